//! Configuration for the proxy

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::ProxyError;
use crate::method_gate::DEFAULT_OPEN_METHODS;

/// How inbound callers prove their identity, and what the proxy sends
/// downstream in exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AuthMode {
    /// Callers present the shared static key; the proxy injects a fixed
    /// Basic pair downstream.
    StaticKey,

    /// Callers present their own `Authorization` value; the proxy forwards
    /// it verbatim and the downstream server validates it.
    BearerPassthrough,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProxyConfig {
    /// Listen host
    pub host: String,

    /// Listen port
    pub port: u16,

    /// Authentication mode
    pub auth_mode: AuthMode,

    /// Full URL of the wrapped MCP server's endpoint, e.g.
    /// `http://127.0.0.1:8080/mcp`
    pub downstream_url: String,

    /// Shared secret accepted from callers (static-key mode)
    pub static_api_key: Option<String>,

    /// File to read the shared secret from at startup, for mounted secrets
    pub static_api_key_file: Option<PathBuf>,

    /// Username of the fixed Basic pair injected downstream (static-key mode)
    pub downstream_username: Option<String>,

    /// Password of the fixed Basic pair injected downstream (static-key mode)
    pub downstream_password: Option<String>,

    /// Rate guard: tokens restored per second, per client IP
    pub rate_limit_per_second: u32,

    /// Rate guard: bucket capacity (instantaneous burst)
    pub rate_limit_burst: u32,

    /// Total timeout for a downstream call, in seconds
    pub downstream_timeout_seconds: u64,

    /// RPC methods that may proceed without proof of identity
    pub open_methods: Vec<String>,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 7450,
            auth_mode: AuthMode::BearerPassthrough,
            downstream_url: "http://127.0.0.1:8080/mcp".to_string(),
            static_api_key: None,
            static_api_key_file: None,
            downstream_username: None,
            downstream_password: None,
            rate_limit_per_second: 10,
            rate_limit_burst: 10,
            downstream_timeout_seconds: 60,
            open_methods: DEFAULT_OPEN_METHODS.iter().map(|m| m.to_string()).collect(),
        }
    }
}

pub struct ProxyConfigBuilder {
    config: ProxyConfig,
}

impl ProxyConfig {
    pub fn builder() -> ProxyConfigBuilder {
        ProxyConfigBuilder {
            config: ProxyConfig::default(),
        }
    }
}

impl ProxyConfigBuilder {
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.config.host = host.into();
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.config.port = port;
        self
    }

    pub fn auth_mode(mut self, mode: AuthMode) -> Self {
        self.config.auth_mode = mode;
        self
    }

    pub fn downstream_url(mut self, url: impl Into<String>) -> Self {
        self.config.downstream_url = url.into();
        self
    }

    pub fn static_api_key(mut self, key: impl Into<String>) -> Self {
        self.config.static_api_key = Some(key.into());
        self
    }

    pub fn downstream_basic_auth(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.config.downstream_username = Some(username.into());
        self.config.downstream_password = Some(password.into());
        self
    }

    pub fn rate_limit(mut self, per_second: u32, burst: u32) -> Self {
        self.config.rate_limit_per_second = per_second;
        self.config.rate_limit_burst = burst;
        self
    }

    pub fn downstream_timeout_seconds(mut self, seconds: u64) -> Self {
        self.config.downstream_timeout_seconds = seconds;
        self
    }

    pub fn open_methods(mut self, methods: Vec<impl Into<String>>) -> Self {
        self.config.open_methods = methods.into_iter().map(|m| m.into()).collect();
        self
    }

    pub fn build(self) -> ProxyConfig {
        self.config
    }
}

impl ProxyConfig {
    /// Load configuration from environment and files
    pub fn from_env() -> Result<Self, config::ConfigError> {
        Self::load(None)
    }

    /// Load configuration, layering defaults, an optional TOML file, and
    /// environment variables (`AUTH_MODE`, `DOWNSTREAM_URL`, ...).
    pub fn load(file: Option<&Path>) -> Result<Self, config::ConfigError> {
        let _ = dotenvy::dotenv();

        let mut builder = config::Config::builder()
            .add_source(config::Config::try_from(&ProxyConfig::default())?);

        match file {
            Some(path) => {
                builder = builder.add_source(config::File::from(path));
            }
            None => {
                if Path::new("proxy.toml").exists() {
                    builder = builder.add_source(config::File::with_name("proxy"));
                }
            }
        }

        builder = builder.add_source(
            config::Environment::default()
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("open_methods"),
        );

        builder.build()?.try_deserialize()
    }

    /// Read secret material from disk. Happens once at startup; never on
    /// the request path.
    pub fn load_secrets(&mut self) -> Result<(), ProxyError> {
        if self.static_api_key.is_none() {
            if let Some(path) = &self.static_api_key_file {
                let key = std::fs::read_to_string(path).map_err(|e| {
                    ProxyError::Config(format!("failed to read {}: {e}", path.display()))
                })?;
                self.static_api_key = Some(key.trim_end().to_string());
            }
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ProxyError> {
        if self.downstream_url.is_empty() {
            return Err(ProxyError::Config("DOWNSTREAM_URL must be set".into()));
        }
        if self.rate_limit_per_second == 0 || self.rate_limit_burst == 0 {
            return Err(ProxyError::Config(
                "rate limit rate and burst must be at least 1".into(),
            ));
        }
        if self.downstream_timeout_seconds == 0 {
            return Err(ProxyError::Config(
                "DOWNSTREAM_TIMEOUT_SECONDS must be at least 1".into(),
            ));
        }
        if self.auth_mode == AuthMode::StaticKey {
            match &self.static_api_key {
                Some(key) if !key.is_empty() => {}
                _ => {
                    return Err(ProxyError::Config(
                        "static-key mode requires STATIC_API_KEY or STATIC_API_KEY_FILE".into(),
                    ))
                }
            }
            if self.downstream_username.is_none() || self.downstream_password.is_none() {
                return Err(ProxyError::Config(
                    "static-key mode requires DOWNSTREAM_USERNAME and DOWNSTREAM_PASSWORD".into(),
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_defaults() {
        let config = ProxyConfig::builder().build();
        assert_eq!(config.auth_mode, AuthMode::BearerPassthrough);
        assert_eq!(config.rate_limit_per_second, 10);
        assert_eq!(config.downstream_timeout_seconds, 60);
        assert_eq!(config.open_methods, vec!["initialize", "tools/list", "ping"]);
    }

    #[test]
    fn test_passthrough_mode_needs_no_secrets() {
        let config = ProxyConfig::builder()
            .downstream_url("http://localhost:8080/mcp")
            .build();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_static_mode_requires_key_and_pair() {
        let config = ProxyConfig::builder()
            .auth_mode(AuthMode::StaticKey)
            .build();
        assert!(config.validate().is_err());

        let config = ProxyConfig::builder()
            .auth_mode(AuthMode::StaticKey)
            .static_api_key("k")
            .build();
        assert!(config.validate().is_err());

        let config = ProxyConfig::builder()
            .auth_mode(AuthMode::StaticKey)
            .static_api_key("k")
            .downstream_basic_auth("neo4j", "secret")
            .build();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_rate_limit_rejected() {
        let config = ProxyConfig::builder().rate_limit(0, 5).build();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_secret_file_loaded_once() {
        let dir = std::env::temp_dir().join("mcp-auth-proxy-config-test");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("api-key");
        std::fs::write(&path, "from-file\n").unwrap();

        let mut config = ProxyConfig::builder().build();
        config.static_api_key_file = Some(path);
        config.load_secrets().unwrap();
        assert_eq!(config.static_api_key.as_deref(), Some("from-file"));
    }
}
