//! Downstream credential resolution

use axum::http::HeaderValue;
use base64::{engine::general_purpose, Engine as _};

use crate::auth::CredentialProof;
use crate::config::{AuthMode, ProxyConfig};
use crate::error::ProxyError;

/// The credential the proxy presents to the wrapped server.
#[derive(Clone)]
pub enum DownstreamCredential {
    /// Fixed `Authorization: Basic` pair, precomputed at startup.
    Basic(HeaderValue),
    /// Inbound `Authorization` value, forwarded verbatim.
    Passthrough(HeaderValue),
}

impl DownstreamCredential {
    pub fn basic(username: &str, password: &str) -> Result<Self, ProxyError> {
        let encoded = general_purpose::STANDARD.encode(format!("{username}:{password}"));
        let mut value = HeaderValue::from_str(&format!("Basic {encoded}")).map_err(|e| {
            ProxyError::Config(format!("downstream credentials are not header-safe: {e}"))
        })?;
        value.set_sensitive(true);
        Ok(Self::Basic(value))
    }

    pub fn header_value(&self) -> &HeaderValue {
        match self {
            Self::Basic(value) | Self::Passthrough(value) => value,
        }
    }
}

impl std::fmt::Debug for DownstreamCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Basic(_) => f.write_str("DownstreamCredential::Basic(<redacted>)"),
            Self::Passthrough(_) => f.write_str("DownstreamCredential::Passthrough(<redacted>)"),
        }
    }
}

/// Resolves the downstream credential for an admitted request.
///
/// Static mode hands out the same fixed pair for every caller; pass-through
/// hands back the proof the authenticator extracted. Resolution never does
/// network I/O: secret material was loaded once at process start.
pub struct CredentialSource {
    mode: AuthMode,
    static_basic: Option<DownstreamCredential>,
}

impl CredentialSource {
    pub fn from_config(config: &ProxyConfig) -> Result<Self, ProxyError> {
        let static_basic = match config.auth_mode {
            AuthMode::StaticKey => {
                let username = config.downstream_username.as_deref().ok_or_else(|| {
                    ProxyError::Config("static-key mode requires DOWNSTREAM_USERNAME".into())
                })?;
                let password = config.downstream_password.as_deref().ok_or_else(|| {
                    ProxyError::Config("static-key mode requires DOWNSTREAM_PASSWORD".into())
                })?;
                Some(DownstreamCredential::basic(username, password)?)
            }
            AuthMode::BearerPassthrough => None,
        };

        Ok(Self {
            mode: config.auth_mode,
            static_basic,
        })
    }

    /// Only runs after the authenticator admitted the request: a downstream
    /// credential is never derived from unvalidated proof.
    pub fn resolve(&self, proof: Option<&CredentialProof>) -> Option<DownstreamCredential> {
        match self.mode {
            AuthMode::StaticKey => self.static_basic.clone(),
            AuthMode::BearerPassthrough => {
                proof.map(|p| DownstreamCredential::Passthrough(p.value().clone()))
            }
        }
    }
}
