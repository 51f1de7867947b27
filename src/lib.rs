//! mcp-auth-proxy - Authenticating reverse proxy for MCP servers
//!
//! Sits in front of an opaque MCP server, decides per JSON-RPC method
//! whether proof of identity is required, validates or extracts that
//! proof, and forwards the request with the downstream credential
//! injected. Responses are relayed verbatim.

pub mod auth;
pub mod config;
pub mod credentials;
pub mod error;
pub mod forwarder;
pub mod mcp_types;
pub mod method_gate;
pub mod proxy;
pub mod rate_limit;

pub use auth::{Admission, Authenticator, CallerIdentity};
pub use config::{AuthMode, ProxyConfig};
pub use credentials::{CredentialSource, DownstreamCredential};
pub use error::ProxyError;
pub use method_gate::MethodPolicy;

use std::sync::Arc;

use forwarder::Forwarder;

/// Shared per-process state: the configuration and the request-pipeline
/// components, built once at startup and cloned into the router.
#[derive(Clone)]
pub struct ProxyContext {
    pub config: Arc<ProxyConfig>,
    pub policy: Arc<MethodPolicy>,
    pub authenticator: Arc<Authenticator>,
    pub credentials: Arc<CredentialSource>,
    pub forwarder: Arc<Forwarder>,
}

impl ProxyContext {
    pub fn new(mut config: ProxyConfig) -> Result<Self, ProxyError> {
        config.load_secrets()?;
        config.validate()?;

        let policy = MethodPolicy::new(config.open_methods.iter().cloned());
        let authenticator = Authenticator::from_config(&config)?;
        let credentials = CredentialSource::from_config(&config)?;
        let forwarder = Forwarder::from_config(&config)?;

        Ok(Self {
            config: Arc::new(config),
            policy: Arc::new(policy),
            authenticator: Arc::new(authenticator),
            credentials: Arc::new(credentials),
            forwarder: Arc::new(forwarder),
        })
    }
}
