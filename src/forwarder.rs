//! Credential injection and downstream forwarding

use std::time::Duration;

use axum::body::{Body, Bytes};
use axum::http::{header, HeaderMap, HeaderName};
use axum::response::Response;

use crate::auth::API_KEY_HEADER;
use crate::config::ProxyConfig;
use crate::credentials::DownstreamCredential;
use crate::error::ProxyError;

const HOP_BY_HOP_HEADERS: [&str; 8] = [
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Rewrites the outbound credential and relays the exchange with the
/// wrapped server. One outbound call per inbound request, never retried:
/// MCP calls may not be idempotent.
pub struct Forwarder {
    client: reqwest::Client,
    downstream_url: reqwest::Url,
}

impl Forwarder {
    pub fn from_config(config: &ProxyConfig) -> Result<Self, ProxyError> {
        let downstream_url = reqwest::Url::parse(&config.downstream_url)
            .map_err(|e| ProxyError::Config(format!("invalid DOWNSTREAM_URL: {e}")))?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.downstream_timeout_seconds))
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(|e| ProxyError::Config(format!("failed to build downstream client: {e}")))?;

        Ok(Self {
            client,
            downstream_url,
        })
    }

    /// Forward the body unmodified with the resolved credential injected,
    /// then relay the downstream response verbatim (minus hop-by-hop
    /// headers).
    pub async fn forward(
        &self,
        inbound_headers: &HeaderMap,
        body: Bytes,
        credential: Option<&DownstreamCredential>,
    ) -> Result<Response, ProxyError> {
        let mut headers = outbound_headers(inbound_headers);
        if let Some(credential) = credential {
            headers.insert(header::AUTHORIZATION, credential.header_value().clone());
        }

        let outcome = self
            .client
            .post(self.downstream_url.clone())
            .headers(headers)
            .body(body)
            .send()
            .await;

        let upstream = match outcome {
            Ok(response) => response,
            Err(err) if err.is_timeout() => return Err(ProxyError::GatewayTimeout),
            Err(err) => return Err(ProxyError::BadGateway(err.to_string())),
        };

        let status = upstream.status();
        let relayed = relay_headers(upstream.headers());

        let mut response = Response::new(Body::from_stream(upstream.bytes_stream()));
        *response.status_mut() = status;
        *response.headers_mut() = relayed;
        Ok(response)
    }
}

fn is_hop_by_hop(name: &HeaderName) -> bool {
    HOP_BY_HOP_HEADERS.contains(&name.as_str())
}

/// Headers to send downstream: everything the caller sent except
/// hop-by-hop headers and the inbound credential, which is replaced.
fn outbound_headers(inbound: &HeaderMap) -> HeaderMap {
    let mut headers = HeaderMap::new();
    for (name, value) in inbound {
        if is_hop_by_hop(name)
            || *name == header::AUTHORIZATION
            || *name == header::HOST
            || *name == header::CONTENT_LENGTH
            || name.as_str() == API_KEY_HEADER
        {
            continue;
        }
        headers.append(name.clone(), value.clone());
    }
    headers
}

fn relay_headers(upstream: &HeaderMap) -> HeaderMap {
    let mut headers = HeaderMap::new();
    for (name, value) in upstream {
        if is_hop_by_hop(name) {
            continue;
        }
        headers.append(name.clone(), value.clone());
    }
    headers
}
