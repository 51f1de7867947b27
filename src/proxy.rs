//! Router assembly and the request pipeline

use axum::{
    body::Bytes,
    extract::State,
    http::HeaderMap,
    middleware,
    response::Response,
    routing::post,
    Router,
};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use tracing::{debug, warn};

use crate::error::ProxyError;
use crate::mcp_types;
use crate::rate_limit::{rate_limit_middleware, RateLimiter, RateLimiterConfig};
use crate::ProxyContext;

/// Largest accepted request body. MCP envelopes are small; anything bigger
/// is abuse.
const MAX_BODY_BYTES: usize = 5 * 1024 * 1024;

pub fn create_router(context: ProxyContext) -> Router {
    let limiter = RateLimiter::new(RateLimiterConfig {
        refill_per_second: context.config.rate_limit_per_second,
        burst: context.config.rate_limit_burst,
    });

    Router::new()
        .route("/mcp", post(handle_mcp))
        .fallback(unknown_path)
        .layer(TraceLayer::new_for_http())
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        // Outermost layer: shed abusive traffic before anything else runs
        .layer(middleware::from_fn_with_state(limiter, rate_limit_middleware))
        .with_state(context)
}

/// Path allow-list: everything except the proxied endpoint is 404,
/// regardless of headers.
async fn unknown_path() -> ProxyError {
    ProxyError::NotFound
}

/// The full pipeline for one request: method gate → authenticator →
/// credential resolution → forward.
async fn handle_mcp(
    State(context): State<ProxyContext>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, ProxyError> {
    let method = mcp_types::request_method(&body);
    // Unparseable bodies fail closed
    let requires_auth = method
        .as_deref()
        .map_or(true, |m| context.policy.requires_auth(m));

    let admission = match context.authenticator.authenticate(&headers, requires_auth) {
        Ok(admission) => admission,
        Err(err) => {
            warn!(
                method = method.as_deref().unwrap_or("<unparsed>"),
                "rejected request without valid proof"
            );
            return Err(err);
        }
    };

    let credential = context.credentials.resolve(admission.proof.as_ref());

    debug!(
        method = method.as_deref().unwrap_or("<unparsed>"),
        identity = %admission.identity,
        "forwarding request downstream"
    );

    context
        .forwarder
        .forward(&headers, body, credential.as_ref())
        .await
}
