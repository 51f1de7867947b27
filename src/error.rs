//! Error taxonomy for the request pipeline

use axum::{
    http::{header, HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProxyError {
    /// Missing or invalid proof on a method that requires it. Deliberately
    /// carries no detail: callers must not learn whether the header was
    /// missing or the value wrong.
    #[error("unauthorized")]
    Unauthorized,

    #[error("forbidden")]
    Forbidden,

    #[error("not found")]
    NotFound,

    #[error("rate limited, retry after {retry_after}s")]
    RateLimited { retry_after: u64, limit: u32 },

    /// Downstream server unreachable. The detail is logged, never sent.
    #[error("bad gateway: {0}")]
    BadGateway(String),

    #[error("gateway timeout")]
    GatewayTimeout,

    #[error("configuration error: {0}")]
    Config(String),
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            Self::Unauthorized => (StatusCode::UNAUTHORIZED, "Authentication required"),
            Self::Forbidden => (StatusCode::FORBIDDEN, "Access denied"),
            Self::NotFound => (StatusCode::NOT_FOUND, "Not found"),
            Self::RateLimited { .. } => (StatusCode::TOO_MANY_REQUESTS, "Too many requests"),
            Self::BadGateway(detail) => {
                tracing::warn!(detail = %detail, "downstream request failed");
                (StatusCode::BAD_GATEWAY, "Downstream server unavailable")
            }
            Self::GatewayTimeout => (StatusCode::GATEWAY_TIMEOUT, "Downstream server timed out"),
            Self::Config(detail) => {
                tracing::error!(detail = %detail, "configuration error reached the request path");
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal error")
            }
        };

        let mut response = (status, Json(json!({ "error": message }))).into_response();

        match self {
            Self::Unauthorized => {
                response
                    .headers_mut()
                    .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
            }
            Self::RateLimited { retry_after, limit } => {
                let headers = response.headers_mut();
                headers.insert(header::RETRY_AFTER, HeaderValue::from(retry_after));
                headers.insert(
                    HeaderName::from_static("x-ratelimit-limit"),
                    HeaderValue::from(limit),
                );
                headers.insert(
                    HeaderName::from_static("x-ratelimit-remaining"),
                    HeaderValue::from_static("0"),
                );
            }
            _ => {}
        }

        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            ProxyError::Unauthorized.into_response().status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ProxyError::NotFound.into_response().status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ProxyError::BadGateway("refused".into()).into_response().status(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            ProxyError::GatewayTimeout.into_response().status(),
            StatusCode::GATEWAY_TIMEOUT
        );
    }

    #[test]
    fn test_unauthorized_advertises_bearer() {
        let response = ProxyError::Unauthorized.into_response();
        assert_eq!(
            response.headers().get(header::WWW_AUTHENTICATE),
            Some(&HeaderValue::from_static("Bearer"))
        );
    }

    #[test]
    fn test_rate_limited_headers() {
        let response = ProxyError::RateLimited {
            retry_after: 2,
            limit: 10,
        }
        .into_response();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(
            response.headers().get(header::RETRY_AFTER),
            Some(&HeaderValue::from(2u64))
        );
        assert_eq!(
            response.headers().get("x-ratelimit-limit"),
            Some(&HeaderValue::from(10u32))
        );
    }
}
