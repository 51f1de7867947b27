//! Rate limiting middleware for the proxied endpoint

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::{
    collections::HashMap,
    sync::Arc,
    time::Instant,
};
use tokio::sync::RwLock;

use crate::error::ProxyError;

/// Rate limiter configuration
#[derive(Clone, Debug)]
pub struct RateLimiterConfig {
    /// Tokens restored per second
    pub refill_per_second: u32,
    /// Bucket capacity (instantaneous burst)
    pub burst: u32,
}

impl Default for RateLimiterConfig {
    fn default() -> Self {
        Self {
            refill_per_second: 10,
            burst: 10,
        }
    }
}

/// Token-bucket limiter keyed by client IP
#[derive(Clone)]
pub struct RateLimiter {
    config: RateLimiterConfig,
    buckets: Arc<RwLock<HashMap<String, Bucket>>>,
}

#[derive(Debug, Clone)]
struct Bucket {
    tokens: f64,
    last_refill: Instant,
}

impl RateLimiter {
    pub fn new(config: RateLimiterConfig) -> Self {
        Self {
            config,
            buckets: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Drop buckets idle long enough to be full again
    async fn cleanup(&self) {
        let mut buckets = self.buckets.write().await;
        let now = Instant::now();
        let idle_to_full =
            f64::from(self.config.burst) / f64::from(self.config.refill_per_second.max(1));

        buckets.retain(|_, bucket| {
            now.duration_since(bucket.last_refill).as_secs_f64() < idle_to_full
        });
    }

    /// Take one token for the client, or report how long until one exists
    pub async fn check(&self, key: &str) -> Result<(), RateLimitError> {
        // Periodically clean up idle buckets
        if rand::random::<f32>() < 0.01 {
            self.cleanup().await;
        }

        let mut buckets = self.buckets.write().await;
        let now = Instant::now();
        let rate = f64::from(self.config.refill_per_second);
        let burst = f64::from(self.config.burst);

        let bucket = buckets.entry(key.to_owned()).or_insert(Bucket {
            tokens: burst,
            last_refill: now,
        });

        let elapsed = now.duration_since(bucket.last_refill).as_secs_f64();
        bucket.tokens = (bucket.tokens + elapsed * rate).min(burst);
        bucket.last_refill = now;

        if bucket.tokens < 1.0 {
            let wait = (1.0 - bucket.tokens) / rate;
            return Err(RateLimitError {
                retry_after: wait.ceil() as u64,
                limit: self.config.refill_per_second,
            });
        }

        bucket.tokens -= 1.0;
        Ok(())
    }

    /// Extract client identifier from request
    fn get_client_key(request: &Request) -> Option<String> {
        // Try X-Forwarded-For or X-Real-IP headers first
        if let Some(forwarded_for) = request.headers().get("x-forwarded-for") {
            if let Ok(value) = forwarded_for.to_str() {
                // Take the first IP in the chain
                if let Some(ip) = value.split(',').next() {
                    return Some(ip.trim().to_string());
                }
            }
        }

        if let Some(real_ip) = request.headers().get("x-real-ip") {
            if let Ok(value) = real_ip.to_str() {
                return Some(value.to_string());
            }
        }

        // Fall back to connection info
        request
            .extensions()
            .get::<axum::extract::ConnectInfo<std::net::SocketAddr>>()
            .map(|conn_info| conn_info.0.ip().to_string())
    }
}

#[derive(Debug)]
pub struct RateLimitError {
    pub retry_after: u64,
    pub limit: u32,
}

/// Rate limiting middleware; runs before authentication so abusive traffic
/// is shed without any parsing or credential work
pub async fn rate_limit_middleware(
    State(limiter): State<RateLimiter>,
    request: Request,
    next: Next,
) -> Response {
    // Only the proxied endpoint is metered; unknown paths 404 regardless
    if request.uri().path() != "/mcp" {
        return next.run(request).await;
    }

    let client_key =
        RateLimiter::get_client_key(&request).unwrap_or_else(|| "unknown".to_string());

    if let Err(err) = limiter.check(&client_key).await {
        return ProxyError::RateLimited {
            retry_after: err.retry_after,
            limit: err.limit,
        }
        .into_response();
    }

    next.run(request).await
}
