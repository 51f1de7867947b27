//! Shared test helpers: stub downstream server and proxy spawning

use axum::{
    extract::State,
    http::{header, HeaderMap},
    routing::post,
    Json, Router,
};
use mcp_auth_proxy::{proxy::create_router, AuthMode, ProxyConfig, ProxyContext};
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::Mutex;

pub const TEST_STATIC_KEY: &str = "test-static-key";
pub const DOWNSTREAM_USER: &str = "neo4j";
pub const DOWNSTREAM_PASS: &str = "graph-password";

/// One request as observed by the stub downstream server.
#[derive(Debug, Clone)]
pub struct CapturedRequest {
    pub authorization: Option<String>,
    pub body: Value,
}

/// Stand-in for the wrapped MCP server: records every request it receives
/// and answers with a canned JSON-RPC result.
#[derive(Clone)]
pub struct StubDownstream {
    pub captured: Arc<Mutex<Vec<CapturedRequest>>>,
    pub url: String,
}

impl StubDownstream {
    pub async fn request_count(&self) -> usize {
        self.captured.lock().await.len()
    }
}

pub async fn spawn_stub_downstream() -> StubDownstream {
    let captured: Arc<Mutex<Vec<CapturedRequest>>> = Arc::new(Mutex::new(Vec::new()));
    let state = captured.clone();

    let app = Router::new()
        .route("/mcp", post(record_request))
        .with_state(state);
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    StubDownstream {
        captured,
        url: format!("http://{addr}/mcp"),
    }
}

async fn record_request(
    State(captured): State<Arc<Mutex<Vec<CapturedRequest>>>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> impl axum::response::IntoResponse {
    let authorization = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned);

    captured.lock().await.push(CapturedRequest {
        authorization,
        body: body.clone(),
    });

    (
        [("x-downstream-stamp", "stub")],
        Json(json!({
            "jsonrpc": "2.0",
            "id": body.get("id").cloned().unwrap_or(Value::Null),
            "result": { "ok": true }
        })),
    )
}

/// Downstream that answers only after a delay, for timeout behaviour.
pub async fn spawn_slow_downstream(delay: Duration) -> String {
    let app = Router::new().route(
        "/mcp",
        post(move || async move {
            tokio::time::sleep(delay).await;
            Json(json!({"jsonrpc": "2.0", "id": 1, "result": {}}))
        }),
    );
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    format!("http://{addr}/mcp")
}

/// Bind the proxy on an ephemeral port and return its base URL.
pub async fn spawn_proxy(config: ProxyConfig) -> String {
    let context = ProxyContext::new(config).unwrap();
    let app = create_router(context);
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
        .unwrap();
    });

    format!("http://{addr}")
}

pub fn static_key_config(downstream_url: &str) -> ProxyConfig {
    ProxyConfig::builder()
        .auth_mode(AuthMode::StaticKey)
        .downstream_url(downstream_url)
        .static_api_key(TEST_STATIC_KEY)
        .downstream_basic_auth(DOWNSTREAM_USER, DOWNSTREAM_PASS)
        .build()
}

pub fn passthrough_config(downstream_url: &str) -> ProxyConfig {
    ProxyConfig::builder()
        .auth_mode(AuthMode::BearerPassthrough)
        .downstream_url(downstream_url)
        .build()
}

/// The Authorization value the stub must see in static-key mode.
pub fn expected_basic_header() -> String {
    use base64::{engine::general_purpose, Engine as _};
    let encoded = general_purpose::STANDARD.encode(format!("{DOWNSTREAM_USER}:{DOWNSTREAM_PASS}"));
    format!("Basic {encoded}")
}
