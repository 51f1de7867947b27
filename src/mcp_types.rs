//! MCP protocol envelope types

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// JSON-RPC request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
    pub method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

/// Extract the RPC method name from a request body.
///
/// Returns `None` for anything that does not parse as a single JSON-RPC
/// envelope, including batch arrays; the method gate treats those as
/// requiring authentication.
pub fn request_method(body: &[u8]) -> Option<String> {
    serde_json::from_slice::<JsonRpcRequest>(body)
        .ok()
        .map(|request| request.method)
}
