use axum::body::Bytes;
use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::Router;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

/// Trivial stand-in for the out-of-scope upstream JSON-RPC server: two
/// services, `calculateSum` and `reverseString`, enough to drive the
/// relay end to end and to satisfy spec's test-harness requirement of an
/// in-process upstream stub.
#[derive(Clone, Default)]
pub struct StubState;

pub fn router(rpc_endpoint_path: &str) -> Router {
    Router::new().route(rpc_endpoint_path, post(handle)).with_state(StubState)
}

#[derive(Debug, Deserialize)]
struct RawCall {
    id: Value,
    method: String,
    #[serde(default)]
    params: Vec<Value>,
}

async fn handle(State(_state): State<StubState>, body: Bytes) -> Response {
    let call: RawCall = match serde_json::from_slice(&body) {
        Ok(call) => call,
        Err(e) => {
            debug!(error = %e, "stub received malformed request");
            return (StatusCode::BAD_REQUEST, "malformed request").into_response();
        }
    };

    let result = match call.method.as_str() {
        "calculateSum_calculateSum" => calculate_sum(&call.params),
        "reverseString_reverseString" => reverse_string(&call.params),
        other => Err(format!("method not found: {other}")),
    };

    let envelope = match result {
        Ok(value) => json!({"jsonrpc": "2.0", "result": value, "id": call.id}),
        Err(message) => {
            json!({"jsonrpc": "2.0", "error": {"code": -32602, "message": message}, "id": call.id})
        }
    };

    (StatusCode::OK, [(header::CONTENT_TYPE, "application/json")], serde_json::to_vec(&envelope).unwrap_or_default())
        .into_response()
}

fn calculate_sum(params: &[Value]) -> Result<Value, String> {
    let [a, b] = params else {
        return Err("invalid argument: calculateSum wants exactly two numbers".to_string());
    };
    let (Some(a), Some(b)) = (a.as_f64(), b.as_f64()) else {
        return Err("invalid argument: calculateSum params must be numbers".to_string());
    };
    Ok(json!(a + b))
}

fn reverse_string(params: &[Value]) -> Result<Value, String> {
    let [s] = params else {
        return Err("invalid argument: reverseString wants exactly one string".to_string());
    };
    let Some(s) = s.as_str() else {
        return Err("invalid argument: reverseString param must be a string".to_string());
    };
    Ok(json!(s.chars().rev().collect::<String>()))
}
