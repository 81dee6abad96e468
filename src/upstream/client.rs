use reqwest::Client;
use serde::Serialize;
use serde_json::Value;

use crate::error::UpstreamError;
use crate::jsonrpc::RpcRequest;

#[derive(Serialize)]
struct UpstreamRequest<'a> {
    jsonrpc: &'static str,
    id: &'a Value,
    method: String,
    params: &'a [Value],
}

/// Persistent JSON-RPC HTTP client to the single upstream target, built
/// once at egress startup and shared by every spawned handler task.
///
/// There is exactly one upstream here, unlike the teacher's
/// `UpstreamManager`, which holds a pool of backends with a health-state
/// machine and fails over between them; this crate has no multi-backend
/// concept to fail over across, so the client is just a pooled
/// `reqwest::Client` plus the one target URL.
#[derive(Clone)]
pub struct UpstreamClient {
    http: Client,
    base_url: String,
}

impl UpstreamClient {
    pub fn new(base_url: String) -> Result<Self, UpstreamError> {
        let http = Client::builder()
            .build()
            .map_err(|e| UpstreamError::Transport(e.to_string()))?;
        Ok(Self { http, base_url })
    }

    /// Invokes the upstream with the swapped `"<methodName>_<moduleName>"`
    /// form and the original params, returning the decoded `result` value
    /// on success. An upstream-side JSON-RPC error surfaces as
    /// `UpstreamError::Rpc` carrying the raw message — callers are
    /// responsible for classifying it without forwarding it verbatim.
    pub async fn call(&self, req: &RpcRequest) -> Result<Value, UpstreamError> {
        let body = UpstreamRequest {
            jsonrpc: "2.0",
            id: &req.id,
            method: req.full_upstream_method_name(),
            params: &req.params,
        };

        let response = self
            .http
            .post(&self.base_url)
            .json(&body)
            .send()
            .await
            .map_err(|e| UpstreamError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(UpstreamError::Http(status.as_u16()));
        }

        let envelope: Value =
            response.json().await.map_err(|e| UpstreamError::Transport(e.to_string()))?;
        if let Some(error) = envelope.get("error") {
            let message = error
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("upstream error")
                .to_string();
            return Err(UpstreamError::Rpc(message));
        }

        Ok(envelope.get("result").cloned().unwrap_or(Value::Null))
    }
}
