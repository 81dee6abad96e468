use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ParseError;
use crate::jsonrpc::fingerprint;

/// Raw wire shape used only to detect "field missing" vs "field present but null",
/// which `id` validation depends on.
#[derive(Debug, Deserialize)]
struct RawRequest {
    jsonrpc: Option<Value>,
    id: Option<Value>,
    method: Option<Value>,
    #[serde(default)]
    params: Vec<Value>,
}

/// A parsed, validated JSON-RPC 2.0 call. Immutable once built.
#[derive(Debug, Clone)]
pub struct RpcRequest {
    pub id: Value,
    pub method: String,
    pub module_name: String,
    pub method_name: String,
    pub params: Vec<Value>,
}

impl RpcRequest {
    /// Parses and validates raw bytes into an `RpcRequest`.
    ///
    /// Validation order: well-formed JSON, then `id` present and non-null,
    /// then `jsonrpc == "2.0"`, then `method` splits into exactly one `_`
    /// separator with non-empty halves. Every failure surfaces as
    /// [`ParseError::NotWellFormed`] — see spec's error taxonomy, which
    /// classifies all of these cases under the same wire error code and
    /// leaves `InvalidRequest` reserved for future use.
    pub fn parse(bytes: &[u8]) -> Result<Self, ParseError> {
        let raw: RawRequest = serde_json::from_slice(bytes)
            .map_err(|e| ParseError::NotWellFormed(e.to_string()))?;

        let id = match raw.id {
            Some(Value::Null) | None => {
                return Err(ParseError::NotWellFormed("missing or null id".into()));
            }
            Some(v) => v,
        };

        let jsonrpc = raw
            .jsonrpc
            .as_ref()
            .and_then(Value::as_str)
            .unwrap_or_default();
        if jsonrpc != "2.0" {
            return Err(ParseError::NotWellFormed(format!(
                "unsupported jsonrpc version: {jsonrpc:?}"
            )));
        }

        let method = raw
            .method
            .as_ref()
            .and_then(Value::as_str)
            .ok_or_else(|| ParseError::NotWellFormed("missing method".into()))?
            .to_string();

        let mut parts = method.splitn(2, '_');
        let module_name = parts.next().unwrap_or_default();
        let method_name = parts.next().unwrap_or_default();
        if module_name.is_empty() || method_name.is_empty() || method.matches('_').count() != 1 {
            return Err(ParseError::NotWellFormed(format!(
                "method does not split into exactly two non-empty halves: {method}"
            )));
        }

        Ok(Self {
            id,
            module_name: module_name.to_string(),
            method_name: method_name.to_string(),
            method,
            params: raw.params,
        })
    }

    /// `"<methodName>_<moduleName>"` — the swapped form the upstream
    /// JSON-RPC server expects (matches the `service_method` naming
    /// convention used by the upstream's JSON-RPC client).
    pub fn full_upstream_method_name(&self) -> String {
        format!("{}_{}", self.method_name, self.module_name)
    }

    /// Deterministic cache key: see [`fingerprint::fingerprint`].
    pub fn cache_key(&self) -> String {
        fingerprint::fingerprint(&self.method, &self.params)
    }

    /// Re-marshals this request to the same wire shape it was parsed from
    /// (original, unswapped `method`). Used by ingress to publish the
    /// request on the bus for egress to parse with the same [`RpcRequest::parse`].
    pub fn to_wire_bytes(&self) -> Vec<u8> {
        #[derive(Serialize)]
        struct Wire<'a> {
            jsonrpc: &'static str,
            id: &'a Value,
            method: &'a str,
            params: &'a [Value],
        }
        serde_json::to_vec(&Wire {
            jsonrpc: "2.0",
            id: &self.id,
            method: &self.method,
            params: &self.params,
        })
        .unwrap_or_default()
    }
}
