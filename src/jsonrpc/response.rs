use serde::{Deserialize, Serialize};
use serde_json::Value;

/// JSON-RPC 2.0 error codes this relay can surface on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    NotWellFormed,
    InvalidRequest,
    MethodNotFound,
    InvalidParams,
    InternalError,
    ModuleNotEnabled,
}

impl ErrorCode {
    pub fn code(self) -> i64 {
        match self {
            Self::NotWellFormed => -32700,
            Self::InvalidRequest => -32600,
            Self::MethodNotFound => -32601,
            Self::InvalidParams => -32602,
            Self::InternalError => -32603,
            Self::ModuleNotEnabled => 101,
        }
    }

    pub fn message(self) -> &'static str {
        match self {
            Self::NotWellFormed => "not well formed",
            Self::InvalidRequest => "invalid request",
            Self::MethodNotFound => "method not found",
            Self::InvalidParams => "invalid params",
            Self::InternalError => "internal error",
            Self::ModuleNotEnabled => "module not enabled",
        }
    }

    /// Maps an upstream error message to a wire error code by prefix:
    /// messages starting with `"invalid argument"` become `InvalidParams`;
    /// everything else becomes `InternalError`. The raw message is never
    /// forwarded — only used here, by the caller, for classification.
    pub fn from_upstream_message(message: &str) -> Self {
        if message.starts_with("invalid argument") {
            Self::InvalidParams
        } else {
            Self::InternalError
        }
    }
}

/// Success envelope: `{jsonrpc, result, id}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcResponse {
    pub jsonrpc: String,
    pub result: Value,
    pub id: Value,
}

impl RpcResponse {
    pub fn new(id: Value, result: Value) -> Self {
        Self { jsonrpc: "2.0".to_string(), result, id }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcError {
    pub code: i64,
    pub message: String,
}

/// Failure envelope: `{jsonrpc: "2.0", id: null, error: {code, message}}`.
/// `id` is always null — no correlation leak for malformed requests.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcErrorResponse {
    pub jsonrpc: String,
    pub id: Value,
    pub error: RpcError,
}

impl RpcErrorResponse {
    pub fn new(code: ErrorCode) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id: Value::Null,
            error: RpcError { code: code.code(), message: code.message().to_string() },
        }
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        serde_json::to_vec(self).unwrap_or_default()
    }
}
