use std::fmt;

/// Failure while parsing or validating an inbound JSON-RPC call.
///
/// Mirrors the validation order in [`crate::jsonrpc::request`]: malformed
/// JSON, then a missing/null `id`, then a bad `jsonrpc` field, then a
/// method that doesn't split into exactly two non-empty `_`-separated
/// halves. The offending payload is never attached here — callers log it
/// separately, since [`ParseError`]'s `Display` output ends up verbatim in
/// wire-facing error messages.
#[derive(Debug)]
pub enum ParseError {
    NotWellFormed(String),
    InvalidRequest(String),
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotWellFormed(reason) => write!(f, "not well formed: {reason}"),
            Self::InvalidRequest(reason) => write!(f, "invalid request: {reason}"),
        }
    }
}

impl std::error::Error for ParseError {}

/// Failure from the result cache. Only `remove` on a missing key can fail.
#[derive(Debug)]
pub enum CacheError {
    NotFound,
}

impl fmt::Display for CacheError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "request not found in cache"),
        }
    }
}

impl std::error::Error for CacheError {}

/// Failure talking to the message bus (publish, request/reply, subscribe, drain).
#[derive(Debug)]
pub enum BusError {
    Connect(String),
    Publish(String),
    Timeout,
    Subscribe(String),
    Drain(String),
}

impl fmt::Display for BusError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connect(e) => write!(f, "bus connect failed: {e}"),
            Self::Publish(e) => write!(f, "bus publish failed: {e}"),
            Self::Timeout => write!(f, "bus reply timed out"),
            Self::Subscribe(e) => write!(f, "bus subscribe failed: {e}"),
            Self::Drain(e) => write!(f, "bus drain failed: {e}"),
        }
    }
}

impl std::error::Error for BusError {}

/// Failure invoking the upstream JSON-RPC server from egress.
#[derive(Debug)]
pub enum UpstreamError {
    Transport(String),
    Http(u16),
    Json(serde_json::Error),
    Rpc(String),
}

impl fmt::Display for UpstreamError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transport(e) => write!(f, "upstream transport error: {e}"),
            Self::Http(status) => write!(f, "upstream HTTP {status}"),
            Self::Json(e) => write!(f, "upstream JSON error: {e}"),
            Self::Rpc(msg) => write!(f, "upstream RPC error: {msg}"),
        }
    }
}

impl std::error::Error for UpstreamError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Json(e) => Some(e),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for UpstreamError {
    fn from(e: serde_json::Error) -> Self {
        Self::Json(e)
    }
}

/// Failure loading or parsing the JSON config file.
#[derive(Debug)]
pub enum ConfigError {
    Read(String),
    Parse(serde_json::Error),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Read(e) => write!(f, "could not read config file: {e}"),
            Self::Parse(e) => write!(f, "could not parse config file: {e}"),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Parse(e) => Some(e),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(e: serde_json::Error) -> Self {
        Self::Parse(e)
    }
}
