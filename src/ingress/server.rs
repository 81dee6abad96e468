use std::sync::Arc;
use std::time::Duration;

use axum::body::Bytes;
use axum::extract::{Method, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::any;
use axum::Router;
use tracing::{debug, warn};

use crate::bus::{subject_for, Bus};
use crate::cache::{Freshness, ResultCache};
use crate::error::BusError;
use crate::jsonrpc::{ErrorCode, RpcErrorResponse, RpcRequest};

/// Shared state for every ingress HTTP handler. `bus` is `Arc<dyn Bus>` so
/// the same router runs against a real `NatsBus` in production and a
/// `LocalBus` in tests.
#[derive(Clone)]
pub struct AppState {
    pub cache: ResultCache,
    pub bus: Arc<dyn Bus>,
    pub subject_pattern: String,
    pub call_timeout: Duration,
}

/// Builds the ingress router: a single route, `/`, that accepts only
/// `POST`. Other methods are rejected inside the handler (rather than left
/// to axum's default 405) so the body matches the exact text the wire
/// contract requires.
pub fn router(state: AppState) -> Router {
    Router::new().route("/", any(handle)).with_state(state)
}

async fn handle(State(state): State<AppState>, method: Method, body: Bytes) -> Response {
    if method != Method::POST {
        return (StatusCode::METHOD_NOT_ALLOWED, "invalid HTTP method: only POST is allowed")
            .into_response();
    }

    let req = match RpcRequest::parse(&body) {
        Ok(req) => req,
        Err(e) => {
            debug!(error = %e, "request failed to parse");
            return (
                StatusCode::BAD_REQUEST,
                RpcErrorResponse::new(ErrorCode::NotWellFormed).to_bytes(),
            )
                .into_response();
        }
    };

    let key = req.cache_key();
    if let Freshness::Fresh(bytes) = state.cache.freshness(&key).await {
        return json_bytes_response(&bytes);
    }

    // Stale-usable and miss both fall through to a synchronous upstream
    // round-trip; the freshness check above has already evicted any
    // entry past the expire threshold, so both cases look identical here.
    match call_upstream(&state, &req).await {
        Ok(bytes) => {
            state.cache.add(key, bytes.clone()).await;
            json_bytes_response(&bytes)
        }
        Err(e) => {
            warn!(error = %e, method = %req.method, "bus round-trip failed");
            (StatusCode::INTERNAL_SERVER_ERROR, "internal error").into_response()
        }
    }
}

async fn call_upstream(state: &AppState, req: &RpcRequest) -> Result<Vec<u8>, BusError> {
    let subject = subject_for(&state.subject_pattern, &req.module_name, &req.method_name);
    state.bus.request(&subject, req.to_wire_bytes(), state.call_timeout).await
}

fn json_bytes_response(bytes: &[u8]) -> Response {
    (StatusCode::OK, [(header::CONTENT_TYPE, "application/json")], bytes.to_vec()).into_response()
}
