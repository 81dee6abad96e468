use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::bus::{Bus, BusMessage};
use crate::config::EnabledRpcModules;
use crate::error::{BusError, UpstreamError};
use crate::jsonrpc::{ErrorCode, RpcErrorResponse, RpcRequest, RpcResponse};
use crate::upstream::UpstreamClient;

/// Shared state for every egress message handler.
#[derive(Clone)]
pub struct EgressState {
    pub enabled_rpc_modules: EnabledRpcModules,
    pub upstream: UpstreamClient,
}

/// Subscribes to `subject` in queue group `queue` and, for every message
/// the subscription yields, spawns a fresh task running [`handle_message`]
/// so one slow upstream call never blocks queue delivery to the rest of
/// the group.
pub async fn run(
    state: EgressState,
    bus: Arc<dyn Bus>,
    subject: &str,
    queue: &str,
) -> Result<(), BusError> {
    let mut subscription = bus.queue_subscribe(subject, queue).await?;
    info!(subject, queue, "egress subscribed");

    while let Some(message) = subscription.next().await {
        let state = state.clone();
        let bus = bus.clone();
        tokio::spawn(async move {
            handle_and_reply(state, bus, message).await;
        });
    }

    Ok(())
}

async fn handle_and_reply(state: EgressState, bus: Arc<dyn Bus>, message: BusMessage) {
    let response_bytes = handle_message(&state, &message.payload).await;
    let Some(reply_subject) = message.reply else {
        warn!(subject = %message.subject, "message carried no reply subject, dropping response");
        return;
    };
    if let Err(e) = bus.publish(&reply_subject, response_bytes).await {
        error!(error = %e, reply_subject, "failed to publish egress reply");
    }
}

/// The 5-step pipeline of a single inbound bus message: parse, gate on
/// enabled modules, invoke upstream, map upstream errors, encode the
/// reply. Returns the exact bytes to publish back on the reply subject.
pub async fn handle_message(state: &EgressState, payload: &[u8]) -> Vec<u8> {
    let req = match RpcRequest::parse(payload) {
        Ok(req) => req,
        Err(e) => {
            debug!(error = %e, "egress failed to parse request");
            return RpcErrorResponse::new(ErrorCode::NotWellFormed).to_bytes();
        }
    };

    if !state.enabled_rpc_modules.contains_key(&req.module_name) {
        debug!(module = %req.module_name, "module not enabled");
        return RpcErrorResponse::new(ErrorCode::ModuleNotEnabled).to_bytes();
    }

    match state.upstream.call(&req).await {
        Ok(result) => {
            let response = RpcResponse::new(req.id.clone(), result);
            serde_json::to_vec(&response).unwrap_or_else(|_| {
                RpcErrorResponse::new(ErrorCode::InternalError).to_bytes()
            })
        }
        Err(e) => {
            warn!(error = %e, method = %req.method, "upstream call failed");
            let code = match &e {
                UpstreamError::Rpc(message) => ErrorCode::from_upstream_message(message),
                UpstreamError::Transport(_) | UpstreamError::Http(_) | UpstreamError::Json(_) => {
                    ErrorCode::InternalError
                }
            };
            RpcErrorResponse::new(code).to_bytes()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};
    use std::collections::HashMap;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn state_against(server: &MockServer) -> EgressState {
        let mut modules = HashMap::new();
        modules.insert("calculateSum".to_string(), vec!["calculateSum".to_string()]);
        EgressState {
            enabled_rpc_modules: modules,
            upstream: UpstreamClient::new(format!("{}/rpc", server.uri())).unwrap(),
        }
    }

    #[tokio::test]
    async fn successful_call_wraps_result_envelope() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/rpc"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"jsonrpc": "2.0", "result": 3, "id": 1})),
            )
            .mount(&server)
            .await;

        let state = state_against(&server).await;
        let payload =
            br#"{"jsonrpc":"2.0","id":1,"method":"calculateSum_calculateSum","params":[1,2]}"#;
        let response_bytes = handle_message(&state, payload).await;
        let envelope: Value = serde_json::from_slice(&response_bytes).unwrap();
        assert_eq!(envelope["result"], json!(3));
        assert_eq!(envelope["id"], json!(1));
    }

    #[tokio::test]
    async fn malformed_payload_yields_not_well_formed() {
        let server = MockServer::start().await;
        let state = state_against(&server).await;
        let response_bytes = handle_message(&state, b"not json").await;
        let envelope: Value = serde_json::from_slice(&response_bytes).unwrap();
        assert_eq!(envelope["error"]["code"], json!(-32700));
    }

    #[tokio::test]
    async fn disabled_module_yields_module_not_enabled_without_upstream_call() {
        let server = MockServer::start().await;
        // deliberately no mock registered: a call would fail wiremock's
        // "no matching mock" assertion, proving no upstream call happened.
        let state = state_against(&server).await;
        let payload = br#"{"jsonrpc":"2.0","id":1,"method":"nosuchmodule_foo","params":[]}"#;
        let response_bytes = handle_message(&state, payload).await;
        let envelope: Value = serde_json::from_slice(&response_bytes).unwrap();
        assert_eq!(envelope["error"]["code"], json!(101));
    }

    #[tokio::test]
    async fn upstream_invalid_argument_maps_to_invalid_params() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/rpc"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "jsonrpc": "2.0",
                "error": {"code": -32602, "message": "invalid argument: not a number"},
                "id": 1
            })))
            .mount(&server)
            .await;

        let state = state_against(&server).await;
        let payload =
            br#"{"jsonrpc":"2.0","id":1,"method":"calculateSum_calculateSum","params":["x","y"]}"#;
        let response_bytes = handle_message(&state, payload).await;
        let envelope: Value = serde_json::from_slice(&response_bytes).unwrap();
        assert_eq!(envelope["error"]["code"], json!(-32602));
        let text = String::from_utf8(response_bytes).unwrap();
        assert!(!text.contains("not a number"));
    }

    #[tokio::test]
    async fn upstream_transport_failure_maps_to_internal_error() {
        let server = MockServer::start().await;
        server.reset().await;
        // no mock mounted at all; wiremock returns 404, which our client
        // maps to UpstreamError::Http -> InternalError.
        let state = state_against(&server).await;
        let payload =
            br#"{"jsonrpc":"2.0","id":1,"method":"calculateSum_calculateSum","params":[1,2]}"#;
        let response_bytes = handle_message(&state, payload).await;
        let envelope: Value = serde_json::from_slice(&response_bytes).unwrap();
        assert_eq!(envelope["error"]["code"], json!(-32603));
    }
}
