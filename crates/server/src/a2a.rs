use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::State,
    routing::{get, post},
    Json, Router,
};
use orderlink_core::domain::descriptor::{DESCRIPTOR_PATH, LEGACY_DESCRIPTOR_PATH};
use orderlink_core::{CapabilityDescriptor, MessageEnvelope, OrderResult};
use orderlink_relay::jsonrpc::{
    INTERNAL_ERROR, INVALID_REQUEST, JSONRPC_VERSION, METHOD_MESSAGE_SEND, METHOD_NOT_FOUND,
    METHOD_TASKS_CANCEL, PARSE_ERROR,
};
use orderlink_relay::{respond, JsonRpcError, JsonRpcRequest, JsonRpcResponse, TaskExecutor};
use serde_json::{json, Value};
use tracing::{info, warn};

#[derive(Clone)]
pub struct RelayState {
    descriptor: Arc<CapabilityDescriptor>,
    executor: Arc<dyn TaskExecutor>,
}

impl RelayState {
    pub fn new(descriptor: CapabilityDescriptor, executor: Arc<dyn TaskExecutor>) -> Self {
        Self { descriptor: Arc::new(descriptor), executor }
    }
}

pub fn router(state: RelayState) -> Router {
    Router::new()
        .route(DESCRIPTOR_PATH, get(descriptor))
        .route(LEGACY_DESCRIPTOR_PATH, get(descriptor))
        .route("/", post(rpc))
        .with_state(state)
}

async fn descriptor(State(state): State<RelayState>) -> Json<CapabilityDescriptor> {
    Json(state.descriptor.as_ref().clone())
}

/// JSON-RPC entry point. Protocol-level failures, undecodable bytes included, are reported as
/// JSON-RPC error objects inside an HTTP 200 response.
async fn rpc(State(state): State<RelayState>, body: Bytes) -> Json<JsonRpcResponse> {
    let frame: Value = match serde_json::from_slice(&body) {
        Ok(frame) => frame,
        Err(error) => {
            return Json(JsonRpcResponse::failure(
                Value::Null,
                JsonRpcError::new(PARSE_ERROR, format!("parse error: {error}")),
            ))
        }
    };
    let id = frame.get("id").cloned().unwrap_or(Value::Null);

    let request = match serde_json::from_value::<JsonRpcRequest>(frame) {
        Ok(request) if request.jsonrpc == JSONRPC_VERSION => request,
        Ok(request) => {
            return Json(JsonRpcResponse::failure(
                id,
                JsonRpcError::new(
                    INVALID_REQUEST,
                    format!("unsupported jsonrpc version `{}`", request.jsonrpc),
                ),
            ))
        }
        Err(error) => {
            return Json(JsonRpcResponse::failure(
                id,
                JsonRpcError::new(INVALID_REQUEST, format!("invalid request: {error}")),
            ))
        }
    };

    let response = match request.method.as_str() {
        METHOD_MESSAGE_SEND => message_send(&state, request).await,
        METHOD_TASKS_CANCEL => tasks_cancel(&state, request).await,
        other => {
            warn!(
                event_name = "relay.server.unknown_method",
                correlation_id = %request.id,
                method = %other,
                "rejecting unknown JSON-RPC method"
            );
            JsonRpcResponse::failure(
                request.id,
                JsonRpcError::new(METHOD_NOT_FOUND, format!("method `{other}` not found")),
            )
        }
    };
    Json(response)
}

async fn message_send(state: &RelayState, request: JsonRpcRequest) -> JsonRpcResponse {
    let message = request.params.get("message").cloned().unwrap_or(Value::Null);
    let reply = match serde_json::from_value::<MessageEnvelope>(message) {
        Ok(message) => {
            info!(
                event_name = "relay.server.message_received",
                correlation_id = %request.id,
                message_id = %message.message_id,
                "message/send received"
            );
            state.executor.execute(&message).await
        }
        Err(error) => {
            warn!(
                event_name = "relay.server.invalid_envelope",
                correlation_id = %request.id,
                error = %error,
                "message/send params carried no usable envelope"
            );
            respond(&OrderResult::error(None, format!("invalid message envelope: {error}")))
        }
    };

    match serde_json::to_value(&reply) {
        Ok(result) => JsonRpcResponse::success(request.id, result),
        Err(error) => JsonRpcResponse::failure(
            request.id,
            JsonRpcError::new(INTERNAL_ERROR, error.to_string()),
        ),
    }
}

async fn tasks_cancel(state: &RelayState, request: JsonRpcRequest) -> JsonRpcResponse {
    let task_id = request
        .params
        .get("id")
        .or_else(|| request.params.get("task_id"))
        .and_then(Value::as_str);

    match state.executor.cancel(task_id).await {
        Ok(()) => JsonRpcResponse::success(request.id, json!({"id": task_id})),
        Err(error) => JsonRpcResponse::failure(request.id, JsonRpcError::from_relay(&error)),
    }
}
