//! JSON-RPC 2.0 framing for the relay's message-send and cancel operations.

use orderlink_core::{MessageEnvelope, RelayError};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

pub const JSONRPC_VERSION: &str = "2.0";
pub const METHOD_MESSAGE_SEND: &str = "message/send";
pub const METHOD_TASKS_CANCEL: &str = "tasks/cancel";

pub const PARSE_ERROR: i64 = -32700;
pub const INVALID_REQUEST: i64 = -32600;
pub const METHOD_NOT_FOUND: i64 = -32601;
pub const INTERNAL_ERROR: i64 = -32603;
pub const UNSUPPORTED_OPERATION: i64 = -32004;

/// Outbound `message/send` call. Borrows the envelope so it is serialized straight into the
/// request body.
#[derive(Debug, Serialize)]
pub struct MessageSendRequest<'a> {
    pub jsonrpc: &'static str,
    pub id: String,
    pub method: &'static str,
    pub params: MessageSendParams<'a>,
}

#[derive(Debug, Serialize)]
pub struct MessageSendParams<'a> {
    pub message: &'a MessageEnvelope,
}

impl<'a> MessageSendRequest<'a> {
    pub fn new(message: &'a MessageEnvelope) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            id: Uuid::new_v4().to_string(),
            method: METHOD_MESSAGE_SEND,
            params: MessageSendParams { message },
        }
    }
}

/// Inbound call as the server sees it; params stay untyped until the method is known.
#[derive(Clone, Debug, Deserialize)]
pub struct JsonRpcRequest {
    #[serde(default)]
    pub jsonrpc: String,
    #[serde(default)]
    pub id: Value,
    pub method: String,
    #[serde(default)]
    pub params: Value,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcError {
    pub code: i64,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    #[serde(default)]
    pub jsonrpc: String,
    #[serde(default)]
    pub id: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

impl JsonRpcError {
    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self { code, message: message.into(), data: None }
    }

    pub fn from_relay(error: &RelayError) -> Self {
        let code = match error {
            RelayError::CancelUnsupported => UNSUPPORTED_OPERATION,
            _ => INTERNAL_ERROR,
        };
        Self {
            code,
            message: error.to_string(),
            data: Some(serde_json::json!({ "kind": error.kind() })),
        }
    }
}

impl JsonRpcResponse {
    pub fn success(id: Value, result: Value) -> Self {
        Self { jsonrpc: JSONRPC_VERSION.to_string(), id, result: Some(result), error: None }
    }

    pub fn failure(id: Value, error: JsonRpcError) -> Self {
        Self { jsonrpc: JSONRPC_VERSION.to_string(), id, result: None, error: Some(error) }
    }
}
