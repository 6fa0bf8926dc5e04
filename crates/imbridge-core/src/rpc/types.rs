//! JSON-RPC 2.0 records carried inside syn/ack events.
//!
//! A call travels as the single argument of a `syn:<method>` event and its
//! answer as the single argument of the matching `ack:<method>` event.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::error::RpcError;

pub const SYN_SIGN: &str = "syn:";
pub const ACK_SIGN: &str = "ack:";

/// Reserved method used by both sides for the handshake.
pub const CONNECT_EVENT: &str = "__rpc_connect_event";

pub fn syn_event(method: &str) -> String {
    format!("{}{}", SYN_SIGN, method)
}

pub fn ack_event(method: &str) -> String {
    format!("{}{}", ACK_SIGN, method)
}

/// JSON-RPC 2.0 request. `id` is absent for notifications.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JsonRpcRequest {
    pub jsonrpc: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
    pub method: String,
    #[serde(default)]
    pub params: Vec<Value>,
}

impl JsonRpcRequest {
    pub fn call(id: impl Into<String>, method: &str, params: Vec<Value>) -> Self {
        Self {
            jsonrpc: "2.0".into(),
            id: Some(Value::String(id.into())),
            method: method.to_string(),
            params,
        }
    }

    pub fn notification(method: &str, params: Vec<Value>) -> Self {
        Self {
            jsonrpc: "2.0".into(),
            id: None,
            method: method.to_string(),
            params,
        }
    }

    /// Null and empty-string ids count as "no id".
    pub fn is_notification(&self) -> bool {
        match &self.id {
            None | Some(Value::Null) => true,
            Some(Value::String(s)) => s.is_empty(),
            Some(_) => false,
        }
    }
}

/// JSON-RPC 2.0 response. Exactly one of `result`/`error` is meaningful;
/// a response with neither resolves to `null`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    #[serde(default)]
    pub id: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

impl JsonRpcResponse {
    pub fn success(id: Option<Value>, result: Value) -> Self {
        Self {
            jsonrpc: "2.0".into(),
            id,
            result: Some(result),
            error: None,
        }
    }

    pub fn failure(id: Option<Value>, error: JsonRpcError) -> Self {
        Self {
            jsonrpc: "2.0".into(),
            id,
            result: None,
            error: Some(error),
        }
    }

    pub fn into_result(self) -> Result<Value, RpcError> {
        match self.error {
            Some(error) => Err(RpcError::from_error_object(error)),
            None => Ok(self.result.unwrap_or(Value::Null)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JsonRpcError {
    pub code: i64,
    pub message: String,
    #[serde(default)]
    pub data: Value,
}

// Protocol codes shared with any peer speaking this protocol.
pub const CONNECT_TIMEOUT: i64 = -32300;
pub const APPLICATION_ERROR: i64 = -32500;
pub const METHOD_NOT_FOUND: i64 = -32601;

pub const CONNECT_TIMEOUT_MESSAGE: &str = "Connect timeout";
pub const APPLICATION_ERROR_MESSAGE: &str = "Application error";
pub const METHOD_NOT_FOUND_MESSAGE: &str = "Method not found";

// Standard JSON-RPC 2.0 codes
pub const PARSE_ERROR: i64 = -32700;
pub const INVALID_PARAMS: i64 = -32602;
pub const INTERNAL_ERROR: i64 = -32603;

/// Never sent over the wire: reported locally when the engine is torn down.
pub const ENGINE_DESTROYED: i64 = -32000;

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_notification_has_no_id_on_the_wire() {
        let value = serde_json::to_value(JsonRpcRequest::notification("ping", vec![])).unwrap();
        assert_eq!(value, json!({ "jsonrpc": "2.0", "method": "ping", "params": [] }));
    }

    #[test]
    fn test_empty_id_is_a_notification() {
        let req: JsonRpcRequest =
            serde_json::from_value(json!({ "jsonrpc": "2.0", "id": "", "method": "m" })).unwrap();
        assert!(req.is_notification());
        assert!(req.params.is_empty());
        assert!(!JsonRpcRequest::call("abc", "m", vec![]).is_notification());
    }

    #[test]
    fn test_response_without_result_resolves_to_null() {
        let ack: JsonRpcResponse =
            serde_json::from_value(json!({ "jsonrpc": "2.0", "id": "1" })).unwrap();
        assert_eq!(ack.into_result().unwrap(), Value::Null);
    }

    #[test]
    fn test_error_response_shape() {
        let ack = JsonRpcResponse::failure(
            Some(json!("1")),
            JsonRpcError {
                code: APPLICATION_ERROR,
                message: "boom".into(),
                data: Value::Null,
            },
        );
        assert_eq!(
            serde_json::to_value(&ack).unwrap(),
            json!({
                "jsonrpc": "2.0",
                "id": "1",
                "error": { "code": -32500, "message": "boom", "data": null }
            })
        );
    }

    #[test]
    fn test_event_names() {
        assert_eq!(syn_event("ping"), "syn:ping");
        assert_eq!(ack_event(CONNECT_EVENT), "ack:__rpc_connect_event");
    }
}
