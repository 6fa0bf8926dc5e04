//! Protocol-level errors of the RPC engine.

use serde_json::{json, Value};

use super::types::{self, JsonRpcError};
use crate::error::BridgeError;

/// Every variant maps onto a JSON-RPC error object via [`RpcError::to_error_object`].
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RpcError {
    /// No ack (or no handshake) within the effective timeout.
    #[error("Connect timeout after {timeout_ms}ms")]
    ConnectTimeout { timeout_ms: u64 },

    /// The peer has no handler for the method; `data` is the original call.
    #[error("Method not found: {method}")]
    MethodNotFound { method: String, data: Value },

    /// A handler failed without a more specific code.
    #[error("{0}")]
    Application(String),

    /// Any other error object reported by the peer.
    #[error("{message} (code {code})")]
    Remote {
        code: i64,
        message: String,
        data: Value,
    },

    #[error("{0} already registered")]
    AlreadyRegistered(String),

    #[error("Invalid params: {0}")]
    InvalidParams(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("RPC engine destroyed")]
    Destroyed,
}

impl RpcError {
    pub fn code(&self) -> i64 {
        match self {
            RpcError::ConnectTimeout { .. } => types::CONNECT_TIMEOUT,
            RpcError::MethodNotFound { .. } => types::METHOD_NOT_FOUND,
            RpcError::Application(_) => types::APPLICATION_ERROR,
            RpcError::Remote { code, .. } => *code,
            RpcError::AlreadyRegistered(_) => types::INTERNAL_ERROR,
            RpcError::InvalidParams(_) => types::INVALID_PARAMS,
            RpcError::Transport(_) => types::INTERNAL_ERROR,
            RpcError::Destroyed => types::ENGINE_DESTROYED,
        }
    }

    pub fn is_connect_timeout(&self) -> bool {
        self.code() == types::CONNECT_TIMEOUT
    }

    pub fn to_error_object(&self) -> JsonRpcError {
        let (message, data) = match self {
            RpcError::ConnectTimeout { timeout_ms } => (
                types::CONNECT_TIMEOUT_MESSAGE.to_string(),
                json!({ "timeout": timeout_ms }),
            ),
            RpcError::MethodNotFound { data, .. } => {
                (types::METHOD_NOT_FOUND_MESSAGE.to_string(), data.clone())
            }
            RpcError::Application(message) if message.is_empty() => {
                (types::APPLICATION_ERROR_MESSAGE.to_string(), Value::Null)
            }
            RpcError::Application(message) => (message.clone(), Value::Null),
            RpcError::Remote { message, data, .. } => (message.clone(), data.clone()),
            other => (other.to_string(), Value::Null),
        };
        JsonRpcError {
            code: self.code(),
            message,
            data,
        }
    }

    /// Rebuild an error from an ack's error object.
    pub fn from_error_object(error: JsonRpcError) -> Self {
        match error.code {
            types::CONNECT_TIMEOUT => RpcError::ConnectTimeout {
                timeout_ms: error.data["timeout"].as_u64().unwrap_or(0),
            },
            types::METHOD_NOT_FOUND => RpcError::MethodNotFound {
                method: error.data["method"].as_str().unwrap_or_default().to_string(),
                data: error.data,
            },
            code => RpcError::Remote {
                code,
                message: error.message,
                data: error.data,
            },
        }
    }
}

impl From<BridgeError> for RpcError {
    fn from(err: BridgeError) -> Self {
        match err {
            BridgeError::BadRequest(msg) => RpcError::InvalidParams(msg),
            BridgeError::Rpc(inner) => inner,
            other => RpcError::Application(other.to_string()),
        }
    }
}
