//! Core error type for the bridge.
//!
//! `BridgeError` is used by the store, the store host and the facade.
//! Protocol-level failures (timeouts, unknown methods, handler errors)
//! live in [`crate::rpc::RpcError`] instead; the two meet at the facade,
//! where an RPC failure either becomes a synthesised database response or
//! propagates unchanged.

#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("RPC error: {0}")]
    Rpc(#[from] crate::rpc::RpcError),
}

impl From<serde_json::Error> for BridgeError {
    fn from(err: serde_json::Error) -> Self {
        BridgeError::BadRequest(format!("Invalid JSON: {}", err))
    }
}
