//! Bidirectional JSON-RPC over named events.

pub mod engine;
pub mod error;
pub mod types;

pub use engine::{
    method_handler, ConnectionState, InvokeOptions, MethodFuture, MethodHandler, RpcEngine,
    RpcOptions,
};
pub use error::RpcError;
pub use types::{JsonRpcError, JsonRpcRequest, JsonRpcResponse};
