//! IM Bridge Core: transport and persistence shim between an IM client's
//! main side and its worker-hosted engine.
//!
//! The crate is transport-agnostic: endpoints are anything implementing
//! [`channel::Endpoint`]. It provides
//!
//! - an event channel multiplexing named events over one endpoint,
//! - a symmetric JSON-RPC engine (request/ack, timeouts, handshake),
//! - the read-cursor / read-state store on SQLite,
//! - the worker-side store host exposing the store as RPC methods,
//! - the main-side database facade with worker reset on timeout.

pub mod channel;
pub mod config;
pub mod db;
pub mod error;
pub mod facade;
pub mod host;
pub mod models;
pub mod response;
pub mod rpc;
pub mod store;

// Convenience re-exports
pub use config::BridgeConfig;
pub use db::Database;
pub use error::BridgeError;
pub use facade::DatabaseApi;
pub use response::{DatabaseErrorCode, DbResponse};
pub use rpc::{RpcEngine, RpcError};
