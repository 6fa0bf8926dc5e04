//! Hosted database methods, one function per RPC method.
//!
//! Params arrive positionally; structured records arrive as one JSON string.

pub mod group;
pub mod peer;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::BridgeError;
use crate::response::DbResponse;

fn parse<T: DeserializeOwned>(json: &str) -> Result<T, BridgeError> {
    Ok(serde_json::from_str(json)?)
}

fn failed(method: &str, err: BridgeError) -> DbResponse {
    tracing::error!("[StoreHost] {} failed: {}", method, err);
    DbResponse::init_error(err.to_string())
}

/// Success with `data`, or ErrorInit.
fn respond<T: Serialize>(method: &str, result: Result<T, BridgeError>) -> DbResponse {
    match result.and_then(|data| DbResponse::ok(&data)) {
        Ok(response) => response,
        Err(e) => failed(method, e),
    }
}

/// Success with `data: ""`, or ErrorInit.
fn respond_empty<T>(method: &str, result: Result<T, BridgeError>) -> DbResponse {
    match result {
        Ok(_) => DbResponse::empty(),
        Err(e) => failed(method, e),
    }
}

/// Success with the row, ErrorNoRecord with `missing()` when absent, or ErrorInit.
fn respond_found<T: Serialize>(
    method: &str,
    result: Result<Option<T>, BridgeError>,
    missing: impl FnOnce() -> String,
) -> DbResponse {
    match result {
        Ok(Some(row)) => respond(method, Ok(row)),
        Ok(None) => DbResponse::not_found(missing()),
        Err(e) => failed(method, e),
    }
}
