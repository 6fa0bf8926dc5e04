//! `imbridge methods`: list the method catalog.

use imbridge_core::facade::CATALOG;
use imbridge_core::host::HOSTED_METHODS;
use serde_json::{json, Value};

/// Every catalog entry, flagged with whether the local worker serves it.
pub fn list() -> Value {
    let entries: Vec<Value> = CATALOG
        .iter()
        .map(|m| {
            json!({
                "name": m.name,
                "remote": m.remote,
                "stringify": m.stringify,
                "hosted": HOSTED_METHODS.contains(&m.remote),
            })
        })
        .collect();
    json!({ "count": entries.len(), "methods": entries })
}
