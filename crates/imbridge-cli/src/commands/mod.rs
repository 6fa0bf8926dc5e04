//! CLI command implementations.
//!
//! Each command returns the JSON it wants printed; `main` prints it.

pub mod cursor;
pub mod methods;
pub mod rpc;

use imbridge_core::{BridgeConfig, Database, DatabaseApi};

/// Open the database at `config.db_path` and put a facade in front of it.
pub fn init_api(config: &BridgeConfig) -> Result<DatabaseApi, String> {
    let db = Database::open(&config.db_path)
        .map_err(|e| format!("Failed to open database '{}': {}", config.db_path, e))?;
    tracing::info!("[imbridge] database opened at {}", config.db_path);
    Ok(DatabaseApi::local(db, config))
}

/// Pretty-print a JSON value to stdout.
pub fn print_json(value: &serde_json::Value) {
    println!(
        "{}",
        serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
    );
}
