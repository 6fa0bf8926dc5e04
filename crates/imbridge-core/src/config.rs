//! Runtime configuration for the bridge.
//!
//! Values come from defaults, from environment variables (`from_env`) or
//! from the CLI, which layers `clap` arguments on top of the same names.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::BridgeError;

pub const ENV_DB_PATH: &str = "IMBRIDGE_DB_PATH";
pub const ENV_CONNECT_TIMEOUT_MS: &str = "IMBRIDGE_CONNECT_TIMEOUT_MS";
pub const ENV_INVOKE_TIMEOUT_MS: &str = "IMBRIDGE_INVOKE_TIMEOUT_MS";

/// Per-call timeout used by the database facade when nothing else is set.
pub const DEFAULT_INVOKE_TIMEOUT_MS: u64 = 5_000_000;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct BridgeConfig {
    #[serde(default = "default_db_path")]
    pub db_path: String,
    /// Handshake timeout for a freshly spawned worker. 0 waits forever.
    #[serde(default)]
    pub connect_timeout_ms: u64,
    /// Timeout applied to every facade invoke. 0 waits forever.
    #[serde(default = "default_invoke_timeout_ms")]
    pub invoke_timeout_ms: u64,
}

fn default_db_path() -> String {
    "imbridge.db".into()
}

fn default_invoke_timeout_ms() -> u64 {
    DEFAULT_INVOKE_TIMEOUT_MS
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            connect_timeout_ms: 0,
            invoke_timeout_ms: default_invoke_timeout_ms(),
        }
    }
}

impl BridgeConfig {
    /// Build a config from defaults overridden by `IMBRIDGE_*` variables.
    pub fn from_env() -> Result<Self, BridgeError> {
        let mut config = Self::default();
        if let Ok(path) = std::env::var(ENV_DB_PATH) {
            config.db_path = path;
        }
        if let Some(ms) = read_millis(ENV_CONNECT_TIMEOUT_MS)? {
            config.connect_timeout_ms = ms;
        }
        if let Some(ms) = read_millis(ENV_INVOKE_TIMEOUT_MS)? {
            config.invoke_timeout_ms = ms;
        }
        Ok(config)
    }

    pub fn connect_timeout(&self) -> Option<Duration> {
        millis_to_duration(self.connect_timeout_ms)
    }

    pub fn invoke_timeout(&self) -> Option<Duration> {
        millis_to_duration(self.invoke_timeout_ms)
    }
}

/// `0` means "no timeout".
pub fn millis_to_duration(ms: u64) -> Option<Duration> {
    (ms > 0).then(|| Duration::from_millis(ms))
}

fn read_millis(var: &str) -> Result<Option<u64>, BridgeError> {
    match std::env::var(var) {
        Ok(raw) => raw
            .trim()
            .parse::<u64>()
            .map(Some)
            .map_err(|e| BridgeError::BadRequest(format!("{} must be milliseconds: {}", var, e))),
        Err(_) => Ok(None),
    }
}
