//! The `{data, errCode, errMsg}` result every database method answers with.
//!
//! Structured `data` (objects, arrays) travels as a JSON string; scalars
//! travel raw. "Not found" is an ordinary response with
//! [`DatabaseErrorCode::ErrorNoRecord`], not an RPC failure.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::BridgeError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatabaseErrorCode {
    ErrorInit,
    ErrorNoRecord,
    ErrorDBTimeout,
}

impl DatabaseErrorCode {
    pub fn code(self) -> i64 {
        match self {
            DatabaseErrorCode::ErrorInit => 10001,
            DatabaseErrorCode::ErrorNoRecord => 10002,
            DatabaseErrorCode::ErrorDBTimeout => 10003,
        }
    }

    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            10001 => Some(DatabaseErrorCode::ErrorInit),
            10002 => Some(DatabaseErrorCode::ErrorNoRecord),
            10003 => Some(DatabaseErrorCode::ErrorDBTimeout),
            _ => None,
        }
    }
}

pub const DB_TIMEOUT_MESSAGE: &str = "database maybe damaged";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DbResponse {
    #[serde(default)]
    pub data: Value,
    #[serde(default)]
    pub err_code: i64,
    #[serde(default)]
    pub err_msg: String,
}

impl DbResponse {
    /// Success carrying `data`; objects and arrays are JSON-stringified.
    pub fn ok<T: Serialize>(data: &T) -> Result<Self, BridgeError> {
        let value = serde_json::to_value(data)
            .map_err(|e| BridgeError::Internal(format!("Failed to encode response: {}", e)))?;
        let data = match value {
            Value::Object(_) | Value::Array(_) => Value::String(value.to_string()),
            other => other,
        };
        Ok(Self {
            data,
            err_code: 0,
            err_msg: String::new(),
        })
    }

    /// Success without a payload (`data: ""`).
    pub fn empty() -> Self {
        Self {
            data: Value::String(String::new()),
            err_code: 0,
            err_msg: String::new(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self {
            data: Value::String(String::new()),
            err_code: DatabaseErrorCode::ErrorNoRecord.code(),
            err_msg: message.into(),
        }
    }

    pub fn init_error(message: impl Into<String>) -> Self {
        Self {
            data: Value::Null,
            err_code: DatabaseErrorCode::ErrorInit.code(),
            err_msg: message.into(),
        }
    }

    /// What the facade hands back after a timed-out call.
    pub fn db_timeout() -> Self {
        Self {
            data: Value::String(String::new()),
            err_code: DatabaseErrorCode::ErrorDBTimeout.code(),
            err_msg: DB_TIMEOUT_MESSAGE.into(),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.err_code == 0
    }

    pub fn error_code(&self) -> Option<DatabaseErrorCode> {
        DatabaseErrorCode::from_code(self.err_code)
    }

    /// Decode `data`, parsing it first when it is a JSON string.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, BridgeError> {
        match &self.data {
            Value::String(text) if !text.is_empty() => match serde_json::from_str(text) {
                Ok(decoded) => Ok(decoded),
                // Plain string payloads are not JSON documents.
                Err(_) => Ok(serde_json::from_value(self.data.clone())?),
            },
            other => Ok(serde_json::from_value(other.clone())?),
        }
    }

    /// `Ok(Some)` on success, `Ok(None)` on ErrorNoRecord, `Err` otherwise.
    pub fn into_optional<T: DeserializeOwned>(self) -> Result<Option<T>, BridgeError> {
        match self.error_code() {
            None if self.is_ok() => self.decode().map(Some),
            Some(DatabaseErrorCode::ErrorNoRecord) => Ok(None),
            _ => Err(self.into_error()),
        }
    }

    /// Like [`into_optional`](Self::into_optional) but a miss is an error.
    pub fn into_value<T: DeserializeOwned>(self) -> Result<T, BridgeError> {
        if self.is_ok() {
            self.decode()
        } else {
            Err(self.into_error())
        }
    }

    /// Success check for methods without a payload.
    pub fn into_unit(self) -> Result<(), BridgeError> {
        if self.is_ok() {
            Ok(())
        } else {
            Err(self.into_error())
        }
    }

    fn into_error(self) -> BridgeError {
        match self.error_code() {
            Some(DatabaseErrorCode::ErrorNoRecord) => BridgeError::NotFound(self.err_msg),
            _ => BridgeError::Database(format!("[{}] {}", self.err_code, self.err_msg)),
        }
    }
}
