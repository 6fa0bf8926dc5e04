//! SDK-style envelopes around facade calls.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::database_api::DatabaseApi;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SdkResponse {
    #[serde(rename = "operationID")]
    pub operation_id: String,
    pub event: String,
    pub data: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SdkErrorResponse {
    #[serde(rename = "operationID")]
    pub operation_id: String,
    pub event: String,
    #[serde(rename = "errCode")]
    pub err_code: i64,
    #[serde(rename = "errMsg")]
    pub err_msg: String,
}

/// `getMinReadSeqFromCursors` -> `GetMinReadSeqFromCursors`.
pub fn event_name(method: &str) -> String {
    let mut chars = method.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

impl DatabaseApi {
    /// Call `method` and wrap the outcome. A database error code and an RPC
    /// failure both become an [`SdkErrorResponse`].
    pub async fn invoke_with_envelope(
        &self,
        method: &str,
        operation_id: Option<String>,
        params: Vec<Value>,
    ) -> Result<SdkResponse, SdkErrorResponse> {
        let operation_id = operation_id.unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
        let event = event_name(method);

        let response = match self.call_db(method, params).await {
            Ok(response) => response,
            Err(e) => {
                return Err(SdkErrorResponse {
                    operation_id,
                    event,
                    err_code: e.code(),
                    err_msg: e.to_string(),
                })
            }
        };

        if !response.is_ok() {
            return Err(SdkErrorResponse {
                operation_id,
                event,
                err_code: response.err_code,
                err_msg: response.err_msg,
            });
        }

        let data = response.decode::<Value>().unwrap_or(response.data);
        Ok(SdkResponse {
            operation_id,
            event,
            data,
        })
    }
}
