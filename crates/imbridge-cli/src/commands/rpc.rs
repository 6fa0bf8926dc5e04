//! `imbridge rpc`: invoke a catalog method and print the SDK envelope.

use imbridge_core::DatabaseApi;
use serde_json::Value;

pub async fn call(
    api: &DatabaseApi,
    method: &str,
    params_str: &str,
    operation_id: Option<String>,
) -> Result<Value, String> {
    let params = match serde_json::from_str::<Value>(params_str)
        .map_err(|e| format!("Invalid JSON params: {}", e))?
    {
        Value::Array(params) => params,
        other => return Err(format!("Params must be a JSON array, got {}", other)),
    };

    let envelope = match api.invoke_with_envelope(method, operation_id, params).await {
        Ok(ok) => serde_json::to_value(ok),
        Err(err) => serde_json::to_value(err),
    };
    envelope.map_err(|e| format!("Failed to encode response: {}", e))
}
