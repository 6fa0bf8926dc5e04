//! `imbridge cursor`: read-cursor shortcuts over the typed facade.
//!
//! `peer` selects the 1:1 tables instead of the group ones.

use imbridge_core::models::ReadCursor;
use imbridge_core::DatabaseApi;
use serde_json::{json, Value};

fn to_json<T: serde::Serialize>(value: &T) -> Result<Value, String> {
    serde_json::to_value(value).map_err(|e| e.to_string())
}

pub async fn upsert(
    api: &DatabaseApi,
    conversation_id: &str,
    user_id: &str,
    seq: i64,
    peer: bool,
) -> Result<Value, String> {
    let cursor = ReadCursor::new(conversation_id, user_id, seq);
    if peer {
        api.upsert_read_cursor(&cursor).await
    } else {
        api.upsert_group_read_cursor(&cursor).await
    }
    .map_err(|e| e.to_string())?;
    to_json(&cursor)
}

pub async fn get(
    api: &DatabaseApi,
    conversation_id: &str,
    user_id: &str,
    peer: bool,
) -> Result<Value, String> {
    let cursor = if peer {
        api.get_read_cursor(conversation_id, user_id).await
    } else {
        api.get_group_read_cursor(conversation_id, user_id).await
    }
    .map_err(|e| e.to_string())?;
    match cursor {
        Some(cursor) => to_json(&cursor),
        None => Err(format!(
            "No cursor for conversation {} and user {}",
            conversation_id, user_id
        )),
    }
}

pub async fn list(api: &DatabaseApi, conversation_id: &str, peer: bool) -> Result<Value, String> {
    let cursors = if peer {
        api.get_read_cursors(conversation_id).await
    } else {
        api.get_group_read_cursors(conversation_id).await
    }
    .map_err(|e| e.to_string())?;
    to_json(&cursors)
}

/// Group: lowest seq over all readers. Peer: lowest over everyone but
/// `exclude_user` (nobody excluded when absent).
pub async fn min_seq(
    api: &DatabaseApi,
    conversation_id: &str,
    peer: bool,
    exclude_user: Option<&str>,
) -> Result<Value, String> {
    let seq = if peer {
        api.get_all_read_seq(conversation_id, exclude_user.unwrap_or_default())
            .await
    } else {
        api.get_min_read_seq(conversation_id).await
    }
    .map_err(|e| e.to_string())?;
    Ok(json!({ "conversationID": conversation_id, "seq": seq }))
}

pub async fn bump_version(api: &DatabaseApi, conversation_id: &str) -> Result<Value, String> {
    let version = api
        .increment_group_read_cursor_version(conversation_id)
        .await
        .map_err(|e| e.to_string())?;
    Ok(json!({ "conversationID": conversation_id, "cursorVersion": version }))
}

pub async fn refresh(
    api: &DatabaseApi,
    conversation_id: &str,
    member_count: i64,
    self_user: Option<&str>,
) -> Result<Value, String> {
    match self_user {
        Some(user) => to_json(
            &api.refresh_read_state(conversation_id, user)
                .await
                .map_err(|e| e.to_string())?,
        ),
        None => to_json(
            &api.refresh_group_read_state(conversation_id, member_count)
                .await
                .map_err(|e| e.to_string())?,
        ),
    }
}
