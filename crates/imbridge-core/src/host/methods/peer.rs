//! Peer (1:1) conversation methods.

use std::sync::Arc;

use super::{parse, respond, respond_empty, respond_found};
use crate::host::StoreHost;
use crate::models::{PeerReadState, ReadCursor};
use crate::response::DbResponse;

// ---------------------------------------------------------------------------
// Cursors
// ---------------------------------------------------------------------------

pub async fn insert_cursor(host: Arc<StoreHost>, (cursor_json,): (String,)) -> DbResponse {
    let result = match parse::<ReadCursor>(&cursor_json) {
        Ok(cursor) => host.peer_cursors.insert(&cursor).await,
        Err(e) => Err(e),
    };
    respond_empty("insertReadCursor", result)
}

pub async fn upsert_cursor(host: Arc<StoreHost>, (cursor_json,): (String,)) -> DbResponse {
    let result = match parse::<ReadCursor>(&cursor_json) {
        Ok(cursor) => host.peer_cursors.upsert(&cursor).await,
        Err(e) => Err(e),
    };
    respond_empty("upsertReadCursor", result)
}

pub async fn get_cursor(
    host: Arc<StoreHost>,
    (conversation_id, user_id): (String, String),
) -> DbResponse {
    respond_found(
        "getReadCursor",
        host.peer_cursors.get(&conversation_id, &user_id).await,
        || format!("no cursor for conversation {} and user {}", conversation_id, user_id),
    )
}

pub async fn list_cursors(host: Arc<StoreHost>, (conversation_id,): (String,)) -> DbResponse {
    respond(
        "getReadCursorsByConversationID",
        host.peer_cursors.list_by_conversation(&conversation_id).await,
    )
}

pub async fn update_cursor(
    host: Arc<StoreHost>,
    (conversation_id, user_id, max_read_seq): (String, String, i64),
) -> DbResponse {
    respond_empty(
        "updateReadCursor",
        host.peer_cursors
            .update(&conversation_id, &user_id, max_read_seq)
            .await,
    )
}

pub async fn delete_cursor(
    host: Arc<StoreHost>,
    (conversation_id, user_id): (String, String),
) -> DbResponse {
    respond_empty(
        "deleteReadCursor",
        host.peer_cursors.delete(&conversation_id, &user_id).await,
    )
}

pub async fn delete_cursors(host: Arc<StoreHost>, (conversation_id,): (String,)) -> DbResponse {
    respond_empty(
        "deleteReadCursorsByConversationID",
        host.peer_cursors.delete_by_conversation(&conversation_id).await,
    )
}

/// Floor across everyone but `excludeUserID`; 0 when nobody else has read.
pub async fn all_read_seq(
    host: Arc<StoreHost>,
    (conversation_id, exclude_user_id): (String, String),
) -> DbResponse {
    respond(
        "getAllReadSeqFromCursors",
        host.peer_cursors
            .all_read_seq(&conversation_id, &exclude_user_id)
            .await,
    )
}

// ---------------------------------------------------------------------------
// Read state
// ---------------------------------------------------------------------------

pub async fn get_read_state(host: Arc<StoreHost>, (conversation_id,): (String,)) -> DbResponse {
    respond_found(
        "getReadStateDB",
        host.peer_states.get(&conversation_id).await,
        || format!("no read state for conversation {}", conversation_id),
    )
}

pub async fn upsert_read_state(host: Arc<StoreHost>, (state_json,): (String,)) -> DbResponse {
    let result = match parse::<PeerReadState>(&state_json) {
        Ok(state) => host.peer_states.upsert(&state).await,
        Err(e) => Err(e),
    };
    respond_empty("upsertReadStateDB", result)
}

pub async fn update_all_read_seq(
    host: Arc<StoreHost>,
    (conversation_id, all_read_seq): (String, i64),
) -> DbResponse {
    respond_empty(
        "updateReadStateAllReadSeqDB",
        host.peer_states
            .update_all_read_seq(&conversation_id, all_read_seq)
            .await,
    )
}

pub async fn delete_read_state(host: Arc<StoreHost>, (conversation_id,): (String,)) -> DbResponse {
    respond_empty(
        "deleteReadStateDB",
        host.peer_states.delete(&conversation_id).await,
    )
}

pub async fn refresh_read_state(
    host: Arc<StoreHost>,
    (conversation_id, self_user_id): (String, String),
) -> DbResponse {
    respond(
        "refreshReadState",
        host.sync
            .refresh_peer_read_state(&conversation_id, &self_user_id)
            .await,
    )
}
