//! Group conversation methods: cursors, cursor version, aggregate read state.

use std::sync::Arc;

use super::{parse, respond, respond_empty, respond_found};
use crate::host::StoreHost;
use crate::models::{GroupReadState, ReadCursor, ReadCursorState};
use crate::response::DbResponse;

// ---------------------------------------------------------------------------
// Cursors
// ---------------------------------------------------------------------------

pub async fn insert_cursor(host: Arc<StoreHost>, (cursor_json,): (String,)) -> DbResponse {
    let result = match parse::<ReadCursor>(&cursor_json) {
        Ok(cursor) => host.group_cursors.insert(&cursor).await,
        Err(e) => Err(e),
    };
    respond_empty("insertGroupReadCursor", result)
}

pub async fn upsert_cursor(host: Arc<StoreHost>, (cursor_json,): (String,)) -> DbResponse {
    let result = match parse::<ReadCursor>(&cursor_json) {
        Ok(cursor) => host.group_cursors.upsert(&cursor).await,
        Err(e) => Err(e),
    };
    respond_empty("upsertGroupReadCursor", result)
}

pub async fn get_cursor(
    host: Arc<StoreHost>,
    (conversation_id, user_id): (String, String),
) -> DbResponse {
    respond_found(
        "getGroupReadCursor",
        host.group_cursors.get(&conversation_id, &user_id).await,
        || format!("no cursor for conversation {} and user {}", conversation_id, user_id),
    )
}

pub async fn list_cursors(host: Arc<StoreHost>, (conversation_id,): (String,)) -> DbResponse {
    respond(
        "getGroupReadCursorsByConversationID",
        host.group_cursors.list_by_conversation(&conversation_id).await,
    )
}

pub async fn update_cursor(
    host: Arc<StoreHost>,
    (conversation_id, user_id, max_read_seq): (String, String, i64),
) -> DbResponse {
    respond_empty(
        "updateGroupReadCursor",
        host.group_cursors
            .update(&conversation_id, &user_id, max_read_seq)
            .await,
    )
}

pub async fn delete_cursor(
    host: Arc<StoreHost>,
    (conversation_id, user_id): (String, String),
) -> DbResponse {
    respond_empty(
        "deleteGroupReadCursor",
        host.group_cursors.delete(&conversation_id, &user_id).await,
    )
}

pub async fn delete_cursors(host: Arc<StoreHost>, (conversation_id,): (String,)) -> DbResponse {
    respond_empty(
        "deleteGroupReadCursorsByConversationID",
        host.group_cursors.delete_by_conversation(&conversation_id).await,
    )
}

pub async fn min_read_seq(host: Arc<StoreHost>, (conversation_id,): (String,)) -> DbResponse {
    respond(
        "getMinReadSeqFromCursors",
        host.group_cursors.min_read_seq(&conversation_id).await,
    )
}

// ---------------------------------------------------------------------------
// Cursor version
// ---------------------------------------------------------------------------

pub async fn insert_cursor_state(host: Arc<StoreHost>, (state_json,): (String,)) -> DbResponse {
    let result = match parse::<ReadCursorState>(&state_json) {
        Ok(state) => host.cursor_states.insert(&state).await,
        Err(e) => Err(e),
    };
    respond_empty("insertGroupReadCursorState", result)
}

pub async fn get_cursor_state(host: Arc<StoreHost>, (conversation_id,): (String,)) -> DbResponse {
    respond_found(
        "getGroupReadCursorState",
        host.cursor_states.get(&conversation_id).await,
        || format!("no cursor state for conversation {}", conversation_id),
    )
}

pub async fn delete_cursor_state(
    host: Arc<StoreHost>,
    (conversation_id,): (String,),
) -> DbResponse {
    respond_empty(
        "deleteGroupReadCursorState",
        host.cursor_states.delete(&conversation_id).await,
    )
}

/// Answers with the new version instead of `""`.
pub async fn increment_version(host: Arc<StoreHost>, (conversation_id,): (String,)) -> DbResponse {
    respond(
        "incrementGroupReadCursorVersion",
        host.cursor_states.increment_version(&conversation_id).await,
    )
}

// ---------------------------------------------------------------------------
// Aggregate read state
// ---------------------------------------------------------------------------

pub async fn get_read_state(host: Arc<StoreHost>, (conversation_id,): (String,)) -> DbResponse {
    respond_found(
        "getGroupReadState",
        host.group_states.get(&conversation_id).await,
        || format!("no group read state for conversation {}", conversation_id),
    )
}

pub async fn upsert_read_state(host: Arc<StoreHost>, (state_json,): (String,)) -> DbResponse {
    let result = match parse::<GroupReadState>(&state_json) {
        Ok(state) => host.group_states.upsert(&state).await,
        Err(e) => Err(e),
    };
    respond_empty("upsertGroupReadState", result)
}

pub async fn update_read_state_min_seq(
    host: Arc<StoreHost>,
    (conversation_id, min_read_seq): (String, i64),
) -> DbResponse {
    respond_empty(
        "updateGroupReadStateMinSeq",
        host.group_states
            .update_min_seq(&conversation_id, min_read_seq)
            .await,
    )
}

pub async fn delete_read_state(host: Arc<StoreHost>, (conversation_id,): (String,)) -> DbResponse {
    respond_empty(
        "deleteGroupReadState",
        host.group_states.delete(&conversation_id).await,
    )
}

pub async fn refresh_read_state(
    host: Arc<StoreHost>,
    (conversation_id, member_count): (String, i64),
) -> DbResponse {
    respond(
        "refreshGroupReadState",
        host.sync
            .refresh_group_read_state(&conversation_id, member_count)
            .await,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use crate::response::DatabaseErrorCode;

    fn host() -> Arc<StoreHost> {
        Arc::new(StoreHost::new(Database::open_in_memory().unwrap()))
    }

    fn cursor_json(cid: &str, uid: &str, seq: i64) -> (String,) {
        (serde_json::to_string(&ReadCursor::new(cid, uid, seq)).unwrap(),)
    }

    #[tokio::test]
    async fn test_cursor_round_trip_through_responses() {
        let host = host();
        upsert_cursor(host.clone(), cursor_json("c1", "u1", 5)).await;
        insert_cursor(host.clone(), cursor_json("c1", "u2", 0)).await;

        let found = get_cursor(host.clone(), ("c1".into(), "u2".into())).await;
        assert_eq!(
            found.into_optional::<ReadCursor>().unwrap(),
            Some(ReadCursor::new("c1", "u2", 0))
        );

        let listed = list_cursors(host.clone(), ("c1".into(),)).await;
        assert_eq!(listed.into_value::<Vec<ReadCursor>>().unwrap().len(), 2);

        let min = min_read_seq(host.clone(), ("c1".into(),)).await;
        assert_eq!(min.into_value::<i64>().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_increment_on_empty_state_yields_version_one() {
        let host = host();
        let bumped = increment_version(host.clone(), ("c1".into(),)).await;
        assert_eq!(bumped.into_value::<i64>().unwrap(), 1);

        let state = get_cursor_state(host, ("c1".into(),)).await;
        assert_eq!(
            state.into_value::<ReadCursorState>().unwrap(),
            ReadCursorState::new("c1", 1)
        );
    }

    #[tokio::test]
    async fn test_missing_rows_report_no_record() {
        let host = host();
        let state = get_cursor_state(host.clone(), ("c9".into(),)).await;
        assert_eq!(state.error_code(), Some(DatabaseErrorCode::ErrorNoRecord));
        assert_eq!(state.err_msg, "no cursor state for conversation c9");

        let read_state = get_read_state(host, ("c9".into(),)).await;
        assert_eq!(read_state.error_code(), Some(DatabaseErrorCode::ErrorNoRecord));
    }

    #[tokio::test]
    async fn test_read_state_upsert_and_refresh() {
        let host = host();
        let legacy = (r#"{"conversationID":"g1","minReadSeq":2}"#.to_string(),);
        assert!(upsert_read_state(host.clone(), legacy).await.is_ok());
        update_read_state_min_seq(host.clone(), ("g1".into(), 6)).await;

        let state: GroupReadState = get_read_state(host.clone(), ("g1".into(),))
            .await
            .into_value()
            .unwrap();
        assert_eq!(state.min_read_seq, 6);

        upsert_cursor(host.clone(), cursor_json("g1", "u1", 11)).await;
        let refreshed: GroupReadState = refresh_read_state(host.clone(), ("g1".into(), 3))
            .await
            .into_value()
            .unwrap();
        assert_eq!(refreshed.min_read_seq, 11);
        assert_eq!(refreshed.cursor_count, 1);
        assert_eq!(refreshed.member_count, 3);

        delete_read_state(host.clone(), ("g1".into(),)).await;
        assert!(!get_read_state(host, ("g1".into(),)).await.is_ok());
    }

    #[tokio::test]
    async fn test_negative_seq_is_init_error() {
        let host = host();
        let resp = upsert_cursor(host, cursor_json("c1", "u1", -1)).await;
        assert_eq!(resp.error_code(), Some(DatabaseErrorCode::ErrorInit));
    }
}
