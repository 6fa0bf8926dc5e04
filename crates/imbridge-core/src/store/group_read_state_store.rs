use rusqlite::{OptionalExtension, Row};

use crate::db::Database;
use crate::error::BridgeError;
use crate::models::GroupReadState;

/// Denormalised aggregate rows (`local_group_read_state`).
///
/// These rows are a cache: nothing here keeps them in step with the live
/// cursors. See [`super::read_state_sync`] for the refresh helper.
pub struct GroupReadStateStore {
    db: Database,
}

impl GroupReadStateStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub async fn get(&self, conversation_id: &str) -> Result<Option<GroupReadState>, BridgeError> {
        let cid = conversation_id.to_string();
        self.db
            .with_conn_async(move |conn| {
                conn.query_row(
                    "SELECT conversation_id, min_read_seq, member_count, cursor_count, last_sync_time, version
                     FROM local_group_read_state WHERE conversation_id = ?1 LIMIT 1",
                    rusqlite::params![cid],
                    |row| Ok(row_to_group_read_state(row)),
                )
                .optional()
            })
            .await
    }

    pub async fn upsert(&self, state: &GroupReadState) -> Result<(), BridgeError> {
        crate::models::validate_seq(state.min_read_seq)?;
        let s = state.clone();
        self.db
            .with_conn_async(move |conn| upsert_group_read_state(conn, &s))
            .await
    }

    /// Overwrite only the cached minimum. Returns rows touched (0 when absent).
    pub async fn update_min_seq(
        &self,
        conversation_id: &str,
        min_read_seq: i64,
    ) -> Result<usize, BridgeError> {
        crate::models::validate_seq(min_read_seq)?;
        let cid = conversation_id.to_string();
        self.db
            .with_conn_async(move |conn| {
                conn.execute(
                    "UPDATE local_group_read_state SET min_read_seq = ?2 WHERE conversation_id = ?1",
                    rusqlite::params![cid, min_read_seq],
                )
            })
            .await
    }

    pub async fn delete(&self, conversation_id: &str) -> Result<(), BridgeError> {
        let cid = conversation_id.to_string();
        self.db
            .with_conn_async(move |conn| {
                conn.execute(
                    "DELETE FROM local_group_read_state WHERE conversation_id = ?1",
                    rusqlite::params![cid],
                )?;
                Ok(())
            })
            .await
    }
}

pub(crate) fn upsert_group_read_state(
    conn: &rusqlite::Connection,
    s: &GroupReadState,
) -> Result<(), rusqlite::Error> {
    conn.execute(
        "INSERT INTO local_group_read_state
           (conversation_id, min_read_seq, member_count, cursor_count, last_sync_time, version)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)
         ON CONFLICT(conversation_id) DO UPDATE SET
           min_read_seq = excluded.min_read_seq,
           member_count = excluded.member_count,
           cursor_count = excluded.cursor_count,
           last_sync_time = excluded.last_sync_time,
           version = excluded.version",
        rusqlite::params![
            s.conversation_id,
            s.min_read_seq,
            s.member_count,
            s.cursor_count,
            s.last_sync_time,
            s.version,
        ],
    )?;
    Ok(())
}

/// Column order: conversation_id(0), min_read_seq(1), member_count(2),
///               cursor_count(3), last_sync_time(4), version(5)
fn row_to_group_read_state(row: &Row<'_>) -> GroupReadState {
    GroupReadState {
        conversation_id: row.get(0).unwrap_or_default(),
        min_read_seq: row.get::<_, Option<i64>>(1).unwrap_or(None).unwrap_or(0),
        member_count: row.get::<_, Option<i64>>(2).unwrap_or(None).unwrap_or(0),
        cursor_count: row.get::<_, Option<i64>>(3).unwrap_or(None).unwrap_or(0),
        last_sync_time: row.get::<_, Option<i64>>(4).unwrap_or(None).unwrap_or(0),
        version: row.get::<_, Option<i64>>(5).unwrap_or(None).unwrap_or(0),
    }
}
