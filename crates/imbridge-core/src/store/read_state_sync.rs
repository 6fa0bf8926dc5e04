use chrono::Utc;
use rusqlite::OptionalExtension;

use crate::db::Database;
use crate::error::BridgeError;
use crate::models::{GroupReadState, PeerReadState};

use super::group_read_state_store::upsert_group_read_state;
use super::read_state_store::upsert_peer_read_state;

/// Rebuilds the cached read-state rows from the live cursor tables.
pub struct ReadStateSync {
    db: Database,
}

impl ReadStateSync {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Recompute the group aggregate inside one transaction: minimum seq and
    /// number of cursors, stamped with the current cursor version and time.
    pub async fn refresh_group_read_state(
        &self,
        conversation_id: &str,
        member_count: i64,
    ) -> Result<GroupReadState, BridgeError> {
        if member_count < 0 {
            return Err(BridgeError::BadRequest(format!(
                "memberCount must be non-negative, got {}",
                member_count
            )));
        }
        let cid = conversation_id.to_string();
        let state = self
            .db
            .with_conn_async(move |conn| {
                let tx = conn.unchecked_transaction()?;
                let (min_read_seq, cursor_count): (i64, i64) = tx.query_row(
                    "SELECT COALESCE(MIN(max_read_seq), 0), COUNT(*) FROM local_group_read_cursor
                     WHERE conversation_id = ?1",
                    rusqlite::params![cid],
                    |row| Ok((row.get(0)?, row.get(1)?)),
                )?;
                let version: i64 = tx
                    .query_row(
                        "SELECT cursor_version FROM local_group_read_cursor_state
                         WHERE conversation_id = ?1",
                        rusqlite::params![cid],
                        |row| row.get(0),
                    )
                    .optional()?
                    .unwrap_or(0);
                let state = GroupReadState {
                    conversation_id: cid,
                    min_read_seq,
                    member_count,
                    cursor_count,
                    last_sync_time: Utc::now().timestamp_millis(),
                    version,
                };
                upsert_group_read_state(&tx, &state)?;
                tx.commit()?;
                Ok(state)
            })
            .await?;

        tracing::debug!(
            "[ReadStateSync] refreshed {} min={} cursors={} version={}",
            state.conversation_id,
            state.min_read_seq,
            state.cursor_count,
            state.version
        );
        Ok(state)
    }

    /// Recompute the peer floor over every reader except `self_user_id`.
    pub async fn refresh_peer_read_state(
        &self,
        conversation_id: &str,
        self_user_id: &str,
    ) -> Result<PeerReadState, BridgeError> {
        let cid = conversation_id.to_string();
        let uid = self_user_id.to_string();
        self.db
            .with_conn_async(move |conn| {
                let tx = conn.unchecked_transaction()?;
                let all_read_seq: i64 = tx.query_row(
                    "SELECT COALESCE(MIN(max_read_seq), 0) FROM local_read_cursor
                     WHERE conversation_id = ?1 AND user_id != ?2",
                    rusqlite::params![cid, uid],
                    |row| row.get(0),
                )?;
                let state = PeerReadState::new(cid, all_read_seq);
                upsert_peer_read_state(&tx, &state)?;
                tx.commit()?;
                Ok(state)
            })
            .await
    }
}

/// A cached aggregate is stale once the cursor set has moved past the
/// version it was computed against.
pub fn is_stale(state: &GroupReadState, cursor_version: i64) -> bool {
    state.version < cursor_version
}
