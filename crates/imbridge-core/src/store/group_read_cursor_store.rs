use rusqlite::OptionalExtension;

use crate::db::Database;
use crate::error::BridgeError;
use crate::models::ReadCursor;

use super::row_to_cursor;

/// Per-member read cursors of group conversations (`local_group_read_cursor`).
///
/// No monotonicity check happens here: callers decide whether a new
/// `maxReadSeq` may replace an older one.
pub struct GroupReadCursorStore {
    db: Database,
}

impl GroupReadCursorStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Insert-or-replace by `(conversation_id, user_id)`.
    pub async fn insert(&self, cursor: &ReadCursor) -> Result<(), BridgeError> {
        cursor.validate()?;
        let c = cursor.clone();
        self.db
            .with_conn_async(move |conn| {
                conn.execute(
                    "INSERT OR REPLACE INTO local_group_read_cursor (conversation_id, user_id, max_read_seq)
                     VALUES (?1, ?2, ?3)",
                    rusqlite::params![c.conversation_id, c.user_id, c.max_read_seq],
                )?;
                Ok(())
            })
            .await
    }

    pub async fn upsert(&self, cursor: &ReadCursor) -> Result<(), BridgeError> {
        cursor.validate()?;
        let c = cursor.clone();
        self.db
            .with_conn_async(move |conn| {
                conn.execute(
                    "INSERT INTO local_group_read_cursor (conversation_id, user_id, max_read_seq)
                     VALUES (?1, ?2, ?3)
                     ON CONFLICT(conversation_id, user_id) DO UPDATE SET
                       max_read_seq = excluded.max_read_seq",
                    rusqlite::params![c.conversation_id, c.user_id, c.max_read_seq],
                )?;
                Ok(())
            })
            .await
    }

    pub async fn get(
        &self,
        conversation_id: &str,
        user_id: &str,
    ) -> Result<Option<ReadCursor>, BridgeError> {
        let cid = conversation_id.to_string();
        let uid = user_id.to_string();
        self.db
            .with_conn_async(move |conn| {
                conn.query_row(
                    "SELECT conversation_id, user_id, max_read_seq FROM local_group_read_cursor
                     WHERE conversation_id = ?1 AND user_id = ?2 LIMIT 1",
                    rusqlite::params![cid, uid],
                    |row| Ok(row_to_cursor(row)),
                )
                .optional()
            })
            .await
    }

    pub async fn list_by_conversation(
        &self,
        conversation_id: &str,
    ) -> Result<Vec<ReadCursor>, BridgeError> {
        let cid = conversation_id.to_string();
        self.db
            .with_conn_async(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT conversation_id, user_id, max_read_seq FROM local_group_read_cursor
                     WHERE conversation_id = ?1",
                )?;
                let rows = stmt
                    .query_map(rusqlite::params![cid], |row| Ok(row_to_cursor(row)))?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(rows)
            })
            .await
    }

    /// Update an existing cursor. Returns the number of rows touched (0 when absent).
    pub async fn update(
        &self,
        conversation_id: &str,
        user_id: &str,
        max_read_seq: i64,
    ) -> Result<usize, BridgeError> {
        crate::models::validate_seq(max_read_seq)?;
        let cid = conversation_id.to_string();
        let uid = user_id.to_string();
        self.db
            .with_conn_async(move |conn| {
                conn.execute(
                    "UPDATE local_group_read_cursor SET max_read_seq = ?3
                     WHERE conversation_id = ?1 AND user_id = ?2",
                    rusqlite::params![cid, uid, max_read_seq],
                )
            })
            .await
    }

    pub async fn delete(&self, conversation_id: &str, user_id: &str) -> Result<(), BridgeError> {
        let cid = conversation_id.to_string();
        let uid = user_id.to_string();
        self.db
            .with_conn_async(move |conn| {
                conn.execute(
                    "DELETE FROM local_group_read_cursor WHERE conversation_id = ?1 AND user_id = ?2",
                    rusqlite::params![cid, uid],
                )?;
                Ok(())
            })
            .await
    }

    pub async fn delete_by_conversation(&self, conversation_id: &str) -> Result<(), BridgeError> {
        let cid = conversation_id.to_string();
        self.db
            .with_conn_async(move |conn| {
                conn.execute(
                    "DELETE FROM local_group_read_cursor WHERE conversation_id = ?1",
                    rusqlite::params![cid],
                )?;
                Ok(())
            })
            .await
    }

    /// Lowest `max_read_seq` across all members; 0 when nobody has a cursor.
    pub async fn min_read_seq(&self, conversation_id: &str) -> Result<i64, BridgeError> {
        let cid = conversation_id.to_string();
        self.db
            .with_conn_async(move |conn| {
                conn.query_row(
                    "SELECT COALESCE(MIN(max_read_seq), 0) FROM local_group_read_cursor
                     WHERE conversation_id = ?1",
                    rusqlite::params![cid],
                    |row| row.get(0),
                )
            })
            .await
    }
}
