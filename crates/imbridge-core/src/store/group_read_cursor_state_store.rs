use rusqlite::OptionalExtension;

use crate::db::Database;
use crate::error::BridgeError;
use crate::models::ReadCursorState;

/// Cursor version counters (`local_group_read_cursor_state`).
pub struct GroupReadCursorStateStore {
    db: Database,
}

impl GroupReadCursorStateStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub async fn insert(&self, state: &ReadCursorState) -> Result<(), BridgeError> {
        crate::models::validate_seq(state.cursor_version)?;
        let s = state.clone();
        self.db
            .with_conn_async(move |conn| {
                conn.execute(
                    "INSERT OR REPLACE INTO local_group_read_cursor_state (conversation_id, cursor_version)
                     VALUES (?1, ?2)",
                    rusqlite::params![s.conversation_id, s.cursor_version],
                )?;
                Ok(())
            })
            .await
    }

    pub async fn get(&self, conversation_id: &str) -> Result<Option<ReadCursorState>, BridgeError> {
        let cid = conversation_id.to_string();
        self.db
            .with_conn_async(move |conn| {
                conn.query_row(
                    "SELECT conversation_id, cursor_version FROM local_group_read_cursor_state
                     WHERE conversation_id = ?1 LIMIT 1",
                    rusqlite::params![cid],
                    |row| {
                        Ok(ReadCursorState {
                            conversation_id: row.get(0)?,
                            cursor_version: row.get::<_, Option<i64>>(1)?.unwrap_or(0),
                        })
                    },
                )
                .optional()
            })
            .await
    }

    pub async fn delete(&self, conversation_id: &str) -> Result<(), BridgeError> {
        let cid = conversation_id.to_string();
        self.db
            .with_conn_async(move |conn| {
                conn.execute(
                    "DELETE FROM local_group_read_cursor_state WHERE conversation_id = ?1",
                    rusqlite::params![cid],
                )?;
                Ok(())
            })
            .await
    }

    /// Bump the version, creating the row at 1 when it does not exist yet.
    /// Returns the new version.
    pub async fn increment_version(&self, conversation_id: &str) -> Result<i64, BridgeError> {
        let cid = conversation_id.to_string();
        self.db
            .with_conn_async(move |conn| {
                conn.query_row(
                    "INSERT INTO local_group_read_cursor_state (conversation_id, cursor_version)
                     VALUES (?1, 1)
                     ON CONFLICT(conversation_id) DO UPDATE SET
                       cursor_version = cursor_version + 1
                     RETURNING cursor_version",
                    rusqlite::params![cid],
                    |row| row.get(0),
                )
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> GroupReadCursorStateStore {
        GroupReadCursorStateStore::new(Database::open_in_memory().unwrap())
    }

    #[tokio::test]
    async fn test_increment_on_missing_row_starts_at_one() {
        let store = store();
        assert_eq!(store.increment_version("c1").await.unwrap(), 1);
        assert_eq!(
            store.get("c1").await.unwrap(),
            Some(ReadCursorState::new("c1", 1))
        );
    }

    #[tokio::test]
    async fn test_increment_is_cumulative() {
        let store = store();
        store.insert(&ReadCursorState::new("c1", 4)).await.unwrap();
        assert_eq!(store.increment_version("c1").await.unwrap(), 5);
        assert_eq!(store.increment_version("c1").await.unwrap(), 6);
        assert_eq!(store.get("c1").await.unwrap().unwrap().cursor_version, 6);
    }

    #[tokio::test]
    async fn test_concurrent_increments_do_not_lose_updates() {
        let store = std::sync::Arc::new(store());
        let mut handles = Vec::new();
        for _ in 0..20 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store.increment_version("hot").await.unwrap()
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }
        assert_eq!(store.get("hot").await.unwrap().unwrap().cursor_version, 20);
    }

    #[tokio::test]
    async fn test_get_missing_and_delete() {
        let store = store();
        assert!(store.get("c1").await.unwrap().is_none());
        store.insert(&ReadCursorState::new("c1", 0)).await.unwrap();
        assert_eq!(store.get("c1").await.unwrap().unwrap().cursor_version, 0);
        store.delete("c1").await.unwrap();
        assert!(store.get("c1").await.unwrap().is_none());
    }
}
