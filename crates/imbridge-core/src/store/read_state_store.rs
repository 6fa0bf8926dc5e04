use rusqlite::OptionalExtension;

use crate::db::Database;
use crate::error::BridgeError;
use crate::models::PeerReadState;

/// Peer read floors (`local_read_state`).
pub struct ReadStateStore {
    db: Database,
}

impl ReadStateStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub async fn get(&self, conversation_id: &str) -> Result<Option<PeerReadState>, BridgeError> {
        let cid = conversation_id.to_string();
        self.db
            .with_conn_async(move |conn| {
                conn.query_row(
                    "SELECT conversation_id, all_read_seq FROM local_read_state
                     WHERE conversation_id = ?1 LIMIT 1",
                    rusqlite::params![cid],
                    |row| {
                        Ok(PeerReadState {
                            conversation_id: row.get(0)?,
                            all_read_seq: row.get::<_, Option<i64>>(1)?.unwrap_or(0),
                        })
                    },
                )
                .optional()
            })
            .await
    }

    pub async fn upsert(&self, state: &PeerReadState) -> Result<(), BridgeError> {
        crate::models::validate_seq(state.all_read_seq)?;
        let s = state.clone();
        self.db
            .with_conn_async(move |conn| upsert_peer_read_state(conn, &s))
            .await
    }

    pub async fn update_all_read_seq(
        &self,
        conversation_id: &str,
        all_read_seq: i64,
    ) -> Result<usize, BridgeError> {
        crate::models::validate_seq(all_read_seq)?;
        let cid = conversation_id.to_string();
        self.db
            .with_conn_async(move |conn| {
                conn.execute(
                    "UPDATE local_read_state SET all_read_seq = ?2 WHERE conversation_id = ?1",
                    rusqlite::params![cid, all_read_seq],
                )
            })
            .await
    }

    pub async fn delete(&self, conversation_id: &str) -> Result<(), BridgeError> {
        let cid = conversation_id.to_string();
        self.db
            .with_conn_async(move |conn| {
                conn.execute(
                    "DELETE FROM local_read_state WHERE conversation_id = ?1",
                    rusqlite::params![cid],
                )?;
                Ok(())
            })
            .await
    }
}

pub(crate) fn upsert_peer_read_state(
    conn: &rusqlite::Connection,
    s: &PeerReadState,
) -> Result<(), rusqlite::Error> {
    conn.execute(
        "INSERT INTO local_read_state (conversation_id, all_read_seq) VALUES (?1, ?2)
         ON CONFLICT(conversation_id) DO UPDATE SET all_read_seq = excluded.all_read_seq",
        rusqlite::params![s.conversation_id, s.all_read_seq],
    )?;
    Ok(())
}
