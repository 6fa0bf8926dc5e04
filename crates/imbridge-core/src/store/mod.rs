//! Read-cursor and read-state persistence.
//!
//! Group and peer (1:1) variants share one cursor shape; each table gets
//! its own store over the shared [`Database`](crate::db::Database) handle.

pub mod group_read_cursor_state_store;
pub mod group_read_cursor_store;
pub mod group_read_state_store;
pub mod read_cursor_store;
pub mod read_state_store;
pub mod read_state_sync;

pub use group_read_cursor_state_store::GroupReadCursorStateStore;
pub use group_read_cursor_store::GroupReadCursorStore;
pub use group_read_state_store::GroupReadStateStore;
pub use read_cursor_store::ReadCursorStore;
pub use read_state_store::ReadStateStore;
pub use read_state_sync::ReadStateSync;

use rusqlite::Row;

use crate::models::ReadCursor;

/// Column order: conversation_id(0), user_id(1), max_read_seq(2)
pub(crate) fn row_to_cursor(row: &Row<'_>) -> ReadCursor {
    ReadCursor {
        conversation_id: row.get(0).unwrap_or_default(),
        user_id: row.get(1).unwrap_or_default(),
        max_read_seq: row.get::<_, Option<i64>>(2).unwrap_or(None).unwrap_or(0),
    }
}
