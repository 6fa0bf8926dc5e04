//! Worker-side store host.
//!
//! Registers one RPC method per store operation on an [`RpcEngine`]. Every
//! method answers with a [`DbResponse`]; only a params shape mismatch
//! surfaces as an RPC error (INVALID_PARAMS).

pub mod methods;

use std::future::Future;
use std::sync::Arc;

use serde::de::DeserializeOwned;

use crate::db::Database;
use crate::response::DbResponse;
use crate::rpc::{RpcEngine, RpcError};
use crate::store::{
    GroupReadCursorStateStore, GroupReadCursorStore, GroupReadStateStore, ReadCursorStore,
    ReadStateStore, ReadStateSync,
};

/// Names registered by [`StoreHost::register`], in registration order.
pub const HOSTED_METHODS: [&str; 30] = [
    "insertGroupReadCursor",
    "getGroupReadCursor",
    "getGroupReadCursorsByConversationID",
    "updateGroupReadCursor",
    "deleteGroupReadCursor",
    "deleteGroupReadCursorsByConversationID",
    "upsertGroupReadCursor",
    "getMinReadSeqFromCursors",
    "insertGroupReadCursorState",
    "getGroupReadCursorState",
    "deleteGroupReadCursorState",
    "incrementGroupReadCursorVersion",
    "getGroupReadState",
    "upsertGroupReadState",
    "updateGroupReadStateMinSeq",
    "deleteGroupReadState",
    "refreshGroupReadState",
    "insertReadCursor",
    "getReadCursor",
    "getReadCursorsByConversationID",
    "updateReadCursor",
    "deleteReadCursor",
    "deleteReadCursorsByConversationID",
    "upsertReadCursor",
    "getAllReadSeqFromCursors",
    "getReadStateDB",
    "upsertReadStateDB",
    "updateReadStateAllReadSeqDB",
    "deleteReadStateDB",
    "refreshReadState",
];

pub struct StoreHost {
    pub group_cursors: GroupReadCursorStore,
    pub cursor_states: GroupReadCursorStateStore,
    pub group_states: GroupReadStateStore,
    pub peer_cursors: ReadCursorStore,
    pub peer_states: ReadStateStore,
    pub sync: ReadStateSync,
}

impl StoreHost {
    pub fn new(db: Database) -> Self {
        Self {
            group_cursors: GroupReadCursorStore::new(db.clone()),
            cursor_states: GroupReadCursorStateStore::new(db.clone()),
            group_states: GroupReadStateStore::new(db.clone()),
            peer_cursors: ReadCursorStore::new(db.clone()),
            peer_states: ReadStateStore::new(db.clone()),
            sync: ReadStateSync::new(db),
        }
    }

    /// Register every hosted method on `engine`.
    pub fn register(engine: &RpcEngine, db: Database) -> Result<Arc<StoreHost>, RpcError> {
        use methods::{group, peer};

        let host = Arc::new(StoreHost::new(db));

        serve(engine, &host, "insertGroupReadCursor", group::insert_cursor)?;
        serve(engine, &host, "getGroupReadCursor", group::get_cursor)?;
        serve(engine, &host, "getGroupReadCursorsByConversationID", group::list_cursors)?;
        serve(engine, &host, "updateGroupReadCursor", group::update_cursor)?;
        serve(engine, &host, "deleteGroupReadCursor", group::delete_cursor)?;
        serve(engine, &host, "deleteGroupReadCursorsByConversationID", group::delete_cursors)?;
        serve(engine, &host, "upsertGroupReadCursor", group::upsert_cursor)?;
        serve(engine, &host, "getMinReadSeqFromCursors", group::min_read_seq)?;
        serve(engine, &host, "insertGroupReadCursorState", group::insert_cursor_state)?;
        serve(engine, &host, "getGroupReadCursorState", group::get_cursor_state)?;
        serve(engine, &host, "deleteGroupReadCursorState", group::delete_cursor_state)?;
        serve(engine, &host, "incrementGroupReadCursorVersion", group::increment_version)?;
        serve(engine, &host, "getGroupReadState", group::get_read_state)?;
        serve(engine, &host, "upsertGroupReadState", group::upsert_read_state)?;
        serve(engine, &host, "updateGroupReadStateMinSeq", group::update_read_state_min_seq)?;
        serve(engine, &host, "deleteGroupReadState", group::delete_read_state)?;
        serve(engine, &host, "refreshGroupReadState", group::refresh_read_state)?;

        serve(engine, &host, "insertReadCursor", peer::insert_cursor)?;
        serve(engine, &host, "getReadCursor", peer::get_cursor)?;
        serve(engine, &host, "getReadCursorsByConversationID", peer::list_cursors)?;
        serve(engine, &host, "updateReadCursor", peer::update_cursor)?;
        serve(engine, &host, "deleteReadCursor", peer::delete_cursor)?;
        serve(engine, &host, "deleteReadCursorsByConversationID", peer::delete_cursors)?;
        serve(engine, &host, "upsertReadCursor", peer::upsert_cursor)?;
        serve(engine, &host, "getAllReadSeqFromCursors", peer::all_read_seq)?;
        serve(engine, &host, "getReadStateDB", peer::get_read_state)?;
        serve(engine, &host, "upsertReadStateDB", peer::upsert_read_state)?;
        serve(engine, &host, "updateReadStateAllReadSeqDB", peer::update_all_read_seq)?;
        serve(engine, &host, "deleteReadStateDB", peer::delete_read_state)?;
        serve(engine, &host, "refreshReadState", peer::refresh_read_state)?;

        tracing::info!("[StoreHost] registered {} methods", HOSTED_METHODS.len());
        Ok(host)
    }
}

fn serve<P, F, Fut>(
    engine: &RpcEngine,
    host: &Arc<StoreHost>,
    name: &str,
    method: F,
) -> Result<(), RpcError>
where
    P: DeserializeOwned + Send + 'static,
    F: Fn(Arc<StoreHost>, P) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = DbResponse> + Send + 'static,
{
    let host = host.clone();
    engine.register_typed(name, move |params: P| {
        let response = method(host.clone(), params);
        async move { Ok::<_, RpcError>(response.await) }
    })
}
