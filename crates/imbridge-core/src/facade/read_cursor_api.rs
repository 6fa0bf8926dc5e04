//! Typed wrappers for the cursor and read-state methods.
//!
//! Records go over the wire as one JSON string param. A synthesised
//! timeout surfaces as `BridgeError::Database`, a missed point lookup as
//! `None`.

use serde::Serialize;
use serde_json::{json, Value};

use crate::error::BridgeError;
use crate::models::{GroupReadState, PeerReadState, ReadCursor, ReadCursorState};
use crate::response::DbResponse;

use super::database_api::DatabaseApi;

fn json_param<T: Serialize>(record: &T) -> Result<Value, BridgeError> {
    let text = serde_json::to_string(record)
        .map_err(|e| BridgeError::Internal(format!("Failed to encode params: {}", e)))?;
    Ok(Value::String(text))
}

impl DatabaseApi {
    async fn db(&self, name: &str, params: Vec<Value>) -> Result<DbResponse, BridgeError> {
        Ok(self.call_db(name, params).await?)
    }

    // ---------------------------------------------------------------
    // Group read cursors
    // ---------------------------------------------------------------

    pub async fn insert_group_read_cursor(&self, cursor: &ReadCursor) -> Result<(), BridgeError> {
        self.db("insertGroupReadCursor", vec![json_param(cursor)?])
            .await?
            .into_unit()
    }

    pub async fn upsert_group_read_cursor(&self, cursor: &ReadCursor) -> Result<(), BridgeError> {
        self.db("upsertGroupReadCursor", vec![json_param(cursor)?])
            .await?
            .into_unit()
    }

    pub async fn get_group_read_cursor(
        &self,
        conversation_id: &str,
        user_id: &str,
    ) -> Result<Option<ReadCursor>, BridgeError> {
        self.db("getGroupReadCursor", vec![json!(conversation_id), json!(user_id)])
            .await?
            .into_optional()
    }

    pub async fn get_group_read_cursors(
        &self,
        conversation_id: &str,
    ) -> Result<Vec<ReadCursor>, BridgeError> {
        self.db("getGroupReadCursorsByConversationID", vec![json!(conversation_id)])
            .await?
            .into_value()
    }

    pub async fn update_group_read_cursor(
        &self,
        conversation_id: &str,
        user_id: &str,
        max_read_seq: i64,
    ) -> Result<(), BridgeError> {
        self.db(
            "updateGroupReadCursor",
            vec![json!(conversation_id), json!(user_id), json!(max_read_seq)],
        )
        .await?
        .into_unit()
    }

    pub async fn delete_group_read_cursor(
        &self,
        conversation_id: &str,
        user_id: &str,
    ) -> Result<(), BridgeError> {
        self.db("deleteGroupReadCursor", vec![json!(conversation_id), json!(user_id)])
            .await?
            .into_unit()
    }

    pub async fn delete_group_read_cursors(&self, conversation_id: &str) -> Result<(), BridgeError> {
        self.db("deleteGroupReadCursorsByConversationID", vec![json!(conversation_id)])
            .await?
            .into_unit()
    }

    pub async fn get_min_read_seq(&self, conversation_id: &str) -> Result<i64, BridgeError> {
        self.db("getMinReadSeqFromCursors", vec![json!(conversation_id)])
            .await?
            .into_value()
    }

    // ---------------------------------------------------------------
    // Group cursor state
    // ---------------------------------------------------------------

    pub async fn insert_group_read_cursor_state(
        &self,
        state: &ReadCursorState,
    ) -> Result<(), BridgeError> {
        self.db("insertGroupReadCursorState", vec![json_param(state)?])
            .await?
            .into_unit()
    }

    pub async fn get_group_read_cursor_state(
        &self,
        conversation_id: &str,
    ) -> Result<Option<ReadCursorState>, BridgeError> {
        self.db("getGroupReadCursorState", vec![json!(conversation_id)])
            .await?
            .into_optional()
    }

    pub async fn delete_group_read_cursor_state(
        &self,
        conversation_id: &str,
    ) -> Result<(), BridgeError> {
        self.db("deleteGroupReadCursorState", vec![json!(conversation_id)])
            .await?
            .into_unit()
    }

    /// Returns the new version.
    pub async fn increment_group_read_cursor_version(
        &self,
        conversation_id: &str,
    ) -> Result<i64, BridgeError> {
        self.db("incrementGroupReadCursorVersion", vec![json!(conversation_id)])
            .await?
            .into_value()
    }

    // ---------------------------------------------------------------
    // Group read state
    // ---------------------------------------------------------------

    pub async fn get_group_read_state(
        &self,
        conversation_id: &str,
    ) -> Result<Option<GroupReadState>, BridgeError> {
        self.db("getGroupReadState", vec![json!(conversation_id)])
            .await?
            .into_optional()
    }

    pub async fn upsert_group_read_state(&self, state: &GroupReadState) -> Result<(), BridgeError> {
        self.db("upsertGroupReadState", vec![json_param(state)?])
            .await?
            .into_unit()
    }

    pub async fn update_group_read_state_min_seq(
        &self,
        conversation_id: &str,
        min_read_seq: i64,
    ) -> Result<(), BridgeError> {
        self.db(
            "updateGroupReadStateMinSeq",
            vec![json!(conversation_id), json!(min_read_seq)],
        )
        .await?
        .into_unit()
    }

    pub async fn delete_group_read_state(&self, conversation_id: &str) -> Result<(), BridgeError> {
        self.db("deleteGroupReadState", vec![json!(conversation_id)])
            .await?
            .into_unit()
    }

    pub async fn refresh_group_read_state(
        &self,
        conversation_id: &str,
        member_count: i64,
    ) -> Result<GroupReadState, BridgeError> {
        self.db(
            "refreshGroupReadState",
            vec![json!(conversation_id), json!(member_count)],
        )
        .await?
        .into_value()
    }

    // ---------------------------------------------------------------
    // Peer read cursors
    // ---------------------------------------------------------------

    pub async fn insert_read_cursor(&self, cursor: &ReadCursor) -> Result<(), BridgeError> {
        self.db("insertReadCursor", vec![json_param(cursor)?])
            .await?
            .into_unit()
    }

    pub async fn upsert_read_cursor(&self, cursor: &ReadCursor) -> Result<(), BridgeError> {
        self.db("upsertReadCursor", vec![json_param(cursor)?])
            .await?
            .into_unit()
    }

    pub async fn get_read_cursor(
        &self,
        conversation_id: &str,
        user_id: &str,
    ) -> Result<Option<ReadCursor>, BridgeError> {
        self.db("getReadCursor", vec![json!(conversation_id), json!(user_id)])
            .await?
            .into_optional()
    }

    pub async fn get_read_cursors(&self, conversation_id: &str) -> Result<Vec<ReadCursor>, BridgeError> {
        self.db("getReadCursorsByConversationID", vec![json!(conversation_id)])
            .await?
            .into_value()
    }

    pub async fn update_read_cursor(
        &self,
        conversation_id: &str,
        user_id: &str,
        max_read_seq: i64,
    ) -> Result<(), BridgeError> {
        self.db(
            "updateReadCursor",
            vec![json!(conversation_id), json!(user_id), json!(max_read_seq)],
        )
        .await?
        .into_unit()
    }

    pub async fn delete_read_cursor(&self, conversation_id: &str, user_id: &str) -> Result<(), BridgeError> {
        self.db("deleteReadCursor", vec![json!(conversation_id), json!(user_id)])
            .await?
            .into_unit()
    }

    pub async fn delete_read_cursors(&self, conversation_id: &str) -> Result<(), BridgeError> {
        self.db("deleteReadCursorsByConversationID", vec![json!(conversation_id)])
            .await?
            .into_unit()
    }

    /// Lowest `maxReadSeq` over everyone but `exclude_user_id`.
    pub async fn get_all_read_seq(
        &self,
        conversation_id: &str,
        exclude_user_id: &str,
    ) -> Result<i64, BridgeError> {
        self.db(
            "getAllReadSeqFromCursors",
            vec![json!(conversation_id), json!(exclude_user_id)],
        )
        .await?
        .into_value()
    }

    // ---------------------------------------------------------------
    // Peer read state
    // ---------------------------------------------------------------

    pub async fn get_read_state(&self, conversation_id: &str) -> Result<Option<PeerReadState>, BridgeError> {
        self.db("getReadStateDB", vec![json!(conversation_id)])
            .await?
            .into_optional()
    }

    pub async fn upsert_read_state(&self, state: &PeerReadState) -> Result<(), BridgeError> {
        self.db("upsertReadStateDB", vec![json_param(state)?])
            .await?
            .into_unit()
    }

    pub async fn update_read_state_all_read_seq(
        &self,
        conversation_id: &str,
        all_read_seq: i64,
    ) -> Result<(), BridgeError> {
        self.db(
            "updateReadStateAllReadSeqDB",
            vec![json!(conversation_id), json!(all_read_seq)],
        )
        .await?
        .into_unit()
    }

    pub async fn delete_read_state(&self, conversation_id: &str) -> Result<(), BridgeError> {
        self.db("deleteReadStateDB", vec![json!(conversation_id)])
            .await?
            .into_unit()
    }

    pub async fn refresh_read_state(
        &self,
        conversation_id: &str,
        self_user_id: &str,
    ) -> Result<PeerReadState, BridgeError> {
        self.db("refreshReadState", vec![json!(conversation_id), json!(self_user_id)])
            .await?
            .into_value()
    }
}

#[cfg(test)]
mod tests {
    use crate::facade::database_api::tests::local_api;
    use crate::models::{GroupReadState, PeerReadState, ReadCursor, ReadCursorState};

    #[tokio::test]
    async fn test_group_cursor_round_trip() {
        let api = local_api();
        api.upsert_group_read_cursor(&ReadCursor::new("g1", "u1", 5)).await.unwrap();
        api.upsert_group_read_cursor(&ReadCursor::new("g1", "u2", 3)).await.unwrap();

        assert_eq!(api.get_min_read_seq("g1").await.unwrap(), 3);
        assert_eq!(
            api.get_group_read_cursor("g1", "u1").await.unwrap(),
            Some(ReadCursor::new("g1", "u1", 5))
        );
        assert_eq!(api.get_group_read_cursor("g1", "nobody").await.unwrap(), None);
        assert_eq!(api.get_group_read_cursors("g1").await.unwrap().len(), 2);

        api.update_group_read_cursor("g1", "u2", 9).await.unwrap();
        assert_eq!(api.get_min_read_seq("g1").await.unwrap(), 5);

        api.delete_group_read_cursor("g1", "u1").await.unwrap();
        assert_eq!(api.get_min_read_seq("g1").await.unwrap(), 9);
        api.delete_group_read_cursors("g1").await.unwrap();
        assert_eq!(api.get_min_read_seq("g1").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_negative_seq_surfaces_as_database_error() {
        let api = local_api();
        let err = api
            .upsert_group_read_cursor(&ReadCursor::new("g1", "u1", -1))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("10001"));
    }

    #[tokio::test]
    async fn test_cursor_version_and_refresh() {
        let api = local_api();
        assert_eq!(api.get_group_read_cursor_state("g1").await.unwrap(), None);
        assert_eq!(api.increment_group_read_cursor_version("g1").await.unwrap(), 1);
        assert_eq!(api.increment_group_read_cursor_version("g1").await.unwrap(), 2);
        assert_eq!(
            api.get_group_read_cursor_state("g1").await.unwrap(),
            Some(ReadCursorState::new("g1", 2))
        );

        api.upsert_group_read_cursor(&ReadCursor::new("g1", "u1", 7)).await.unwrap();
        let state = api.refresh_group_read_state("g1", 4).await.unwrap();
        assert_eq!(state.min_read_seq, 7);
        assert_eq!(state.member_count, 4);
        assert_eq!(state.cursor_count, 1);
        assert_eq!(state.version, 2);
        assert_eq!(api.get_group_read_state("g1").await.unwrap(), Some(state));

        api.delete_group_read_cursor_state("g1").await.unwrap();
        api.insert_group_read_cursor_state(&ReadCursorState::new("g1", 10)).await.unwrap();
        assert_eq!(api.increment_group_read_cursor_version("g1").await.unwrap(), 11);
    }

    #[tokio::test]
    async fn test_group_read_state_ops() {
        let api = local_api();
        api.upsert_group_read_state(&GroupReadState::new("g1", 4)).await.unwrap();
        api.update_group_read_state_min_seq("g1", 6).await.unwrap();
        let state = api.get_group_read_state("g1").await.unwrap().unwrap();
        assert_eq!(state.min_read_seq, 6);
        api.delete_group_read_state("g1").await.unwrap();
        assert_eq!(api.get_group_read_state("g1").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_peer_cursors_and_state() {
        let api = local_api();
        api.insert_read_cursor(&ReadCursor::new("p1", "me", 10)).await.unwrap();
        api.upsert_read_cursor(&ReadCursor::new("p1", "peer", 4)).await.unwrap();

        assert_eq!(api.get_all_read_seq("p1", "me").await.unwrap(), 4);
        assert_eq!(api.get_read_cursors("p1").await.unwrap().len(), 2);
        api.update_read_cursor("p1", "peer", 8).await.unwrap();
        assert_eq!(
            api.get_read_cursor("p1", "peer").await.unwrap(),
            Some(ReadCursor::new("p1", "peer", 8))
        );

        assert_eq!(api.get_read_state("p1").await.unwrap(), None);
        let state = api.refresh_read_state("p1", "me").await.unwrap();
        assert_eq!(state, PeerReadState::new("p1", 8));
        api.update_read_state_all_read_seq("p1", 9).await.unwrap();
        assert_eq!(api.get_read_state("p1").await.unwrap(), Some(PeerReadState::new("p1", 9)));

        api.upsert_read_state(&PeerReadState::new("p1", 1)).await.unwrap();
        api.delete_read_state("p1").await.unwrap();
        api.delete_read_cursor("p1", "me").await.unwrap();
        api.delete_read_cursors("p1").await.unwrap();
        assert!(api.get_read_cursors("p1").await.unwrap().is_empty());
    }
}
