use serde::{Deserialize, Serialize};

/// Cached aggregate of a group conversation's cursors.
///
/// Older payloads only carry `conversationID` and `minReadSeq`; the
/// bookkeeping fields default to 0.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GroupReadState {
    #[serde(rename = "conversationID")]
    pub conversation_id: String,
    #[serde(rename = "minReadSeq", default)]
    pub min_read_seq: i64,
    #[serde(rename = "memberCount", default)]
    pub member_count: i64,
    #[serde(rename = "cursorCount", default)]
    pub cursor_count: i64,
    /// Epoch milliseconds of the last refresh.
    #[serde(rename = "lastSyncTime", default)]
    pub last_sync_time: i64,
    /// Cursor version the aggregate was computed against.
    #[serde(default)]
    pub version: i64,
}

impl GroupReadState {
    pub fn new(conversation_id: impl Into<String>, min_read_seq: i64) -> Self {
        Self {
            conversation_id: conversation_id.into(),
            min_read_seq,
            member_count: 0,
            cursor_count: 0,
            last_sync_time: 0,
            version: 0,
        }
    }
}

/// Peer (1:1) read floor: the lowest sequence every other participant has read.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PeerReadState {
    #[serde(rename = "conversationID")]
    pub conversation_id: String,
    #[serde(rename = "allReadSeq", default)]
    pub all_read_seq: i64,
}

impl PeerReadState {
    pub fn new(conversation_id: impl Into<String>, all_read_seq: i64) -> Self {
        Self {
            conversation_id: conversation_id.into(),
            all_read_seq,
        }
    }
}
