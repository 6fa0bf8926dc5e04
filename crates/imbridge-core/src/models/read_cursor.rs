use serde::{Deserialize, Serialize};

use crate::error::BridgeError;

/// One reader's high-water mark in a conversation.
///
/// The same shape backs both the group table and the peer (1:1) table.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReadCursor {
    #[serde(rename = "conversationID")]
    pub conversation_id: String,
    #[serde(rename = "userID")]
    pub user_id: String,
    #[serde(rename = "maxReadSeq", default)]
    pub max_read_seq: i64,
}

impl ReadCursor {
    pub fn new(conversation_id: impl Into<String>, user_id: impl Into<String>, max_read_seq: i64) -> Self {
        Self {
            conversation_id: conversation_id.into(),
            user_id: user_id.into(),
            max_read_seq,
        }
    }

    pub fn validate(&self) -> Result<(), BridgeError> {
        if self.conversation_id.is_empty() {
            return Err(BridgeError::BadRequest("conversationID is required".into()));
        }
        if self.user_id.is_empty() {
            return Err(BridgeError::BadRequest("userID is required".into()));
        }
        validate_seq(self.max_read_seq)
    }
}

/// Version counter guarding a conversation's cursor set.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReadCursorState {
    #[serde(rename = "conversationID")]
    pub conversation_id: String,
    #[serde(rename = "cursorVersion", default)]
    pub cursor_version: i64,
}

impl ReadCursorState {
    pub fn new(conversation_id: impl Into<String>, cursor_version: i64) -> Self {
        Self {
            conversation_id: conversation_id.into(),
            cursor_version,
        }
    }
}

/// Sequence numbers are non-negative; absence is 0.
pub fn validate_seq(seq: i64) -> Result<(), BridgeError> {
    if seq < 0 {
        return Err(BridgeError::BadRequest(format!(
            "sequence numbers must be non-negative, got {}",
            seq
        )));
    }
    Ok(())
}
