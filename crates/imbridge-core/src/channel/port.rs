//! In-process message endpoints.
//!
//! A [`MessagePort`] pair is the stand-in for a worker's `postMessage`
//! surface: what one side posts lands in the other side's inbox.

use std::sync::{Arc, Mutex};

use serde_json::Value;
use tokio::sync::mpsc;

use crate::error::BridgeError;

/// Opaque resource moved (not copied) along with a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transferable(pub Vec<u8>);

/// One native message as delivered by an endpoint.
#[derive(Debug, Clone)]
pub struct NativeMessage {
    pub data: Value,
    pub transfer: Vec<Transferable>,
}

pub type Inbox = mpsc::UnboundedReceiver<NativeMessage>;

/// Something that can send native messages and owns an inbox of received ones.
///
/// The inbox is lent to whoever listens on the endpoint (`take_inbox`) and
/// handed back on teardown (`restore_inbox`), so a later listener picks up
/// where the previous one stopped.
pub trait Endpoint: Send + Sync {
    fn post_message(&self, data: Value, transfer: Vec<Transferable>) -> Result<(), BridgeError>;

    fn take_inbox(&self) -> Option<Inbox>;

    fn restore_inbox(&self, inbox: Inbox);
}

pub struct MessagePort {
    peer_tx: mpsc::UnboundedSender<NativeMessage>,
    inbox: Mutex<Option<Inbox>>,
}

impl MessagePort {
    /// Two ports wired to each other.
    pub fn pair() -> (Arc<MessagePort>, Arc<MessagePort>) {
        let (a_tx, a_rx) = mpsc::unbounded_channel();
        let (b_tx, b_rx) = mpsc::unbounded_channel();
        let a = Arc::new(MessagePort {
            peer_tx: b_tx,
            inbox: Mutex::new(Some(a_rx)),
        });
        let b = Arc::new(MessagePort {
            peer_tx: a_tx,
            inbox: Mutex::new(Some(b_rx)),
        });
        (a, b)
    }
}

impl Endpoint for MessagePort {
    fn post_message(&self, data: Value, transfer: Vec<Transferable>) -> Result<(), BridgeError> {
        self.peer_tx
            .send(NativeMessage { data, transfer })
            .map_err(|_| BridgeError::Internal("message port is closed".into()))
    }

    fn take_inbox(&self) -> Option<Inbox> {
        self.inbox.lock().ok().and_then(|mut slot| slot.take())
    }

    fn restore_inbox(&self, inbox: Inbox) {
        if let Ok(mut slot) = self.inbox.lock() {
            *slot = Some(inbox);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_pair_delivers_to_the_other_side() {
        let (a, b) = MessagePort::pair();
        a.post_message(json!({ "hello": 1 }), vec![Transferable(vec![7])])
            .unwrap();

        let mut inbox = b.take_inbox().unwrap();
        let msg = inbox.recv().await.unwrap();
        assert_eq!(msg.data, json!({ "hello": 1 }));
        assert_eq!(msg.transfer, vec![Transferable(vec![7])]);

        // A's own inbox saw nothing.
        let mut own = a.take_inbox().unwrap();
        assert!(own.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_inbox_can_only_be_taken_once_until_restored() {
        let (a, _b) = MessagePort::pair();
        let inbox = a.take_inbox().unwrap();
        assert!(a.take_inbox().is_none());
        a.restore_inbox(inbox);
        assert!(a.take_inbox().is_some());
    }

    #[test]
    fn test_post_to_dropped_peer_fails() {
        let (a, b) = MessagePort::pair();
        drop(b);
        assert!(a.post_message(json!(null), vec![]).is_err());
    }
}
