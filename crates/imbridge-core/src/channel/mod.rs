//! Event channel adapter.
//!
//! Presents a two-way [`Endpoint`] as a named-event emitter: `emit` posts
//! `{event, args}` to the target endpoint, and a reader task dispatches
//! every inbound message to the handlers registered for its event name.

pub mod port;

pub use port::{Endpoint, Inbox, MessagePort, NativeMessage, Transferable};

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use serde::Serialize;
use serde_json::Value;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use crate::error::BridgeError;
use crate::rpc::types::{METHOD_NOT_FOUND, METHOD_NOT_FOUND_MESSAGE};

/// Identifies one registration made with [`EventChannel::on`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HandlerId(u64);

pub type Handler = Arc<dyn Fn(Vec<Value>) + Send + Sync>;
pub type SendTransform = Arc<dyn Fn(Value) -> Outgoing + Send + Sync>;
pub type ReceiveTransform = Arc<dyn Fn(&NativeMessage) -> Value + Send + Sync>;
pub type ErrorHook = Arc<dyn Fn(UnroutableMessage) + Send + Sync>;

/// What a send transform hands to the endpoint.
#[derive(Debug, Clone)]
pub struct Outgoing {
    pub data: Value,
    pub transfer: Vec<Transferable>,
}

impl Outgoing {
    pub fn new(data: Value) -> Self {
        Self {
            data,
            transfer: Vec::new(),
        }
    }
}

/// Passed to the `onerror` hook when no handler exists for an inbound event.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnroutableMessage {
    pub code: i64,
    pub message: String,
    pub data: Value,
}

pub struct EventChannelOptions {
    /// Endpoint whose inbox is read.
    pub current: Arc<dyn Endpoint>,
    /// Endpoint that `emit` posts to.
    pub target: Arc<dyn Endpoint>,
    pub send_transform: Option<SendTransform>,
    pub receive_transform: Option<ReceiveTransform>,
}

impl EventChannelOptions {
    /// Listen on and post to the same endpoint, like a worker handle.
    pub fn new(endpoint: Arc<dyn Endpoint>) -> Self {
        Self {
            current: endpoint.clone(),
            target: endpoint,
            send_transform: None,
            receive_transform: None,
        }
    }

    pub fn with_target(mut self, target: Arc<dyn Endpoint>) -> Self {
        self.target = target;
        self
    }

    pub fn with_send_transform(mut self, transform: SendTransform) -> Self {
        self.send_transform = Some(transform);
        self
    }

    pub fn with_receive_transform(mut self, transform: ReceiveTransform) -> Self {
        self.receive_transform = Some(transform);
        self
    }
}

enum Reader {
    Idle,
    Running {
        shutdown: oneshot::Sender<()>,
        task: JoinHandle<()>,
    },
    Destroyed,
}

struct Shared {
    current: Arc<dyn Endpoint>,
    target: Arc<dyn Endpoint>,
    send_transform: Option<SendTransform>,
    receive_transform: Option<ReceiveTransform>,
    handlers: Mutex<HashMap<String, Vec<(HandlerId, Handler)>>>,
    onerror: Mutex<Option<ErrorHook>>,
    next_handler_id: AtomicU64,
    reader: Mutex<Reader>,
}

/// Cheap to clone; clones share handlers and the reader.
#[derive(Clone)]
pub struct EventChannel {
    shared: Arc<Shared>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl EventChannel {
    pub fn new(options: EventChannelOptions) -> Self {
        Self {
            shared: Arc::new(Shared {
                current: options.current,
                target: options.target,
                send_transform: options.send_transform,
                receive_transform: options.receive_transform,
                handlers: Mutex::new(HashMap::new()),
                onerror: Mutex::new(None),
                next_handler_id: AtomicU64::new(1),
                reader: Mutex::new(Reader::Idle),
            }),
        }
    }

    /// Take the endpoint's inbox and start dispatching. Calling it again
    /// while running is a no-op. Must run inside a tokio runtime.
    pub fn start(&self) -> Result<(), BridgeError> {
        let mut reader = lock(&self.shared.reader);
        match *reader {
            Reader::Running { .. } => return Ok(()),
            Reader::Destroyed => {
                return Err(BridgeError::Internal("event channel is destroyed".into()))
            }
            Reader::Idle => {}
        }

        let mut inbox = self.shared.current.take_inbox().ok_or_else(|| {
            BridgeError::Internal("endpoint inbox is already taken by another listener".into())
        })?;
        let (shutdown, mut shutdown_rx) = oneshot::channel::<()>();
        let weak = Arc::downgrade(&self.shared);
        let endpoint = self.shared.current.clone();

        let task = tokio::spawn(async move {
            loop {
                tokio::select! {
                    biased;
                    _ = &mut shutdown_rx => break,
                    msg = inbox.recv() => {
                        let Some(msg) = msg else { break };
                        let Some(shared) = weak.upgrade() else { break };
                        shared.dispatch(msg);
                    }
                }
            }
            endpoint.restore_inbox(inbox);
            tracing::debug!("[EventChannel] reader stopped, inbox restored");
        });

        *reader = Reader::Running { shutdown, task };
        Ok(())
    }

    /// Post `{event, args}` to the target endpoint.
    pub fn emit(&self, event: &str, args: Vec<Value>) -> Result<(), BridgeError> {
        let data = serde_json::json!({ "event": event, "args": args });
        let outgoing = match &self.shared.send_transform {
            Some(transform) => transform(data),
            None => Outgoing::new(data),
        };
        self.shared
            .target
            .post_message(outgoing.data, outgoing.transfer)
    }

    pub fn on(&self, event: &str, handler: Handler) -> HandlerId {
        let id = HandlerId(self.shared.next_handler_id.fetch_add(1, Ordering::SeqCst));
        lock(&self.shared.handlers)
            .entry(event.to_string())
            .or_default()
            .push((id, handler));
        id
    }

    /// Remove one registration, or every handler of `event` when `id` is `None`.
    pub fn off(&self, event: &str, id: Option<HandlerId>) {
        let mut handlers = lock(&self.shared.handlers);
        match id {
            None => {
                handlers.remove(event);
            }
            Some(id) => {
                if let Some(list) = handlers.get_mut(event) {
                    list.retain(|(handler_id, _)| *handler_id != id);
                    if list.is_empty() {
                        handlers.remove(event);
                    }
                }
            }
        }
    }

    pub fn handler_count(&self, event: &str) -> usize {
        lock(&self.shared.handlers)
            .get(event)
            .map(Vec::len)
            .unwrap_or(0)
    }

    pub fn set_onerror(&self, hook: ErrorHook) {
        *lock(&self.shared.onerror) = Some(hook);
    }

    /// Stop the reader and hand the inbox back to the endpoint. Idempotent.
    pub async fn destroy(&self) {
        let previous = std::mem::replace(&mut *lock(&self.shared.reader), Reader::Destroyed);
        if let Reader::Running { shutdown, task } = previous {
            let _ = shutdown.send(());
            if let Err(e) = task.await {
                tracing::warn!("[EventChannel] reader task ended abnormally: {}", e);
            }
        }
    }
}

impl Shared {
    fn dispatch(&self, msg: NativeMessage) {
        let data = match &self.receive_transform {
            Some(transform) => transform(&msg),
            None => msg.data,
        };

        let Some(event) = data.get("event").and_then(Value::as_str) else {
            tracing::debug!("[EventChannel] ignoring message without an event name");
            return;
        };
        let args = match data.get("args") {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Array(args)) => args.clone(),
            Some(_) => {
                tracing::debug!("[EventChannel] ignoring {}: args is not an array", event);
                return;
            }
        };

        // Snapshot so handlers may call on/off without deadlocking.
        let handlers: Vec<Handler> = lock(&self.handlers)
            .get(event)
            .map(|list| list.iter().map(|(_, h)| h.clone()).collect())
            .unwrap_or_default();

        if handlers.is_empty() {
            let hook = lock(&self.onerror).clone();
            match hook {
                Some(hook) => hook(UnroutableMessage {
                    code: METHOD_NOT_FOUND,
                    message: METHOD_NOT_FOUND_MESSAGE.to_string(),
                    data,
                }),
                None => tracing::debug!("[EventChannel] no handler for {}", event),
            }
            return;
        }

        for handler in handlers {
            handler(args.clone());
        }
    }
}
