//! Symmetric request/ack RPC over an [`EventChannel`].
//!
//! Either side registers methods and either side invokes the other's.
//! A call is a `syn:<method>` event carrying a JSON-RPC request; the answer
//! is an `ack:<method>` event carrying the response with the same `id`.
//! Every outstanding invoke owns one ack listener and one oneshot sender,
//! both removed on ack, timeout or destroy.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::{oneshot, watch, OnceCell};

use super::error::RpcError;
use super::types::*;
use crate::channel::{EventChannel, HandlerId, UnroutableMessage};

pub type MethodFuture = Pin<Box<dyn Future<Output = Result<Value, RpcError>> + Send>>;
pub type MethodHandler = Arc<dyn Fn(Vec<Value>) -> MethodFuture + Send + Sync>;

/// Wrap an async closure over positional params as a [`MethodHandler`].
pub fn method_handler<F, Fut>(f: F) -> MethodHandler
where
    F: Fn(Vec<Value>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Value, RpcError>> + Send + 'static,
{
    Arc::new(move |params| Box::pin(f(params)))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Unconnected,
    Connecting,
    Connected,
    Destroyed,
}

#[derive(Default)]
pub struct RpcOptions {
    /// Default for invokes without their own timeout.
    pub timeout: Option<Duration>,
    /// Default for `connect()`. Falls back to `timeout` when unset.
    pub connect_timeout: Option<Duration>,
    /// Methods registered before the channel starts.
    pub methods: Vec<(String, MethodHandler)>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct InvokeOptions {
    /// Fire-and-forget: no id, no ack, resolves immediately with `null`.
    pub notify: bool,
    /// Overrides the engine default. `None` or zero falls back to it.
    pub timeout: Option<Duration>,
}

impl InvokeOptions {
    pub fn notify() -> Self {
        Self {
            notify: true,
            timeout: None,
        }
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            notify: false,
            timeout: Some(timeout),
        }
    }
}

struct PendingCall {
    tx: oneshot::Sender<Result<Value, RpcError>>,
    ack_event: String,
    listener: HandlerId,
}

struct EngineInner {
    channel: EventChannel,
    timeout: Option<Duration>,
    connect_timeout: Option<Duration>,
    methods: Mutex<HashMap<String, HandlerId>>,
    pending: Mutex<HashMap<String, PendingCall>>,
    state: watch::Sender<ConnectionState>,
    connect: OnceCell<Result<(), RpcError>>,
}

/// Cheap to clone; clones drive the same engine.
#[derive(Clone)]
pub struct RpcEngine {
    inner: Arc<EngineInner>,
}

impl std::fmt::Debug for RpcEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RpcEngine")
            .field("state", &self.state())
            .field("pending", &self.pending_count())
            .finish()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn non_zero(timeout: Option<Duration>) -> Option<Duration> {
    timeout.filter(|d| !d.is_zero())
}

impl RpcEngine {
    /// Register the initial methods, wire the handshake, start the channel
    /// and begin connecting. Must run inside a tokio runtime.
    pub fn new(channel: EventChannel, options: RpcOptions) -> Result<Self, RpcError> {
        let (state, _) = watch::channel(ConnectionState::Unconnected);
        let engine = Self {
            inner: Arc::new(EngineInner {
                channel,
                timeout: non_zero(options.timeout),
                connect_timeout: non_zero(options.connect_timeout).or(non_zero(options.timeout)),
                methods: Mutex::new(HashMap::new()),
                pending: Mutex::new(HashMap::new()),
                state,
                connect: OnceCell::new(),
            }),
        };

        for (name, handler) in options.methods {
            engine.register_method(&name, handler)?;
        }

        let weak = Arc::downgrade(&engine.inner);
        engine
            .inner
            .channel
            .set_onerror(Arc::new(move |err: UnroutableMessage| {
                if let Some(inner) = weak.upgrade() {
                    inner.reply_unroutable(err);
                }
            }));

        engine.install_connect_listeners();
        engine
            .inner
            .channel
            .start()
            .map_err(|e| RpcError::Transport(e.to_string()))?;

        engine.inner.state.send_replace(ConnectionState::Connecting);
        let eager = engine.clone();
        tokio::spawn(async move {
            if let Err(e) = eager.connect().await {
                tracing::warn!("[RpcEngine] connect failed: {}", e);
            }
        });

        Ok(engine)
    }

    pub fn state(&self) -> ConnectionState {
        *self.inner.state.borrow()
    }

    /// Wait for the handshake with the engine's connect timeout.
    pub async fn connect(&self) -> Result<(), RpcError> {
        self.connect_with_timeout(0).await
    }

    /// Wait for the handshake. The outcome is memoised: every caller,
    /// concurrent or later, sees the result of the first attempt. `0` uses
    /// the engine's connect timeout.
    pub async fn connect_with_timeout(&self, timeout_ms: u64) -> Result<(), RpcError> {
        let timeout = non_zero(Some(Duration::from_millis(timeout_ms))).or(self.inner.connect_timeout);
        let inner = self.inner.clone();
        self.inner
            .connect
            .get_or_init(|| async move { inner.run_connect(timeout).await })
            .await
            .clone()
    }

    /// Fails with [`RpcError::AlreadyRegistered`] instead of overwriting.
    pub fn register_method(&self, name: &str, handler: MethodHandler) -> Result<(), RpcError> {
        let mut methods = lock(&self.inner.methods);
        if methods.contains_key(name) {
            return Err(RpcError::AlreadyRegistered(name.to_string()));
        }

        let weak = Arc::downgrade(&self.inner);
        let method = name.to_string();
        let listener = self.inner.channel.on(
            &syn_event(name),
            Arc::new(move |args: Vec<Value>| {
                if let Some(inner) = weak.upgrade() {
                    inner.handle_syn(&method, &handler, args);
                }
            }),
        );
        methods.insert(name.to_string(), listener);
        Ok(())
    }

    /// Register a handler whose positional params deserialize into `P`
    /// (typically a tuple). A shape mismatch answers with INVALID_PARAMS.
    pub fn register_typed<P, R, F, Fut>(&self, name: &str, handler: F) -> Result<(), RpcError>
    where
        P: DeserializeOwned + Send + 'static,
        R: Serialize + Send + 'static,
        F: Fn(P) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<R, RpcError>> + Send + 'static,
    {
        let handler = Arc::new(handler);
        self.register_method(
            name,
            method_handler(move |params: Vec<Value>| {
                let handler = handler.clone();
                async move {
                    let parsed: P = serde_json::from_value(Value::Array(params))
                        .map_err(|e| RpcError::InvalidParams(e.to_string()))?;
                    let out = handler(parsed).await?;
                    serde_json::to_value(out).map_err(|e| RpcError::Application(e.to_string()))
                }
            }),
        )
    }

    /// Returns whether a method was registered under `name`.
    pub fn remove_method(&self, name: &str) -> bool {
        let removed = lock(&self.inner.methods).remove(name).is_some();
        if removed {
            self.inner.channel.off(&syn_event(name), None);
        }
        removed
    }

    pub fn has_method(&self, name: &str) -> bool {
        lock(&self.inner.methods).contains_key(name)
    }

    pub fn method_names(&self) -> Vec<String> {
        let mut names: Vec<String> = lock(&self.inner.methods).keys().cloned().collect();
        names.sort();
        names
    }

    pub fn pending_count(&self) -> usize {
        lock(&self.inner.pending).len()
    }

    /// Whether both handles drive the same engine.
    pub fn same_engine(&self, other: &RpcEngine) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Call `method` on the peer.
    pub async fn invoke(
        &self,
        method: &str,
        params: Vec<Value>,
        options: InvokeOptions,
    ) -> Result<Value, RpcError> {
        if self.state() == ConnectionState::Destroyed {
            return Err(RpcError::Destroyed);
        }
        let inner = &self.inner;

        if options.notify {
            let request = JsonRpcRequest::notification(method, params);
            inner.emit(&syn_event(method), &request)?;
            tracing::debug!("[RpcEngine] notify {}", method);
            return Ok(Value::Null);
        }

        let id = uuid::Uuid::new_v4().to_string();
        let ack = ack_event(method);
        let (tx, rx) = oneshot::channel();

        let weak: Weak<EngineInner> = Arc::downgrade(inner);
        let call_id = id.clone();
        let listener = inner.channel.on(
            &ack,
            Arc::new(move |args: Vec<Value>| {
                let Some(inner) = weak.upgrade() else { return };
                let Some(response) = args
                    .into_iter()
                    .next()
                    .and_then(|v| serde_json::from_value::<JsonRpcResponse>(v).ok())
                else {
                    return;
                };
                if response.id.as_ref().and_then(Value::as_str) == Some(call_id.as_str()) {
                    inner.settle(&call_id, response.into_result());
                }
            }),
        );
        lock(&inner.pending).insert(
            id.clone(),
            PendingCall {
                tx,
                ack_event: ack,
                listener,
            },
        );

        // destroy() flips the state before draining `pending`; an entry
        // inserted after the drain must be rejected here.
        if self.state() == ConnectionState::Destroyed {
            inner.discard(&id);
            return Err(RpcError::Destroyed);
        }

        let request = JsonRpcRequest::call(id.clone(), method, params);
        if let Err(e) = inner.emit(&syn_event(method), &request) {
            inner.discard(&id);
            return Err(e);
        }
        tracing::debug!("[RpcEngine] invoke {} (id={})", method, id);

        let outcome = match non_zero(options.timeout).or(inner.timeout) {
            Some(timeout) => match tokio::time::timeout(timeout, rx).await {
                Ok(outcome) => outcome,
                Err(_) => {
                    inner.discard(&id);
                    tracing::warn!(
                        "[RpcEngine] {} timed out after {}ms (id={})",
                        method,
                        timeout.as_millis(),
                        id
                    );
                    return Err(RpcError::ConnectTimeout {
                        timeout_ms: timeout.as_millis() as u64,
                    });
                }
            },
            None => rx.await,
        };

        match outcome {
            Ok(result) => {
                tracing::debug!("[RpcEngine] {} settled (id={}, ok={})", method, id, result.is_ok());
                result
            }
            Err(_) => Err(RpcError::Destroyed),
        }
    }

    /// Tear down permanently: reject outstanding invokes, detach method and
    /// handshake listeners, destroy the channel. Idempotent.
    pub async fn destroy(&self) {
        let previous = self.inner.state.send_replace(ConnectionState::Destroyed);
        if previous == ConnectionState::Destroyed {
            return;
        }
        let inner = &self.inner;

        let methods: Vec<String> = lock(&inner.methods).drain().map(|(name, _)| name).collect();
        for method in &methods {
            inner.channel.off(&syn_event(method), None);
        }
        inner.channel.off(&syn_event(CONNECT_EVENT), None);
        inner.channel.off(&ack_event(CONNECT_EVENT), None);

        let pending: Vec<PendingCall> = lock(&inner.pending).drain().map(|(_, call)| call).collect();
        let rejected = pending.len();
        for call in pending {
            inner.channel.off(&call.ack_event, Some(call.listener));
            let _ = call.tx.send(Err(RpcError::Destroyed));
        }

        inner.channel.destroy().await;
        tracing::info!(
            "[RpcEngine] destroyed ({} methods detached, {} pending calls rejected)",
            methods.len(),
            rejected
        );
    }

    fn install_connect_listeners(&self) {
        let weak = Arc::downgrade(&self.inner);
        self.inner.channel.on(
            &ack_event(CONNECT_EVENT),
            Arc::new(move |_| {
                if let Some(inner) = weak.upgrade() {
                    inner.mark_connected();
                }
            }),
        );

        let weak = Arc::downgrade(&self.inner);
        self.inner.channel.on(
            &syn_event(CONNECT_EVENT),
            Arc::new(move |_| {
                if let Some(inner) = weak.upgrade() {
                    if let Err(e) = inner.channel.emit(&ack_event(CONNECT_EVENT), Vec::new()) {
                        tracing::warn!("[RpcEngine] failed to ack handshake: {}", e);
                    }
                    inner.mark_connected();
                }
            }),
        );
    }
}

impl EngineInner {
    fn emit<T: Serialize>(&self, event: &str, record: &T) -> Result<(), RpcError> {
        let value =
            serde_json::to_value(record).map_err(|e| RpcError::Transport(e.to_string()))?;
        self.channel
            .emit(event, vec![value])
            .map_err(|e| RpcError::Transport(e.to_string()))
    }

    async fn run_connect(&self, timeout: Option<Duration>) -> Result<(), RpcError> {
        self.channel
            .emit(&syn_event(CONNECT_EVENT), Vec::new())
            .map_err(|e| RpcError::Transport(e.to_string()))?;

        let wait = self.wait_connected();
        let result = match timeout {
            Some(timeout) => match tokio::time::timeout(timeout, wait).await {
                Ok(result) => result,
                Err(_) => Err(RpcError::ConnectTimeout {
                    timeout_ms: timeout.as_millis() as u64,
                }),
            },
            None => wait.await,
        };
        if result.is_ok() {
            tracing::info!("[RpcEngine] connected");
        }
        result
    }

    async fn wait_connected(&self) -> Result<(), RpcError> {
        let mut rx = self.state.subscribe();
        let reached = *rx
            .wait_for(|s| matches!(s, ConnectionState::Connected | ConnectionState::Destroyed))
            .await
            .map_err(|_| RpcError::Destroyed)?;
        match reached {
            ConnectionState::Connected => Ok(()),
            _ => Err(RpcError::Destroyed),
        }
    }

    fn mark_connected(&self) {
        self.state.send_if_modified(|state| match state {
            ConnectionState::Unconnected | ConnectionState::Connecting => {
                *state = ConnectionState::Connected;
                true
            }
            _ => false,
        });
    }

    fn handle_syn(&self, method: &str, handler: &MethodHandler, args: Vec<Value>) {
        let Some(request) = args
            .into_iter()
            .next()
            .and_then(|v| serde_json::from_value::<JsonRpcRequest>(v).ok())
        else {
            tracing::debug!("[RpcEngine] ignoring malformed call to {}", method);
            return;
        };

        let future = handler(request.params.clone());
        let method = method.to_string();

        if request.is_notification() {
            tokio::spawn(async move {
                if let Err(e) = future.await {
                    tracing::debug!("[RpcEngine] notification {} failed: {}", method, e);
                }
            });
            return;
        }

        let channel = self.channel.clone();
        let id = request.id;
        tokio::spawn(async move {
            let response = match future.await {
                Ok(result) => JsonRpcResponse::success(id, result),
                Err(e) => {
                    let mut error = e.to_error_object();
                    error.data = Value::Null;
                    JsonRpcResponse::failure(id, error)
                }
            };
            let sent = serde_json::to_value(&response)
                .map_err(|e| e.to_string())
                .and_then(|value| {
                    channel
                        .emit(&ack_event(&method), vec![value])
                        .map_err(|e| e.to_string())
                });
            if let Err(e) = sent {
                tracing::warn!("[RpcEngine] failed to ack {}: {}", method, e);
            }
        });
    }

    /// A `syn:` event nobody handles is answered with METHOD_NOT_FOUND so the
    /// caller does not hang. Anything else (late acks) is only logged.
    fn reply_unroutable(&self, err: UnroutableMessage) {
        let event = err.data["event"].as_str().unwrap_or_default().to_string();
        let Some(method) = event.strip_prefix(SYN_SIGN) else {
            tracing::debug!("[RpcEngine] dropping unroutable {}", event);
            return;
        };
        let Some(call) = err.data["args"].get(0).cloned() else {
            return;
        };
        let id = call.get("id").cloned().filter(|id| match id {
            Value::Null => false,
            Value::String(s) => !s.is_empty(),
            _ => true,
        });
        if id.is_none() {
            tracing::debug!("[RpcEngine] dropping notification for unknown method {}", method);
            return;
        }

        tracing::debug!("[RpcEngine] method not found: {}", method);
        let response = JsonRpcResponse::failure(
            id,
            JsonRpcError {
                code: err.code,
                message: err.message,
                data: call,
            },
        );
        if let Err(e) = self.emit(&ack_event(method), &response) {
            tracing::warn!("[RpcEngine] failed to report unknown method {}: {}", method, e);
        }
    }

    fn settle(&self, id: &str, result: Result<Value, RpcError>) {
        let call = lock(&self.pending).remove(id);
        if let Some(call) = call {
            self.channel.off(&call.ack_event, Some(call.listener));
            let _ = call.tx.send(result);
        }
    }

    fn discard(&self, id: &str) {
        let call = lock(&self.pending).remove(id);
        if let Some(call) = call {
            self.channel.off(&call.ack_event, Some(call.listener));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::{Endpoint, EventChannelOptions, MessagePort};
    use serde_json::json;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    fn channel(port: Arc<MessagePort>) -> EventChannel {
        EventChannel::new(EventChannelOptions::new(port))
    }

    /// Two connected engines; `right` serves `methods`.
    async fn pair(methods: Vec<(String, MethodHandler)>) -> (RpcEngine, RpcEngine) {
        let (a, b) = MessagePort::pair();
        let left = RpcEngine::new(
            channel(a),
            RpcOptions {
                timeout: Some(ms(2_000)),
                connect_timeout: None,
                methods: Vec::new(),
            },
        )
        .unwrap();
        let right = RpcEngine::new(
            channel(b),
            RpcOptions {
                timeout: Some(ms(2_000)),
                connect_timeout: None,
                methods,
            },
        )
        .unwrap();
        left.connect().await.unwrap();
        right.connect().await.unwrap();
        (left, right)
    }

    fn pong() -> (String, MethodHandler) {
        (
            "ping".to_string(),
            method_handler(|_| async { Ok(json!("pong")) }),
        )
    }

    #[tokio::test]
    async fn test_ping_pong() {
        let (left, right) = pair(vec![pong()]).await;
        assert_eq!(left.state(), ConnectionState::Connected);
        assert_eq!(right.state(), ConnectionState::Connected);

        let result = left
            .invoke("ping", vec![], InvokeOptions::default())
            .await
            .unwrap();
        assert_eq!(result, json!("pong"));
        assert_eq!(left.pending_count(), 0);
    }

    #[tokio::test]
    async fn test_both_sides_can_serve() {
        let (left, right) = pair(vec![pong()]).await;
        left.register_typed("add", |(a, b): (i64, i64)| async move { Ok(a + b) })
            .unwrap();

        let sum = right
            .invoke("add", vec![json!(2), json!(3)], InvokeOptions::default())
            .await
            .unwrap();
        assert_eq!(sum, json!(5));
    }

    #[tokio::test]
    async fn test_unknown_method_rejects_with_method_not_found() {
        let (left, _right) = pair(vec![]).await;
        let err = left
            .invoke("foo", vec![json!(1)], InvokeOptions::default())
            .await
            .unwrap_err();
        assert_eq!(err.code(), -32601);
        match err {
            RpcError::MethodNotFound { method, data } => {
                assert_eq!(method, "foo");
                assert_eq!(data["params"], json!([1]));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_handler_error_becomes_application_error() {
        let (left, right) = pair(vec![]).await;
        right
            .register_method(
                "fail",
                method_handler(|_| async { Err(RpcError::Application("disk on fire".into())) }),
            )
            .unwrap();
        right
            .register_method(
                "fail-silently",
                method_handler(|_| async { Err(RpcError::Application(String::new())) }),
            )
            .unwrap();

        match left.invoke("fail", vec![], InvokeOptions::default()).await {
            Err(RpcError::Remote { code, message, data }) => {
                assert_eq!(code, -32500);
                assert_eq!(message, "disk on fire");
                assert_eq!(data, Value::Null);
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
        match left.invoke("fail-silently", vec![], InvokeOptions::default()).await {
            Err(RpcError::Remote { message, .. }) => assert_eq!(message, "Application error"),
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_typed_params_mismatch_is_invalid_params() {
        let (left, right) = pair(vec![]).await;
        right
            .register_typed("len", |(s,): (String,)| async move { Ok(s.len()) })
            .unwrap();

        let ok = left
            .invoke("len", vec![json!("abcd")], InvokeOptions::default())
            .await
            .unwrap();
        assert_eq!(ok, json!(4));

        let err = left
            .invoke("len", vec![json!(12)], InvokeOptions::default())
            .await
            .unwrap_err();
        assert_eq!(err.code(), -32602);
    }

    #[tokio::test]
    async fn test_duplicate_registration_fails() {
        let (_, right) = pair(vec![pong()]).await;
        let err = right
            .register_method("ping", method_handler(|_| async { Ok(json!("other")) }))
            .unwrap_err();
        assert_eq!(err, RpcError::AlreadyRegistered("ping".into()));
    }

    #[tokio::test]
    async fn test_duplicate_initial_methods_fail_construction() {
        let (a, _b) = MessagePort::pair();
        let result = RpcEngine::new(
            channel(a),
            RpcOptions {
                timeout: None,
                connect_timeout: None,
                methods: vec![pong(), pong()],
            },
        );
        assert!(matches!(result, Err(RpcError::AlreadyRegistered(_))));
    }

    #[tokio::test]
    async fn test_remove_method_then_reregister() {
        let (left, right) = pair(vec![pong()]).await;
        assert!(right.remove_method("ping"));
        assert!(!right.remove_method("ping"));
        assert!(!right.has_method("ping"));

        let err = left
            .invoke("ping", vec![], InvokeOptions::default())
            .await
            .unwrap_err();
        assert_eq!(err.code(), -32601);

        right
            .register_method("ping", method_handler(|_| async { Ok(json!("pong again")) }))
            .unwrap();
        let result = left
            .invoke("ping", vec![], InvokeOptions::default())
            .await
            .unwrap();
        assert_eq!(result, json!("pong again"));
    }

    #[tokio::test]
    async fn test_timeout_carries_value_and_late_ack_is_ignored() {
        let (left, right) = pair(vec![]).await;
        right
            .register_method(
                "slow",
                method_handler(|_| async {
                    tokio::time::sleep(Duration::from_millis(200)).await;
                    Ok(json!("late"))
                }),
            )
            .unwrap();

        let err = left
            .invoke("slow", vec![], InvokeOptions::with_timeout(ms(50)))
            .await
            .unwrap_err();
        assert_eq!(err, RpcError::ConnectTimeout { timeout_ms: 50 });
        assert_eq!(err.to_error_object().data, json!({ "timeout": 50 }));
        assert_eq!(left.pending_count(), 0);

        // Let the late ack arrive; nothing is listening for it any more.
        tokio::time::sleep(Duration::from_millis(300)).await;
        assert_eq!(left.pending_count(), 0);

        // The engine still works afterwards.
        right
            .register_method("fast", method_handler(|_| async { Ok(json!(1)) }))
            .unwrap();
        assert_eq!(
            left.invoke("fast", vec![], InvokeOptions::default())
                .await
                .unwrap(),
            json!(1)
        );
    }

    #[tokio::test]
    async fn test_notify_resolves_immediately_without_listener() {
        let (left, right) = pair(vec![]).await;
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        right
            .register_method(
                "log",
                method_handler(move |params| {
                    let tx = tx.clone();
                    async move {
                        let _ = tx.send(params);
                        Ok(Value::Null)
                    }
                }),
            )
            .unwrap();

        let result = left
            .invoke("log", vec![json!("line")], InvokeOptions::notify())
            .await
            .unwrap();
        assert_eq!(result, Value::Null);
        assert_eq!(left.pending_count(), 0);
        assert_eq!(left.inner.channel.handler_count(&ack_event("log")), 0);

        let params = tokio::time::timeout(ms(1_000), rx.recv()).await.unwrap().unwrap();
        assert_eq!(params, vec![json!("line")]);

        // Unknown methods are fine too: nothing waits for an answer.
        left.invoke("nobody", vec![], InvokeOptions::notify())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_acks_with_unknown_ids_are_ignored() {
        let (a, b) = MessagePort::pair();
        let left = RpcEngine::new(channel(a), RpcOptions::default()).unwrap();
        let mut inbox = b.take_inbox().unwrap();

        let caller = left.clone();
        let call = tokio::spawn(async move {
            caller
                .invoke("echo", vec![json!(7)], InvokeOptions::with_timeout(ms(2_000)))
                .await
        });

        // Drain until the echo call shows up (the handshake syn comes first).
        let request = loop {
            let msg = inbox.recv().await.unwrap();
            if msg.data["event"] == "syn:echo" {
                break serde_json::from_value::<JsonRpcRequest>(msg.data["args"][0].clone())
                    .unwrap();
            }
        };

        let forged = JsonRpcResponse::success(Some(json!("not-the-id")), json!("forged"));
        b.post_message(
            json!({ "event": "ack:echo", "args": [forged] }),
            vec![],
        )
        .unwrap();
        tokio::time::sleep(ms(50)).await;
        assert_eq!(left.pending_count(), 1);

        let genuine = JsonRpcResponse::success(request.id.clone(), json!(7));
        b.post_message(
            json!({ "event": "ack:echo", "args": [genuine] }),
            vec![],
        )
        .unwrap();
        assert_eq!(call.await.unwrap().unwrap(), json!(7));
        assert_eq!(left.pending_count(), 0);
    }

    #[tokio::test]
    async fn test_concurrent_calls_resolve_independently() {
        let (left, right) = pair(vec![]).await;
        right
            .register_typed("delay", |(ms_, tag): (u64, String)| async move {
                tokio::time::sleep(Duration::from_millis(ms_)).await;
                Ok(tag)
            })
            .unwrap();

        let slow = left.invoke("delay", vec![json!(150), json!("slow")], InvokeOptions::default());
        let fast = left.invoke("delay", vec![json!(10), json!("fast")], InvokeOptions::default());
        let (slow, fast) = tokio::join!(slow, fast);
        assert_eq!(slow.unwrap(), json!("slow"));
        assert_eq!(fast.unwrap(), json!("fast"));
    }

    #[tokio::test]
    async fn test_connect_timeout_without_peer() {
        let (a, _b) = MessagePort::pair();
        let engine = RpcEngine::new(
            channel(a),
            RpcOptions {
                timeout: Some(ms(100)),
                connect_timeout: None,
                methods: Vec::new(),
            },
        )
        .unwrap();

        let started = tokio::time::Instant::now();
        let err = engine.connect().await.unwrap_err();
        assert!(started.elapsed() < Duration::from_secs(2));
        assert_eq!(err.code(), -32300);
        assert_eq!(err.to_error_object().data, json!({ "timeout": 100 }));

        // Memoised: a later caller sees the same outcome, even with a new timeout.
        assert_eq!(engine.connect_with_timeout(5_000).await.unwrap_err(), err);
        assert_eq!(engine.state(), ConnectionState::Connecting);
    }

    #[tokio::test]
    async fn test_connect_timeout_does_not_bound_invokes() {
        let (a, b) = MessagePort::pair();
        let left = RpcEngine::new(
            channel(a),
            RpcOptions {
                timeout: None,
                connect_timeout: Some(ms(50)),
                methods: Vec::new(),
            },
        )
        .unwrap();
        let right = RpcEngine::new(
            channel(b),
            RpcOptions {
                timeout: None,
                connect_timeout: None,
                methods: vec![(
                    "slow".to_string(),
                    method_handler(|_| async {
                        tokio::time::sleep(Duration::from_millis(300)).await;
                        Ok(json!("done"))
                    }),
                )],
            },
        )
        .unwrap();
        left.connect().await.unwrap();
        right.connect().await.unwrap();

        let result = left
            .invoke("slow", vec![], InvokeOptions::default())
            .await
            .unwrap();
        assert_eq!(result, json!("done"));
    }

    #[tokio::test]
    async fn test_destroy_rejects_pending_and_later_calls() {
        let (left, right) = pair(vec![]).await;
        right
            .register_method(
                "forever",
                method_handler(|_| async {
                    std::future::pending::<()>().await;
                    Ok(Value::Null)
                }),
            )
            .unwrap();

        let caller = left.clone();
        let call = tokio::spawn(async move {
            caller
                .invoke("forever", vec![], InvokeOptions::with_timeout(ms(10_000)))
                .await
        });
        while left.pending_count() == 0 {
            tokio::time::sleep(ms(5)).await;
        }

        left.destroy().await;
        assert_eq!(call.await.unwrap().unwrap_err(), RpcError::Destroyed);
        assert_eq!(left.state(), ConnectionState::Destroyed);
        assert_eq!(left.pending_count(), 0);
        assert!(left.method_names().is_empty());
        assert_eq!(
            left.invoke("forever", vec![], InvokeOptions::default())
                .await
                .unwrap_err(),
            RpcError::Destroyed
        );

        // Second destroy is a no-op.
        left.destroy().await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_invokes_racing_destroy_never_hang() {
        let (a, _b) = MessagePort::pair();
        let engine = RpcEngine::new(channel(a), RpcOptions::default()).unwrap();

        let calls: Vec<_> = (0..64)
            .map(|_| {
                let caller = engine.clone();
                tokio::spawn(async move {
                    caller.invoke("silent", vec![], InvokeOptions::default()).await
                })
            })
            .collect();
        tokio::task::yield_now().await;
        engine.destroy().await;

        for call in calls {
            let outcome = tokio::time::timeout(ms(2_000), call)
                .await
                .expect("invoke left pending after destroy")
                .unwrap();
            assert_eq!(outcome.unwrap_err(), RpcError::Destroyed);
        }
        assert_eq!(engine.pending_count(), 0);
    }

    #[test]
    fn test_debug_shows_state() {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let (a, _b) = MessagePort::pair();
            let engine = RpcEngine::new(channel(a), RpcOptions::default()).unwrap();
            engine.destroy().await;
            assert_eq!(format!("{:?}", engine), "RpcEngine { state: Destroyed, pending: 0 }");
        });
    }

    #[tokio::test]
    async fn test_destroy_unblocks_connect_without_timeout() {
        let (a, _b) = MessagePort::pair();
        let engine = RpcEngine::new(channel(a), RpcOptions::default()).unwrap();
        let waiter = engine.clone();
        let connect = tokio::spawn(async move { waiter.connect().await });
        tokio::time::sleep(ms(20)).await;

        engine.destroy().await;
        assert_eq!(connect.await.unwrap().unwrap_err(), RpcError::Destroyed);
    }
}
