//! Explicitly owned worker connection.
//!
//! `WorkerConnection` holds at most one live worker. It is created lazily by
//! `get_or_create`, dropped by `reset` (the next call spawns a fresh one) and
//! closed for good by `destroy`.

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::rpc::{RpcEngine, RpcError};

pub type TerminateFuture = Pin<Box<dyn Future<Output = ()> + Send>>;
type TerminateHook = Box<dyn FnOnce() -> TerminateFuture + Send>;

/// A spawned worker: the main-side engine plus whatever shuts the worker down.
pub struct WorkerHandle {
    rpc: RpcEngine,
    terminate: Option<TerminateHook>,
}

impl WorkerHandle {
    pub fn new(rpc: RpcEngine) -> Self {
        Self {
            rpc,
            terminate: None,
        }
    }

    /// Run `hook` after the engine is destroyed on termination.
    pub fn on_terminate<F>(mut self, hook: F) -> Self
    where
        F: FnOnce() -> TerminateFuture + Send + 'static,
    {
        self.terminate = Some(Box::new(hook));
        self
    }

    pub fn rpc(&self) -> &RpcEngine {
        &self.rpc
    }

    pub async fn terminate(mut self) {
        self.rpc.destroy().await;
        if let Some(hook) = self.terminate.take() {
            hook().await;
        }
    }
}

/// Spawns workers on demand.
pub trait WorkerFactory: Send + Sync {
    /// Start a worker and return a handle whose engine talks to it. Called
    /// from inside a tokio runtime.
    fn spawn(&self) -> Result<WorkerHandle, RpcError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    Idle,
    Active,
    Closed,
}

enum Slot {
    Idle,
    Active(WorkerHandle),
    Closed,
}

pub struct WorkerConnection {
    factory: Arc<dyn WorkerFactory>,
    slot: Mutex<Slot>,
    spawned: AtomicUsize,
}

impl WorkerConnection {
    pub fn new(factory: Arc<dyn WorkerFactory>) -> Self {
        Self {
            factory,
            slot: Mutex::new(Slot::Idle),
            spawned: AtomicUsize::new(0),
        }
    }

    pub async fn state(&self) -> WorkerState {
        match &*self.slot.lock().await {
            Slot::Idle => WorkerState::Idle,
            Slot::Active(_) => WorkerState::Active,
            Slot::Closed => WorkerState::Closed,
        }
    }

    /// How many workers have been spawned so far.
    pub fn spawn_count(&self) -> usize {
        self.spawned.load(Ordering::SeqCst)
    }

    /// The live worker's engine, spawning one when idle.
    pub async fn get_or_create(&self) -> Result<RpcEngine, RpcError> {
        let mut slot = self.slot.lock().await;
        match &*slot {
            Slot::Active(handle) => return Ok(handle.rpc().clone()),
            Slot::Closed => return Err(RpcError::Destroyed),
            Slot::Idle => {}
        }

        let handle = self.factory.spawn()?;
        let engine = handle.rpc().clone();
        *slot = Slot::Active(handle);
        let n = self.spawned.fetch_add(1, Ordering::SeqCst) + 1;
        tracing::info!("[WorkerConnection] worker spawned (#{})", n);
        Ok(engine)
    }

    /// Terminate the live worker, if any. The next call spawns a new one.
    pub async fn reset(&self) {
        let previous = {
            let mut slot = self.slot.lock().await;
            match std::mem::replace(&mut *slot, Slot::Idle) {
                Slot::Closed => {
                    *slot = Slot::Closed;
                    None
                }
                Slot::Active(handle) => Some(handle),
                Slot::Idle => None,
            }
        };
        if let Some(handle) = previous {
            tracing::warn!("[WorkerConnection] resetting worker");
            handle.terminate().await;
        }
    }

    /// Reset only if `engine` is still the live worker's engine, so a stale
    /// failure does not kill a worker spawned after it.
    pub async fn reset_engine(&self, engine: &RpcEngine) {
        let previous = {
            let mut slot = self.slot.lock().await;
            let is_current = matches!(&*slot, Slot::Active(handle) if handle.rpc().same_engine(engine));
            if !is_current {
                return;
            }
            match std::mem::replace(&mut *slot, Slot::Idle) {
                Slot::Active(handle) => Some(handle),
                _ => None,
            }
        };
        if let Some(handle) = previous {
            tracing::warn!("[WorkerConnection] resetting worker");
            handle.terminate().await;
        }
    }

    /// Terminate the worker and refuse to spawn another.
    pub async fn destroy(&self) {
        let previous = {
            let mut slot = self.slot.lock().await;
            std::mem::replace(&mut *slot, Slot::Closed)
        };
        if let Slot::Active(handle) = previous {
            handle.terminate().await;
        }
        tracing::info!("[WorkerConnection] destroyed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::{EventChannel, EventChannelOptions, MessagePort};
    use crate::rpc::{ConnectionState, RpcOptions};

    /// Engines whose peer never answers; counts terminations.
    struct SilentFactory {
        terminated: Arc<AtomicUsize>,
    }

    impl WorkerFactory for SilentFactory {
        fn spawn(&self) -> Result<WorkerHandle, RpcError> {
            let (port, _peer) = MessagePort::pair();
            let engine = RpcEngine::new(
                EventChannel::new(EventChannelOptions::new(port)),
                RpcOptions::default(),
            )?;
            let terminated = self.terminated.clone();
            Ok(WorkerHandle::new(engine).on_terminate(move || {
                Box::pin(async move {
                    terminated.fetch_add(1, Ordering::SeqCst);
                })
            }))
        }
    }

    fn connection() -> (WorkerConnection, Arc<AtomicUsize>) {
        let terminated = Arc::new(AtomicUsize::new(0));
        let factory = Arc::new(SilentFactory {
            terminated: terminated.clone(),
        });
        (WorkerConnection::new(factory), terminated)
    }

    #[tokio::test]
    async fn test_lazy_spawn_and_reuse() {
        let (conn, _) = connection();
        assert_eq!(conn.state().await, WorkerState::Idle);
        assert_eq!(conn.spawn_count(), 0);

        let first = conn.get_or_create().await.unwrap();
        let again = conn.get_or_create().await.unwrap();
        assert!(first.same_engine(&again));
        assert_eq!(conn.spawn_count(), 1);
        assert_eq!(conn.state().await, WorkerState::Active);
    }

    #[tokio::test]
    async fn test_reset_terminates_and_respawns() {
        let (conn, terminated) = connection();
        let first = conn.get_or_create().await.unwrap();

        conn.reset().await;
        assert_eq!(conn.state().await, WorkerState::Idle);
        assert_eq!(terminated.load(Ordering::SeqCst), 1);
        assert_eq!(first.state(), ConnectionState::Destroyed);

        let second = conn.get_or_create().await.unwrap();
        assert!(!first.same_engine(&second));
        assert_eq!(conn.spawn_count(), 2);
    }

    #[tokio::test]
    async fn test_stale_reset_keeps_new_worker() {
        let (conn, terminated) = connection();
        let stale = conn.get_or_create().await.unwrap();
        conn.reset().await;
        let fresh = conn.get_or_create().await.unwrap();

        conn.reset_engine(&stale).await;
        assert_eq!(conn.state().await, WorkerState::Active);
        assert_eq!(terminated.load(Ordering::SeqCst), 1);

        conn.reset_engine(&fresh).await;
        assert_eq!(conn.state().await, WorkerState::Idle);
        assert_eq!(terminated.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_destroy_is_terminal() {
        let (conn, terminated) = connection();
        conn.get_or_create().await.unwrap();
        conn.destroy().await;
        assert_eq!(terminated.load(Ordering::SeqCst), 1);
        assert_eq!(conn.state().await, WorkerState::Closed);
        assert_eq!(conn.get_or_create().await.unwrap_err(), RpcError::Destroyed);

        // Reset after destroy does not reopen.
        conn.reset().await;
        assert_eq!(conn.state().await, WorkerState::Closed);
    }
}
