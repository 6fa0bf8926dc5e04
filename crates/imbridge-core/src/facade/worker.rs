//! In-process worker: a port pair with the store hosted on the far side.

use std::sync::Arc;
use std::time::Duration;

use crate::channel::{EventChannel, EventChannelOptions, MessagePort};
use crate::db::Database;
use crate::host::StoreHost;
use crate::rpc::{RpcEngine, RpcError, RpcOptions};

use super::connection::{WorkerFactory, WorkerHandle};

/// Spawns a [`StoreHost`] over `db` for every new worker. The database
/// handle is shared, so a reset worker sees the same rows.
pub struct LocalWorker {
    db: Database,
    connect_timeout: Option<Duration>,
}

impl LocalWorker {
    pub fn new(db: Database, connect_timeout: Option<Duration>) -> Self {
        Self {
            db,
            connect_timeout,
        }
    }

    /// Host the store on `worker` and open the main side on `main_port`.
    /// On failure `worker` is destroyed.
    fn attach(&self, worker: RpcEngine, main_port: Arc<MessagePort>) -> Result<WorkerHandle, RpcError> {
        // No default invoke timeout: `connect_timeout` bounds the handshake only.
        let main = StoreHost::register(&worker, self.db.clone()).and_then(|_| {
            RpcEngine::new(
                EventChannel::new(EventChannelOptions::new(main_port)),
                RpcOptions {
                    timeout: None,
                    connect_timeout: self.connect_timeout,
                    methods: Vec::new(),
                },
            )
        });
        let main = match main {
            Ok(main) => main,
            Err(e) => {
                tracing::error!("[LocalWorker] worker failed to start: {}", e);
                tokio::spawn(async move { worker.destroy().await });
                return Err(e);
            }
        };
        tracing::debug!("[LocalWorker] worker started");

        Ok(WorkerHandle::new(main).on_terminate(move || {
            Box::pin(async move {
                worker.destroy().await;
                tracing::debug!("[LocalWorker] worker stopped");
            })
        }))
    }
}

impl WorkerFactory for LocalWorker {
    fn spawn(&self) -> Result<WorkerHandle, RpcError> {
        let (main_port, worker_port) = MessagePort::pair();
        let worker = RpcEngine::new(
            EventChannel::new(EventChannelOptions::new(worker_port)),
            RpcOptions::default(),
        )?;
        self.attach(worker, main_port)
    }
}
