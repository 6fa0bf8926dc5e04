//! Main-side database API.
//!
//! Every exposed name resolves through the catalog to a remote method and
//! is invoked on the current worker. A call that times out is answered with
//! a synthesised `ErrorDBTimeout` response after the worker is reset; the
//! next call spawns a fresh one. Every other failure propagates.

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;

use crate::config::BridgeConfig;
use crate::db::Database;
use crate::response::DbResponse;
use crate::rpc::{InvokeOptions, RpcError};

use super::catalog;
use super::connection::{WorkerConnection, WorkerFactory};
use super::worker::LocalWorker;

enum Reply {
    Remote(Value),
    TimedOut(DbResponse),
}

fn lookup(name: &str) -> Result<&'static catalog::MethodDescriptor, RpcError> {
    catalog::lookup(name).ok_or_else(|| RpcError::MethodNotFound {
        method: name.to_string(),
        data: Value::Null,
    })
}

pub struct DatabaseApi {
    connection: WorkerConnection,
    invoke_timeout: Option<Duration>,
}

impl DatabaseApi {
    pub fn new(factory: Arc<dyn WorkerFactory>, config: &BridgeConfig) -> Self {
        Self {
            connection: WorkerConnection::new(factory),
            invoke_timeout: config.invoke_timeout(),
        }
    }

    /// A facade over an in-process worker hosting `db`.
    pub fn local(db: Database, config: &BridgeConfig) -> Self {
        Self::new(
            Arc::new(LocalWorker::new(db, config.connect_timeout())),
            config,
        )
    }

    pub fn connection(&self) -> &WorkerConnection {
        &self.connection
    }

    /// Invoke the catalog method `name`. Returns the response as a JSON
    /// string unless the method is marked raw. A synthesised timeout is
    /// always a string.
    pub async fn call(&self, name: &str, params: Vec<Value>) -> Result<Value, RpcError> {
        let descriptor = lookup(name)?;
        match self.invoke_with_recovery(descriptor.remote, params).await? {
            Reply::Remote(response) if descriptor.stringify => Ok(Value::String(response.to_string())),
            Reply::Remote(response) => Ok(response),
            Reply::TimedOut(response) => serde_json::to_string(&response)
                .map(Value::String)
                .map_err(|e| RpcError::Application(e.to_string())),
        }
    }

    /// Like [`call`](Self::call), decoded as a [`DbResponse`].
    pub async fn call_db(&self, name: &str, params: Vec<Value>) -> Result<DbResponse, RpcError> {
        let descriptor = lookup(name)?;
        match self.invoke_with_recovery(descriptor.remote, params).await? {
            Reply::Remote(response) => serde_json::from_value(response).map_err(|e| {
                RpcError::Application(format!("{} returned a malformed response: {}", name, e))
            }),
            Reply::TimedOut(response) => Ok(response),
        }
    }

    async fn invoke_with_recovery(&self, remote: &str, params: Vec<Value>) -> Result<Reply, RpcError> {
        let engine = self.connection.get_or_create().await?;
        tracing::debug!("[DatabaseApi] {} <- {:?}", remote, params);
        let options = InvokeOptions {
            notify: false,
            timeout: self.invoke_timeout,
        };
        match engine.invoke(remote, params, options).await {
            Ok(response) => {
                tracing::debug!("[DatabaseApi] {} -> {}", remote, response);
                Ok(Reply::Remote(response))
            }
            Err(e) if e.is_connect_timeout() => {
                tracing::warn!("[DatabaseApi] {} timed out, resetting worker", remote);
                self.connection.reset_engine(&engine).await;
                Ok(Reply::TimedOut(DbResponse::db_timeout()))
            }
            Err(e) => {
                tracing::error!("[DatabaseApi] {} failed: {}", remote, e);
                Err(e)
            }
        }
    }

    /// Terminate the worker. Later calls fail with [`RpcError::Destroyed`].
    pub async fn close(&self) {
        self.connection.destroy().await;
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::channel::{EventChannel, EventChannelOptions, MessagePort};
    use crate::facade::connection::{WorkerHandle, WorkerState};
    use crate::response::DatabaseErrorCode;
    use crate::rpc::{RpcEngine, RpcOptions};
    use serde_json::json;

    /// A worker that never answers anything.
    pub(crate) struct HungWorker;

    impl WorkerFactory for HungWorker {
        fn spawn(&self) -> Result<WorkerHandle, RpcError> {
            let (main_port, worker_port) = MessagePort::pair();
            let engine = RpcEngine::new(
                EventChannel::new(EventChannelOptions::new(main_port)),
                RpcOptions::default(),
            )?;
            // The far port stays open but unread until termination.
            Ok(WorkerHandle::new(engine).on_terminate(move || {
                Box::pin(async move {
                    drop(worker_port);
                })
            }))
        }
    }

    fn config(invoke_timeout_ms: u64) -> BridgeConfig {
        BridgeConfig {
            db_path: ":memory:".into(),
            connect_timeout_ms: 0,
            invoke_timeout_ms,
        }
    }

    pub(crate) fn local_api() -> DatabaseApi {
        DatabaseApi::local(Database::open_in_memory().unwrap(), &config(5_000))
    }

    #[tokio::test]
    async fn test_call_stringifies_response() {
        let api = local_api();
        let out = api
            .call("incrementGroupReadCursorVersion", vec![json!("c1")])
            .await
            .unwrap();
        let text = out.as_str().unwrap();
        assert_eq!(
            serde_json::from_str::<Value>(text).unwrap(),
            json!({ "data": 1, "errCode": 0, "errMsg": "" })
        );
    }

    #[tokio::test]
    async fn test_timeout_resets_and_synthesises_db_timeout() {
        let api = DatabaseApi::new(Arc::new(HungWorker), &config(50));

        let resp = api
            .call_db("getMinReadSeqFromCursors", vec![json!("c1")])
            .await
            .unwrap();
        assert_eq!(resp.error_code(), Some(DatabaseErrorCode::ErrorDBTimeout));
        assert_eq!(resp.err_msg, "database maybe damaged");
        assert_eq!(resp.data, json!(""));
        assert_eq!(api.connection().state().await, WorkerState::Idle);
        assert_eq!(api.connection().spawn_count(), 1);

        // The next call starts a new worker.
        let _ = api.call_db("getMinReadSeqFromCursors", vec![json!("c1")]).await;
        assert_eq!(api.connection().spawn_count(), 2);
    }

    #[tokio::test]
    async fn test_raw_method_timeout_is_stringified() {
        let api = DatabaseApi::new(Arc::new(HungWorker), &config(50));
        let out = api.call("wasmRead", vec![json!("f1"), json!(0)]).await.unwrap();
        let resp: DbResponse = serde_json::from_str(out.as_str().unwrap()).unwrap();
        assert_eq!(resp.error_code(), Some(DatabaseErrorCode::ErrorDBTimeout));
        assert_eq!(api.connection().state().await, WorkerState::Idle);
    }

    #[tokio::test]
    async fn test_connect_timeout_does_not_bound_calls() {
        let db = Database::open_in_memory().unwrap();
        let config = BridgeConfig {
            db_path: ":memory:".into(),
            connect_timeout_ms: 50,
            invoke_timeout_ms: 0,
        };
        let api = DatabaseApi::local(db.clone(), &config);
        api.call_db("getMinReadSeqFromCursors", vec![json!("c1")]).await.unwrap();

        let (locked_tx, locked_rx) = tokio::sync::oneshot::channel();
        let busy = tokio::spawn(async move {
            db.with_conn_async(move |_| {
                let _ = locked_tx.send(());
                std::thread::sleep(Duration::from_millis(300));
                Ok(())
            })
            .await
        });
        locked_rx.await.unwrap();

        let resp = api
            .call_db("getMinReadSeqFromCursors", vec![json!("c1")])
            .await
            .unwrap();
        assert_eq!(resp.err_code, 0);
        assert_eq!(resp.data, json!(0));
        assert_eq!(api.connection().spawn_count(), 1);
        busy.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_unknown_remote_method_propagates() {
        let api = local_api();
        // In the catalog, but not hosted by the in-process worker.
        let err = api.call("getAllConversationListDB", vec![]).await.unwrap_err();
        assert_eq!(err.code(), -32601);
        assert_eq!(api.connection().state().await, WorkerState::Active);
    }

    #[tokio::test]
    async fn test_name_outside_catalog_is_rejected_locally() {
        let api = local_api();
        let err = api.call("noSuchMethod", vec![]).await.unwrap_err();
        assert!(matches!(err, RpcError::MethodNotFound { ref method, .. } if method == "noSuchMethod"));
        assert_eq!(api.connection().spawn_count(), 0);
    }

    #[tokio::test]
    async fn test_close_is_terminal() {
        let api = local_api();
        api.call_db("getMinReadSeqFromCursors", vec![json!("c1")]).await.unwrap();
        api.close().await;
        let err = api
            .call_db("getMinReadSeqFromCursors", vec![json!("c1")])
            .await
            .unwrap_err();
        assert_eq!(err, RpcError::Destroyed);
    }
}
