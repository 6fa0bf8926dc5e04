//! Main-side invoker facade: the method catalog, the owned worker
//! connection and the database API built on them.

pub mod catalog;
pub mod connection;
pub mod database_api;
pub mod envelope;
mod read_cursor_api;
pub mod worker;

pub use catalog::{lookup, MethodDescriptor, CATALOG};
pub use connection::{TerminateFuture, WorkerConnection, WorkerFactory, WorkerHandle, WorkerState};
pub use database_api::DatabaseApi;
pub use envelope::{event_name, SdkErrorResponse, SdkResponse};
pub use worker::LocalWorker;
