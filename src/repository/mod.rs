//! Persistence layer: connection pooling, schema migrations, and the
//! document/property/party persistor (C8).

pub mod batch_store;
pub mod diesel_pool;
pub mod document_store;
pub mod migrations;
pub mod models;
pub mod persistor;
pub mod util;

pub use batch_store::BatchStore;
pub use diesel_pool::{AsyncSqlitePool, DieselError};
pub use document_store::DocumentStore;
pub use persistor::Persistor;
