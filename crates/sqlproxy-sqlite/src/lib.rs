//! SQLite backend for sqlproxy database handles
//!
//! This crate implements the `sqlproxy_core::Backend` trait on top of
//! rusqlite, so handles can open in-memory or file-backed SQLite databases
//! by name.
//!
//! # Features
//!
//! - One connection per name, created on open and released on close
//! - Named parameter binding for update/select (`:name`, `@name`, `$name`)
//! - Batch scripts split on statement boundaries; failures name the statement
//! - Migration ledger with strict or incremental mode
//! - Optional all-or-nothing migrations and batches
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use sqlproxy_core::{Backend, DatabaseHandle, Migration, Params};
//! use sqlproxy_sqlite::SqliteBackend;
//!
//! # async fn run() -> sqlproxy_core::Result<()> {
//! let backend: Arc<dyn Backend> = Arc::new(SqliteBackend::new());
//! let db = DatabaseHandle::open_in_memory(backend, "t").await?;
//!
//! db.migration(&[Migration::new(
//!     "m1",
//!     "CREATE TABLE t(id INTEGER PRIMARY KEY, v TEXT)",
//! )])
//! .await?;
//! db.update("INSERT INTO t(v) VALUES (:v)", &Params::new().with(":v", "hello"))
//!     .await?;
//!
//! let rows = db.select("SELECT * FROM t", &Params::new()).await?;
//! assert_eq!(rows.len(), 1);
//!
//! db.close().await?;
//! # Ok(())
//! # }
//! ```
//!
//! # Atomicity
//!
//! By default neither `migration` nor `batch` is atomic: work done before
//! the failing entry stays applied. Set `atomic_migrations` /
//! `atomic_batch` in [`SqliteConfig`] to run them in a single transaction.
//! Scripts that manage their own transactions must not be combined with
//! those settings.

pub mod backend;
pub mod config;
mod convert;
pub mod error;
pub mod migrate;
mod query;
mod script;

// Re-export main types
pub use backend::SqliteBackend;
pub use config::{MigrationMode, SqliteConfig};
pub use error::{Result, SqliteError};
pub use migrate::hash_sql;
