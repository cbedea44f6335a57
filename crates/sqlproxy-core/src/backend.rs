//! Backend trait definition

use async_trait::async_trait;

use crate::error::Result;
use crate::migration::{AppliedMigration, Migration};
use crate::value::{Params, Row};

/// Engine-side operations addressed by database name.
///
/// This trait is the typed form of the plugin command set. Implementations
/// exist for:
/// - SQLite via rusqlite (`sqlproxy-sqlite`)
/// - Any [`Transport`](crate::channel::Transport) via
///   [`ChannelBackend`](crate::channel::ChannelBackend)
///
/// Backends own all durable state. Operations on the same name may be
/// issued concurrently; ordering between them is the backend's concern.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Open an in-memory database under `name`.
    ///
    /// Returns `Error::AlreadyOpen` if a connection with that name exists.
    async fn open_in_memory(&self, name: &str) -> Result<()>;

    /// Open (creating if absent) the database file at `path`.
    ///
    /// The path string becomes the database name.
    async fn open_in_path(&self, path: &str) -> Result<()>;

    /// Apply `migrations` in order, recording each in the ledger.
    ///
    /// Stops at the first failure with `Error::Migration`. Whether earlier
    /// entries stay applied depends on the backend's atomicity setting.
    async fn migration(&self, name: &str, migrations: &[Migration]) -> Result<()>;

    /// List ledger entries in application order.
    async fn applied_migrations(&self, name: &str) -> Result<Vec<AppliedMigration>>;

    /// Execute one mutating statement.
    async fn update(&self, name: &str, sql: &str, params: &Params) -> Result<()>;

    /// Execute one reading statement and return its rows in engine order.
    async fn select(&self, name: &str, sql: &str, params: &Params) -> Result<Vec<Row>>;

    /// Execute a multi-statement script, stopping at the first failure.
    async fn batch(&self, name: &str, sql: &str) -> Result<()>;

    /// Release the connection held under `name`.
    ///
    /// Returns `Error::BackendUnavailable` if no such connection exists.
    async fn close(&self, name: &str) -> Result<()>;
}
