//! Client-side database handle
//!
//! A [`DatabaseHandle`] is a thin proxy: it holds the database name and an
//! open flag, and forwards every operation to its [`Backend`]. Nothing is
//! cached locally, so every read reflects backend truth.
//!
//! Lifecycle: `Unopened → Open → Closed`. Data operations are only valid
//! while `Open`; anything else fails with `Error::InvalidState` without
//! reaching the backend.

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, info, warn};

use crate::backend::Backend;
use crate::error::{Error, Result};
use crate::logging::prefix::DB;
use crate::migration::{AppliedMigration, Migration};
use crate::value::{Params, Row};

/// Lifecycle state of a handle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandleState {
    Unopened,
    Open,
    Closed,
}

/// Named reference to one open database on a backend
pub struct DatabaseHandle {
    name: String,
    backend: Arc<dyn Backend>,
    state: RwLock<HandleState>,
}

impl DatabaseHandle {
    /// Create an unopened handle for `name`.
    ///
    /// Every operation on it fails with `InvalidState` until it is replaced
    /// by one returned from [`open_in_memory`](Self::open_in_memory) or
    /// [`open_in_path`](Self::open_in_path).
    pub fn new(backend: Arc<dyn Backend>, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            backend,
            state: RwLock::new(HandleState::Unopened),
        }
    }

    /// Open an in-memory database labelled `name`
    pub async fn open_in_memory(backend: Arc<dyn Backend>, name: &str) -> Result<Self> {
        if name.is_empty() {
            return Err(Error::invalid_argument("database name must not be empty"));
        }

        backend.open_in_memory(name).await?;
        info!("{} opened in-memory database '{}'", DB, name);

        Ok(Self::opened(backend, name.to_string()))
    }

    /// Open the database file at `path`, creating it if absent.
    ///
    /// The path string is the handle's name.
    pub async fn open_in_path(backend: Arc<dyn Backend>, path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let name = path.to_str().ok_or_else(|| {
            Error::invalid_argument(format!("path {} is not valid UTF-8", path.display()))
        })?;
        if name.is_empty() {
            return Err(Error::invalid_argument("database path must not be empty"));
        }

        backend.open_in_path(name).await?;
        info!("{} opened database file '{}'", DB, name);

        Ok(Self::opened(backend, name.to_string()))
    }

    fn opened(backend: Arc<dyn Backend>, name: String) -> Self {
        Self {
            name,
            backend,
            state: RwLock::new(HandleState::Open),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> HandleState {
        *self.state.read()
    }

    pub fn is_open(&self) -> bool {
        self.state() == HandleState::Open
    }

    fn ensure_open(&self, operation: &str) -> Result<()> {
        match self.state() {
            HandleState::Open => Ok(()),
            state => {
                warn!(
                    "{} rejected {} on '{}' in state {:?}",
                    DB, operation, self.name, state
                );
                Err(Error::invalid_state(&self.name, operation))
            }
        }
    }

    /// Apply migrations in order.
    ///
    /// Not atomic unless the backend is configured that way: migrations
    /// before the failing one stay applied.
    pub async fn migration(&self, migrations: &[Migration]) -> Result<()> {
        self.ensure_open("migration")?;
        debug!("{} '{}' migration ({} entries)", DB, self.name, migrations.len());
        self.backend.migration(&self.name, migrations).await
    }

    /// Ledger entries in the order they were applied
    pub async fn applied_migrations(&self) -> Result<Vec<AppliedMigration>> {
        self.ensure_open("applied_migrations")?;
        self.backend.applied_migrations(&self.name).await
    }

    pub async fn update(&self, sql: &str, params: &Params) -> Result<()> {
        self.ensure_open("update")?;
        debug!("{} '{}' update: {}", DB, self.name, sql);
        self.backend.update(&self.name, sql, params).await
    }

    pub async fn select(&self, sql: &str, params: &Params) -> Result<Vec<Row>> {
        self.ensure_open("select")?;
        debug!("{} '{}' select: {}", DB, self.name, sql);
        self.backend.select(&self.name, sql, params).await
    }

    /// Run a multi-statement script. Statements after a failure do not run.
    pub async fn batch(&self, sql: &str) -> Result<()> {
        self.ensure_open("batch")?;
        debug!("{} '{}' batch ({} bytes)", DB, self.name, sql.len());
        self.backend.batch(&self.name, sql).await
    }

    /// Release the backend connection.
    ///
    /// A second close on the same handle fails with `InvalidState`. If the
    /// backend has already dropped the connection (closed through another
    /// handle object), the backend's `BackendUnavailable` is returned and
    /// the handle stays open.
    pub async fn close(&self) -> Result<()> {
        self.ensure_open("close")?;
        self.backend.close(&self.name).await?;
        *self.state.write() = HandleState::Closed;
        info!("{} closed database '{}'", DB, self.name);
        Ok(())
    }
}

impl fmt::Debug for DatabaseHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseHandle")
            .field("name", &self.name)
            .field("state", &self.state())
            .finish()
    }
}
