//! SQLite backend implementing the `Backend` trait

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use rusqlite::{Connection, OpenFlags};
use sqlproxy_core::logging::prefix::DB;
use sqlproxy_core::{AppliedMigration, Backend, Error, Migration, Params, Result, Row};
use tracing::{debug, info, warn};

use crate::config::SqliteConfig;
use crate::{migrate, query};

/// Connection slot; `None` once closed
type SharedConnection = Arc<Mutex<Option<Connection>>>;

/// rusqlite-backed database engine, connections keyed by name.
///
/// Each connection sits behind its own mutex, so operations against one
/// name run one at a time while different names proceed in parallel.
/// Blocking SQLite calls run on tokio's blocking pool.
pub struct SqliteBackend {
    config: Arc<SqliteConfig>,
    connections: Mutex<HashMap<String, SharedConnection>>,
}

impl Default for SqliteBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl SqliteBackend {
    /// Create a backend with the default configuration
    pub fn new() -> Self {
        Self {
            config: Arc::new(SqliteConfig::default()),
            connections: Mutex::new(HashMap::new()),
        }
    }

    /// Create a backend with a custom configuration
    pub fn with_config(config: SqliteConfig) -> crate::error::Result<Self> {
        config.validate()?;
        Ok(Self {
            config: Arc::new(config),
            connections: Mutex::new(HashMap::new()),
        })
    }

    pub fn config(&self) -> &SqliteConfig {
        &self.config
    }

    /// Names of open connections, sorted
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.connections.lock().keys().cloned().collect();
        names.sort();
        names
    }

    pub fn is_open(&self, name: &str) -> bool {
        self.connections.lock().contains_key(name)
    }

    /// Close every open connection, returning the first error
    pub async fn close_all(&self) -> Result<()> {
        let mut first_error = None;
        for name in self.names() {
            if let Err(e) = self.close(&name).await {
                first_error.get_or_insert(e);
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn ensure_vacant(&self, name: &str) -> Result<()> {
        if self.is_open(name) {
            return Err(Error::already_open(name));
        }
        Ok(())
    }

    fn register(&self, name: &str, conn: Connection) -> Result<()> {
        let mut connections = self.connections.lock();
        if connections.contains_key(name) {
            // Lost a race with a concurrent open; the new connection is dropped
            return Err(Error::already_open(name));
        }
        connections.insert(name.to_string(), Arc::new(Mutex::new(Some(conn))));
        Ok(())
    }

    fn connection(&self, name: &str) -> Result<SharedConnection> {
        self.connections
            .lock()
            .get(name)
            .cloned()
            .ok_or_else(|| Error::unavailable(format!("no open database named '{}'", name)))
    }

    /// Run `f` on the named connection in the blocking pool
    async fn with_connection<T, F>(&self, name: &str, operation: &'static str, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&Connection, &SqliteConfig) -> Result<T> + Send + 'static,
    {
        let shared = self.connection(name)?;
        let config = Arc::clone(&self.config);
        let owned_name = name.to_string();

        let result = tokio::task::spawn_blocking(move || {
            let guard = shared.lock();
            match guard.as_ref() {
                Some(conn) => f(conn, &config),
                None => Err(Error::unavailable(format!(
                    "database '{}' was closed",
                    owned_name
                ))),
            }
        })
        .await
        .map_err(|e| Error::unavailable(format!("{} worker failed: {}", operation, e)))?;

        if let Err(e) = &result {
            warn!("{} {} on '{}' failed: {}", DB, operation, name, e);
        }
        result
    }

    async fn open_blocking<F>(&self, name: &str, open: F) -> Result<()>
    where
        F: FnOnce(&SqliteConfig) -> Result<Connection> + Send + 'static,
    {
        self.ensure_vacant(name)?;
        let config = Arc::clone(&self.config);
        let conn = tokio::task::spawn_blocking(move || open(&config))
            .await
            .map_err(|e| Error::unavailable(format!("open worker failed: {}", e)))??;
        self.register(name, conn)
    }
}

/// Apply per-connection settings
fn configure(conn: &Connection, config: &SqliteConfig) -> rusqlite::Result<()> {
    conn.pragma_update(None, "foreign_keys", config.foreign_keys)?;
    if let Some(ms) = config.busy_timeout_ms {
        conn.busy_timeout(Duration::from_millis(ms))?;
    }
    Ok(())
}

#[async_trait]
impl Backend for SqliteBackend {
    async fn open_in_memory(&self, name: &str) -> Result<()> {
        self.open_blocking(name, |config| {
            let conn = Connection::open_in_memory().map_err(Error::unavailable)?;
            configure(&conn, config).map_err(Error::unavailable)?;
            Ok(conn)
        })
        .await?;

        info!("{} opened in-memory connection '{}'", DB, name);
        Ok(())
    }

    async fn open_in_path(&self, path: &str) -> Result<()> {
        let owned = path.to_string();
        self.open_blocking(path, move |config| {
            let conn = Connection::open_with_flags(&owned, OpenFlags::default())
                .map_err(|e| Error::io(&owned, e))?;
            configure(&conn, config).map_err(|e| Error::io(&owned, e))?;
            Ok(conn)
        })
        .await?;

        info!("{} opened connection '{}'", DB, path);
        Ok(())
    }

    async fn migration(&self, name: &str, migrations: &[Migration]) -> Result<()> {
        let migrations = migrations.to_vec();
        debug!("{} '{}' running {} migration(s)", DB, name, migrations.len());
        self.with_connection(name, "migration", move |conn, config| {
            migrate::run(conn, config, &migrations)
        })
        .await
    }

    async fn applied_migrations(&self, name: &str) -> Result<Vec<AppliedMigration>> {
        self.with_connection(name, "applied_migrations", |conn, config| {
            migrate::applied(conn, &config.migration_table)
                .map_err(|e| Error::migration(&config.migration_table, e))
        })
        .await
    }

    async fn update(&self, name: &str, sql: &str, params: &Params) -> Result<()> {
        let sql = sql.to_string();
        let params = params.clone();
        let changed = self
            .with_connection(name, "update", move |conn, _| {
                query::update(conn, &sql, &params)
            })
            .await?;
        debug!("{} '{}' update changed {} row(s)", DB, name, changed);
        Ok(())
    }

    async fn select(&self, name: &str, sql: &str, params: &Params) -> Result<Vec<Row>> {
        let sql = sql.to_string();
        let params = params.clone();
        self.with_connection(name, "select", move |conn, _| {
            query::select(conn, &sql, &params)
        })
        .await
    }

    async fn batch(&self, name: &str, sql: &str) -> Result<()> {
        let sql = sql.to_string();
        self.with_connection(name, "batch", move |conn, config| {
            query::batch(conn, &sql, config.atomic_batch)
        })
        .await
    }

    async fn close(&self, name: &str) -> Result<()> {
        let shared = self
            .connections
            .lock()
            .remove(name)
            .ok_or_else(|| Error::unavailable(format!("no open database named '{}'", name)))?;

        // Waits for any in-flight operation holding the connection
        tokio::task::spawn_blocking(move || {
            let conn = shared.lock().take();
            match conn {
                Some(conn) => conn.close().map_err(|(_, e)| Error::unavailable(e)),
                None => Ok(()),
            }
        })
        .await
        .map_err(|e| Error::unavailable(format!("close worker failed: {}", e)))??;

        info!("{} closed connection '{}'", DB, name);
        Ok(())
    }
}
