//! Backend configuration
//!
//! Deserializes from the `plugins.rusqlite` section of `tauri.conf.json`
//! (camelCase keys); every field has a default.

use serde::{Deserialize, Serialize};

use crate::error::{Result, SqliteError};

/// Default ledger table name
pub const DEFAULT_MIGRATION_TABLE: &str = "migrations_history";

/// How `migration` treats names already recorded in the ledger
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MigrationMode {
    /// Any already-applied name fails the call
    #[default]
    Strict,
    /// The ledger must be an unmodified prefix of the list; the rest is applied
    Incremental,
}

/// SQLite backend configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SqliteConfig {
    /// Ledger table recording applied migrations
    pub migration_table: String,
    pub migration_mode: MigrationMode,
    /// Apply a whole migration list in one transaction
    pub atomic_migrations: bool,
    /// Run a whole batch script in one transaction
    pub atomic_batch: bool,
    /// `PRAGMA foreign_keys` for every new connection
    pub foreign_keys: bool,
    /// Busy timeout for file-backed databases
    pub busy_timeout_ms: Option<u64>,
}

impl Default for SqliteConfig {
    fn default() -> Self {
        Self {
            migration_table: DEFAULT_MIGRATION_TABLE.to_string(),
            migration_mode: MigrationMode::default(),
            atomic_migrations: false,
            atomic_batch: false,
            foreign_keys: true,
            busy_timeout_ms: None,
        }
    }
}

impl SqliteConfig {
    pub fn migration_mode(mut self, mode: MigrationMode) -> Self {
        self.migration_mode = mode;
        self
    }

    pub fn atomic_migrations(mut self, atomic: bool) -> Self {
        self.atomic_migrations = atomic;
        self
    }

    pub fn atomic_batch(mut self, atomic: bool) -> Self {
        self.atomic_batch = atomic;
        self
    }

    pub fn migration_table(mut self, table: impl Into<String>) -> Self {
        self.migration_table = table.into();
        self
    }

    /// Check values that end up interpolated into SQL
    pub fn validate(&self) -> Result<()> {
        let table = &self.migration_table;
        let valid = table
            .chars()
            .next()
            .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
            && table.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');

        if !valid {
            return Err(SqliteError::Config(format!(
                "migration table '{}' is not a plain identifier",
                table
            )));
        }
        Ok(())
    }
}
