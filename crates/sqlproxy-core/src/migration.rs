//! Migration types

use serde::{Deserialize, Serialize};

/// A named schema or data change, applied once and tracked by the backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Migration {
    pub name: String,
    pub sql: String,
}

impl Migration {
    pub fn new(name: impl Into<String>, sql: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sql: sql.into(),
        }
    }
}

/// Ledger entry for a migration the backend has applied
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppliedMigration {
    pub name: String,
    /// Hex digest of the migration SQL at the time it was applied
    pub hash: String,
    pub applied_at: String,
}
