//! Error taxonomy shared by handles, backends and transports

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors surfaced by every database operation.
///
/// Backends report failures in these terms so callers see the same kinds no
/// matter which transport sits in between. The enum serializes with a `kind`
/// tag and survives a round trip through the command channel.
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Error {
    /// Operation on a handle that is not open (never opened, or closed)
    #[error("database '{name}' is not open (attempted {operation})")]
    InvalidState { name: String, operation: String },

    /// A database with this name is already open
    #[error("database '{name}' is already open")]
    AlreadyOpen { name: String },

    /// Channel or backend failure unrelated to SQL content
    #[error("backend unavailable: {reason}")]
    BackendUnavailable { reason: String },

    /// A named migration failed
    #[error("migration '{name}' failed: {cause}")]
    Migration { name: String, cause: String },

    /// Malformed SQL, type mismatch or constraint violation
    #[error("query failed: {cause} (sql: {sql})")]
    Query { sql: String, cause: String },

    /// Opening a file-backed database failed
    #[error("cannot open '{path}': {cause}")]
    Io { path: String, cause: String },

    /// Rejected by client-side validation before reaching the backend
    #[error("invalid argument: {reason}")]
    InvalidArgument { reason: String },
}

impl Error {
    pub fn invalid_state(name: impl Into<String>, operation: impl Into<String>) -> Self {
        Error::InvalidState {
            name: name.into(),
            operation: operation.into(),
        }
    }

    pub fn already_open(name: impl Into<String>) -> Self {
        Error::AlreadyOpen { name: name.into() }
    }

    pub fn unavailable(reason: impl ToString) -> Self {
        Error::BackendUnavailable {
            reason: reason.to_string(),
        }
    }

    pub fn invalid_argument(reason: impl ToString) -> Self {
        Error::InvalidArgument {
            reason: reason.to_string(),
        }
    }

    pub fn migration(name: impl Into<String>, cause: impl ToString) -> Self {
        Error::Migration {
            name: name.into(),
            cause: cause.to_string(),
        }
    }

    pub fn query(sql: impl Into<String>, cause: impl ToString) -> Self {
        Error::Query {
            sql: sql.into(),
            cause: cause.to_string(),
        }
    }

    pub fn io(path: impl Into<String>, cause: impl ToString) -> Self {
        Error::Io {
            path: path.into(),
            cause: cause.to_string(),
        }
    }
}

/// Result type for database operations
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_serializes_with_kind_tag() {
        let err = Error::query("SELECT nope", "no such column: nope");
        let value = serde_json::to_value(&err).unwrap();
        assert_eq!(
            value,
            json!({"kind": "query", "sql": "SELECT nope", "cause": "no such column: nope"})
        );

        let back: Error = serde_json::from_value(value).unwrap();
        assert_eq!(back, err);
    }

    #[test]
    fn test_display_carries_context() {
        let err = Error::migration("m1", "table t already exists");
        assert_eq!(err.to_string(), "migration 'm1' failed: table t already exists");

        let err = Error::invalid_state("t", "select");
        assert!(err.to_string().contains("'t'"));
        assert!(err.to_string().contains("select"));
    }
}
