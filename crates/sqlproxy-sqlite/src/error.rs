//! Error types for the SQLite backend

use sqlproxy_core::Error;
use thiserror::Error;

/// Result type for backend setup
pub type Result<T> = std::result::Result<T, SqliteError>;

/// Errors raised while setting up the backend or a connection
#[derive(Debug, Error)]
pub enum SqliteError {
    /// Database connection or pragma error
    #[error("SQLite error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Invalid backend configuration
    #[error("configuration error: {0}")]
    Config(String),
}

/// Convert SqliteError to the contract error
impl From<SqliteError> for Error {
    fn from(err: SqliteError) -> Self {
        match err {
            SqliteError::Database(e) => Error::unavailable(format!("SQLite: {}", e)),
            SqliteError::Config(msg) => Error::invalid_argument(msg),
        }
    }
}
