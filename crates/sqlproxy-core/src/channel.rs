//! Named-command channel
//!
//! The plugin protocol as typed messages: a [`Command`] names the operation
//! and carries its arguments, a [`Reply`] carries the result. [`dispatch`]
//! serves commands from any [`Backend`]; [`ChannelBackend`] turns any
//! [`Transport`] back into a `Backend`, so handles work unchanged over
//! in-process calls, IPC or RPC.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::backend::Backend;
use crate::error::{Error, Result};
use crate::migration::{AppliedMigration, Migration};
use crate::value::{Params, Row};

/// One request to the backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum Command {
    OpenInMemory {
        name: String,
    },
    OpenInPath {
        path: String,
    },
    Migration {
        name: String,
        migrations: Vec<Migration>,
    },
    AppliedMigrations {
        name: String,
    },
    Update {
        name: String,
        sql: String,
        #[serde(default)]
        parameters: Params,
    },
    Select {
        name: String,
        sql: String,
        #[serde(default)]
        parameters: Params,
    },
    Batch {
        name: String,
        sql: String,
    },
    Close {
        name: String,
    },
}

impl Command {
    /// Wire name of the command
    pub fn as_str(&self) -> &'static str {
        match self {
            Command::OpenInMemory { .. } => "open_in_memory",
            Command::OpenInPath { .. } => "open_in_path",
            Command::Migration { .. } => "migration",
            Command::AppliedMigrations { .. } => "applied_migrations",
            Command::Update { .. } => "update",
            Command::Select { .. } => "select",
            Command::Batch { .. } => "batch",
            Command::Close { .. } => "close",
        }
    }
}

/// Successful response to a [`Command`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "reply", content = "data", rename_all = "snake_case")]
pub enum Reply {
    Ack,
    Rows(Vec<Row>),
    Migrations(Vec<AppliedMigration>),
}

/// Execute `command` against `backend`
pub async fn dispatch(backend: &dyn Backend, command: Command) -> Result<Reply> {
    debug!("dispatch {}", command.as_str());
    match command {
        Command::OpenInMemory { name } => backend.open_in_memory(&name).await.map(|_| Reply::Ack),
        Command::OpenInPath { path } => backend.open_in_path(&path).await.map(|_| Reply::Ack),
        Command::Migration { name, migrations } => backend
            .migration(&name, &migrations)
            .await
            .map(|_| Reply::Ack),
        Command::AppliedMigrations { name } => backend
            .applied_migrations(&name)
            .await
            .map(Reply::Migrations),
        Command::Update {
            name,
            sql,
            parameters,
        } => backend
            .update(&name, &sql, &parameters)
            .await
            .map(|_| Reply::Ack),
        Command::Select {
            name,
            sql,
            parameters,
        } => backend
            .select(&name, &sql, &parameters)
            .await
            .map(Reply::Rows),
        Command::Batch { name, sql } => backend.batch(&name, &sql).await.map(|_| Reply::Ack),
        Command::Close { name } => backend.close(&name).await.map(|_| Reply::Ack),
    }
}

/// Carries commands to a backend and replies back
#[async_trait]
pub trait Transport: Send + Sync {
    async fn invoke(&self, command: Command) -> Result<Reply>;
}

/// [`Backend`] implemented by sending commands over a [`Transport`]
pub struct ChannelBackend<T> {
    transport: T,
}

impl<T: Transport> ChannelBackend<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    async fn ack(&self, command: Command) -> Result<()> {
        let operation = command.as_str();
        match self.transport.invoke(command).await? {
            Reply::Ack => Ok(()),
            other => Err(unexpected(operation, &other)),
        }
    }
}

fn unexpected(operation: &str, reply: &Reply) -> Error {
    let kind = match reply {
        Reply::Ack => "ack",
        Reply::Rows(_) => "rows",
        Reply::Migrations(_) => "migrations",
    };
    Error::unavailable(format!("unexpected '{}' reply to {}", kind, operation))
}

#[async_trait]
impl<T: Transport> Backend for ChannelBackend<T> {
    async fn open_in_memory(&self, name: &str) -> Result<()> {
        self.ack(Command::OpenInMemory {
            name: name.to_string(),
        })
        .await
    }

    async fn open_in_path(&self, path: &str) -> Result<()> {
        self.ack(Command::OpenInPath {
            path: path.to_string(),
        })
        .await
    }

    async fn migration(&self, name: &str, migrations: &[Migration]) -> Result<()> {
        self.ack(Command::Migration {
            name: name.to_string(),
            migrations: migrations.to_vec(),
        })
        .await
    }

    async fn applied_migrations(&self, name: &str) -> Result<Vec<AppliedMigration>> {
        let command = Command::AppliedMigrations {
            name: name.to_string(),
        };
        match self.transport.invoke(command).await? {
            Reply::Migrations(applied) => Ok(applied),
            other => Err(unexpected("applied_migrations", &other)),
        }
    }

    async fn update(&self, name: &str, sql: &str, params: &Params) -> Result<()> {
        self.ack(Command::Update {
            name: name.to_string(),
            sql: sql.to_string(),
            parameters: params.clone(),
        })
        .await
    }

    async fn select(&self, name: &str, sql: &str, params: &Params) -> Result<Vec<Row>> {
        let command = Command::Select {
            name: name.to_string(),
            sql: sql.to_string(),
            parameters: params.clone(),
        };
        match self.transport.invoke(command).await? {
            Reply::Rows(rows) => Ok(rows),
            other => Err(unexpected("select", &other)),
        }
    }

    async fn batch(&self, name: &str, sql: &str) -> Result<()> {
        self.ack(Command::Batch {
            name: name.to_string(),
            sql: sql.to_string(),
        })
        .await
    }

    async fn close(&self, name: &str) -> Result<()> {
        self.ack(Command::Close {
            name: name.to_string(),
        })
        .await
    }
}

/// In-process transport that JSON-encodes every message.
///
/// Commands and results cross a serialization boundary exactly as they
/// would over IPC, then run against the wrapped backend.
pub struct LoopbackTransport {
    backend: Arc<dyn Backend>,
}

impl LoopbackTransport {
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self { backend }
    }
}

#[async_trait]
impl Transport for LoopbackTransport {
    async fn invoke(&self, command: Command) -> Result<Reply> {
        let request = serde_json::to_string(&command)
            .map_err(|e| Error::unavailable(format!("encode command: {}", e)))?;
        let command: Command = serde_json::from_str(&request)
            .map_err(|e| Error::unavailable(format!("decode command: {}", e)))?;

        let result = dispatch(self.backend.as_ref(), command).await;

        let response = serde_json::to_string(&result)
            .map_err(|e| Error::unavailable(format!("encode reply: {}", e)))?;
        serde_json::from_str::<Result<Reply>>(&response)
            .map_err(|e| Error::unavailable(format!("decode reply: {}", e)))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_command_wire_shape() {
        let command = Command::Update {
            name: "t".into(),
            sql: "INSERT INTO t(v) VALUES (:v)".into(),
            parameters: Params::new().with(":v", "hello"),
        };
        let value = serde_json::to_value(&command).unwrap();
        assert_eq!(
            value,
            json!({
                "command": "update",
                "name": "t",
                "sql": "INSERT INTO t(v) VALUES (:v)",
                "parameters": {":v": "hello"}
            })
        );
    }

    #[test]
    fn test_command_parameters_default_to_empty() {
        let command: Command =
            serde_json::from_value(json!({"command": "select", "name": "t", "sql": "SELECT 1"}))
                .unwrap();
        assert_eq!(
            command,
            Command::Select {
                name: "t".into(),
                sql: "SELECT 1".into(),
                parameters: Params::new(),
            }
        );
    }

    #[test]
    fn test_migration_command_decodes() {
        let command: Command = serde_json::from_value(json!({
            "command": "migration",
            "name": "t",
            "migrations": [{"name": "m1", "sql": "CREATE TABLE t(id INTEGER)"}]
        }))
        .unwrap();
        assert_eq!(command.as_str(), "migration");
    }

    #[test]
    fn test_result_envelope_round_trip() {
        let ok: Result<Reply> = Ok(Reply::Ack);
        let text = serde_json::to_string(&ok).unwrap();
        assert_eq!(serde_json::from_str::<Result<Reply>>(&text).unwrap(), ok);

        let err: Result<Reply> = Err(Error::already_open("t"));
        let text = serde_json::to_string(&err).unwrap();
        assert_eq!(serde_json::from_str::<Result<Reply>>(&text).unwrap(), err);
    }
}
