//! sqlproxy - command-line front end for database handles
//!
//! Opens one SQLite database through a `DatabaseHandle`, runs a single
//! operation and closes it again.
//!
//! Usage:
//!     sqlproxy --db app.db migrate migrations/
//!     sqlproxy --db app.db update "INSERT INTO t(v) VALUES (:v)" -p :v=hello
//!     sqlproxy --db app.db select "SELECT * FROM t WHERE id = :id" -p :id=1
//!     sqlproxy --memory scratch batch schema.sql

mod input;

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use sqlproxy_core::{Backend, DatabaseHandle, Value};
use sqlproxy_sqlite::{MigrationMode, SqliteBackend, SqliteConfig};
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "sqlproxy")]
#[command(about = "Run migrations and queries against a SQLite database")]
#[command(version)]
struct Args {
    /// Database file (created if absent)
    #[arg(long, conflicts_with = "memory")]
    db: Option<PathBuf>,

    /// Label of an in-memory database (used when --db is not given)
    #[arg(long, default_value = "main")]
    memory: String,

    /// Apply only migrations not yet in the ledger
    #[arg(long)]
    incremental: bool,

    /// Run migrations and batches in a single transaction
    #[arg(long)]
    atomic: bool,

    /// Log level (debug, info, warn, error)
    #[arg(long, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Apply every *.sql file in DIR, in file name order
    Migrate { dir: PathBuf },
    /// List applied migrations
    Applied,
    /// Execute one statement
    Update {
        sql: String,
        /// Named parameter binding, e.g. -p :id=1
        #[arg(short, long = "param", value_parser = input::parse_param)]
        params: Vec<(String, Value)>,
    },
    /// Execute one query and print each row as a JSON line
    Select {
        sql: String,
        /// Named parameter binding, e.g. -p :id=1
        #[arg(short, long = "param", value_parser = input::parse_param)]
        params: Vec<(String, Value)>,
    },
    /// Execute a multi-statement script from FILE
    Batch { file: PathBuf },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    sqlproxy_core::logging::init_with_filter(&args.log_level);

    let mode = if args.incremental {
        MigrationMode::Incremental
    } else {
        MigrationMode::Strict
    };
    let config = SqliteConfig::default()
        .migration_mode(mode)
        .atomic_migrations(args.atomic)
        .atomic_batch(args.atomic);
    let backend: Arc<dyn Backend> = Arc::new(SqliteBackend::with_config(config)?);

    let db = match &args.db {
        Some(path) => DatabaseHandle::open_in_path(backend, path).await?,
        None => DatabaseHandle::open_in_memory(backend, &args.memory).await?,
    };

    let outcome = run(&db, args.command).await;
    // Close even when the command failed; report the command's error first
    let closed = db.close().await;
    outcome?;
    closed?;

    Ok(())
}

async fn run(db: &DatabaseHandle, command: Command) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        Command::Migrate { dir } => {
            let migrations = input::load_migrations(&dir)?;
            info!("Loaded {} migration(s) from {}", migrations.len(), dir.display());
            db.migration(&migrations).await?;
        }
        Command::Applied => {
            for entry in db.applied_migrations().await? {
                println!("{}\t{}\t{}", entry.applied_at, entry.hash, entry.name);
            }
        }
        Command::Update { sql, params } => {
            db.update(&sql, &input::to_params(params)).await?;
        }
        Command::Select { sql, params } => {
            for row in db.select(&sql, &input::to_params(params)).await? {
                println!("{}", serde_json::to_string(&row)?);
            }
        }
        Command::Batch { file } => {
            let script = std::fs::read_to_string(&file)?;
            db.batch(&script).await?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_args_definition_is_valid() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_parse_select_with_params() {
        let args = Args::try_parse_from([
            "sqlproxy",
            "--db",
            "app.db",
            "select",
            "SELECT * FROM t WHERE id = :id",
            "-p",
            ":id=1",
            "--param",
            ":v=x",
        ])
        .unwrap();

        assert_eq!(args.db, Some(PathBuf::from("app.db")));
        match args.command {
            Command::Select { sql, params } => {
                assert_eq!(sql, "SELECT * FROM t WHERE id = :id");
                assert_eq!(
                    params,
                    vec![
                        (":id".to_string(), Value::Integer(1)),
                        (":v".to_string(), Value::Text("x".into())),
                    ]
                );
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_db_and_memory_conflict() {
        let result = Args::try_parse_from(["sqlproxy", "--db", "a.db", "--memory", "m", "applied"]);
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_run_migrate_then_select() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("001_create.sql"),
            "CREATE TABLE t(id INTEGER PRIMARY KEY, v TEXT)",
        )
        .unwrap();

        let backend: Arc<dyn Backend> = Arc::new(SqliteBackend::new());
        let db = DatabaseHandle::open_in_memory(backend, "cli").await.unwrap();

        run(&db, Command::Migrate { dir: dir.path().to_path_buf() })
            .await
            .unwrap();
        run(
            &db,
            Command::Update {
                sql: "INSERT INTO t(v) VALUES (:v)".into(),
                params: vec![(":v".into(), Value::from("hello"))],
            },
        )
        .await
        .unwrap();

        let applied = db.applied_migrations().await.unwrap();
        assert_eq!(applied[0].name, "001_create");

        let rows = db
            .select("SELECT v FROM t", &sqlproxy_core::Params::new())
            .await
            .unwrap();
        assert_eq!(rows[0].get("v"), Some(&Value::from("hello")));
    }
}
