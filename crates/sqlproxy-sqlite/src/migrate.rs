//! Migration runner and ledger
//!
//! Applied migrations are recorded in a ledger table (default
//! `migrations_history`) with a SHA-256 of their SQL. In strict mode a name
//! that is already recorded fails the call; in incremental mode the ledger
//! must match the head of the supplied list and only the tail is applied.

use rusqlite::{Connection, OptionalExtension};
use sha2::{Digest, Sha256};
use sqlproxy_core::logging::prefix::LEDGER;
use sqlproxy_core::{AppliedMigration, Error, Migration, Result};
use tracing::info;

use crate::config::{MigrationMode, SqliteConfig};

/// Hex SHA-256 of a migration's SQL
pub fn hash_sql(sql: &str) -> String {
    hex::encode(Sha256::digest(sql.as_bytes()))
}

/// Apply `migrations` according to `config`
pub(crate) fn run(conn: &Connection, config: &SqliteConfig, migrations: &[Migration]) -> Result<()> {
    let table = config.migration_table.as_str();
    ensure_ledger(conn, table).map_err(|e| Error::migration(table, e))?;

    let pending = match config.migration_mode {
        MigrationMode::Strict => migrations,
        MigrationMode::Incremental => {
            let applied = applied(conn, table).map_err(|e| Error::migration(table, e))?;
            verify_prefix(&applied, migrations)?;
            &migrations[applied.len()..]
        }
    };

    if pending.is_empty() {
        return Ok(());
    }

    if config.atomic_migrations {
        // Dropping the transaction on error rolls everything back
        let tx = conn
            .unchecked_transaction()
            .map_err(|e| Error::migration(&pending[0].name, e))?;
        for migration in pending {
            apply(&tx, table, migration)?;
        }
        tx.commit()
            .map_err(|e| Error::migration(&pending[pending.len() - 1].name, e))?;
    } else {
        for migration in pending {
            apply(conn, table, migration)?;
        }
    }

    info!("{} applied {} migration(s)", LEDGER, pending.len());
    Ok(())
}

/// Ledger entries in application order; empty if the ledger does not exist yet
pub(crate) fn applied(conn: &Connection, table: &str) -> rusqlite::Result<Vec<AppliedMigration>> {
    if !ledger_exists(conn, table)? {
        return Ok(Vec::new());
    }

    let mut stmt = conn.prepare(&format!(
        "SELECT name, hash, applied_at FROM {} ORDER BY id",
        table
    ))?;

    let entries = stmt
        .query_map([], |row| {
            Ok(AppliedMigration {
                name: row.get(0)?,
                hash: row.get(1)?,
                applied_at: row.get(2)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    Ok(entries)
}

fn ensure_ledger(conn: &Connection, table: &str) -> rusqlite::Result<()> {
    conn.execute_batch(&format!(
        "CREATE TABLE IF NOT EXISTS {} (
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL UNIQUE,
            hash TEXT NOT NULL,
            applied_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
        )",
        table
    ))
}

fn ledger_exists(conn: &Connection, table: &str) -> rusqlite::Result<bool> {
    conn.prepare("SELECT name FROM sqlite_master WHERE type='table' AND name=?")?
        .exists([table])
}

fn is_applied(conn: &Connection, table: &str, name: &str) -> rusqlite::Result<bool> {
    let found: Option<i64> = conn
        .query_row(
            &format!("SELECT id FROM {} WHERE name = ?", table),
            [name],
            |row| row.get(0),
        )
        .optional()?;
    Ok(found.is_some())
}

/// Check that every ledger entry matches the list entry at the same position
fn verify_prefix(applied: &[AppliedMigration], migrations: &[Migration]) -> Result<()> {
    for (index, entry) in applied.iter().enumerate() {
        let Some(migration) = migrations.get(index) else {
            return Err(Error::migration(
                &entry.name,
                "applied migration is missing from the migration list",
            ));
        };
        if migration.name != entry.name || hash_sql(&migration.sql) != entry.hash {
            return Err(Error::migration(
                &migration.name,
                format!(
                    "migration has been modified (ledger has '{}' at position {})",
                    entry.name,
                    index + 1
                ),
            ));
        }
    }
    Ok(())
}

fn apply(conn: &Connection, table: &str, migration: &Migration) -> Result<()> {
    let name = migration.name.as_str();

    if is_applied(conn, table, name).map_err(|e| Error::migration(name, e))? {
        return Err(Error::migration(name, "already applied"));
    }

    conn.execute_batch(&migration.sql)
        .map_err(|e| Error::migration(name, e))?;

    conn.execute(
        &format!("INSERT INTO {} (name, hash) VALUES (?1, ?2)", table),
        [name, hash_sql(&migration.sql).as_str()],
    )
    .map_err(|e| Error::migration(name, e))?;

    info!("{} applied migration '{}'", LEDGER, name);
    Ok(())
}
