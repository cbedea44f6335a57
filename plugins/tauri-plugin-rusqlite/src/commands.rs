//! Webview-facing commands
//!
//! Each command forwards to the managed [`SqliteBackend`]. Errors keep their
//! `kind` tag when serialized back to the webview.

use sqlproxy_core::{AppliedMigration, Backend, Migration, Params, Result, Row};
use sqlproxy_sqlite::SqliteBackend;
use tauri::State;

#[tauri::command]
pub async fn open_in_memory(state: State<'_, SqliteBackend>, name: String) -> Result<()> {
    state.open_in_memory(&name).await
}

#[tauri::command]
pub async fn open_in_path(state: State<'_, SqliteBackend>, path: String) -> Result<()> {
    state.open_in_path(&path).await
}

#[tauri::command]
pub async fn migration(
    state: State<'_, SqliteBackend>,
    name: String,
    migrations: Vec<Migration>,
) -> Result<()> {
    state.migration(&name, &migrations).await
}

#[tauri::command]
pub async fn applied_migrations(
    state: State<'_, SqliteBackend>,
    name: String,
) -> Result<Vec<AppliedMigration>> {
    state.applied_migrations(&name).await
}

#[tauri::command]
pub async fn update(
    state: State<'_, SqliteBackend>,
    name: String,
    sql: String,
    parameters: Option<Params>,
) -> Result<()> {
    state
        .update(&name, &sql, &parameters.unwrap_or_default())
        .await
}

#[tauri::command]
pub async fn select(
    state: State<'_, SqliteBackend>,
    name: String,
    sql: String,
    parameters: Option<Params>,
) -> Result<Vec<Row>> {
    state
        .select(&name, &sql, &parameters.unwrap_or_default())
        .await
}

#[tauri::command]
pub async fn batch(state: State<'_, SqliteBackend>, name: String, sql: String) -> Result<()> {
    state.batch(&name, &sql).await
}

#[tauri::command]
pub async fn close(state: State<'_, SqliteBackend>, name: String) -> Result<()> {
    state.close(&name).await
}
