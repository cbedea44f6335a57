//! Tauri plugin serving sqlproxy SQLite databases
//!
//! Registers the `rusqlite` plugin. The webview opens databases by name and
//! runs migrations and queries through `plugin:rusqlite|<command>`.
//!
//! Optional configuration in `tauri.conf.json`:
//!
//! ```json
//! {
//!   "plugins": {
//!     "rusqlite": {
//!       "migrationMode": "incremental",
//!       "atomicMigrations": true
//!     }
//!   }
//! }
//! ```

mod commands;

use sqlproxy_core::logging::prefix::DB;
use sqlproxy_sqlite::{SqliteBackend, SqliteConfig};
use tauri::plugin::{Builder, TauriPlugin};
use tauri::{Manager, RunEvent, Runtime};
use tracing::{info, warn};

pub use sqlproxy_sqlite::MigrationMode;

/// Initializes the plugin.
pub fn init<R: Runtime>() -> TauriPlugin<R, Option<SqliteConfig>> {
    Builder::<R, Option<SqliteConfig>>::new("rusqlite")
        .invoke_handler(tauri::generate_handler![
            commands::open_in_memory,
            commands::open_in_path,
            commands::migration,
            commands::applied_migrations,
            commands::update,
            commands::select,
            commands::batch,
            commands::close,
        ])
        .setup(|app, api| {
            let config = api.config().clone().unwrap_or_default();
            info!(
                "{} rusqlite plugin ready (migrations: {:?}, atomic: {})",
                DB, config.migration_mode, config.atomic_migrations
            );
            app.manage(SqliteBackend::with_config(config)?);
            Ok(())
        })
        .on_event(|app, event| {
            if let RunEvent::Exit = event {
                let backend = app.state::<SqliteBackend>();
                if let Err(e) = tauri::async_runtime::block_on(backend.close_all()) {
                    warn!("{} failed to close databases on exit: {}", DB, e);
                }
            }
        })
        .build()
}
