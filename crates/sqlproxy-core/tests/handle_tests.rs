//! Handle, registry and channel tests against a recording backend

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use pretty_assertions::assert_eq;
use sqlproxy_core::{
    AppliedMigration, Backend, ChannelBackend, DatabaseHandle, Error, HandleState,
    LoopbackTransport, Migration, OpenPolicy, Params, Registry, Result, Row, Value,
};

/// Backend that tracks open names and records every call it receives
#[derive(Default)]
struct RecordingBackend {
    open: Mutex<HashSet<String>>,
    calls: Mutex<Vec<String>>,
}

impl RecordingBackend {
    fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    fn record(&self, call: String) {
        self.calls.lock().push(call);
    }

    fn require_open(&self, name: &str) -> Result<()> {
        if self.open.lock().contains(name) {
            Ok(())
        } else {
            Err(Error::unavailable(format!("no connection named '{}'", name)))
        }
    }

    fn insert(&self, name: &str) -> Result<()> {
        if !self.open.lock().insert(name.to_string()) {
            return Err(Error::already_open(name));
        }
        Ok(())
    }
}

#[async_trait]
impl Backend for RecordingBackend {
    async fn open_in_memory(&self, name: &str) -> Result<()> {
        self.record(format!("open_in_memory {}", name));
        self.insert(name)
    }

    async fn open_in_path(&self, path: &str) -> Result<()> {
        self.record(format!("open_in_path {}", path));
        if path.starts_with("/unwritable") {
            return Err(Error::io(path, "unable to open database file"));
        }
        self.insert(path)
    }

    async fn migration(&self, name: &str, migrations: &[Migration]) -> Result<()> {
        self.require_open(name)?;
        let names: Vec<&str> = migrations.iter().map(|m| m.name.as_str()).collect();
        self.record(format!("migration {} [{}]", name, names.join(",")));
        Ok(())
    }

    async fn applied_migrations(&self, name: &str) -> Result<Vec<AppliedMigration>> {
        self.require_open(name)?;
        self.record(format!("applied_migrations {}", name));
        Ok(vec![AppliedMigration {
            name: "m1".into(),
            hash: "abc".into(),
            applied_at: "2024-01-01 00:00:00".into(),
        }])
    }

    async fn update(&self, name: &str, sql: &str, params: &Params) -> Result<()> {
        self.require_open(name)?;
        self.record(format!("update {} {} ({} params)", name, sql, params.len()));
        if sql.contains("BROKEN") {
            return Err(Error::query(sql, "syntax error"));
        }
        Ok(())
    }

    async fn select(&self, name: &str, sql: &str, params: &Params) -> Result<Vec<Row>> {
        self.require_open(name)?;
        self.record(format!("select {} {}", name, sql));
        let mut row = Row::new();
        row.push("id", Value::Integer(1));
        row.push("v", params.get(":v").cloned().unwrap_or_default());
        row.push("data", Value::Blob(vec![0, 127, 255]));
        Ok(vec![row])
    }

    async fn batch(&self, name: &str, sql: &str) -> Result<()> {
        self.require_open(name)?;
        self.record(format!("batch {} {}", name, sql));
        Ok(())
    }

    async fn close(&self, name: &str) -> Result<()> {
        self.record(format!("close {}", name));
        if !self.open.lock().remove(name) {
            return Err(Error::unavailable(format!("no connection named '{}'", name)));
        }
        Ok(())
    }
}

fn recording_backend() -> (Arc<RecordingBackend>, Arc<dyn Backend>) {
    let recording = Arc::new(RecordingBackend::default());
    let backend: Arc<dyn Backend> = recording.clone();
    (recording, backend)
}

#[tokio::test]
async fn test_open_forwards_name_and_starts_open() {
    let (recording, backend) = recording_backend();

    let db = DatabaseHandle::open_in_memory(backend, "t").await.unwrap();

    assert_eq!(db.name(), "t");
    assert_eq!(db.state(), HandleState::Open);
    assert_eq!(recording.calls(), vec!["open_in_memory t"]);
}

#[tokio::test]
async fn test_open_rejects_empty_name_without_backend_call() {
    let (recording, backend) = recording_backend();

    let err = DatabaseHandle::open_in_memory(backend.clone(), "").await.unwrap_err();
    assert!(matches!(err, Error::InvalidArgument { .. }));

    let err = DatabaseHandle::open_in_path(backend, "").await.unwrap_err();
    assert!(matches!(err, Error::InvalidArgument { .. }));

    assert!(recording.calls().is_empty());
}

#[tokio::test]
async fn test_open_in_path_surfaces_io_error() {
    let (_, backend) = recording_backend();

    let err = DatabaseHandle::open_in_path(backend, "/unwritable/db.sqlite")
        .await
        .unwrap_err();

    assert_eq!(
        err,
        Error::io("/unwritable/db.sqlite", "unable to open database file")
    );
}

#[tokio::test]
async fn test_operations_forward_in_order() {
    let (recording, backend) = recording_backend();
    let db = DatabaseHandle::open_in_memory(backend, "t").await.unwrap();

    db.migration(&[Migration::new("m1", "CREATE TABLE t(v)"), Migration::new("m2", "SELECT 1")])
        .await
        .unwrap();
    db.update("INSERT INTO t(v) VALUES (:v)", &Params::new().with(":v", "x"))
        .await
        .unwrap();
    db.batch("DELETE FROM t;").await.unwrap();
    db.close().await.unwrap();

    assert_eq!(
        recording.calls(),
        vec![
            "open_in_memory t",
            "migration t [m1,m2]",
            "update t INSERT INTO t(v) VALUES (:v) (1 params)",
            "batch t DELETE FROM t;",
            "close t",
        ]
    );
}

#[tokio::test]
async fn test_backend_errors_surface_unchanged() {
    let (_, backend) = recording_backend();
    let db = DatabaseHandle::open_in_memory(backend, "t").await.unwrap();

    let err = db.update("BROKEN SQL", &Params::new()).await.unwrap_err();
    assert_eq!(err, Error::query("BROKEN SQL", "syntax error"));
}

#[tokio::test]
async fn test_every_operation_after_close_is_invalid_state() {
    let (recording, backend) = recording_backend();
    let db = DatabaseHandle::open_in_memory(backend, "t").await.unwrap();
    db.close().await.unwrap();
    let calls_before = recording.calls().len();

    let params = Params::new();
    let errors = vec![
        db.migration(&[Migration::new("m1", "SELECT 1")]).await.unwrap_err(),
        db.applied_migrations().await.unwrap_err(),
        db.update("UPDATE t SET v = 1", &params).await.unwrap_err(),
        db.select("SELECT 1", &params).await.unwrap_err(),
        db.batch("SELECT 1;").await.unwrap_err(),
        db.close().await.unwrap_err(),
    ];

    for err in errors {
        assert!(matches!(err, Error::InvalidState { .. }), "got {:?}", err);
    }
    assert_eq!(db.state(), HandleState::Closed);
    assert_eq!(recording.calls().len(), calls_before);
}

#[tokio::test]
async fn test_unopened_handle_rejects_operations() {
    let (recording, backend) = recording_backend();
    let db = DatabaseHandle::new(backend, "t");

    assert_eq!(db.state(), HandleState::Unopened);
    let err = db.select("SELECT 1", &Params::new()).await.unwrap_err();
    assert_eq!(err, Error::invalid_state("t", "select"));
    assert!(recording.calls().is_empty());
}

#[tokio::test]
async fn test_close_after_backend_dropped_connection() {
    let (_, backend) = recording_backend();
    let db = DatabaseHandle::open_in_memory(backend.clone(), "t").await.unwrap();

    // Closed behind the handle's back, e.g. through another handle object
    backend.close("t").await.unwrap();

    let err = db.close().await.unwrap_err();
    assert!(matches!(err, Error::BackendUnavailable { .. }));
    assert_eq!(db.state(), HandleState::Open);
}

#[tokio::test]
async fn test_registry_single_instance_rejects_second_open() {
    let (_, backend) = recording_backend();
    let registry = Registry::new(backend);

    registry.open_in_memory("t").await.unwrap();
    let err = registry.open_in_memory("t").await.unwrap_err();
    assert_eq!(err, Error::already_open("t"));

    registry.close("t").await.unwrap();
    let reopened = registry.open_in_memory("t").await.unwrap();
    assert!(reopened.is_open());
}

#[tokio::test]
async fn test_registry_shared_reuses_handle() {
    let (recording, backend) = recording_backend();
    let registry = Registry::with_policy(backend, OpenPolicy::Shared);

    let first = registry.open_in_memory("t").await.unwrap();
    let second = registry.open_in_memory("t").await.unwrap();

    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(recording.calls(), vec!["open_in_memory t"]);
}

#[tokio::test]
async fn test_registry_tracks_names_and_replaces_stale_entries() {
    let (_, backend) = recording_backend();
    let registry = Registry::new(backend);

    let b = registry.open_in_memory("b").await.unwrap();
    registry.open_in_memory("a").await.unwrap();
    assert_eq!(registry.names(), vec!["a", "b"]);

    // Closed directly, not through the registry
    b.close().await.unwrap();
    assert_eq!(registry.names(), vec!["a"]);
    assert!(registry.get("b").is_none());

    let b = registry.open_in_memory("b").await.unwrap();
    assert!(b.is_open());
}

#[tokio::test]
async fn test_registry_close_unknown_is_invalid_state() {
    let (_, backend) = recording_backend();
    let registry = Registry::new(backend);

    let err = registry.close("missing").await.unwrap_err();
    assert_eq!(err, Error::invalid_state("missing", "close"));
}

#[tokio::test]
async fn test_registry_close_all_keeps_failed_handles() {
    let (_, backend) = recording_backend();
    let registry = Registry::new(backend.clone());
    registry.open_in_memory("a").await.unwrap();
    let b = registry.open_in_memory("b").await.unwrap();

    // Backend no longer knows "b", so closing it fails
    backend.close("b").await.unwrap();

    let err = registry.close_all().await.unwrap_err();
    assert!(matches!(err, Error::BackendUnavailable { .. }));

    assert_eq!(registry.names(), vec!["b"]);
    let kept = registry.get("b").unwrap();
    assert!(Arc::ptr_eq(&kept, &b));
    assert!(kept.is_open());
}

#[tokio::test]
async fn test_registry_close_all() {
    let (recording, backend) = recording_backend();
    let registry = Registry::new(backend);
    registry.open_in_memory("a").await.unwrap();
    registry.open_in_path("/tmp/b.db").await.unwrap();

    registry.close_all().await.unwrap();

    assert!(registry.names().is_empty());
    let closes = recording
        .calls()
        .into_iter()
        .filter(|call| call.starts_with("close"))
        .count();
    assert_eq!(closes, 2);
}

#[tokio::test]
async fn test_loopback_channel_preserves_rows_and_errors() {
    let (_, inner) = recording_backend();
    let channel: Arc<dyn Backend> =
        Arc::new(ChannelBackend::new(LoopbackTransport::new(inner)));

    let db = DatabaseHandle::open_in_memory(channel.clone(), "t").await.unwrap();
    let rows = db
        .select("SELECT * FROM t", &Params::new().with(":v", 2.5))
        .await
        .unwrap();

    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].column_names(), vec!["id", "v", "data"]);
    assert_eq!(rows[0].get("v"), Some(&Value::Real(2.5)));
    assert_eq!(rows[0].get("data"), Some(&Value::Blob(vec![0, 127, 255])));

    let applied = db.applied_migrations().await.unwrap();
    assert_eq!(applied[0].name, "m1");

    let err = db.update("BROKEN", &Params::new()).await.unwrap_err();
    assert_eq!(err, Error::query("BROKEN", "syntax error"));

    let err = DatabaseHandle::open_in_memory(channel, "t").await.unwrap_err();
    assert_eq!(err, Error::already_open("t"));
}
