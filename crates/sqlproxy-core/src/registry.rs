//! Explicit registry of open handles by name
//!
//! Replaces a process-wide "current database" slot: the caller owns the
//! registry and every open/close goes through it.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::backend::Backend;
use crate::error::{Error, Result};
use crate::handle::DatabaseHandle;
use crate::logging::prefix::DB;

/// What happens when a name that is already open is opened again
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OpenPolicy {
    /// Second open fails with `AlreadyOpen` until the first is closed
    #[default]
    SingleInstance,
    /// Second open returns the handle that is already open
    Shared,
}

/// Name → handle map over one backend
pub struct Registry {
    backend: Arc<dyn Backend>,
    policy: OpenPolicy,
    handles: RwLock<HashMap<String, Arc<DatabaseHandle>>>,
}

impl Registry {
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self::with_policy(backend, OpenPolicy::default())
    }

    pub fn with_policy(backend: Arc<dyn Backend>, policy: OpenPolicy) -> Self {
        Self {
            backend,
            policy,
            handles: RwLock::new(HashMap::new()),
        }
    }

    pub fn policy(&self) -> OpenPolicy {
        self.policy
    }

    pub fn backend(&self) -> &Arc<dyn Backend> {
        &self.backend
    }

    /// Check the policy for `name`. Returns an existing handle to reuse.
    fn existing(&self, name: &str) -> Result<Option<Arc<DatabaseHandle>>> {
        let handles = self.handles.read();
        match handles.get(name) {
            Some(handle) if handle.is_open() => match self.policy {
                OpenPolicy::SingleInstance => Err(Error::already_open(name)),
                OpenPolicy::Shared => Ok(Some(Arc::clone(handle))),
            },
            _ => Ok(None),
        }
    }

    fn insert(&self, handle: DatabaseHandle) -> Arc<DatabaseHandle> {
        let handle = Arc::new(handle);
        self.handles
            .write()
            .insert(handle.name().to_string(), Arc::clone(&handle));
        debug!("{} registered '{}'", DB, handle.name());
        handle
    }

    pub async fn open_in_memory(&self, name: &str) -> Result<Arc<DatabaseHandle>> {
        if let Some(handle) = self.existing(name)? {
            return Ok(handle);
        }
        let handle = DatabaseHandle::open_in_memory(Arc::clone(&self.backend), name).await?;
        Ok(self.insert(handle))
    }

    pub async fn open_in_path(&self, path: impl AsRef<Path>) -> Result<Arc<DatabaseHandle>> {
        let path = path.as_ref();
        if let Some(name) = path.to_str() {
            if let Some(handle) = self.existing(name)? {
                return Ok(handle);
            }
        }
        let handle = DatabaseHandle::open_in_path(Arc::clone(&self.backend), path).await?;
        Ok(self.insert(handle))
    }

    /// Open handle registered under `name`
    pub fn get(&self, name: &str) -> Option<Arc<DatabaseHandle>> {
        self.handles
            .read()
            .get(name)
            .filter(|handle| handle.is_open())
            .cloned()
    }

    /// Names of open handles, sorted
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .handles
            .read()
            .values()
            .filter(|handle| handle.is_open())
            .map(|handle| handle.name().to_string())
            .collect();
        names.sort();
        names
    }

    /// Close and unregister the handle for `name`.
    ///
    /// A handle whose close fails stays registered and open.
    pub async fn close(&self, name: &str) -> Result<()> {
        let handle = self
            .get(name)
            .ok_or_else(|| Error::invalid_state(name, "close"))?;
        handle.close().await?;

        let mut handles = self.handles.write();
        if handles.get(name).is_some_and(|h| Arc::ptr_eq(h, &handle)) {
            handles.remove(name);
        }
        Ok(())
    }

    /// Close every registered handle.
    ///
    /// All handles are attempted; the first error is returned. As with
    /// [`close`](Self::close), a handle whose close fails stays registered.
    pub async fn close_all(&self) -> Result<()> {
        let handles: Vec<Arc<DatabaseHandle>> =
            self.handles.write().drain().map(|(_, handle)| handle).collect();

        let mut first_error = None;
        for handle in handles.into_iter().filter(|handle| handle.is_open()) {
            if let Err(e) = handle.close().await {
                warn!("{} failed to close '{}': {}", DB, handle.name(), e);
                self.handles
                    .write()
                    .entry(handle.name().to_string())
                    .or_insert(handle);
                first_error.get_or_insert(e);
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}
