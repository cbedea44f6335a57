//! Typed database handle contract
//!
//! This crate defines the client side of a named-database proxy: a
//! [`DatabaseHandle`] forwards migration, update, select, batch and close
//! operations to a [`Backend`] and surfaces its errors unchanged.
//!
//! # Features
//!
//! - Tagged [`Value`] type for parameters and row cells
//! - One async method per backend operation ([`Backend`])
//! - Explicit [`Registry`] of open handles with a configurable [`OpenPolicy`]
//! - Typed named-command channel ([`Command`], [`Reply`], [`Transport`])
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use sqlproxy_core::{DatabaseHandle, Migration, Params};
//!
//! let db = DatabaseHandle::open_in_memory(backend, "t").await?;
//! db.migration(&[Migration::new(
//!     "m1",
//!     "CREATE TABLE t(id INTEGER PRIMARY KEY, v TEXT)",
//! )])
//! .await?;
//! db.update("INSERT INTO t(v) VALUES (:v)", &Params::new().with(":v", "hello"))
//!     .await?;
//! let rows = db.select("SELECT * FROM t", &Params::new()).await?;
//! db.close().await?;
//! ```

pub mod backend;
pub mod channel;
pub mod error;
pub mod handle;
pub mod logging;
pub mod migration;
pub mod registry;
pub mod value;

// Re-export main types
pub use backend::Backend;
pub use channel::{dispatch, ChannelBackend, Command, LoopbackTransport, Reply, Transport};
pub use error::{Error, Result};
pub use handle::{DatabaseHandle, HandleState};
pub use migration::{AppliedMigration, Migration};
pub use registry::{OpenPolicy, Registry};
pub use value::{Params, Row, Value};
