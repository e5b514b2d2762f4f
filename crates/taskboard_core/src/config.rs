//! Task store connection configuration.
//!
//! # Responsibility
//! - Describe where the task collection lives and how long operations may block.

use crate::db::DEFAULT_BUSY_TIMEOUT;
use std::path::PathBuf;
use std::time::Duration;

/// Default upper bound for one store operation when the caller sets none.
pub const DEFAULT_OP_TIMEOUT: Duration = Duration::from_secs(5);

/// Where the task collection is persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreLocation {
    /// SQLite database file, created on first open.
    File(PathBuf),
    /// Private in-memory database, dropped on shutdown.
    Memory,
}

/// Connection configuration consumed by `TaskStore::open`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    pub location: StoreLocation,
    /// How long a statement waits on a locked database.
    pub busy_timeout: Duration,
    /// Deadline applied to operations whose context carries none.
    pub op_timeout: Option<Duration>,
}

impl StoreConfig {
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self::at(StoreLocation::File(path.into()))
    }

    pub fn in_memory() -> Self {
        Self::at(StoreLocation::Memory)
    }

    pub fn with_op_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.op_timeout = timeout;
        self
    }

    fn at(location: StoreLocation) -> Self {
        Self {
            location,
            busy_timeout: DEFAULT_BUSY_TIMEOUT,
            op_timeout: Some(DEFAULT_OP_TIMEOUT),
        }
    }
}
