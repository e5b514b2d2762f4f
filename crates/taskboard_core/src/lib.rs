//! Core domain logic for the task board.
//! This crate owns the task collection and every invariant it carries.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod store;

pub use config::{StoreConfig, StoreLocation, DEFAULT_OP_TIMEOUT};
pub use logging::{default_log_level, init_logging, logging_status, LogTarget};
pub use model::task::{Category, Task, TaskId, TaskValidationError};
pub use repo::task_repo::{RepoError, RepoResult, SqliteTaskRepository, TaskRepository};
pub use store::{CancelFlag, OpContext, StoreError, StoreResult, TaskStore, UnavailableReason};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
