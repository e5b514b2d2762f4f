//! Process-wide task store handle.
//!
//! # Responsibility
//! - Own the connection to the task collection between `open` and `shutdown`.
//! - Expose the four category-scoped operations with typed failures.
//! - Bound every operation by the caller's deadline/cancellation signal.
//!
//! # Invariants
//! - Each operation is a single SQL statement: it applies fully or not at all.
//! - Toggle is assume-and-set: it writes `!current_done_hint` without reading
//!   the stored value, so concurrent toggles with stale hints are last-write-wins.
//! - Errors are never retried or swallowed here.
//! - Waiting for the connection handle is bounded by the same deadline and
//!   cancellation signal as the statement itself.

mod context;

pub use context::{Abort, CancelFlag, OpContext};

use crate::config::{StoreConfig, StoreLocation};
use crate::db::{open_db, open_db_in_memory};
use crate::model::task::{Category, Task, TaskId, TaskValidationError};
use crate::repo::task_repo::{RepoError, SqliteTaskRepository, TaskRepository};
use log::{debug, error, info, warn};
use parking_lot::{Mutex, MutexGuard};
use rusqlite::Connection;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::{Duration, Instant};

/// VM instructions between deadline/cancellation polls inside a statement.
const PROGRESS_POLL_OPS: i32 = 100;

/// Longest single wait for the connection handle before re-checking the context.
const HANDLE_POLL: Duration = Duration::from_millis(10);

pub type StoreResult<T> = Result<T, StoreError>;

/// Failure surfaced to store callers.
#[derive(Debug)]
pub enum StoreError {
    /// Malformed create input; nothing was written.
    Validation(TaskValidationError),
    /// The referenced task does not exist; nothing was written.
    NotFound(TaskId),
    /// The collection could not serve the request.
    StorageUnavailable(UnavailableReason),
}

/// Cause of a `StorageUnavailable` failure.
#[derive(Debug)]
pub enum UnavailableReason {
    DeadlineExceeded,
    Cancelled,
    /// Database stayed locked past the busy timeout.
    Busy,
    /// `shutdown` already released the connection.
    Closed,
    Backend(RepoError),
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "validation failed: {err}"),
            Self::NotFound(id) => write!(f, "task not found: {id}"),
            Self::StorageUnavailable(reason) => write!(f, "storage unavailable: {reason}"),
        }
    }
}

impl Display for UnavailableReason {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DeadlineExceeded => write!(f, "deadline exceeded"),
            Self::Cancelled => write!(f, "operation cancelled"),
            Self::Busy => write!(f, "database is busy"),
            Self::Closed => write!(f, "store is shut down"),
            Self::Backend(err) => write!(f, "{err}"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::NotFound(_) => None,
            Self::StorageUnavailable(UnavailableReason::Backend(err)) => Some(err),
            Self::StorageUnavailable(_) => None,
        }
    }
}

impl From<TaskValidationError> for StoreError {
    fn from(value: TaskValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<Abort> for StoreError {
    fn from(value: Abort) -> Self {
        Self::StorageUnavailable(match value {
            Abort::DeadlineExceeded => UnavailableReason::DeadlineExceeded,
            Abort::Cancelled => UnavailableReason::Cancelled,
        })
    }
}

impl StoreError {
    /// Stable short code for logs and HTTP mapping.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::NotFound(_) => "not_found",
            Self::StorageUnavailable(UnavailableReason::DeadlineExceeded) => "deadline_exceeded",
            Self::StorageUnavailable(UnavailableReason::Cancelled) => "cancelled",
            Self::StorageUnavailable(UnavailableReason::Busy) => "busy",
            Self::StorageUnavailable(UnavailableReason::Closed) => "closed",
            Self::StorageUnavailable(UnavailableReason::Backend(_)) => "backend",
        }
    }

    fn from_repo(err: RepoError, ctx: &OpContext) -> Self {
        match err {
            RepoError::Validation(err) => Self::Validation(err),
            RepoError::NotFound(id) => Self::NotFound(id),
            RepoError::Db(db) if db.is_interrupted() => match ctx.check() {
                Err(abort) => abort.into(),
                // Interrupted without our signal: report it as a storage fault.
                Ok(()) => Self::StorageUnavailable(UnavailableReason::Backend(RepoError::Db(db))),
            },
            // The busy wait is capped by the deadline, so a timeout may be ours.
            RepoError::Db(db) if db.is_busy() => match ctx.check() {
                Err(abort) => abort.into(),
                Ok(()) => Self::StorageUnavailable(UnavailableReason::Busy),
            },
            other => Self::StorageUnavailable(UnavailableReason::Backend(other)),
        }
    }
}

/// Shared handle to the persisted task collection.
///
/// Construct once at startup with `open`, share behind an `Arc`, and release
/// with `shutdown`. Every operation may block on I/O.
pub struct TaskStore {
    conn: Mutex<Option<Connection>>,
    busy_timeout: Duration,
    op_timeout: Option<Duration>,
}

impl TaskStore {
    /// Opens the collection and verifies its schema.
    ///
    /// Callers treat a failure here as fatal: the service cannot run
    /// without its collection.
    pub fn open(config: &StoreConfig) -> StoreResult<Self> {
        let opened = match &config.location {
            StoreLocation::File(path) => open_db(path),
            StoreLocation::Memory => open_db_in_memory(),
        };
        let conn = opened.map_err(|err| {
            error!("event=store_open module=store status=error error={err}");
            StoreError::StorageUnavailable(UnavailableReason::Backend(err.into()))
        })?;
        conn.busy_timeout(config.busy_timeout)
            .map_err(|err| backend(err.into()))?;
        SqliteTaskRepository::try_new(&conn).map_err(backend)?;

        info!(
            "event=store_open module=store status=ok op_timeout_ms={}",
            config
                .op_timeout
                .map_or_else(|| "none".to_string(), |t| t.as_millis().to_string())
        );
        Ok(Self {
            conn: Mutex::new(Some(conn)),
            busy_timeout: config.busy_timeout,
            op_timeout: config.op_timeout,
        })
    }

    /// Lists the tasks of one category in insertion order.
    pub fn list_by_category(
        &self,
        ctx: &OpContext,
        category: Category,
    ) -> StoreResult<Vec<Task>> {
        self.run(ctx, "list_by_category", |repo| repo.list_by_category(category))
    }

    /// Creates a not-yet-done task.
    ///
    /// # Errors
    /// - `Validation` when `name` is blank; nothing is written.
    pub fn create(&self, ctx: &OpContext, name: &str, category: Category) -> StoreResult<Task> {
        let task = Task::new(name, category)?;
        self.run(ctx, "create", |repo| repo.create_task(&task))?;
        Ok(task)
    }

    /// Sets `done` to the negation of what the caller believes it is.
    ///
    /// # Errors
    /// - `NotFound` when `id` does not exist; nothing is written.
    pub fn toggle_done(
        &self,
        ctx: &OpContext,
        id: TaskId,
        current_done_hint: bool,
    ) -> StoreResult<()> {
        self.run(ctx, "toggle_done", |repo| {
            repo.set_done(id, !current_done_hint)
        })
    }

    /// Removes every completed task of `category`. Zero matches is not an error.
    pub fn delete_completed(&self, ctx: &OpContext, category: Category) -> StoreResult<()> {
        let removed = self.run(ctx, "delete_completed", |repo| repo.delete_done(category))?;
        debug!(
            "event=tasks_purged module=store category={} removed={}",
            category, removed
        );
        Ok(())
    }

    /// Releases the connection. Later operations fail with `Closed`.
    ///
    /// Calling this more than once is a no-op.
    pub fn shutdown(&self) -> StoreResult<()> {
        let Some(conn) = self.lock().take() else {
            return Ok(());
        };
        conn.close().map_err(|(_, err)| {
            error!("event=store_shutdown module=store status=error error={err}");
            backend(err.into())
        })?;
        info!("event=store_shutdown module=store status=ok");
        Ok(())
    }

    /// Whether `shutdown` has not run yet.
    pub fn is_open(&self) -> bool {
        self.lock().is_some()
    }

    fn lock(&self) -> MutexGuard<'_, Option<Connection>> {
        self.conn.lock()
    }

    /// Takes the connection handle, giving up once `ctx` aborts.
    fn lock_within(&self, ctx: &OpContext) -> StoreResult<MutexGuard<'_, Option<Connection>>> {
        if !ctx.is_bounded() {
            return Ok(self.lock());
        }
        loop {
            ctx.check()?;
            let slice = ctx.remaining().map_or(HANDLE_POLL, |left| left.min(HANDLE_POLL));
            if let Some(guard) = self.conn.try_lock_for(slice) {
                return Ok(guard);
            }
        }
    }

    fn run<T>(
        &self,
        ctx: &OpContext,
        op: &'static str,
        f: impl FnOnce(&SqliteTaskRepository<'_>) -> Result<T, RepoError>,
    ) -> StoreResult<T> {
        let started_at = Instant::now();
        let ctx = ctx.or_timeout(self.op_timeout);

        let result = self.run_bounded(&ctx, f);
        let duration_ms = started_at.elapsed().as_millis();
        match &result {
            Ok(_) => debug!(
                "event=task_store module=store op={op} status=ok duration_ms={duration_ms}"
            ),
            Err(err @ (StoreError::Validation(_) | StoreError::NotFound(_))) => info!(
                "event=task_store module=store op={op} status=rejected duration_ms={duration_ms} error_code={}",
                err.code()
            ),
            Err(err) => warn!(
                "event=task_store module=store op={op} status=error duration_ms={duration_ms} error_code={} error={err}",
                err.code()
            ),
        }
        result
    }

    fn run_bounded<T>(
        &self,
        ctx: &OpContext,
        f: impl FnOnce(&SqliteTaskRepository<'_>) -> Result<T, RepoError>,
    ) -> StoreResult<T> {
        ctx.check()?;
        let guard = self.lock_within(ctx)?;
        let conn = guard
            .as_ref()
            .ok_or(StoreError::StorageUnavailable(UnavailableReason::Closed))?;
        ctx.check()?;

        let _armed = ArmedConnection::arm(conn, ctx, self.busy_timeout)
            .map_err(|err| StoreError::from_repo(err.into(), ctx))?;
        let repo = SqliteTaskRepository::verified(conn);
        f(&repo).map_err(|err| StoreError::from_repo(err, ctx))
    }
}

impl Drop for TaskStore {
    fn drop(&mut self) {
        if let Err(err) = self.shutdown() {
            warn!("event=store_drop module=store status=error error={err}");
        }
    }
}

/// Installs the interrupt hooks for one operation and removes them on drop.
struct ArmedConnection<'conn> {
    conn: &'conn Connection,
    busy_timeout: Duration,
}

impl<'conn> ArmedConnection<'conn> {
    fn arm(
        conn: &'conn Connection,
        ctx: &OpContext,
        busy_timeout: Duration,
    ) -> rusqlite::Result<Self> {
        let wait = ctx
            .remaining()
            .map_or(busy_timeout, |remaining| ceil_millis(remaining).min(busy_timeout));
        conn.busy_timeout(wait)?;

        let poll = ctx.clone();
        conn.progress_handler(PROGRESS_POLL_OPS, Some(move || poll.check().is_err()));
        Ok(Self { conn, busy_timeout })
    }
}

impl Drop for ArmedConnection<'_> {
    fn drop(&mut self) {
        self.conn.progress_handler(PROGRESS_POLL_OPS, None::<fn() -> bool>);
        if let Err(err) = self.conn.busy_timeout(self.busy_timeout) {
            warn!("event=store_disarm module=store status=error error={err}");
        }
    }
}

/// SQLite counts the busy timeout in whole milliseconds; never round below the deadline.
fn ceil_millis(duration: Duration) -> Duration {
    let millis = duration.as_micros().div_ceil(1000);
    Duration::from_millis(u64::try_from(millis).unwrap_or(u64::MAX))
}

fn backend(err: RepoError) -> StoreError {
    StoreError::StorageUnavailable(UnavailableReason::Backend(err))
}
