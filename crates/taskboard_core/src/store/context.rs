//! Per-operation deadline and cancellation signal.
//!
//! # Invariants
//! - A context past its deadline or cancelled never starts a statement.
//! - Cancellation is sticky: once set, a flag stays cancelled.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Shared cancellation switch, cheap to clone across threads.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation of every operation observing this flag.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Why a context refused to continue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Abort {
    DeadlineExceeded,
    Cancelled,
}

/// Caller-supplied bounds for one store operation.
#[derive(Debug, Clone, Default)]
pub struct OpContext {
    deadline: Option<Instant>,
    cancel: Option<CancelFlag>,
}

impl OpContext {
    /// Unbounded context: no deadline, no cancellation.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self::new().deadline(Instant::now() + timeout)
    }

    pub fn deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn cancel_on(mut self, flag: CancelFlag) -> Self {
        self.cancel = Some(flag);
        self
    }

    /// Fills in `fallback` as the timeout when the caller set no deadline.
    pub(crate) fn or_timeout(&self, fallback: Option<Duration>) -> Self {
        match (self.deadline, fallback) {
            (None, Some(timeout)) => self.clone().deadline(Instant::now() + timeout),
            _ => self.clone(),
        }
    }

    /// Time left before the deadline, `None` when unbounded.
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|deadline| deadline.saturating_duration_since(Instant::now()))
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(CancelFlag::is_cancelled)
    }

    /// Whether a deadline or a cancellation flag can ever stop this context.
    pub fn is_bounded(&self) -> bool {
        self.deadline.is_some() || self.cancel.is_some()
    }

    /// Returns the reason to stop, cancellation taking precedence.
    pub fn check(&self) -> Result<(), Abort> {
        if self.is_cancelled() {
            return Err(Abort::Cancelled);
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Err(Abort::DeadlineExceeded),
            _ => Ok(()),
        }
    }
}
