//! Shared handler state and the bridge from async handlers to the blocking store.

use crate::error::WebError;
use std::sync::Arc;
use std::time::Duration;
use taskboard_core::{CancelFlag, OpContext, StoreResult, TaskStore};

#[derive(Clone)]
pub struct AppState {
    store: Arc<TaskStore>,
    op_timeout: Duration,
}

impl AppState {
    pub fn new(store: Arc<TaskStore>, op_timeout: Duration) -> Self {
        Self { store, op_timeout }
    }

    /// Runs one store operation on the blocking pool.
    ///
    /// The operation gets the configured deadline and is cancelled if the
    /// request future is dropped before it finishes.
    pub async fn call<T, F>(&self, op: F) -> Result<T, WebError>
    where
        T: Send + 'static,
        F: FnOnce(&TaskStore, &OpContext) -> StoreResult<T> + Send + 'static,
    {
        let flag = CancelFlag::new();
        let ctx = OpContext::with_timeout(self.op_timeout).cancel_on(flag.clone());
        let _cancel_on_drop = CancelOnDrop(flag);

        let store = Arc::clone(&self.store);
        let result = tokio::task::spawn_blocking(move || op(&store, &ctx))
            .await
            .map_err(WebError::Worker)?;
        Ok(result?)
    }
}

struct CancelOnDrop(CancelFlag);

impl Drop for CancelOnDrop {
    fn drop(&mut self) {
        self.0.cancel();
    }
}
