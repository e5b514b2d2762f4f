//! Process bootstrap: logging, store, listener, graceful shutdown.
//!
//! # Invariants
//! - Any bootstrap failure is returned before the listener accepts requests.
//! - The store is shut down explicitly after the server stops.

use crate::config::{ConfigError, WebConfig};
use crate::create_router;
use crate::state::AppState;
use log::{error, info};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;
use taskboard_core::{init_logging, StoreError, TaskStore};
use tokio::net::TcpListener;

#[derive(Debug)]
pub enum StartupError {
    Config(ConfigError),
    Logging(String),
    Store(StoreError),
    Io(std::io::Error),
}

impl Display for StartupError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Config(err) => write!(f, "configuration error: {err}"),
            Self::Logging(message) => write!(f, "logging setup failed: {message}"),
            Self::Store(err) => write!(f, "cannot open task store: {err}"),
            Self::Io(err) => write!(f, "server I/O error: {err}"),
        }
    }
}

impl Error for StartupError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Config(err) => Some(err),
            Self::Logging(_) => None,
            Self::Store(err) => Some(err),
            Self::Io(err) => Some(err),
        }
    }
}

impl From<ConfigError> for StartupError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<StoreError> for StartupError {
    fn from(value: StoreError) -> Self {
        Self::Store(value)
    }
}

impl From<std::io::Error> for StartupError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

/// Runs the service until Ctrl-C.
pub async fn serve(config: WebConfig) -> Result<(), StartupError> {
    init_logging(&config.log_level, config.log_dir.as_deref()).map_err(StartupError::Logging)?;

    info!(
        "event=store_connect module=web status=start path={}",
        config.db_path.display()
    );
    let store = Arc::new(TaskStore::open(&config.store_config())?);

    let app = create_router(
        AppState::new(Arc::clone(&store), config.op_timeout),
        &config.static_dir,
    );
    let listener = TcpListener::bind(config.bind).await?;
    info!(
        "event=server_start module=web status=ok bind={}",
        config.bind
    );

    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await;

    info!("event=server_stop module=web status=ok");
    let closed = store.shutdown();
    served?;
    closed?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        // Without a signal handler the server runs until killed.
        error!("event=shutdown_signal module=web status=error error={err}");
        std::future::pending::<()>().await;
    }
}
