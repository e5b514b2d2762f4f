//! HTTP front end for the task board: routes, HTML rendering, static assets.

pub mod config;
pub mod error;
pub mod handlers;
pub mod render;
pub mod server;
pub mod state;

pub use config::{ConfigError, WebConfig};
pub use error::WebError;
pub use server::{serve, StartupError};
pub use state::AppState;

use axum::routing::{get, post};
use axum::Router;
use std::path::Path;
use tower_http::services::ServeDir;

/// Builds the full router: list pages, form endpoints and `/static/`.
pub fn create_router(state: AppState, static_dir: impl AsRef<Path>) -> Router {
    Router::new()
        .route("/", get(handlers::list_today))
        .route("/work", get(handlers::list_work))
        .route("/check", post(handlers::check))
        .route("/submit", post(handlers::submit))
        .route("/delete", post(handlers::delete))
        .nest_service("/static", ServeDir::new(static_dir.as_ref()))
        .with_state(state)
}
