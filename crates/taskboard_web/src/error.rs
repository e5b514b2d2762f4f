//! HTTP mapping for request failures.
//!
//! Validation -> 400, not found -> 404, storage trouble -> 503. Nothing on
//! the request path panics; every failure becomes a response.

use crate::render::render_error;
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use log::{error, info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};
use taskboard_core::StoreError;

#[derive(Debug)]
pub enum WebError {
    Store(StoreError),
    /// Form input that never reached the store.
    BadRequest(String),
    /// The blocking worker running a store call died.
    Worker(tokio::task::JoinError),
}

impl WebError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Store(StoreError::Validation(_)) | Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Store(StoreError::NotFound(_)) => StatusCode::NOT_FOUND,
            Self::Store(StoreError::StorageUnavailable(_)) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Worker(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn code(&self) -> &'static str {
        match self {
            Self::Store(err) => err.code(),
            Self::BadRequest(_) => "bad_request",
            Self::Worker(_) => "worker_failed",
        }
    }
}

impl Display for WebError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Store(err) => write!(f, "{err}"),
            Self::BadRequest(message) => write!(f, "bad request: {message}"),
            Self::Worker(err) => write!(f, "store worker failed: {err}"),
        }
    }
}

impl Error for WebError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Store(err) => Some(err),
            Self::BadRequest(_) => None,
            Self::Worker(err) => Some(err),
        }
    }
}

impl From<StoreError> for WebError {
    fn from(value: StoreError) -> Self {
        Self::Store(value)
    }
}

impl IntoResponse for WebError {
    fn into_response(self) -> Response {
        let status = self.status();
        let code = self.code();
        if status.is_server_error() {
            error!(
                "event=http_request module=web status=error http_status={} error_code={code} error={self}",
                status.as_u16()
            );
        } else if status == StatusCode::NOT_FOUND {
            info!(
                "event=http_request module=web status=rejected http_status=404 error_code={code}"
            );
        } else {
            warn!(
                "event=http_request module=web status=rejected http_status={} error_code={code}",
                status.as_u16()
            );
        }

        let message = match &self {
            // Storage internals stay in the log.
            Self::Store(StoreError::StorageUnavailable(_)) | Self::Worker(_) => {
                "The task list is temporarily unavailable. Please try again.".to_string()
            }
            other => other.to_string(),
        };
        (status, Html(render_error(status, &message))).into_response()
    }
}
