//! HTTP error responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;
use tracing::{debug, warn};

use crate::service::TileError;

/// Errors returned by the tile endpoints.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The request path could not be parsed
    #[error("bad request: {0}")]
    BadRequest(String),

    /// The pipeline failed
    #[error(transparent)]
    Tile(#[from] TileError),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Tile(e) => {
                StatusCode::from_u16(e.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            warn!(status = status.as_u16(), error = %self, "Tile request failed");
        } else {
            debug!(status = status.as_u16(), error = %self, "Tile request rejected");
        }
        (status, self.to_string()).into_response()
    }
}
