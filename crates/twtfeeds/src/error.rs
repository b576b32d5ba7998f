//! Conversion of core errors into HTTP responses

use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use thiserror::Error;
use tracing::{error, warn};
use twtfeeds_core::{ErrorClass, FeedsError};

/// Handler error; renders as exactly one status with a minimal message
#[derive(Error, Debug)]
#[error(transparent)]
pub struct ApiError(#[from] pub FeedsError);

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self.0.class() {
            ErrorClass::NotFound => StatusCode::NOT_FOUND,
            ErrorClass::BadRequest => StatusCode::BAD_REQUEST,
            ErrorClass::Conflict => StatusCode::CONFLICT,
            ErrorClass::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        match self.0.class() {
            ErrorClass::Internal => error!(error = %self.0, "request failed"),
            _ => warn!(error = %self.0, status = status.as_u16(), "request rejected"),
        }
        let message = status.canonical_reason().unwrap_or("Error");
        (
            status,
            [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
            message,
        )
            .into_response()
    }
}
