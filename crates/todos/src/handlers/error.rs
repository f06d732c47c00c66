use axum::{
    extract::rejection::BytesRejection,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use thiserror::Error;

use todos_core::storage::StorageError;
use todos_core::todo::TodoError;

/// Every failure an API request can end in.
///
/// All of them are reported the same way: 500 with the error message as a
/// plain-text body. That includes a request body that could not be read.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Todo(#[from] TodoError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Body(#[from] BytesRejection),
    #[error("No storage connection is attached to this request")]
    MissingConnection,
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        StatusCode::INTERNAL_SERVER_ERROR
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let mut message = self.to_string();
        if message.is_empty() {
            message = status.canonical_reason().unwrap_or_default().to_string();
        }

        tracing::error!(status = %status, error = %message, "API error");

        (
            status,
            [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
            message,
        )
            .into_response()
    }
}
