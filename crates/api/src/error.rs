//! API error types with HTTP response mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use saga::DocumentError;
use views::ViewError;

/// API-level error type that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// Resource not found.
    NotFound(String),
    /// Bad request from the client.
    BadRequest(String),
    /// Document service error.
    Document(DocumentError),
    /// Read side error.
    View(ViewError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, error_body(msg)),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, error_body(msg)),
            ApiError::Document(err) => document_error_to_response(err),
            ApiError::View(err) => view_error_to_response(err),
        };

        (status, axum::Json(body)).into_response()
    }
}

fn error_body(message: String) -> serde_json::Value {
    serde_json::json!({ "error": message })
}

fn document_error_to_response(err: DocumentError) -> (StatusCode, serde_json::Value) {
    let message = err.to_string();
    match err {
        DocumentError::Validation(_) => (StatusCode::BAD_REQUEST, error_body(message)),
        DocumentError::NotFound { .. } => (StatusCode::NOT_FOUND, error_body(message)),
        DocumentError::Conflict { .. } => (StatusCode::CONFLICT, error_body(message)),
        DocumentError::Ledger {
            step, document_id, ..
        } => {
            tracing::warn!(%document_id, step, error = %message, "ledger step failed");
            (
                StatusCode::BAD_GATEWAY,
                serde_json::json!({
                    "error": message,
                    "step": step,
                    "document_id": document_id,
                }),
            )
        }
        DocumentError::Persistence { step, .. } => {
            tracing::error!(step, error = %message, "persistence failure");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                serde_json::json!({ "error": message, "step": step }),
            )
        }
        DocumentError::PartialFailure {
            step,
            document_id,
            failed_compensations,
            ..
        } => {
            tracing::error!(%document_id, step, error = %message, "reconciliation required");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                serde_json::json!({
                    "error": message,
                    "step": step,
                    "document_id": document_id,
                    "reconciliation_required": true,
                    "failed_compensations": failed_compensations,
                }),
            )
        }
    }
}

fn view_error_to_response(err: ViewError) -> (StatusCode, serde_json::Value) {
    let status = match &err {
        ViewError::Validation(_) => StatusCode::BAD_REQUEST,
        ViewError::NotFound(_) => StatusCode::NOT_FOUND,
        ViewError::Store(_) => {
            tracing::error!(error = %err, "read failed");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    (status, error_body(err.to_string()))
}

impl From<DocumentError> for ApiError {
    fn from(err: DocumentError) -> Self {
        ApiError::Document(err)
    }
}

impl From<ViewError> for ApiError {
    fn from(err: ViewError) -> Self {
        ApiError::View(err)
    }
}
