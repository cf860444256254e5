use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use core_types::CoreError;
use database::DbError;
use enrollment::EnrollmentError;
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Enrollment error: {0}")]
    Enrollment(#[from] EnrollmentError),
    #[error("Database error: {0}")]
    Database(#[from] DbError),
    #[error("Validation error: {0}")]
    Validation(#[from] CoreError),
    #[error("Not found: {0}")]
    NotFound(String),
}

/// Converts our custom `AppError` into an HTTP response.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::Enrollment(err) => enrollment_status(err),
            AppError::Database(DbError::UniqueViolation(detail)) => {
                tracing::debug!(%detail, "Unique constraint rejected a write.");
                (StatusCode::CONFLICT, "Resource already exists".to_string())
            }
            AppError::Database(db_err) => {
                tracing::error!(error = ?db_err, "Database error.");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "An internal database error occurred".to_string(),
                )
            }
            AppError::Validation(err) => (StatusCode::BAD_REQUEST, err.to_string()),
            AppError::NotFound(message) => (StatusCode::NOT_FOUND, message),
        };

        let body = Json(json!({ "error": error_message }));
        (status, body).into_response()
    }
}

fn enrollment_status(err: EnrollmentError) -> (StatusCode, String) {
    match err {
        EnrollmentError::InvalidInput(_) | EnrollmentError::InvalidState(_) => {
            (StatusCode::BAD_REQUEST, err.to_string())
        }
        EnrollmentError::NotFound { .. } => (StatusCode::NOT_FOUND, err.to_string()),
        EnrollmentError::CapacityExceeded { .. }
        | EnrollmentError::DuplicateEnrollment { .. }
        | EnrollmentError::TransactionConflict { .. } => (StatusCode::CONFLICT, err.to_string()),
        // Already logged with full context by the enrollment layer.
        EnrollmentError::StorageFailure(_) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            "An error occurred while processing the enrollment".to_string(),
        ),
    }
}
