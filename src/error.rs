// src/error.rs

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::fmt;

/// Global Application Error Enum.
/// Centralizes the state-machine and persistence error taxonomy and its
/// mapping to HTTP responses.
#[derive(Debug)]
pub enum AppError {
    // 409 Conflict - operation attempted in a state that forbids it
    // (e.g., selecting an answer after submission).
    InvalidStateTransition(String),

    // 400 Bad Request - question or option index outside bounds.
    // Always a caller bug; answer selection is never silently clamped.
    OutOfRange(String),

    // 422 Unprocessable - submit called with unanswered questions.
    // Carries the first gap so the UI can steer the student back to it.
    IncompleteAttempt { first_unanswered: usize },

    // 409 Conflict - only the exact active lesson may be completed.
    LessonLocked(String),

    // 409 Conflict - all lessons of the course are already done.
    CourseAlreadyComplete,

    // 409 Conflict - quiz already completed and the retake policy is 'deny'.
    RetakeNotAllowed,

    // 422 Unprocessable - quiz content unusable (no questions, empty answer key).
    InvalidQuiz(String),

    // 404 Not Found
    NotFound(String),

    // 400 Bad Request
    BadRequest(String),

    // 401 Unauthorized
    AuthError(String),

    // 503 Service Unavailable - transient gateway failure. Safe to retry
    // reads; for writes the caller must re-fetch state before proceeding.
    PersistenceUnavailable(String),

    // 500 Internal Server Error
    InternalServerError(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

impl std::error::Error for AppError {}

/// Implements `IntoResponse` for `AppError`.
/// Converts the error into a JSON response with appropriate HTTP status code.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            AppError::InvalidStateTransition(msg) => (StatusCode::CONFLICT, json!({ "error": msg })),
            AppError::OutOfRange(msg) => (StatusCode::BAD_REQUEST, json!({ "error": msg })),
            AppError::IncompleteAttempt { first_unanswered } => (
                StatusCode::UNPROCESSABLE_ENTITY,
                json!({
                    "error": format!("Question {} has not been answered yet", first_unanswered),
                    "first_unanswered": first_unanswered,
                }),
            ),
            AppError::LessonLocked(msg) => (StatusCode::CONFLICT, json!({ "error": msg })),
            AppError::CourseAlreadyComplete => (
                StatusCode::CONFLICT,
                json!({ "error": "All lessons of this course are already completed" }),
            ),
            AppError::RetakeNotAllowed => (
                StatusCode::CONFLICT,
                json!({ "error": "This quiz was already completed and retakes are disabled" }),
            ),
            AppError::InvalidQuiz(msg) => {
                (StatusCode::UNPROCESSABLE_ENTITY, json!({ "error": msg }))
            }
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, json!({ "error": msg })),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, json!({ "error": msg })),
            AppError::AuthError(msg) => (StatusCode::UNAUTHORIZED, json!({ "error": msg })),
            AppError::PersistenceUnavailable(msg) => {
                tracing::warn!("Persistence unavailable: {}", msg);
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    json!({ "error": "Storage is temporarily unavailable", "retryable": true }),
                )
            }
            AppError::InternalServerError(msg) => {
                tracing::error!("Internal Server Error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "error": "Internal Server Error" }),
                )
            }
        };

        (status, Json(body)).into_response()
    }
}

/// Converts `sqlx::Error` into `AppError::PersistenceUnavailable`.
/// Gateway round-trips are the subsystem's only suspension points and their
/// failures are treated as transient: the caller retries or re-fetches.
impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::PersistenceUnavailable(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::BadRequest(err.to_string())
    }
}
