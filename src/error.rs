// src/error.rs

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::fmt;

use crate::models::attempt::AttemptResult;

/// Global Application Error Enum.
/// Centralizes error handling and mapping to HTTP responses.
///
/// Business-rule violations each get a dedicated variant because every one of
/// them implies a different client action (retry, render the prior result,
/// stop editing, ...). All of them serialize with a stable `code` string.
#[derive(Debug)]
pub enum AppError {
    // 500 Internal Server Error
    InternalServerError(String),

    // 400 Bad Request
    BadRequest(String),

    // 401 Unauthorized
    AuthError(String),

    // 403 Forbidden (wrong role, non-owner instructor)
    Forbidden(String),

    // 404 Not Found
    NotFound(String),

    /// Quiz exists but has been soft-disabled by the instructor.
    QuizDisabled,

    /// The availability window has not opened yet.
    NotYetAvailable,

    /// The availability window has closed.
    WindowClosed,

    /// The caller is not in the quiz's roster snapshot.
    NotEnrolled,

    /// A submitted attempt already exists. Carries the prior result so the
    /// client can render it without re-querying.
    AlreadyCompleted(Box<AttemptResult>),

    /// Submit without an in-progress attempt.
    NoActiveAttempt,

    /// A concurrent or repeated submit lost the guarded update.
    AlreadySubmitted,

    /// Structural quiz fields cannot change once graded work exists.
    FrozenByAttempts,

    /// A quiz with submitted attempts cannot be deleted.
    HasSubmittedAttempts,
}

impl AppError {
    /// Stable machine-readable code for the client.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::InternalServerError(_) => "INTERNAL",
            AppError::BadRequest(_) => "BAD_REQUEST",
            AppError::AuthError(_) => "UNAUTHORIZED",
            AppError::Forbidden(_) => "FORBIDDEN",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::QuizDisabled => "QUIZ_DISABLED",
            AppError::NotYetAvailable => "NOT_YET_AVAILABLE",
            AppError::WindowClosed => "WINDOW_CLOSED",
            AppError::NotEnrolled => "NOT_ENROLLED",
            AppError::AlreadyCompleted(_) => "ALREADY_COMPLETED",
            AppError::NoActiveAttempt => "NO_ACTIVE_ATTEMPT",
            AppError::AlreadySubmitted => "ALREADY_SUBMITTED",
            AppError::FrozenByAttempts => "FROZEN_BY_ATTEMPTS",
            AppError::HasSubmittedAttempts => "HAS_SUBMITTED_ATTEMPTS",
        }
    }
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
        let code = self.code();
        let (status, error_message, context) = match self {
            AppError::InternalServerError(msg) => {
                tracing::error!("Internal Server Error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal Server Error".to_string(),
                    None,
                )
            }
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg, None),
            AppError::AuthError(msg) => (StatusCode::UNAUTHORIZED, msg, None),
            AppError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg, None),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg, None),
            AppError::QuizDisabled => (
                StatusCode::FORBIDDEN,
                "Quiz is currently disabled".to_string(),
                None,
            ),
            AppError::NotYetAvailable => (
                StatusCode::FORBIDDEN,
                "Quiz is not yet available".to_string(),
                None,
            ),
            AppError::WindowClosed => (
                StatusCode::FORBIDDEN,
                "Quiz availability window has closed".to_string(),
                None,
            ),
            AppError::NotEnrolled => (
                StatusCode::FORBIDDEN,
                "You are not enrolled in this quiz".to_string(),
                None,
            ),
            AppError::AlreadyCompleted(result) => (
                StatusCode::CONFLICT,
                "Quiz already completed".to_string(),
                Some(json!(result)),
            ),
            AppError::NoActiveAttempt => (
                StatusCode::CONFLICT,
                "No attempt in progress for this quiz".to_string(),
                None,
            ),
            AppError::AlreadySubmitted => (
                StatusCode::CONFLICT,
                "Attempt has already been submitted".to_string(),
                None,
            ),
            AppError::FrozenByAttempts => (
                StatusCode::CONFLICT,
                "Quiz structure is frozen because graded attempts exist".to_string(),
                None,
            ),
            AppError::HasSubmittedAttempts => (
                StatusCode::CONFLICT,
                "Quiz has submitted attempts and cannot be deleted".to_string(),
                None,
            ),
        };

        let mut body = json!({
            "error": error_message,
            "code": code,
        });
        if let Some(result) = context {
            body["result"] = result;
        }

        (status, Json(body)).into_response()
    }
}

/// Converts `sqlx::Error` into `AppError::InternalServerError`.
/// Allows using `?` operator on database queries.
impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::InternalServerError(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::BadRequest(err.to_string())
    }
}
