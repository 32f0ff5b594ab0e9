/// Unified Error Handling Module
///
/// Every failure in the credential/session subsystem maps onto one of five
/// caller-visible kinds (BadRequest, Conflict, NotFound, Unauthorized,
/// Internal). Handlers return `Result<_, AppError>` and actix renders the
/// structured JSON body through the `ResponseError` impl.

use actix_web::{error::ResponseError, http::StatusCode, HttpResponse};
use std::error::Error as StdError;
use std::fmt;

use crate::validators::ValidationError;

/// Central application error type.
///
/// The message is what the client sees; it must stay generic on the
/// authentication paths (no username-vs-email hints, no token-failure cause).
#[derive(Debug)]
pub enum AppError {
    BadRequest(String),
    Conflict(String),
    NotFound(String),
    Unauthorized(String),
    Internal(String),
}

impl AppError {
    fn code(&self) -> &'static str {
        match self {
            AppError::BadRequest(_) => "BAD_REQUEST",
            AppError::Conflict(_) => "CONFLICT",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::Unauthorized(_) => "UNAUTHORIZED",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    fn log(&self, error_id: &str) {
        match self {
            AppError::BadRequest(msg) => {
                tracing::warn!(error_id = error_id, error = %msg, "Bad request");
            }
            AppError::Conflict(msg) => {
                tracing::warn!(error_id = error_id, error = %msg, "Duplicate entry attempt");
            }
            AppError::NotFound(msg) => {
                tracing::warn!(error_id = error_id, error = %msg, "Not found");
            }
            AppError::Unauthorized(msg) => {
                tracing::warn!(error_id = error_id, error = %msg, "Authentication failure");
            }
            AppError::Internal(msg) => {
                tracing::error!(error_id = error_id, error = %msg, "Internal error");
            }
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::BadRequest(msg)
            | AppError::Conflict(msg)
            | AppError::NotFound(msg)
            | AppError::Unauthorized(msg) => write!(f, "{}", msg),
            AppError::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl StdError for AppError {}

impl From<ValidationError> for AppError {
    fn from(err: ValidationError) -> Self {
        AppError::BadRequest(err.to_string())
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(ref db_err) = err {
            // 23505 = unique_violation; uniqueness is enforced by the
            // constraint itself, not by a racy pre-check.
            if db_err.code().as_deref() == Some("23505") {
                return AppError::Conflict(
                    "User with this username or email already exists".to_string(),
                );
            }
        }

        match err {
            sqlx::Error::RowNotFound => AppError::NotFound("Record not found".to_string()),
            other => AppError::Internal(other.to_string()),
        }
    }
}

/// JSON body returned for every failed request.
#[derive(Debug, serde::Serialize)]
pub struct ErrorResponse {
    /// Unique error ID for log correlation
    pub error_id: String,
    pub message: String,
    pub code: String,
    pub status: u16,
    pub timestamp: String,
}

impl ErrorResponse {
    pub fn new(error_id: String, message: String, code: String, status: u16) -> Self {
        Self {
            error_id,
            message,
            code,
            status,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let error_id = uuid::Uuid::new_v4().to_string();
        self.log(&error_id);

        let status = self.status_code();
        let message = match self {
            // Internal details never reach the client.
            AppError::Internal(_) => "Internal server error".to_string(),
            other => other.to_string(),
        };

        HttpResponse::build(status).json(ErrorResponse::new(
            error_id,
            message,
            self.code().to_string(),
            status.as_u16(),
        ))
    }
}
