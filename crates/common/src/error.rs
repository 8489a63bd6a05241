//! Error types for pollbox.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

/// Application result type.
pub type AppResult<T> = Result<T, AppError>;

/// Application error type.
#[derive(Debug, Error)]
pub enum AppError {
    // === Client Errors ===
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Validation error: {0}")]
    Validation(String),

    // === Vote Admission Rejections ===
    #[error("Poll is inactive or does not exist: {0}")]
    PollInactiveOrMissing(String),

    #[error("Poll has expired: {0}")]
    PollExpired(String),

    #[error("Invalid option: {0}")]
    InvalidOption(String),

    #[error("Already voted on poll: {0}")]
    DuplicateVote(String),

    // === Server Errors ===
    #[error("Database error: {0}")]
    Database(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            // 4xx Client Errors
            Self::NotFound(_) | Self::PollInactiveOrMissing(_) => StatusCode::NOT_FOUND,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::Validation(_) | Self::InvalidOption(_) => StatusCode::BAD_REQUEST,
            Self::PollExpired(_) => StatusCode::GONE,
            Self::DuplicateVote(_) => StatusCode::CONFLICT,

            // 5xx Server Errors
            Self::Database(_) | Self::Config(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "NOT_FOUND",
            Self::Unauthorized => "UNAUTHORIZED",
            Self::Forbidden(_) => "FORBIDDEN",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::PollInactiveOrMissing(_) => "POLL_INACTIVE_OR_MISSING",
            Self::PollExpired(_) => "POLL_EXPIRED",
            Self::InvalidOption(_) => "INVALID_OPTION",
            Self::DuplicateVote(_) => "DUPLICATE_VOTE",
            Self::Database(_) => "DATABASE_ERROR",
            Self::Config(_) => "CONFIG_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Returns whether this error should be logged at error level.
    #[must_use]
    pub fn is_server_error(&self) -> bool {
        self.status_code().is_server_error()
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.error_code();

        // Log server errors
        if self.is_server_error() {
            tracing::error!(error = %self, code = code, "Server error occurred");
        } else {
            tracing::debug!(error = %self, code = code, "Client error occurred");
        }

        let body = Json(json!({
            "error": {
                "code": code,
                "message": self.to_string(),
            }
        }));

        (status, body).into_response()
    }
}

// === From implementations ===

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        Self::Validation(err.to_string())
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        Self::Config(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_admission_rejections_are_distinct() {
        let rejections = [
            AppError::PollInactiveOrMissing("p1".to_string()),
            AppError::PollExpired("p1".to_string()),
            AppError::InvalidOption("o1".to_string()),
            AppError::DuplicateVote("p1".to_string()),
        ];

        let mut codes: Vec<&str> = rejections.iter().map(AppError::error_code).collect();
        codes.sort_unstable();
        codes.dedup();

        assert_eq!(codes.len(), 4);
        assert!(
            rejections
                .iter()
                .all(|err| err.status_code().is_client_error())
        );
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(
            AppError::PollInactiveOrMissing(String::new()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::PollExpired(String::new()).status_code(),
            StatusCode::GONE
        );
        assert_eq!(
            AppError::InvalidOption(String::new()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::DuplicateVote(String::new()).status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(AppError::Unauthorized.status_code(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn test_storage_failures_are_server_errors() {
        assert!(AppError::Database("connection reset".to_string()).is_server_error());
        assert!(!AppError::Validation("title".to_string()).is_server_error());
    }
}
