//! Error handling
//!
//! `AuthError` is the taxonomy every core operation returns. Authentication
//! failures are coarse; dependency failures collapse into
//! `Internal` whose detail is logged but never sent to the caller.

use actix_web::{error::ResponseError, http::StatusCode, HttpResponse};
use std::fmt;

use crate::auth::HashError;
use crate::store::StoreError;
use crate::validators::ValidationError;

/// Account field that violated a uniqueness constraint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictField {
    Email,
    Username,
}

impl fmt::Display for ConflictField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConflictField::Email => write!(f, "email"),
            ConflictField::Username => write!(f, "username"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("unauthorized")]
    Unauthorized,
    #[error("refresh token not valid")]
    TokenNotValid,
    #[error("{0} already exists")]
    AlreadyExists(ConflictField),
    #[error("user already deleted")]
    AlreadyDeleted,
    #[error("user not found")]
    NotFound,
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<StoreError> for AuthError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound => AuthError::NotFound,
            StoreError::Conflict(field) => AuthError::AlreadyExists(field),
            other => AuthError::Internal(other.to_string()),
        }
    }
}

impl From<HashError> for AuthError {
    fn from(err: HashError) -> Self {
        AuthError::Internal(err.to_string())
    }
}

impl AuthError {
    /// Stable machine-readable code for clients
    pub fn code(&self) -> &'static str {
        match self {
            AuthError::InvalidCredentials => "INVALID_CREDENTIALS",
            AuthError::Unauthorized => "UNAUTHORIZED",
            AuthError::TokenNotValid => "TOKEN_NOT_VALID",
            AuthError::AlreadyExists(ConflictField::Email) => "EMAIL_ALREADY_EXISTS",
            AuthError::AlreadyExists(ConflictField::Username) => "USERNAME_ALREADY_EXISTS",
            AuthError::AlreadyDeleted => "ALREADY_DELETED",
            AuthError::NotFound => "NOT_FOUND",
            AuthError::Validation(_) => "VALIDATION_ERROR",
            AuthError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Message safe to return to a caller
    pub fn public_message(&self) -> String {
        match self {
            AuthError::Internal(_) => "internal error".to_string(),
            other => other.to_string(),
        }
    }

    fn log(&self, request_id: &str) {
        match self {
            AuthError::Internal(detail) => {
                tracing::error!(request_id = request_id, error = %detail, "Internal error");
            }
            AuthError::Validation(e) => {
                tracing::debug!(request_id = request_id, error = %e, "Validation error");
            }
            other => {
                tracing::warn!(request_id = request_id, error = %other, "Request rejected");
            }
        }
    }
}

/// Error response structure for HTTP responses
#[derive(Debug, serde::Serialize)]
pub struct ErrorResponse {
    /// Unique error ID for tracking
    pub error_id: String,
    /// Human-readable error message
    pub message: String,
    /// Error code for client-side handling
    pub code: String,
    /// HTTP status code
    pub status: u16,
    /// Timestamp when error occurred
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

impl ResponseError for AuthError {
    fn status_code(&self) -> StatusCode {
        match self {
            AuthError::InvalidCredentials | AuthError::Unauthorized => StatusCode::UNAUTHORIZED,
            AuthError::TokenNotValid | AuthError::Validation(_) => StatusCode::BAD_REQUEST,
            AuthError::AlreadyExists(_) => StatusCode::CONFLICT,
            AuthError::AlreadyDeleted => StatusCode::FORBIDDEN,
            AuthError::NotFound => StatusCode::NOT_FOUND,
            AuthError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let request_id = uuid::Uuid::new_v4().to_string();
        self.log(&request_id);

        let status = self.status_code();
        HttpResponse::build(status).json(ErrorResponse::new(
            request_id,
            self.public_message(),
            self.code().to_string(),
            status.as_u16(),
        ))
    }
}

/// Error context for operation-scoped logging
#[derive(Debug, Clone)]
pub struct ErrorContext {
    pub request_id: String,
    pub operation: &'static str,
}

impl ErrorContext {
    pub fn new(operation: &'static str) -> Self {
        Self {
            request_id: uuid::Uuid::new_v4().to_string(),
            operation,
        }
    }

    pub fn log_error(&self, error: &AuthError) {
        match error {
            AuthError::Internal(_) => tracing::error!(
                request_id = %self.request_id,
                operation = self.operation,
                error = %error,
                "Operation failed"
            ),
            _ => tracing::debug!(
                request_id = %self.request_id,
                operation = self.operation,
                error = %error,
                "Operation rejected"
            ),
        }
    }
}
