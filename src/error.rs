/// Error Handling Module
///
/// Unified error handling for the CRM service:
/// 1. Domain-specific errors (tokens, key material, repositories)
/// 2. The client-visible application error taxonomy
/// 3. HTTP response mapping with structured logging
/// 4. Error context enrichment for handler logs

use actix_web::{error::ResponseError, http::StatusCode, HttpResponse};
use std::error::Error as StdError;
use std::fmt;

/// ============================================================================
/// 1. DOMAIN-SPECIFIC ERROR TYPES
/// ============================================================================

/// Token signing and verification errors
///
/// Every verification failure is `Invalid`, whatever the cause.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenError {
    Invalid,
    Signing(String),
}

impl fmt::Display for TokenError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenError::Invalid => write!(f, "invalid token"),
            TokenError::Signing(msg) => write!(f, "token signing failed: {}", msg),
        }
    }
}

impl StdError for TokenError {}

/// Errors raised while loading EC key material
#[derive(Debug)]
pub enum KeyError {
    Read(String, std::io::Error),
    Parse(String),
}

impl fmt::Display for KeyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyError::Read(path, e) => write!(f, "cannot read key file {}: {}", path, e),
            KeyError::Parse(msg) => write!(f, "invalid EC key: {}", msg),
        }
    }
}

impl StdError for KeyError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            KeyError::Read(_, e) => Some(e),
            KeyError::Parse(_) => None,
        }
    }
}

/// Credential and profile store errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RepositoryError {
    UniqueViolation(String),
    Timeout,
    ConnectionPool(String),
    QueryExecution(String),
    Corrupted(String),
}

impl fmt::Display for RepositoryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RepositoryError::UniqueViolation(msg) => write!(f, "Duplicate entry: {}", msg),
            RepositoryError::Timeout => write!(f, "Repository call timed out"),
            RepositoryError::ConnectionPool(msg) => write!(f, "Database connection error: {}", msg),
            RepositoryError::QueryExecution(msg) => write!(f, "Query error: {}", msg),
            RepositoryError::Corrupted(msg) => write!(f, "Corrupted record: {}", msg),
        }
    }
}

impl StdError for RepositoryError {}

impl From<sqlx::Error> for RepositoryError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Database(db_err) if db_err.code().as_deref() == Some("23505") => {
                RepositoryError::UniqueViolation(db_err.message().to_string())
            }
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                RepositoryError::ConnectionPool(err.to_string())
            }
            _ => RepositoryError::QueryExecution(err.to_string()),
        }
    }
}

/// ============================================================================
/// 2. UNIFIED APPLICATION ERROR TYPE
/// ============================================================================

/// Closed set of errors a client can observe
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppError {
    /// Malformed or missing request fields
    InvalidBody(String),
    /// Bad credentials or an unusable token
    Unauthorized,
    /// Token no longer matches live user state
    RefreshExpired,
    /// Caller's role does not allow the operation
    InvalidRole,
    UsernameExists,
    /// Downstream failure; detail is logged, never returned
    Unhealthy(String),
    RecordNotFound,
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::InvalidBody(msg) => write!(f, "request invalid body: {}", msg),
            AppError::Unauthorized => write!(f, "unauthorized"),
            AppError::RefreshExpired => write!(f, "refresh token expired"),
            AppError::InvalidRole => write!(f, "invalid role"),
            AppError::UsernameExists => write!(f, "username already exists"),
            AppError::Unhealthy(msg) => write!(f, "unhealthy: {}", msg),
            AppError::RecordNotFound => write!(f, "record not found"),
        }
    }
}

impl StdError for AppError {}

// ============================================================================
// FROM IMPLEMENTATIONS
// ============================================================================

impl From<TokenError> for AppError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Invalid => AppError::Unauthorized,
            TokenError::Signing(msg) => AppError::Unhealthy(msg),
        }
    }
}

impl From<RepositoryError> for AppError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::UniqueViolation(_) => AppError::UsernameExists,
            other => AppError::Unhealthy(other.to_string()),
        }
    }
}

// ============================================================================
// 3. HTTP RESPONSE MAPPING
// ============================================================================

/// Error response body
#[derive(Debug, serde::Serialize, serde::Deserialize)]
pub struct ErrorResponse {
    /// Unique error ID for correlating with server logs
    pub error_id: String,
    pub message: String,
    /// Stable code for client-side handling
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

/// Trait for converting errors to HTTP responses with proper logging
pub trait ErrorHandler {
    fn error_response(&self, request_id: &str) -> (StatusCode, ErrorResponse);
    fn log_error(&self, request_id: &str);
}

impl AppError {
    /// Stable client-facing code
    pub fn code(&self) -> &'static str {
        match self {
            AppError::InvalidBody(_) => "INVALID_BODY",
            AppError::Unauthorized => "UNAUTHORIZED",
            AppError::RefreshExpired => "REFRESH_EXPIRED",
            AppError::InvalidRole => "INVALID_ROLE",
            AppError::UsernameExists => "USERNAME_EXISTS",
            AppError::Unhealthy(_) => "UNHEALTHY",
            AppError::RecordNotFound => "RECORD_NOT_FOUND",
        }
    }

    fn public_message(&self) -> &'static str {
        match self {
            AppError::InvalidBody(_) => "request invalid body",
            AppError::Unauthorized => "unauthorized",
            AppError::RefreshExpired => "refresh token expired",
            AppError::InvalidRole => "invalid role",
            AppError::UsernameExists => "username already exists",
            AppError::Unhealthy(_) => "service unhealthy",
            AppError::RecordNotFound => "record not found",
        }
    }
}

impl ErrorHandler for AppError {
    fn error_response(&self, request_id: &str) -> (StatusCode, ErrorResponse) {
        let status = ResponseError::status_code(self);
        let error_response = ErrorResponse::new(
            request_id.to_string(),
            self.public_message().to_string(),
            self.code().to_string(),
            status.as_u16(),
        );

        (status, error_response)
    }

    fn log_error(&self, request_id: &str) {
        match self {
            AppError::InvalidBody(e) => {
                tracing::warn!(request_id = request_id, error = %e, "Invalid request body");
            }
            AppError::Unhealthy(e) => {
                tracing::error!(request_id = request_id, error = %e, "Downstream failure");
            }
            AppError::RecordNotFound => {
                tracing::debug!(request_id = request_id, "Record not found");
            }
            _ => {
                tracing::warn!(request_id = request_id, error = %self, "Request rejected");
            }
        }
    }
}

/// Implement ResponseError for Actix-web integration
impl ResponseError for AppError {
    fn error_response(&self) -> HttpResponse {
        let request_id = uuid::Uuid::new_v4().to_string();
        self.log_error(&request_id);

        let (status, error_response) = <Self as ErrorHandler>::error_response(self, &request_id);

        HttpResponse::build(status).json(error_response)
    }

    fn status_code(&self) -> StatusCode {
        match self {
            AppError::InvalidBody(_) | AppError::InvalidRole | AppError::UsernameExists => {
                StatusCode::BAD_REQUEST
            }
            AppError::Unauthorized | AppError::RefreshExpired => StatusCode::UNAUTHORIZED,
            AppError::Unhealthy(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::RecordNotFound => StatusCode::NOT_FOUND,
        }
    }
}

// ============================================================================
// 4. ERROR CONTEXT ENRICHMENT
// ============================================================================

/// Per-request context attached to handler log lines
#[derive(Debug, Clone)]
pub struct ErrorContext {
    pub request_id: String,
    pub user_id: Option<String>,
    pub operation: String,
}

impl ErrorContext {
    pub fn new(operation: impl Into<String>) -> Self {
        Self {
            request_id: uuid::Uuid::new_v4().to_string(),
            user_id: None,
            operation: operation.into(),
        }
    }

    pub fn with_user_id(mut self, user_id: String) -> Self {
        self.user_id = Some(user_id);
        self
    }

    /// Log a failure and hand the error back for `?` propagation
    pub fn fail(&self, error: AppError) -> AppError {
        tracing::warn!(
            request_id = %self.request_id,
            operation = %self.operation,
            user_id = ?self.user_id,
            error = %error,
            "Operation failed"
        );
        error
    }
}
