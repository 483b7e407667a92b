//! Domain error types.
//!
//! Every controlled failure carries a stable machine-readable code plus a
//! human message. The gateway maps errors to HTTP exactly once, through
//! `IntoResponse`; services never format HTTP responses themselves.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

/// Closed set of domain error kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// 409: unique field (pseudonym, public key) already taken
    AlreadyExists,
    /// 404: the referenced entity does not exist
    NotFound,
    /// 401: challenge signature rejected (also covers "no active challenge")
    InvalidSignature,
    /// 401: token malformed, expired, revoked or unknown
    Unauthorized,
    /// 400: malformed input (e.g. wrong recovery-phrase-hash count)
    ValidationError,
    /// 500: anything unexpected, details never leave the process
    Internal,
}

impl ErrorCode {
    /// Stable wire code.
    pub fn name(self) -> &'static str {
        match self {
            Self::AlreadyExists => "ALREADY_EXISTS",
            Self::NotFound => "NOT_FOUND",
            Self::InvalidSignature => "INVALID_SIGNATURE",
            Self::Unauthorized => "UNAUTHORIZED",
            Self::ValidationError => "VALIDATION_ERROR",
            Self::Internal => "UNEXPECTED_ERROR",
        }
    }

    /// HTTP status the gateway responds with.
    pub fn http_status(self) -> StatusCode {
        match self {
            Self::AlreadyExists => StatusCode::CONFLICT,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::InvalidSignature | Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::ValidationError => StatusCode::BAD_REQUEST,
            Self::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Application error: code + message pair.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{}: {message}", .code.name())]
pub struct AppError {
    pub code: ErrorCode,
    pub message: String,
}

impl AppError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn already_exists(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::AlreadyExists, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::NotFound, message)
    }

    pub fn invalid_signature(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidSignature, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Unauthorized, message)
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ValidationError, message)
    }

    /// Opaque 500. The cause is logged, never surfaced.
    pub fn internal() -> Self {
        Self::new(ErrorCode::Internal, "Internal server error")
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        tracing::error!("unexpected failure: {:?}", err);
        Self::internal()
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        Self::validation(err.to_string())
    }
}

/// JSON error body: `{code, error, message}`, where `code` repeats the
/// HTTP status and `error` is the stable machine-readable code.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: u16,
    pub error: &'static str,
    pub message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.code.http_status();
        let body = ErrorBody {
            code: status.as_u16(),
            error: self.code.name(),
            message: self.message,
        };
        (status, Json(body)).into_response()
    }
}
