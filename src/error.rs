//! Error types shared across the service.
//!
//! `ApiError` implements `IntoResponse` so handlers can return `ApiResult<T>`
//! instead of building `(StatusCode, Json<..>)` tuples by hand.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use utoipa::ToSchema;

/// Invalid environment configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("{name} must be a valid {expected} (got '{value}')")]
    InvalidValue {
        name: &'static str,
        expected: &'static str,
        value: String,
    },

    #[error("{name} must be set when {reason}")]
    Missing {
        name: &'static str,
        reason: &'static str,
    },
}

/// Persistence failures.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("database unavailable: {0}")]
    Unavailable(String),

    #[error("database error: {0}")]
    Backend(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    /// A unique key already holds a record.
    #[error("duplicate record: {0}")]
    Duplicate(String),
}

/// MongoDB's duplicate key server error.
const DUPLICATE_KEY_CODE: i32 = 11000;

impl From<mongodb::error::Error> for StoreError {
    fn from(err: mongodb::error::Error) -> Self {
        use mongodb::error::{ErrorKind, WriteFailure};
        match *err.kind {
            ErrorKind::ServerSelection { .. } | ErrorKind::Io(_) | ErrorKind::DnsResolve { .. } => {
                StoreError::Unavailable(err.to_string())
            }
            ErrorKind::Write(WriteFailure::WriteError(ref write))
                if write.code == DUPLICATE_KEY_CODE =>
            {
                StoreError::Duplicate(write.message.clone())
            }
            _ => StoreError::Backend(err.to_string()),
        }
    }
}

impl From<mongodb::bson::ser::Error> for StoreError {
    fn from(err: mongodb::bson::ser::Error) -> Self {
        StoreError::Serialization(err.to_string())
    }
}

impl From<mongodb::bson::de::Error> for StoreError {
    fn from(err: mongodb::bson::de::Error) -> Self {
        StoreError::Serialization(err.to_string())
    }
}

/// Alert delivery failures.
#[derive(Error, Debug)]
pub enum NotifyError {
    #[error("email alerts are disabled")]
    Disabled,

    #[error("invalid address '{address}': {reason}")]
    InvalidAddress { address: String, reason: String },

    #[error("failed to build message: {0}")]
    Message(String),

    #[error("SMTP transport error: {0}")]
    Transport(String),
}

/// A rejected monitor or alert definition.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct ValidationError(pub String);

impl ValidationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Error body, `{"detail": "..."}`.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    pub detail: String,
}

#[derive(Debug)]
pub enum ApiError {
    /// 404
    NotFound(String),
    /// 400
    BadRequest(String),
    /// 422 - body could not be parsed
    Unprocessable(String),
    /// 503
    ServiceUnavailable(String),
    /// 500
    Internal(String),
}

impl ApiError {
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest(message.into())
    }

    pub fn unprocessable(message: impl Into<String>) -> Self {
        Self::Unprocessable(message.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unprocessable(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn into_message(self) -> String {
        match self {
            ApiError::NotFound(m)
            | ApiError::BadRequest(m)
            | ApiError::Unprocessable(m)
            | ApiError::ServiceUnavailable(m)
            | ApiError::Internal(m) => m,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(status = status.as_u16(), "{}", self);
        }
        let body = ErrorResponse {
            detail: self.into_message(),
        };
        (status, Json(body)).into_response()
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ApiError::NotFound(m) => write!(f, "Not found: {}", m),
            ApiError::BadRequest(m) => write!(f, "Bad request: {}", m),
            ApiError::Unprocessable(m) => write!(f, "Unprocessable: {}", m),
            ApiError::ServiceUnavailable(m) => write!(f, "Service unavailable: {}", m),
            ApiError::Internal(m) => write!(f, "Internal error: {}", m),
        }
    }
}

impl std::error::Error for ApiError {}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Unavailable(reason) => {
                tracing::warn!("store unavailable: {}", reason);
                ApiError::ServiceUnavailable("Database not available".to_string())
            }
            StoreError::Duplicate(reason) => ApiError::BadRequest(reason),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError::BadRequest(err.0)
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
