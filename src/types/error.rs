//! Error types for EaseForm

use hyper::StatusCode;

/// Main error type for EaseForm operations
#[derive(Debug, thiserror::Error)]
pub enum EaseformError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Could not validate credentials: {0}")]
    Unauthenticated(String),

    /// Resource exists but is owned by another host.
    ///
    /// Internal only: `status_code` maps this to 404 and the message is
    /// written to match the not-found message for the same resource, so a
    /// foreign resource is indistinguishable from a missing one at the
    /// boundary. The variant survives for logging.
    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("This form is no longer accepting responses")]
    AcceptanceClosed,

    #[error("You have already submitted a response to this form")]
    DuplicateConflict,

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Failed to initialize host profile: {0}")]
    Bootstrap(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl EaseformError {
    /// Convert error to HTTP status code
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::NOT_FOUND,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::AcceptanceClosed => StatusCode::BAD_REQUEST,
            Self::DuplicateConflict => StatusCode::CONFLICT,
            Self::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Bootstrap(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message for the response body.
    ///
    /// Storage detail is only exposed when `include_detail` is set (the
    /// development environment); production callers get an opaque line.
    pub fn public_message(&self, include_detail: bool) -> String {
        match self {
            Self::Storage(_) | Self::Internal(_) if !include_detail => {
                "Internal server error occurred".to_string()
            }
            other => other.to_string(),
        }
    }
}

// Implement From conversions for common error types

impl From<std::io::Error> for EaseformError {
    fn from(err: std::io::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

impl From<serde_json::Error> for EaseformError {
    fn from(err: serde_json::Error) -> Self {
        Self::BadRequest(format!("JSON error: {}", err))
    }
}

impl From<hyper::Error> for EaseformError {
    fn from(err: hyper::Error) -> Self {
        Self::Internal(format!("HTTP error: {}", err))
    }
}

impl From<reqwest::Error> for EaseformError {
    fn from(err: reqwest::Error) -> Self {
        Self::Storage(err.to_string())
    }
}

impl From<jsonwebtoken::errors::Error> for EaseformError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        Self::Unauthenticated(format!("JWT error: {}", err))
    }
}

/// Result type alias for EaseForm operations
pub type Result<T> = std::result::Result<T, EaseformError>;
