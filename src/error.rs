use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use thiserror::Error;

/// Fixed usage message for requests that do not name a target.
pub const USAGE_MESSAGE: &str = "Use /proxy?url=https://example.com";

/// Unified error type for the Mirage application
#[derive(Error, Debug)]
pub enum MirageError {
    // Request errors
    #[error("Use /proxy?url=https://example.com")]
    MissingTarget,

    #[error("Invalid target URL: {0}")]
    MalformedTarget(String),

    // Upstream errors
    #[error("{0}")]
    Fetch(String),

    // Configuration errors
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // Internal errors
    #[error("{0}")]
    Internal(String),
}

/// Result type alias for Mirage operations
pub type Result<T> = std::result::Result<T, MirageError>;

impl MirageError {
    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            // 400 Bad Request
            MirageError::MissingTarget | MirageError::MalformedTarget(_) => {
                StatusCode::BAD_REQUEST
            }

            // 502 Bad Gateway: upstream failures and the unhandled-error fallback
            MirageError::Fetch(_) | MirageError::Internal(_) => StatusCode::BAD_GATEWAY,

            // 500 Internal Server Error (startup-time failures)
            MirageError::InvalidConfig(_) | MirageError::Io(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Check if this is a client error (4xx)
    pub fn is_client_error(&self) -> bool {
        self.status_code().is_client_error()
    }

    /// Check if this is a server error (5xx)
    pub fn is_server_error(&self) -> bool {
        self.status_code().is_server_error()
    }
}

// Every request error converts to a plain-text response; nothing propagates
// far enough to tear down the server.
impl IntoResponse for MirageError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = match &self {
            MirageError::MissingTarget => USAGE_MESSAGE.to_string(),
            MirageError::MalformedTarget(_) => self.to_string(),
            _ => format!("Proxy failed: {}", self),
        };

        (
            status,
            [(header::CONTENT_TYPE, "text/plain")],
            body,
        )
            .into_response()
    }
}

// Convert from URL parse errors
impl From<url::ParseError> for MirageError {
    fn from(err: url::ParseError) -> Self {
        MirageError::MalformedTarget(err.to_string())
    }
}
