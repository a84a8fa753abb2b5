//! Error types for the tips server.

use thiserror::Error;
use tips_core::{BrokerError, ErrorCategory};

/// Result type for server operations.
pub type ServerResult<T> = Result<T, ServerError>;

/// Errors that can occur in the tips server.
#[derive(Error, Debug)]
pub enum ServerError {
    /// The broker rejected the operation.
    #[error(transparent)]
    Broker(#[from] BrokerError),

    /// Malformed request line or field.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),

    /// I/O error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl ServerError {
    /// Returns the HTTP-style status code for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            ServerError::Broker(err) => match err.category() {
                ErrorCategory::NotFound => 404,
                ErrorCategory::AlreadyExists => 409,
                ErrorCategory::InvalidArgument => 400,
                ErrorCategory::Internal => 500,
            },
            ServerError::InvalidRequest(_) => 400,
            ServerError::Internal(_) | ServerError::Io(_) => 500,
        }
    }

    /// Returns true if this is a client error (4xx).
    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.status_code())
    }

    /// Returns true if this is a server error (5xx).
    pub fn is_server_error(&self) -> bool {
        self.status_code() >= 500
    }
}
