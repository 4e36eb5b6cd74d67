//! Error types for the Fiks IO client.

use thiserror::Error;

/// Result type alias for client operations
pub type FiksIoResult<T> = Result<T, FiksIoError>;

/// Main error type for the Fiks IO client
#[derive(Debug, Error)]
pub enum FiksIoError {
    #[error("Not found: {what}")]
    NotFound { what: String },

    #[error("Invalid request: {message}")]
    InvalidRequest { message: String },

    #[error("Unauthorized: {message}")]
    Unauthorized { message: String },

    #[error("Operation canceled")]
    Canceled,

    #[error("Payload I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Transport failure: {message}")]
    Transport { message: String },

    #[error("Authentication failed: {message}")]
    Auth { message: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Undecodable delivery: {message}")]
    Delivery { message: String },

    #[error("JSON serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl FiksIoError {
    /// Create a not found error
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound { what: what.into() }
    }

    /// Create an invalid request error
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest {
            message: message.into(),
        }
    }

    /// Create an unauthorized error
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized {
            message: message.into(),
        }
    }

    /// Create a transport error
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    /// Create an authentication error
    pub fn auth(message: impl Into<String>) -> Self {
        Self::Auth {
            message: message.into(),
        }
    }

    /// Create a configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create a delivery decoding error
    pub fn delivery(message: impl Into<String>) -> Self {
        Self::Delivery {
            message: message.into(),
        }
    }

    /// Whether this error is the user-initiated cancellation rather than a real failure.
    pub fn is_canceled(&self) -> bool {
        matches!(self, Self::Canceled)
    }
}

impl From<reqwest::Error> for FiksIoError {
    fn from(err: reqwest::Error) -> Self {
        Self::Transport {
            message: format!("HTTP error: {}", err),
        }
    }
}

impl From<redis::RedisError> for FiksIoError {
    fn from(err: redis::RedisError) -> Self {
        Self::Transport {
            message: format!("Redis error: {}", err),
        }
    }
}

impl From<jsonwebtoken::errors::Error> for FiksIoError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        Self::Auth {
            message: format!("JWT error: {}", err),
        }
    }
}
