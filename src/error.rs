use thiserror::Error;

/// Errors returned by TextVision client operations.
#[derive(Error, Debug)]
pub enum ClientError {
    /// Network-level request failure with context.
    #[error("{context}: {source}")]
    Network {
        context: String,
        source: reqwest::Error,
    },

    /// The request did not complete within the configured timeout.
    #[error("Request timed out, check the network connection")]
    Timeout,

    /// The backend returned a non-success HTTP status.
    #[error("Backend returned HTTP {status}: {message}")]
    Http { status: u16, message: String },

    /// HTTP 401. The stored token has already been cleared.
    #[error("{0}")]
    Unauthorized(String),

    /// A 2xx response whose envelope carried a non-200 business code.
    #[error("{message} (code {code})")]
    Business { code: String, message: String },

    /// The response was missing expected fields or had an unknown shape.
    #[error("{0}")]
    InvalidResponse(String),

    /// A caller-supplied argument cannot be sent to the backend.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// A generation is already in flight and the store rejects concurrent submits.
    #[error("A generation is already in progress")]
    GenerationInFlight,

    /// Invalid client configuration.
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Token file I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ClientError {
    /// True when the session is gone and the user has to log in again.
    pub fn is_session_fatal(&self) -> bool {
        matches!(self, ClientError::Unauthorized(_))
    }
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, ClientError>;
