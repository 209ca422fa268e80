//! Error types for llmux.

use thiserror::Error;

/// Primary error type for all llmux operations.
#[derive(Error, Debug)]
pub enum LlmuxError {
    #[error("{provider}: missing API key; set {env_var} (create a key at {console_url})")]
    MissingCredential {
        provider: String,
        env_var: String,
        console_url: String,
    },

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("unsupported provider '{name}'; known providers: {known}")]
    UnsupportedProvider { name: String, known: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("{provider}: connection failed: {source}. {guidance}")]
    Connection {
        provider: String,
        guidance: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("request cancelled")]
    Cancelled,

    #[error("request deadline exceeded")]
    DeadlineExceeded,

    #[error("{provider}: authentication failed (status 401): {message}")]
    Authentication { provider: String, message: String },

    #[error("{provider}: rate limit exceeded (status 429): {message}")]
    RateLimited { provider: String, message: String },

    #[error("{provider}: API error (status {status}): {message}")]
    Api {
        provider: String,
        status: u16,
        message: String,
    },

    #[error("{provider}: unknown API error (status {status})")]
    UnknownApi { provider: String, status: u16 },

    #[error("{provider}: request failed with status {status}: {body}")]
    RequestFailed {
        provider: String,
        status: u16,
        body: String,
    },

    #[error("{provider}: failed to parse response: {source}")]
    Parse {
        provider: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("{provider}: response contained no content")]
    NoContent { provider: String },

    #[error("{provider}: returned invalid JSON: {source}")]
    InvalidJson {
        provider: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Broad error category, following the failure stage that produced the error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Detected before any network activity.
    Precondition,
    Transport,
    Cancelled,
    /// The service answered with a non-success status.
    Http,
    Parse,
    /// Programmer error inside llmux or its caller.
    Internal,
}

impl LlmuxError {
    /// Classify this error into a category.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::MissingCredential { .. }
            | Self::Configuration(_)
            | Self::UnsupportedProvider { .. } => ErrorCategory::Precondition,
            Self::Network(_) | Self::Connection { .. } => ErrorCategory::Transport,
            Self::Cancelled | Self::DeadlineExceeded => ErrorCategory::Cancelled,
            Self::Authentication { .. }
            | Self::RateLimited { .. }
            | Self::Api { .. }
            | Self::UnknownApi { .. }
            | Self::RequestFailed { .. } => ErrorCategory::Http,
            Self::Parse { .. } | Self::NoContent { .. } | Self::InvalidJson { .. } => {
                ErrorCategory::Parse
            }
            Self::Serialization(_) => ErrorCategory::Internal,
        }
    }

    /// HTTP status carried by this error, if the service produced one.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Authentication { .. } => Some(401),
            Self::RateLimited { .. } => Some(429),
            Self::Api { status, .. }
            | Self::UnknownApi { status, .. }
            | Self::RequestFailed { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Whether this error is potentially retryable.
    pub fn is_retryable(&self) -> bool {
        match self.category() {
            ErrorCategory::Transport => true,
            ErrorCategory::Http => self
                .status()
                .is_some_and(crate::util::retry::is_retryable_status),
            _ => false,
        }
    }
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, LlmuxError>;
