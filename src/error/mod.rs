//! Error types for roci-agents.

pub mod unified;

pub use unified::{ErrorCategory, RecoverySuggestion};

use thiserror::Error;

use crate::convert::Dialect;
use crate::tools::ToolKind;

/// Boxed error returned by user callbacks.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Primary error type for all roci-agents operations.
#[derive(Error, Debug)]
pub enum RociError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("User error: {0}")]
    UserError(String),

    #[error("Tool kind '{tool}' is not supported in the {dialect} dialect")]
    UnsupportedTool { dialect: Dialect, tool: ToolKind },

    #[error("Model behavior error: {0}")]
    ModelBehavior(String),

    #[error("Callback error: {0}")]
    Callback(#[source] BoxError),

    #[error("Max turns ({max_turns}) exceeded")]
    MaxTurnsExceeded { max_turns: usize },

    #[error("API error (status {status}): {message}")]
    Api {
        status: u16,
        message: String,
        #[source]
        source: Option<BoxError>,
    },

    #[error("Authentication error: {0}")]
    Authentication(String),

    #[error("Rate limited: retry after {retry_after_ms:?}ms")]
    RateLimited { retry_after_ms: Option<u64> },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Stream error: {0}")]
    Stream(String),

    #[error("Run canceled")]
    Canceled,

    #[error("Invalid state: {0}")]
    InvalidState(String),
}

impl RociError {
    /// Create an API error.
    pub fn api(status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            message: message.into(),
            source: None,
        }
    }

    /// Wrap an error raised by user code (tool body, handoff callback, hook).
    ///
    /// The wrapped value is kept as-is so callers can recover it with
    /// [`RociError::downcast_callback`].
    pub fn callback<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Callback(Box::new(err))
    }

    /// Borrow the original callback error if it has type `E`.
    pub fn downcast_callback<E>(&self) -> Option<&E>
    where
        E: std::error::Error + 'static,
    {
        match self {
            Self::Callback(inner) => inner.downcast_ref::<E>(),
            _ => None,
        }
    }

    /// Classify this error into a category.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Configuration(_) | Self::UnsupportedTool { .. } => ErrorCategory::Configuration,
            Self::UserError(_) => ErrorCategory::User,
            Self::Callback(_) => ErrorCategory::Callback,
            Self::ModelBehavior(_) => ErrorCategory::ModelBehavior,
            Self::MaxTurnsExceeded { .. } => ErrorCategory::MaxTurns,
            Self::Authentication(_) => ErrorCategory::Authentication,
            Self::RateLimited { .. } => ErrorCategory::RateLimit,
            Self::Network(_) => ErrorCategory::Network,
            Self::Serialization(_) => ErrorCategory::Serialization,
            Self::Canceled => ErrorCategory::Canceled,
            Self::Api { status, .. } => match status {
                401 | 403 => ErrorCategory::Authentication,
                429 => ErrorCategory::RateLimit,
                500..=599 => ErrorCategory::Server,
                _ => ErrorCategory::Api,
            },
            _ => ErrorCategory::Unknown,
        }
    }

    /// Whether the caller supplied something invalid.
    ///
    /// Covers both setup mistakes caught before the first model call and bad
    /// input caught while running.
    pub fn is_user_error(&self) -> bool {
        matches!(
            self.category(),
            ErrorCategory::Configuration | ErrorCategory::User
        )
    }

    /// Whether this error is potentially retryable by an outer layer.
    ///
    /// The runner itself never retries.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.category(),
            ErrorCategory::RateLimit | ErrorCategory::Network | ErrorCategory::Server
        )
    }

    /// Suggest recovery actions.
    pub fn recovery_suggestion(&self) -> RecoverySuggestion {
        match self.category() {
            ErrorCategory::Authentication => RecoverySuggestion::CheckCredentials,
            ErrorCategory::RateLimit | ErrorCategory::Network | ErrorCategory::Server => {
                RecoverySuggestion::RetryWithBackoff
            }
            ErrorCategory::Configuration => RecoverySuggestion::CheckConfiguration,
            ErrorCategory::User => RecoverySuggestion::FixInput,
            ErrorCategory::MaxTurns => RecoverySuggestion::RaiseTurnLimit,
            ErrorCategory::Callback => RecoverySuggestion::CheckCallback,
            _ => RecoverySuggestion::ContactSupport,
        }
    }
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, RociError>;
