//! Error classification and recovery.

use strum::Display;

/// Broad error category for routing recovery logic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum ErrorCategory {
    /// Invalid agent/tool/handoff setup detected before any model call.
    Configuration,
    /// Bad input supplied by the caller or requested by the model.
    User,
    /// Error raised by a user callback (tool, handoff, hook).
    Callback,
    /// The model produced output the runtime cannot act on.
    ModelBehavior,
    /// Turn budget exhausted.
    MaxTurns,
    Authentication,
    RateLimit,
    Network,
    Server,
    Api,
    Serialization,
    Canceled,
    Unknown,
}

/// Suggested recovery action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoverySuggestion {
    RetryWithBackoff,
    CheckCredentials,
    CheckConfiguration,
    FixInput,
    RaiseTurnLimit,
    CheckCallback,
    ContactSupport,
}
