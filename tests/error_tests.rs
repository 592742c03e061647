//! Tests for the error system.

use roci_agents::convert::Dialect;
use roci_agents::error::unified::*;
use roci_agents::error::*;
use roci_agents::tools::ToolKind;

#[test]
fn error_api_creation() {
    let err = RociError::api(404, "Not found");
    assert!(matches!(&err, RociError::Api { status: 404, .. }));
    assert_eq!(err.to_string(), "API error (status 404): Not found");
}

#[test]
fn error_helper_mappings_are_stable_for_major_variants() {
    struct Case {
        error: RociError,
        expected_category: ErrorCategory,
        expected_retryable: bool,
        expected_recovery: RecoverySuggestion,
    }

    let network_error = reqwest::Client::new()
        .get("http://[::1")
        .build()
        .unwrap_err();
    let io_error = std::io::Error::new(std::io::ErrorKind::Other, "disk");
    let serde_error = serde_json::from_str::<serde_json::Value>("{not-json}").unwrap_err();

    let cases = vec![
        Case {
            error: RociError::Authentication("bad-key".to_string()),
            expected_category: ErrorCategory::Authentication,
            expected_retryable: false,
            expected_recovery: RecoverySuggestion::CheckCredentials,
        },
        Case {
            error: RociError::RateLimited {
                retry_after_ms: Some(1000),
            },
            expected_category: ErrorCategory::RateLimit,
            expected_retryable: true,
            expected_recovery: RecoverySuggestion::RetryWithBackoff,
        },
        Case {
            error: RociError::Configuration("bad-config".to_string()),
            expected_category: ErrorCategory::Configuration,
            expected_retryable: false,
            expected_recovery: RecoverySuggestion::CheckConfiguration,
        },
        Case {
            error: RociError::UnsupportedTool {
                dialect: Dialect::ChatCompletions,
                tool: ToolKind::WebSearch,
            },
            expected_category: ErrorCategory::Configuration,
            expected_retryable: false,
            expected_recovery: RecoverySuggestion::CheckConfiguration,
        },
        Case {
            error: RociError::UserError("no such tool".to_string()),
            expected_category: ErrorCategory::User,
            expected_retryable: false,
            expected_recovery: RecoverySuggestion::FixInput,
        },
        Case {
            error: RociError::ModelBehavior("bad json".to_string()),
            expected_category: ErrorCategory::ModelBehavior,
            expected_retryable: false,
            expected_recovery: RecoverySuggestion::ContactSupport,
        },
        Case {
            error: RociError::MaxTurnsExceeded { max_turns: 3 },
            expected_category: ErrorCategory::MaxTurns,
            expected_retryable: false,
            expected_recovery: RecoverySuggestion::RaiseTurnLimit,
        },
        Case {
            error: RociError::callback(std::io::Error::new(std::io::ErrorKind::Other, "hook")),
            expected_category: ErrorCategory::Callback,
            expected_retryable: false,
            expected_recovery: RecoverySuggestion::CheckCallback,
        },
        Case {
            error: RociError::Network(network_error),
            expected_category: ErrorCategory::Network,
            expected_retryable: true,
            expected_recovery: RecoverySuggestion::RetryWithBackoff,
        },
        Case {
            error: RociError::Serialization(serde_error),
            expected_category: ErrorCategory::Serialization,
            expected_retryable: false,
            expected_recovery: RecoverySuggestion::ContactSupport,
        },
        Case {
            error: RociError::api(401, "Unauthorized"),
            expected_category: ErrorCategory::Authentication,
            expected_retryable: false,
            expected_recovery: RecoverySuggestion::CheckCredentials,
        },
        Case {
            error: RociError::api(429, "Rate limited"),
            expected_category: ErrorCategory::RateLimit,
            expected_retryable: true,
            expected_recovery: RecoverySuggestion::RetryWithBackoff,
        },
        Case {
            error: RociError::api(503, "Server unavailable"),
            expected_category: ErrorCategory::Server,
            expected_retryable: true,
            expected_recovery: RecoverySuggestion::RetryWithBackoff,
        },
        Case {
            error: RociError::api(418, "Teapot"),
            expected_category: ErrorCategory::Api,
            expected_retryable: false,
            expected_recovery: RecoverySuggestion::ContactSupport,
        },
        Case {
            error: RociError::Io(io_error),
            expected_category: ErrorCategory::Unknown,
            expected_retryable: false,
            expected_recovery: RecoverySuggestion::ContactSupport,
        },
        Case {
            error: RociError::Canceled,
            expected_category: ErrorCategory::Canceled,
            expected_retryable: false,
            expected_recovery: RecoverySuggestion::ContactSupport,
        },
        Case {
            error: RociError::Stream("stream-error".to_string()),
            expected_category: ErrorCategory::Unknown,
            expected_retryable: false,
            expected_recovery: RecoverySuggestion::ContactSupport,
        },
    ];

    for case in cases {
        assert_eq!(case.error.category(), case.expected_category);
        assert_eq!(case.error.is_retryable(), case.expected_retryable);
        assert_eq!(case.error.recovery_suggestion(), case.expected_recovery);
    }
}

#[derive(Debug, thiserror::Error)]
#[error("inventory service returned {0}")]
struct InventoryError(u16);

#[test]
fn callback_errors_keep_their_original_type() {
    let err = RociError::callback(InventoryError(503));

    assert_eq!(
        err.to_string(),
        "Callback error: inventory service returned 503"
    );
    assert_eq!(err.downcast_callback::<InventoryError>().map(|e| e.0), Some(503));
    assert!(err.downcast_callback::<std::io::Error>().is_none());
    assert!(RociError::Canceled
        .downcast_callback::<InventoryError>()
        .is_none());
    assert!(std::error::Error::source(&err).is_some());
}

#[test]
fn user_errors_cover_setup_and_input_problems() {
    assert!(RociError::Configuration("dup".into()).is_user_error());
    assert!(RociError::UserError("missing".into()).is_user_error());
    assert!(!RociError::ModelBehavior("bad".into()).is_user_error());
    assert!(!RociError::MaxTurnsExceeded { max_turns: 1 }.is_user_error());
}

#[test]
fn unsupported_tool_message_names_dialect_and_kind() {
    let err = RociError::UnsupportedTool {
        dialect: Dialect::ChatCompletions,
        tool: ToolKind::FileSearch,
    };
    assert_eq!(
        err.to_string(),
        "Tool kind 'file_search' is not supported in the chat_completions dialect"
    );
}
