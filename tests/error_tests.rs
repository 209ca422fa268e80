//! Tests for the error system.

use llmux::error::*;

#[test]
fn error_helper_mappings_are_stable_for_major_variants() {
    struct Case {
        error: LlmuxError,
        expected_category: ErrorCategory,
        expected_retryable: bool,
        expected_status: Option<u16>,
    }

    let network_error = reqwest::Client::new()
        .get("http://[::1")
        .build()
        .unwrap_err();
    let serde_error = serde_json::from_str::<serde_json::Value>("{not-json}").unwrap_err();

    let cases = vec![
        Case {
            error: LlmuxError::MissingCredential {
                provider: "openai".to_string(),
                env_var: "OPENAI_API_KEY".to_string(),
                console_url: "https://platform.openai.com/api-keys".to_string(),
            },
            expected_category: ErrorCategory::Precondition,
            expected_retryable: false,
            expected_status: None,
        },
        Case {
            error: LlmuxError::Network(network_error),
            expected_category: ErrorCategory::Transport,
            expected_retryable: true,
            expected_status: None,
        },
        Case {
            error: LlmuxError::Cancelled,
            expected_category: ErrorCategory::Cancelled,
            expected_retryable: false,
            expected_status: None,
        },
        Case {
            error: LlmuxError::Authentication {
                provider: "openai".to_string(),
                message: "bad key".to_string(),
            },
            expected_category: ErrorCategory::Http,
            expected_retryable: false,
            expected_status: Some(401),
        },
        Case {
            error: LlmuxError::RateLimited {
                provider: "openai".to_string(),
                message: "slow down".to_string(),
            },
            expected_category: ErrorCategory::Http,
            expected_retryable: true,
            expected_status: Some(429),
        },
        Case {
            error: LlmuxError::Api {
                provider: "cohere".to_string(),
                status: 503,
                message: "overloaded".to_string(),
            },
            expected_category: ErrorCategory::Http,
            expected_retryable: true,
            expected_status: Some(503),
        },
        Case {
            error: LlmuxError::RequestFailed {
                provider: "cohere".to_string(),
                status: 404,
                body: "missing".to_string(),
            },
            expected_category: ErrorCategory::Http,
            expected_retryable: false,
            expected_status: Some(404),
        },
        Case {
            error: LlmuxError::NoContent {
                provider: "ollama".to_string(),
            },
            expected_category: ErrorCategory::Parse,
            expected_retryable: false,
            expected_status: None,
        },
        Case {
            error: LlmuxError::Serialization(serde_error),
            expected_category: ErrorCategory::Internal,
            expected_retryable: false,
            expected_status: None,
        },
    ];

    for case in cases {
        assert_eq!(
            case.error.category(),
            case.expected_category,
            "category mismatch for {:?}",
            case.error
        );
        assert_eq!(
            case.error.is_retryable(),
            case.expected_retryable,
            "retryable mismatch for {:?}",
            case.error
        );
        assert_eq!(
            case.error.status(),
            case.expected_status,
            "status mismatch for {:?}",
            case.error
        );
    }
}

#[test]
fn messages_name_the_provider_first() {
    let err = LlmuxError::Api {
        provider: "anthropic".to_string(),
        status: 400,
        message: "prompt is too long".to_string(),
    };
    assert_eq!(
        err.to_string(),
        "anthropic: API error (status 400): prompt is too long"
    );

    let err = LlmuxError::UnknownApi {
        provider: "groq".to_string(),
        status: 502,
    };
    assert_eq!(err.to_string(), "groq: unknown API error (status 502)");
}

#[test]
fn missing_credential_explains_how_to_fix_it() {
    let err = LlmuxError::MissingCredential {
        provider: "cohere".to_string(),
        env_var: "COHERE_API_KEY".to_string(),
        console_url: "https://dashboard.cohere.com/api-keys".to_string(),
    };
    assert_eq!(
        err.to_string(),
        "cohere: missing API key; set COHERE_API_KEY \
         (create a key at https://dashboard.cohere.com/api-keys)"
    );
}

#[test]
fn invalid_json_keeps_the_parser_error_as_source() {
    use std::error::Error as _;

    let source = serde_json::from_str::<serde_json::Value>("not json").unwrap_err();
    let err = LlmuxError::InvalidJson {
        provider: "openai".to_string(),
        source,
    };

    assert!(err.to_string().starts_with("openai: returned invalid JSON: "));
    assert!(err.source().is_some());
}
