//! Shared HTTP client construction, endpoint rewriting and error classification.

use std::time::Duration;

use reqwest::header::{HeaderValue, AUTHORIZATION};
use serde::de::DeserializeOwned;

use super::CredentialHint;
use crate::error::{LlmuxError, Result};

/// Path appended to the base URL before adapters customize the request.
pub const DEFAULT_PATH: &str = "/chat/completions";

/// Build the HTTP client for one execution core.
///
/// Only connection establishment is bounded; whole-call limits come from the
/// caller's context.
pub fn build_client(connect_timeout: Duration) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .connect_timeout(connect_timeout)
        .pool_max_idle_per_host(10)
        .build()
        .map_err(|e| LlmuxError::Configuration(format!("failed to build HTTP client: {e}")))
}

/// Swap the trailing [`DEFAULT_PATH`] of the request URL for `endpoint`.
///
/// A URL that no longer ends in the default path is left untouched, so calling
/// this twice is harmless.
pub fn replace_endpoint(request: &mut reqwest::Request, endpoint: &str) {
    let url = request.url_mut();
    if let Some(prefix) = url.path().strip_suffix(DEFAULT_PATH) {
        let path = format!("{prefix}{endpoint}");
        url.set_path(&path);
    }
}

/// Remove the `Authorization: Bearer` header, returning its token.
pub fn take_bearer_token(request: &mut reqwest::Request) -> Option<String> {
    let value = request.headers_mut().remove(AUTHORIZATION)?;
    value
        .to_str()
        .ok()
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::to_string)
}

/// Insert a header, reporting values that are not valid header text.
pub fn set_header(request: &mut reqwest::Request, name: &'static str, value: &str) -> Result<()> {
    let value = HeaderValue::from_str(value)
        .map_err(|_| LlmuxError::Configuration(format!("invalid value for header {name}")))?;
    request.headers_mut().insert(name, value);
    Ok(())
}

/// Classify a non-success response.
///
/// 401 and 429 are answered from the status alone. Otherwise the body is
/// decoded as the vendor envelope `E`: a non-empty message gives
/// [`LlmuxError::Api`], an empty one [`LlmuxError::UnknownApi`], and a body
/// that does not fit the envelope [`LlmuxError::RequestFailed`].
pub fn classify_error<E, F>(
    provider: &str,
    hint: Option<CredentialHint>,
    status: u16,
    body: &[u8],
    message_of: F,
) -> LlmuxError
where
    E: DeserializeOwned,
    F: FnOnce(E) -> Option<String>,
{
    match status {
        401 => {
            return LlmuxError::Authentication {
                provider: provider.to_string(),
                message: auth_guidance(hint),
            }
        }
        429 => {
            return LlmuxError::RateLimited {
                provider: provider.to_string(),
                message: "too many requests; wait before retrying, lower the request rate, \
                          or check your plan's quota"
                    .to_string(),
            }
        }
        _ => {}
    }

    match serde_json::from_slice::<E>(body) {
        Ok(envelope) => match message_of(envelope)
            .map(|m| m.trim().to_string())
            .filter(|m| !m.is_empty())
        {
            Some(message) => LlmuxError::Api {
                provider: provider.to_string(),
                status,
                message,
            },
            None => LlmuxError::UnknownApi {
                provider: provider.to_string(),
                status,
            },
        },
        Err(_) => LlmuxError::RequestFailed {
            provider: provider.to_string(),
            status,
            body: String::from_utf8_lossy(body).trim().to_string(),
        },
    }
}

fn auth_guidance(hint: Option<CredentialHint>) -> String {
    match hint {
        Some(hint) => format!(
            "the API key was rejected; check {} or create a new key at {}",
            hint.env_var, hint.console_url
        ),
        None => "the service rejected the request credentials".to_string(),
    }
}
