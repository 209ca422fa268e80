//! Client configuration (explicit values, or resolved from the environment).

use std::fmt;
use std::time::Duration;

use bon::Builder;

use crate::provider::{CredentialHint, ProviderAdapter};

/// Retries used when the caller does not choose.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Ceiling on establishing a TCP/TLS connection. Nothing else times out on
/// its own; callers bound whole calls through [`crate::util::context::CallContext`].
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Environment variable overriding the retry count.
pub const MAX_RETRIES_VAR: &str = "LLMUX_MAX_RETRIES";

/// Long-lived settings owned by one [`crate::client::UnifiedClient`].
///
/// ```
/// use llmux::config::ClientConfig;
///
/// let config = ClientConfig::builder()
///     .api_key("sk-test")
///     .max_retries(2)
///     .build();
/// assert_eq!(config.base_url, None);
/// ```
#[derive(Clone, Builder)]
pub struct ClientConfig {
    #[builder(into)]
    pub api_key: Option<String>,
    /// Overrides the provider's default base URL.
    #[builder(into)]
    pub base_url: Option<String>,
    #[builder(default = DEFAULT_MAX_RETRIES)]
    pub max_retries: u32,
    #[builder(default = DEFAULT_CONNECT_TIMEOUT)]
    pub connect_timeout: Duration,
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("base_url", &self.base_url)
            .field("max_retries", &self.max_retries)
            .field("connect_timeout", &self.connect_timeout)
            .finish()
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl ClientConfig {
    /// Resolve settings for `adapter` from the environment (and `.env`, if present).
    pub fn from_env(adapter: &dyn ProviderAdapter) -> Self {
        let _ = dotenvy::dotenv(); // load .env if present, ignore error
        Self::from_lookup(adapter.name(), adapter.credential_hint(), |key| {
            std::env::var(key).ok()
        })
    }

    /// Resolve settings through an arbitrary variable lookup.
    ///
    /// Reads the credential variable named by `hint`, `<PROVIDER>_BASE_URL`
    /// and [`MAX_RETRIES_VAR`]. Blank values count as unset.
    pub fn from_lookup<F>(provider: &str, hint: Option<CredentialHint>, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let api_key = hint.and_then(|hint| read(hint.env_var));
        let base_url = read(&base_url_var(provider));
        let max_retries = match read(MAX_RETRIES_VAR) {
            Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
                tracing::warn!(value = %raw, var = MAX_RETRIES_VAR, "Ignoring invalid retry count");
                DEFAULT_MAX_RETRIES
            }),
            None => DEFAULT_MAX_RETRIES,
        };

        Self {
            api_key,
            base_url,
            max_retries,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }
}

/// `openrouter` -> `OPENROUTER_BASE_URL`.
pub fn base_url_var(provider: &str) -> String {
    let mut var: String = provider
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_uppercase() } else { '_' })
        .collect();
    var.push_str("_BASE_URL");
    var
}
