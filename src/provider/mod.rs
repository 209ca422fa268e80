//! Provider adapter trait and implementations.
//!
//! An adapter is a stateless translator between the normalized call shape and
//! one vendor's HTTP API. It never performs I/O; the execution core in
//! [`crate::client`] owns transport, retries and cancellation.

pub mod format;
pub mod http;
pub mod registry;

#[cfg(feature = "openai")]
pub mod openai;

#[cfg(feature = "anthropic")]
pub mod anthropic;

#[cfg(feature = "cohere")]
pub mod cohere;

#[cfg(feature = "ollama")]
pub mod ollama;

use std::fmt;

use tracing::warn;

use crate::error::{LlmuxError, Result};
use crate::types::{GenerationOptions, Message, NormalizedResponse, ProviderOptions};

/// Where a user obtains a missing credential.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CredentialHint {
    /// Environment variable the key is read from.
    pub env_var: &'static str,
    /// Console page where a key can be created.
    pub console_url: &'static str,
}

/// Everything that differs between backend services.
pub trait ProviderAdapter: Send + Sync + fmt::Debug {
    /// Stable identifier used in log lines and error prefixes.
    fn name(&self) -> &str;

    /// Whether a missing API key is a hard precondition failure.
    fn requires_credential(&self) -> bool {
        true
    }

    fn credential_hint(&self) -> Option<CredentialHint>;

    /// Base URL used when the configuration does not override it.
    fn default_base_url(&self) -> &str;

    /// Build the vendor request body. Streaming is always disabled.
    fn build_request(
        &self,
        messages: &[Message],
        model: &str,
        options: Option<&dyn ProviderOptions>,
    ) -> Result<serde_json::Value>;

    /// Parse a successful response body.
    fn parse_response(&self, body: &[u8]) -> Result<NormalizedResponse>;

    /// Turn a non-success response into an actionable error.
    fn handle_error(&self, status: u16, body: &[u8]) -> LlmuxError;

    /// Rewrite the outbound request (endpoint path, auth scheme) before it is
    /// sent. Must be idempotent.
    fn customize_request(&self, _request: &mut reqwest::Request) -> Result<()> {
        Ok(())
    }

    /// Enrich a transport failure that survived every retry.
    fn handle_connection_error(&self, err: LlmuxError) -> LlmuxError {
        err
    }
}

/// Normalize the options handed to an adapter into its own options type.
///
/// Accepts the adapter's own type or plain [`GenerationOptions`]; anything
/// else falls back to defaults rather than failing the call.
// TODO: reject foreign option types once callers stop sharing option values across providers.
pub(crate) fn resolve_options<T>(provider: &str, options: Option<&dyn ProviderOptions>) -> T
where
    T: ProviderOptions + Clone + Default + From<GenerationOptions>,
{
    let Some(options) = options else {
        return T::default();
    };
    let any = options.as_any();
    if let Some(own) = any.downcast_ref::<T>() {
        return own.clone();
    }
    if let Some(common) = any.downcast_ref::<GenerationOptions>() {
        return T::from(common.clone());
    }
    warn!(
        provider,
        options = ?options,
        "Options of unexpected type; falling back to defaults"
    );
    T::default()
}
