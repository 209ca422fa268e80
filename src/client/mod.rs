//! Unified client: the one execution path every provider call flows through.
//!
//! The client owns transport, retries and cancellation. Everything that
//! differs between vendors is delegated to the [`ProviderAdapter`].

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Method, Url};
use serde::de::IgnoredAny;
use tracing::{debug, error, info, info_span, trace, Instrument};
use uuid::Uuid;

use crate::config::ClientConfig;
use crate::error::{LlmuxError, Result};
use crate::provider::http::{build_client, DEFAULT_PATH};
use crate::provider::{registry, ProviderAdapter};
use crate::types::{Message, ProviderOptions};
use crate::util::context::CallContext;
use crate::util::retry::{RetryError, RetryPolicy};

/// Object-safe generation entrypoint.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Name of the provider behind this generator.
    fn provider(&self) -> &str;

    /// Send `messages` to `model` and return the generated text.
    async fn generate(
        &self,
        ctx: &CallContext,
        messages: &[Message],
        model: &str,
        options: &[&dyn ProviderOptions],
    ) -> Result<String>;
}

/// Execution core bound to one provider adapter.
///
/// Configuration is fixed at construction, so a single client can serve
/// concurrent calls from many tasks.
pub struct UnifiedClient {
    adapter: Arc<dyn ProviderAdapter>,
    api_key: Option<String>,
    endpoint: Url,
    http: reqwest::Client,
    retry: RetryPolicy,
}

impl fmt::Debug for UnifiedClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UnifiedClient")
            .field("provider", &self.adapter.name())
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("endpoint", &self.endpoint.as_str())
            .field("retry", &self.retry)
            .finish()
    }
}

impl UnifiedClient {
    /// Create a client, failing fast when a required credential is missing.
    pub fn new(adapter: Arc<dyn ProviderAdapter>, config: ClientConfig) -> Result<Self> {
        let api_key = config.api_key.filter(|key| !key.trim().is_empty());
        if adapter.requires_credential() && api_key.is_none() {
            return Err(match adapter.credential_hint() {
                Some(hint) => LlmuxError::MissingCredential {
                    provider: adapter.name().to_string(),
                    env_var: hint.env_var.to_string(),
                    console_url: hint.console_url.to_string(),
                },
                None => LlmuxError::Configuration(format!("{}: missing API key", adapter.name())),
            });
        }

        let base_url = config
            .base_url
            .unwrap_or_else(|| adapter.default_base_url().to_string());
        let raw_endpoint = format!("{}{}", base_url.trim_end_matches('/'), DEFAULT_PATH);
        let endpoint = Url::parse(&raw_endpoint).map_err(|e| {
            LlmuxError::Configuration(format!("invalid base URL '{base_url}': {e}"))
        })?;

        Ok(Self {
            http: build_client(config.connect_timeout)?,
            retry: RetryPolicy::new(config.max_retries),
            adapter,
            api_key,
            endpoint,
        })
    }

    /// Create a client for a built-in provider by name.
    pub fn for_provider(name: &str, config: ClientConfig) -> Result<Self> {
        Self::new(registry::lookup(name)?, config)
    }

    /// Create a client for a built-in provider, reading settings from the environment.
    pub fn from_env(name: &str) -> Result<Self> {
        let adapter = registry::lookup(name)?;
        let config = ClientConfig::from_env(adapter.as_ref());
        Self::new(adapter, config)
    }

    /// Replace the retry policy. Intended for construction time.
    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry = policy;
        self
    }

    pub fn provider(&self) -> &str {
        self.adapter.name()
    }

    /// URL requests are sent to before the adapter rewrites them.
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    /// Send `messages` to `model` and return the generated text.
    ///
    /// At most one options value is honoured; extra values are logged and
    /// ignored.
    pub async fn generate(
        &self,
        ctx: &CallContext,
        messages: &[Message],
        model: &str,
        options: &[&dyn ProviderOptions],
    ) -> Result<String> {
        let span = info_span!(
            "generate",
            provider = self.adapter.name(),
            model,
            request_id = %Uuid::new_v4()
        );
        self.run_generate(ctx, messages, model, options)
            .instrument(span)
            .await
    }

    async fn run_generate(
        &self,
        ctx: &CallContext,
        messages: &[Message],
        model: &str,
        options: &[&dyn ProviderOptions],
    ) -> Result<String> {
        let options = select_options(options);
        let started = std::time::Instant::now();

        let payload = self.adapter.build_request(messages, model, options)?;
        let body = serde_json::to_vec(&payload).map_err(|e| {
            error!(error = %e, "Failed to serialize request payload");
            LlmuxError::Serialization(e)
        })?;
        trace!(payload = %String::from_utf8_lossy(&body), "Request payload");

        let request = self.prepare(body)?;
        debug!(
            url = %request.url,
            messages = messages.len(),
            bytes = request.body.len(),
            "Sending generation request"
        );

        let response = match self
            .retry
            .execute(ctx, || self.http.execute(request.to_request()))
            .await
        {
            Ok(response) => response,
            Err(RetryError::Cancelled(err)) => return Err(err),
            Err(RetryError::Exhausted(err)) => {
                return Err(self.adapter.handle_connection_error(err))
            }
        };

        let status = response.status();
        let body = ctx.run(response.bytes()).await??;
        trace!(status = status.as_u16(), body = %String::from_utf8_lossy(&body), "Response body");

        if !status.is_success() {
            let err = self.adapter.handle_error(status.as_u16(), &body);
            debug!(status = status.as_u16(), error = %err, "Provider returned an error");
            return Err(err);
        }

        let parsed = self.adapter.parse_response(&body)?;

        if options.is_some_and(|o| o.common().wants_json()) {
            serde_json::from_str::<IgnoredAny>(&parsed.content).map_err(|source| {
                LlmuxError::InvalidJson {
                    provider: self.adapter.name().to_string(),
                    source,
                }
            })?;
        }

        if let Some(usage) = parsed.usage {
            info!(
                prompt_tokens = usage.prompt_tokens,
                completion_tokens = usage.completion_tokens,
                total_tokens = usage.total_tokens,
                "Token usage"
            );
        }
        info!(
            elapsed_ms = started.elapsed().as_millis() as u64,
            bytes = parsed.content.len(),
            "Generation complete"
        );

        Ok(parsed.content)
    }

    /// Assemble the outbound request once; every attempt sends a copy.
    fn prepare(&self, body: Vec<u8>) -> Result<PreparedRequest> {
        let mut request = reqwest::Request::new(Method::POST, self.endpoint.clone());
        request
            .headers_mut()
            .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if let Some(api_key) = &self.api_key {
            let value = HeaderValue::from_str(&format!("Bearer {api_key}")).map_err(|_| {
                LlmuxError::Configuration(
                    "API key contains characters not allowed in an HTTP header".to_string(),
                )
            })?;
            request.headers_mut().insert(AUTHORIZATION, value);
        }

        self.adapter.customize_request(&mut request)?;

        Ok(PreparedRequest {
            url: request.url().clone(),
            headers: request.headers().clone(),
            body,
        })
    }
}

#[async_trait]
impl TextGenerator for UnifiedClient {
    fn provider(&self) -> &str {
        UnifiedClient::provider(self)
    }

    async fn generate(
        &self,
        ctx: &CallContext,
        messages: &[Message],
        model: &str,
        options: &[&dyn ProviderOptions],
    ) -> Result<String> {
        UnifiedClient::generate(self, ctx, messages, model, options).await
    }
}

struct PreparedRequest {
    url: Url,
    headers: HeaderMap,
    body: Vec<u8>,
}

impl PreparedRequest {
    fn to_request(&self) -> reqwest::Request {
        let mut request = reqwest::Request::new(Method::POST, self.url.clone());
        *request.headers_mut() = self.headers.clone();
        *request.body_mut() = Some(self.body.clone().into());
        request
    }
}

fn select_options<'a>(options: &[&'a dyn ProviderOptions]) -> Option<&'a dyn ProviderOptions> {
    match options {
        [] => None,
        [only] => Some(*only),
        [first, rest @ ..] => {
            error!(
                ignored = rest.len(),
                "Multiple option values supplied; only the first is used"
            );
            Some(*first)
        }
    }
}
