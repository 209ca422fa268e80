//! Ollama local provider (native `/api/chat`).

use bon::Builder;
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::error::{LlmuxError, Result};
use crate::types::options::impl_provider_options;
use crate::types::{GenerationOptions, Message, NormalizedResponse, ProviderOptions, Usage};

use super::format::put;
use super::http::{classify_error, replace_endpoint};
use super::{resolve_options, CredentialHint, ProviderAdapter};

const DEFAULT_BASE_URL: &str = "http://localhost:11434";

const START_GUIDANCE: &str =
    "Is Ollama running? Start it with `ollama serve`, or point OLLAMA_BASE_URL at a running instance.";

/// Ollama-specific options on top of [`GenerationOptions`].
#[derive(Debug, Clone, Default, PartialEq, Builder)]
pub struct OllamaOptions {
    #[builder(default)]
    pub common: GenerationOptions,
    pub top_k: Option<u32>,
    pub seed: Option<u64>,
    /// Context window size in tokens.
    pub num_ctx: Option<u32>,
    pub repeat_penalty: Option<f64>,
}

impl_provider_options!(OllamaOptions);

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OllamaAdapter;

impl OllamaAdapter {
    pub const NAME: &'static str = "ollama";
}

impl ProviderAdapter for OllamaAdapter {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn requires_credential(&self) -> bool {
        false
    }

    fn credential_hint(&self) -> Option<CredentialHint> {
        None
    }

    fn default_base_url(&self) -> &str {
        DEFAULT_BASE_URL
    }

    fn build_request(
        &self,
        messages: &[Message],
        model: &str,
        options: Option<&dyn ProviderOptions>,
    ) -> Result<Value> {
        let options: OllamaOptions = resolve_options(Self::NAME, options);
        let common = options.common;
        let wants_json = common.wants_json();

        let messages: Vec<Value> = messages
            .iter()
            .map(|m| {
                let mut message = Map::new();
                message.insert("role".into(), m.role.to_string().into());
                message.insert("content".into(), m.content.clone().into());
                Value::Object(message)
            })
            .collect();

        let mut sampling = Map::new();
        put(&mut sampling, "temperature", common.temperature);
        put(&mut sampling, "top_p", common.top_p);
        put(&mut sampling, "top_k", options.top_k);
        put(&mut sampling, "num_predict", common.max_tokens);
        put(&mut sampling, "stop", common.stop);
        put(&mut sampling, "seed", options.seed);
        put(&mut sampling, "num_ctx", options.num_ctx);
        put(&mut sampling, "repeat_penalty", options.repeat_penalty);

        let mut body = Map::new();
        body.insert("model".into(), model.into());
        body.insert("messages".into(), messages.into());
        body.insert("stream".into(), false.into());
        if wants_json {
            body.insert("format".into(), "json".into());
        }
        // The chat endpoint has no tool_choice; tools pass through as given.
        put(&mut body, "tools", common.tools);
        if !sampling.is_empty() {
            body.insert("options".into(), Value::Object(sampling));
        }

        Ok(Value::Object(body))
    }

    fn parse_response(&self, body: &[u8]) -> Result<NormalizedResponse> {
        let data: ChatResponse =
            serde_json::from_slice(body).map_err(|source| LlmuxError::Parse {
                provider: Self::NAME.to_string(),
                source,
            })?;

        let content = data
            .message
            .and_then(|message| message.content)
            .filter(|content| !content.is_empty())
            .ok_or_else(|| LlmuxError::NoContent {
                provider: Self::NAME.to_string(),
            })?;

        let usage = Usage::from_counts(data.prompt_eval_count, data.eval_count, None);

        Ok(NormalizedResponse { content, usage })
    }

    fn handle_error(&self, status: u16, body: &[u8]) -> LlmuxError {
        classify_error::<ErrorEnvelope, _>(Self::NAME, None, status, body, |e| e.error)
    }

    fn customize_request(&self, request: &mut reqwest::Request) -> Result<()> {
        replace_endpoint(request, "/api/chat");
        Ok(())
    }

    fn handle_connection_error(&self, err: LlmuxError) -> LlmuxError {
        match err {
            LlmuxError::Network(source) if source.is_connect() => LlmuxError::Connection {
                provider: Self::NAME.to_string(),
                guidance: START_GUIDANCE.to_string(),
                source,
            },
            other => other,
        }
    }
}

#[derive(Deserialize)]
struct ChatResponse {
    message: Option<ResponseMessage>,
    #[serde(default)]
    prompt_eval_count: u32,
    #[serde(default)]
    eval_count: u32,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: Option<String>,
}
