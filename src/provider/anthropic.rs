//! Anthropic Messages API adapter.

use bon::Builder;
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::error::{LlmuxError, Result};
use crate::types::options::impl_provider_options;
use crate::types::{GenerationOptions, Message, NormalizedResponse, ProviderOptions, Usage};

use super::format::{concat_text_segments, put, split_system};
use super::http::{classify_error, replace_endpoint, set_header, take_bearer_token};
use super::{resolve_options, CredentialHint, ProviderAdapter};

const DEFAULT_BASE_URL: &str = "https://api.anthropic.com/v1";
const API_VERSION: &str = "2023-06-01";

/// The Messages API rejects requests without `max_tokens`.
pub const DEFAULT_MAX_TOKENS: u32 = 4096;

const HINT: CredentialHint = CredentialHint {
    env_var: "ANTHROPIC_API_KEY",
    console_url: "https://console.anthropic.com/settings/keys",
};

/// Anthropic-specific options on top of [`GenerationOptions`].
#[derive(Debug, Clone, Default, PartialEq, Builder)]
pub struct AnthropicOptions {
    #[builder(default)]
    pub common: GenerationOptions,
    pub top_k: Option<u32>,
    /// Opaque end-user identifier, sent as `metadata.user_id`.
    #[builder(into)]
    pub user_id: Option<String>,
}

impl_provider_options!(AnthropicOptions);

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AnthropicAdapter;

impl AnthropicAdapter {
    pub const NAME: &'static str = "anthropic";
}

impl ProviderAdapter for AnthropicAdapter {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn credential_hint(&self) -> Option<CredentialHint> {
        Some(HINT)
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
        let conversation = split_system(messages);
        let options: AnthropicOptions = resolve_options(Self::NAME, options);
        let common = options.common;

        let turns: Vec<Value> = conversation
            .turns
            .iter()
            .map(|m| {
                let mut turn = Map::new();
                turn.insert("role".into(), m.role.to_string().into());
                turn.insert("content".into(), m.content.clone().into());
                Value::Object(turn)
            })
            .collect();

        let mut body = Map::new();
        body.insert("model".into(), model.into());
        body.insert("messages".into(), turns.into());
        body.insert(
            "max_tokens".into(),
            common.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS).into(),
        );
        body.insert("stream".into(), false.into());

        put(&mut body, "system", conversation.system);
        put(&mut body, "temperature", common.temperature);
        put(&mut body, "top_p", common.top_p);
        put(&mut body, "top_k", options.top_k);
        put(&mut body, "stop_sequences", common.stop);
        put(&mut body, "tools", common.tools);
        put(&mut body, "tool_choice", common.tool_choice);

        if let Some(user_id) = options.user_id {
            body.insert("metadata".into(), serde_json::json!({ "user_id": user_id }));
        }

        Ok(Value::Object(body))
    }

    fn parse_response(&self, body: &[u8]) -> Result<NormalizedResponse> {
        let data: MessagesResponse =
            serde_json::from_slice(body).map_err(|source| LlmuxError::Parse {
                provider: Self::NAME.to_string(),
                source,
            })?;

        // Non-text blocks (tool_use, thinking) are skipped.
        let content = concat_text_segments(
            data.content
                .iter()
                .filter(|block| block.kind == "text")
                .filter_map(|block| block.text.as_deref()),
        )
        .ok_or_else(|| LlmuxError::NoContent {
            provider: Self::NAME.to_string(),
        })?;

        let usage = data
            .usage
            .and_then(|u| Usage::from_counts(u.input_tokens, u.output_tokens, None));

        Ok(NormalizedResponse { content, usage })
    }

    fn handle_error(&self, status: u16, body: &[u8]) -> LlmuxError {
        classify_error::<ErrorEnvelope, _>(Self::NAME, Some(HINT), status, body, |e| {
            e.error.message
        })
    }

    fn customize_request(&self, request: &mut reqwest::Request) -> Result<()> {
        replace_endpoint(request, "/messages");
        if let Some(api_key) = take_bearer_token(request) {
            set_header(request, "x-api-key", &api_key)?;
        }
        set_header(request, "anthropic-version", API_VERSION)
    }
}

#[derive(Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
    usage: Option<MessagesUsage>,
}

#[derive(Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    text: Option<String>,
}

#[derive(Deserialize)]
struct MessagesUsage {
    #[serde(default)]
    input_tokens: u32,
    #[serde(default)]
    output_tokens: u32,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: Option<String>,
}
