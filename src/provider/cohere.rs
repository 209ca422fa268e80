//! Cohere v2 Chat API adapter.

use bon::Builder;
use serde::Deserialize;
use serde_json::{Map, Value};
use strum::{Display, EnumString};

use crate::error::{LlmuxError, Result};
use crate::types::options::impl_provider_options;
use crate::types::{GenerationOptions, Message, NormalizedResponse, ProviderOptions, Usage};

use super::format::{concat_text_segments, put};
use super::http::{classify_error, replace_endpoint};
use super::{resolve_options, CredentialHint, ProviderAdapter};

const DEFAULT_BASE_URL: &str = "https://api.cohere.com/v2";

const HINT: CredentialHint = CredentialHint {
    env_var: "COHERE_API_KEY",
    console_url: "https://dashboard.cohere.com/api-keys",
};

/// Cohere content safety mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum SafetyMode {
    Contextual,
    Strict,
    Off,
}

/// Cohere-specific options on top of [`GenerationOptions`].
#[derive(Debug, Clone, Default, PartialEq, Builder)]
pub struct CohereOptions {
    #[builder(default)]
    pub common: GenerationOptions,
    pub top_k: Option<u32>,
    pub seed: Option<u64>,
    pub safety_mode: Option<SafetyMode>,
    pub frequency_penalty: Option<f64>,
    pub presence_penalty: Option<f64>,
}

impl_provider_options!(CohereOptions);

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CohereAdapter;

impl CohereAdapter {
    pub const NAME: &'static str = "cohere";
}

impl ProviderAdapter for CohereAdapter {
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
        let options: CohereOptions = resolve_options(Self::NAME, options);
        let common = options.common;
        let wants_json = common.wants_json();

        // v2 accepts system turns inline, so order is preserved as given.
        let messages: Vec<Value> = messages
            .iter()
            .map(|m| {
                let mut message = Map::new();
                message.insert("role".into(), m.role.to_string().into());
                message.insert("content".into(), m.content.clone().into());
                Value::Object(message)
            })
            .collect();

        let mut body = Map::new();
        body.insert("model".into(), model.into());
        body.insert("messages".into(), messages.into());
        body.insert("stream".into(), false.into());

        put(&mut body, "temperature", common.temperature);
        put(&mut body, "p", common.top_p);
        put(&mut body, "k", options.top_k);
        put(&mut body, "max_tokens", common.max_tokens);
        put(&mut body, "stop_sequences", common.stop);
        if wants_json {
            body.insert("response_format".into(), serde_json::json!({"type": "json_object"}));
        }
        put(&mut body, "tools", common.tools);
        put(&mut body, "tool_choice", common.tool_choice);

        put(&mut body, "seed", options.seed);
        put(&mut body, "frequency_penalty", options.frequency_penalty);
        put(&mut body, "presence_penalty", options.presence_penalty);
        put(
            &mut body,
            "safety_mode",
            options.safety_mode.map(|mode| mode.to_string()),
        );

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
            .and_then(|message| {
                concat_text_segments(
                    message
                        .content
                        .iter()
                        .filter(|part| part.kind == "text")
                        .filter_map(|part| part.text.as_deref()),
                )
            })
            .ok_or_else(|| LlmuxError::NoContent {
                provider: Self::NAME.to_string(),
            })?;

        let usage = data.usage.and_then(|usage| {
            let counts = usage.tokens.or(usage.billed_units)?;
            Usage::from_counts(
                counts.input_tokens as u32,
                counts.output_tokens as u32,
                None,
            )
        });

        Ok(NormalizedResponse { content, usage })
    }

    fn handle_error(&self, status: u16, body: &[u8]) -> LlmuxError {
        classify_error::<ErrorEnvelope, _>(Self::NAME, Some(HINT), status, body, |e| e.message)
    }

    fn customize_request(&self, request: &mut reqwest::Request) -> Result<()> {
        replace_endpoint(request, "/chat");
        Ok(())
    }
}

#[derive(Deserialize)]
struct ChatResponse {
    message: Option<ResponseMessage>,
    usage: Option<ChatUsage>,
}

#[derive(Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Vec<ContentPart>,
}

#[derive(Deserialize)]
struct ContentPart {
    #[serde(rename = "type")]
    kind: String,
    text: Option<String>,
}

#[derive(Deserialize)]
struct ChatUsage {
    tokens: Option<TokenCounts>,
    billed_units: Option<TokenCounts>,
}

/// Cohere reports counts as JSON numbers that may carry a fraction.
#[derive(Deserialize)]
struct TokenCounts {
    #[serde(default)]
    input_tokens: f64,
    #[serde(default)]
    output_tokens: f64,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    message: Option<String>,
}
