//! OpenAI Chat Completions adapter.
//!
//! The same wire format is spoken by several hosted services; each one is a
//! profile of [`OpenAiAdapter`] with its own name, base URL and credential.

use bon::Builder;
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::error::{LlmuxError, Result};
use crate::types::options::impl_provider_options;
use crate::types::{GenerationOptions, Message, NormalizedResponse, ProviderOptions, Usage};

use super::format::{concat_text_segments, put};
use super::http::classify_error;
use super::{resolve_options, CredentialHint, ProviderAdapter};

/// OpenAI-specific options on top of [`GenerationOptions`].
#[derive(Debug, Clone, Default, PartialEq, Builder)]
pub struct OpenAiOptions {
    #[builder(default)]
    pub common: GenerationOptions,
    pub seed: Option<u64>,
    pub presence_penalty: Option<f64>,
    pub frequency_penalty: Option<f64>,
    /// End-user identifier for abuse monitoring.
    #[builder(into)]
    pub user: Option<String>,
}

impl_provider_options!(OpenAiOptions);

/// Adapter for OpenAI and OpenAI-compatible chat completion APIs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpenAiAdapter {
    name: &'static str,
    base_url: &'static str,
    hint: CredentialHint,
}

impl OpenAiAdapter {
    pub const fn new(name: &'static str, base_url: &'static str, hint: CredentialHint) -> Self {
        Self {
            name,
            base_url,
            hint,
        }
    }

    pub const fn openai() -> Self {
        Self::new(
            "openai",
            "https://api.openai.com/v1",
            CredentialHint {
                env_var: "OPENAI_API_KEY",
                console_url: "https://platform.openai.com/api-keys",
            },
        )
    }

    pub const fn groq() -> Self {
        Self::new(
            "groq",
            "https://api.groq.com/openai/v1",
            CredentialHint {
                env_var: "GROQ_API_KEY",
                console_url: "https://console.groq.com/keys",
            },
        )
    }

    pub const fn mistral() -> Self {
        Self::new(
            "mistral",
            "https://api.mistral.ai/v1",
            CredentialHint {
                env_var: "MISTRAL_API_KEY",
                console_url: "https://console.mistral.ai/api-keys",
            },
        )
    }

    pub const fn openrouter() -> Self {
        Self::new(
            "openrouter",
            "https://openrouter.ai/api/v1",
            CredentialHint {
                env_var: "OPENROUTER_API_KEY",
                console_url: "https://openrouter.ai/keys",
            },
        )
    }

    pub const fn together() -> Self {
        Self::new(
            "together",
            "https://api.together.xyz/v1",
            CredentialHint {
                env_var: "TOGETHER_API_KEY",
                console_url: "https://api.together.ai/settings/api-keys",
            },
        )
    }

    /// Every built-in profile.
    pub const fn profiles() -> [Self; 5] {
        [
            Self::openai(),
            Self::groq(),
            Self::mistral(),
            Self::openrouter(),
            Self::together(),
        ]
    }
}

impl ProviderAdapter for OpenAiAdapter {
    fn name(&self) -> &str {
        self.name
    }

    fn credential_hint(&self) -> Option<CredentialHint> {
        Some(self.hint)
    }

    fn default_base_url(&self) -> &str {
        self.base_url
    }

    fn build_request(
        &self,
        messages: &[Message],
        model: &str,
        options: Option<&dyn ProviderOptions>,
    ) -> Result<Value> {
        let options: OpenAiOptions = resolve_options(self.name, options);
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

        let mut body = Map::new();
        body.insert("model".into(), model.into());
        body.insert("messages".into(), messages.into());
        body.insert("stream".into(), false.into());

        put(&mut body, "temperature", common.temperature);
        put(&mut body, "top_p", common.top_p);
        put(&mut body, "max_tokens", common.max_tokens);
        put(&mut body, "stop", common.stop);
        if wants_json {
            body.insert("response_format".into(), serde_json::json!({"type": "json_object"}));
        }
        put(&mut body, "tools", common.tools);
        put(&mut body, "tool_choice", common.tool_choice);

        put(&mut body, "seed", options.seed);
        put(&mut body, "presence_penalty", options.presence_penalty);
        put(&mut body, "frequency_penalty", options.frequency_penalty);
        put(&mut body, "user", options.user);

        Ok(Value::Object(body))
    }

    fn parse_response(&self, body: &[u8]) -> Result<NormalizedResponse> {
        let data: ChatResponse = serde_json::from_slice(body).map_err(|source| {
            LlmuxError::Parse {
                provider: self.name.to_string(),
                source,
            }
        })?;

        let content = data
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .and_then(|content| match content {
                MessageContent::Text(text) => Some(text),
                MessageContent::Parts(parts) => concat_text_segments(
                    parts
                        .iter()
                        .filter(|p| p.kind == "text")
                        .filter_map(|p| p.text.as_deref()),
                ),
            })
            .ok_or_else(|| LlmuxError::NoContent {
                provider: self.name.to_string(),
            })?;

        let usage = data
            .usage
            .and_then(|u| Usage::from_counts(u.prompt_tokens, u.completion_tokens, u.total_tokens));

        Ok(NormalizedResponse { content, usage })
    }

    fn handle_error(&self, status: u16, body: &[u8]) -> LlmuxError {
        classify_error::<ErrorEnvelope, _>(self.name, Some(self.hint), status, body, |e| {
            e.error.message
        })
    }
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    usage: Option<ChatUsage>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<MessageContent>,
}

/// `content` is a plain string, or a list of typed parts on some compatible servers.
#[derive(Deserialize)]
#[serde(untagged)]
enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

#[derive(Deserialize)]
struct ContentPart {
    #[serde(rename = "type")]
    kind: String,
    text: Option<String>,
}

#[derive(Deserialize)]
struct ChatUsage {
    #[serde(default)]
    prompt_tokens: u32,
    #[serde(default)]
    completion_tokens: u32,
    total_tokens: Option<u32>,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: Option<String>,
}
