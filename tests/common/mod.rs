//! Shared test helpers: mock-server clients and canned vendor responses.

#![allow(dead_code)]

use std::time::Duration;

use llmux::client::UnifiedClient;
use llmux::config::ClientConfig;
use llmux::types::Message;
use llmux::util::retry::RetryPolicy;
use serde_json::{json, Value};
use wiremock::MockServer;

pub const TEST_KEY: &str = "sk-test";

/// Retry policy whose backoff is measured in milliseconds instead of seconds.
pub fn fast_retry(max_retries: u32) -> RetryPolicy {
    RetryPolicy::new(max_retries).with_base_delay(Duration::from_millis(1))
}

/// Client for `provider` pointed at `base_url`, with fast retries.
pub fn client_at(provider: &str, base_url: &str, max_retries: u32) -> UnifiedClient {
    let config = ClientConfig::builder()
        .api_key(TEST_KEY)
        .base_url(base_url)
        .max_retries(max_retries)
        .build();
    UnifiedClient::for_provider(provider, config)
        .expect("client should build")
        .with_retry_policy(fast_retry(max_retries))
}

/// Client for `provider` talking to `server` under the `/v1` prefix.
pub fn mock_client(provider: &str, server: &MockServer, max_retries: u32) -> UnifiedClient {
    client_at(provider, &format!("{}/v1", server.uri()), max_retries)
}

pub fn user_prompt(text: &str) -> Vec<Message> {
    vec![Message::user(text)]
}

/// OpenAI-style chat completion with one choice and usage counts.
pub fn openai_completion(text: &str) -> Value {
    json!({
        "id": "chatcmpl-123",
        "object": "chat.completion",
        "choices": [{
            "index": 0,
            "message": {"role": "assistant", "content": text},
            "finish_reason": "stop"
        }],
        "usage": {"prompt_tokens": 12, "completion_tokens": 5, "total_tokens": 17}
    })
}

pub fn openai_error(message: &str) -> Value {
    json!({"error": {"message": message, "type": "invalid_request_error"}})
}

pub fn anthropic_message(text: &str) -> Value {
    json!({
        "id": "msg_01",
        "type": "message",
        "role": "assistant",
        "content": [{"type": "text", "text": text}],
        "stop_reason": "end_turn",
        "usage": {"input_tokens": 9, "output_tokens": 3}
    })
}

pub fn cohere_message(text: &str) -> Value {
    json!({
        "id": "c-1",
        "finish_reason": "COMPLETE",
        "message": {
            "role": "assistant",
            "content": [{"type": "text", "text": text}]
        },
        "usage": {
            "billed_units": {"input_tokens": 7, "output_tokens": 2},
            "tokens": {"input_tokens": 70, "output_tokens": 2}
        }
    })
}

pub fn ollama_message(text: &str) -> Value {
    json!({
        "model": "llama3.2",
        "message": {"role": "assistant", "content": text},
        "done": true,
        "prompt_eval_count": 26,
        "eval_count": 4
    })
}
