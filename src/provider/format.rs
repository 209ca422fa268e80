//! Message and response normalization helpers shared by adapters.

use serde_json::{Map, Value};

use crate::types::{Message, Role};

/// Separator placed between consecutive system messages.
pub const SYSTEM_SEPARATOR: &str = "\n\n";

/// A conversation with its system messages pulled out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitConversation<'a> {
    /// All system messages, joined in input order.
    pub system: Option<String>,
    /// The remaining user and assistant turns, in order.
    pub turns: Vec<&'a Message>,
}

/// Separate system messages for vendors with a dedicated system field.
pub fn split_system(messages: &[Message]) -> SplitConversation<'_> {
    let mut system_parts = Vec::new();
    let mut turns = Vec::new();
    for message in messages {
        match message.role {
            Role::System => system_parts.push(message.content.as_str()),
            Role::User | Role::Assistant => turns.push(message),
        }
    }
    SplitConversation {
        system: (!system_parts.is_empty()).then(|| system_parts.join(SYSTEM_SEPARATOR)),
        turns,
    }
}

/// Insert `value` under `key` only when it is set.
pub fn put<T: Into<Value>>(body: &mut Map<String, Value>, key: &str, value: Option<T>) {
    if let Some(value) = value {
        body.insert(key.to_string(), value.into());
    }
}

/// Concatenate textual segments in order; `None` when there were none.
pub fn concat_text_segments<'a, I>(segments: I) -> Option<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut segments = segments.into_iter().peekable();
    segments.peek()?;
    Some(segments.collect())
}
