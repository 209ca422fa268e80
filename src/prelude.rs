//! Convenience re-exports for common use.

pub use crate::client::{TextGenerator, UnifiedClient};
pub use crate::config::ClientConfig;
pub use crate::error::{LlmuxError, Result};
pub use crate::provider::registry::ProviderRegistry;
pub use crate::provider::ProviderAdapter;
pub use crate::types::{
    GenerationOptions, Message, NormalizedResponse, ProviderOptions, ResponseFormat, Role, Usage,
};
pub use crate::util::context::CallContext;
pub use crate::util::retry::RetryPolicy;
