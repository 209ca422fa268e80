//! Provider registry for name-based adapter lookup.

use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use super::ProviderAdapter;
use crate::error::{LlmuxError, Result};

static BUILTIN: OnceLock<ProviderRegistry> = OnceLock::new();

/// Registry mapping provider names to their adapters.
///
/// Populate it once, then share it; lookups take `&self` and need no locking.
#[derive(Debug, Clone, Default)]
pub struct ProviderRegistry {
    adapters: HashMap<String, Arc<dyn ProviderAdapter>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding every adapter enabled by feature flags.
    pub fn builtin() -> Self {
        #[allow(unused_mut)]
        let mut registry = Self::new();

        #[cfg(feature = "openai")]
        for profile in super::openai::OpenAiAdapter::profiles() {
            registry.register(Arc::new(profile));
        }
        #[cfg(feature = "anthropic")]
        registry.register(Arc::new(super::anthropic::AnthropicAdapter));
        #[cfg(feature = "cohere")]
        registry.register(Arc::new(super::cohere::CohereAdapter));
        #[cfg(feature = "ollama")]
        registry.register(Arc::new(super::ollama::OllamaAdapter));

        registry
    }

    /// Register an adapter under its own name, replacing any previous one.
    pub fn register(&mut self, adapter: Arc<dyn ProviderAdapter>) {
        self.adapters.insert(adapter.name().to_string(), adapter);
    }

    /// Look up an adapter by name.
    pub fn get(&self, name: &str) -> Result<Arc<dyn ProviderAdapter>> {
        self.adapters
            .get(name)
            .cloned()
            .ok_or_else(|| LlmuxError::UnsupportedProvider {
                name: name.to_string(),
                known: self.names().join(", "),
            })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.adapters.contains_key(name)
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.adapters.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

/// The process-wide registry of built-in adapters, created on first use.
pub fn global() -> &'static ProviderRegistry {
    BUILTIN.get_or_init(ProviderRegistry::builtin)
}

/// Look up a built-in adapter by name.
pub fn lookup(name: &str) -> Result<Arc<dyn ProviderAdapter>> {
    global().get(name)
}
