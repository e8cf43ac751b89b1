pub mod gemini;
pub mod mock;

use std::collections::HashMap;
use std::sync::Arc;

use adkit_core::{AdkError, LlmProvider};

/// Registry of LLM providers, looked up by name.
#[derive(Clone, Default)]
pub struct ProviderRegistry {
    providers: HashMap<String, Arc<dyn LlmProvider>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self {
            providers: HashMap::new(),
        }
    }

    /// Register a provider by name.
    pub fn register(&mut self, name: impl Into<String>, provider: Arc<dyn LlmProvider>) {
        self.providers.insert(name.into(), provider);
    }

    pub fn get(&self, name: &str) -> Result<Arc<dyn LlmProvider>, AdkError> {
        self.providers
            .get(name)
            .cloned()
            .ok_or_else(|| AdkError::ProviderNotFound(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.providers.contains_key(name)
    }

    /// Registered provider names, sorted.
    pub fn list(&self) -> Vec<String> {
        let mut names: Vec<String> = self.providers.keys().cloned().collect();
        names.sort();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::mock::ScriptedProvider;

    #[test]
    fn test_registry_lookup() {
        let mut registry = ProviderRegistry::new();
        registry.register("mock2", Arc::new(ScriptedProvider::new("mock2")));
        registry.register("mock1", Arc::new(ScriptedProvider::new("mock1")));

        assert_eq!(registry.list(), vec!["mock1", "mock2"]);
        assert_eq!(registry.get("mock1").unwrap().name(), "mock1");
        assert!(registry.contains("mock2"));
    }

    #[test]
    fn test_registry_missing_provider() {
        let registry = ProviderRegistry::new();
        let err = registry.get("gemini").err().unwrap();
        assert!(matches!(err, AdkError::ProviderNotFound(name) if name == "gemini"));
    }
}
