use std::collections::HashMap;
use std::sync::Arc;

use crate::error::AdkError;
use crate::traits::Tool;
use crate::types::ToolDeclaration;

/// Static mapping from tool name to implementation.
#[derive(Default, Clone)]
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
        }
    }

    /// Register a tool. A later registration under the same name replaces the earlier one.
    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        self.tools.insert(tool.name().to_string(), tool);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// Registered names, sorted.
    pub fn list(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tools.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Declarations for every tool, sorted by name.
    pub fn declarations(&self) -> Vec<ToolDeclaration> {
        self.list()
            .iter()
            .filter_map(|name| self.tools.get(name))
            .map(|tool| tool.declaration())
            .collect()
    }

    /// A registry restricted to `names`. Fails on the first name that is not registered.
    pub fn subset<S: AsRef<str>>(&self, names: &[S]) -> Result<ToolRegistry, AdkError> {
        let mut subset = ToolRegistry::new();
        for name in names {
            let name = name.as_ref();
            let tool = self
                .get(name)
                .ok_or_else(|| AdkError::UnknownTool(name.to_string()))?;
            subset.register(tool);
        }
        Ok(subset)
    }
}
