use std::sync::Arc;

use adkit_core::AdkError;
use async_trait::async_trait;

use crate::context::InvocationContext;

/// A node in the agent tree.
#[async_trait]
pub trait Agent: Send + Sync {
    fn name(&self) -> &str;

    fn description(&self) -> &str {
        ""
    }

    /// Direct children, for composite agents.
    fn sub_agents(&self) -> &[Arc<dyn Agent>] {
        &[]
    }

    /// Run one turn, appending every event it produces to `ctx`.
    async fn run(&self, ctx: &mut InvocationContext) -> Result<(), AdkError>;
}

/// Depth-first search of the tree rooted at `root`.
pub fn find_agent(root: &Arc<dyn Agent>, name: &str) -> Option<Arc<dyn Agent>> {
    if root.name() == name {
        return Some(root.clone());
    }
    root.sub_agents()
        .iter()
        .find_map(|child| find_agent(child, name))
}
