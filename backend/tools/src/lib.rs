pub mod calculator;
pub mod state;
pub mod time;
pub mod web;

use std::sync::Arc;

use adkit_core::ToolRegistry;

pub use calculator::CalculatorTool;
pub use state::{ExitLoopTool, GetStateTool, SetStateTool};
pub use time::CurrentTimeTool;
pub use web::WebFetchTool;

/// Add every built-in tool to `registry`.
pub fn register_builtins(registry: &mut ToolRegistry) {
    registry.register(Arc::new(CurrentTimeTool));
    registry.register(Arc::new(CalculatorTool));
    registry.register(Arc::new(SetStateTool));
    registry.register(Arc::new(GetStateTool));
    registry.register(Arc::new(ExitLoopTool));
    registry.register(Arc::new(WebFetchTool::new()));
}

pub fn builtin_registry() -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    register_builtins(&mut registry);
    registry
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registers_all_builtins() {
        let registry = builtin_registry();
        assert_eq!(
            registry.list(),
            vec![
                "calculate",
                "exit_loop",
                "get_current_time",
                "get_state",
                "set_state",
                "web_fetch"
            ]
        );
        assert!(registry
            .declarations()
            .iter()
            .all(|d| d.parameters["type"] == "object"));
    }
}
