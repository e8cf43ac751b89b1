//! Tools that read and write session state through the tool context.

use adkit_core::{Tool, ToolContext, ToolResult};
use async_trait::async_trait;
use serde_json::{Map, Value, json};
use tracing::debug;

fn key_argument(arguments: &Map<String, Value>) -> Result<&str, ToolResult> {
    match arguments.get("key").and_then(Value::as_str) {
        Some(key) if !key.trim().is_empty() => Ok(key),
        _ => Err(ToolResult::error("key must be a non-empty string")),
    }
}

/// Writes one state key. `temp:` keys last for the current invocation only.
pub struct SetStateTool;

#[async_trait]
impl Tool for SetStateTool {
    fn name(&self) -> &str {
        "set_state"
    }

    fn description(&self) -> &str {
        "Stores a value in session state under the given key. Prefix the key with user: or app: to share it across sessions, or temp: to keep it for this turn only."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "key": { "type": "string", "description": "State key" },
                "value": { "description": "Any JSON value" }
            },
            "required": ["key", "value"]
        })
    }

    async fn execute(
        &self,
        arguments: Map<String, Value>,
        ctx: &mut ToolContext,
    ) -> anyhow::Result<ToolResult> {
        let key = match key_argument(&arguments) {
            Ok(key) => key.to_string(),
            Err(result) => return Ok(result),
        };
        let value = arguments.get("value").cloned().unwrap_or(Value::Null);
        debug!(agent = %ctx.agent_name, key = %key, "set_state");
        ctx.state.set(key.clone(), value);
        Ok(ToolResult::success(Map::new()).with("key", key))
    }
}

pub struct GetStateTool;

#[async_trait]
impl Tool for GetStateTool {
    fn name(&self) -> &str {
        "get_state"
    }

    fn description(&self) -> &str {
        "Reads a value from session state."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "key": { "type": "string", "description": "State key" }
            },
            "required": ["key"]
        })
    }

    async fn execute(
        &self,
        arguments: Map<String, Value>,
        ctx: &mut ToolContext,
    ) -> anyhow::Result<ToolResult> {
        let key = match key_argument(&arguments) {
            Ok(key) => key,
            Err(result) => return Ok(result),
        };
        Ok(match ctx.state.get(key) {
            Some(value) => ToolResult::success(Map::new())
                .with("key", key)
                .with("value", value.clone()),
            None => ToolResult::error(format!("no state value for key '{key}'")),
        })
    }
}

/// Asks the enclosing loop agent to stop after the current iteration.
pub struct ExitLoopTool;

#[async_trait]
impl Tool for ExitLoopTool {
    fn name(&self) -> &str {
        "exit_loop"
    }

    fn description(&self) -> &str {
        "Call this when the task is complete and no further iterations are needed."
    }

    fn parameters(&self) -> Value {
        json!({ "type": "object", "properties": {} })
    }

    async fn execute(
        &self,
        _arguments: Map<String, Value>,
        ctx: &mut ToolContext,
    ) -> anyhow::Result<ToolResult> {
        ctx.escalate = true;
        Ok(ToolResult::success(Map::new()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use adkit_core::State;

    fn args(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn set_then_get() {
        let mut ctx = ToolContext::new("inv", "agent", State::default());
        let set = SetStateTool
            .execute(args(json!({"key": "user:city", "value": "Paris"})), &mut ctx)
            .await
            .unwrap();
        assert!(set.is_success());
        assert_eq!(ctx.state.delta().get("user:city"), Some(&json!("Paris")));

        let got = GetStateTool
            .execute(args(json!({"key": "user:city"})), &mut ctx)
            .await
            .unwrap();
        assert_eq!(got.get("value"), Some(&json!("Paris")));
    }

    #[tokio::test]
    async fn missing_key_is_an_error_result() {
        let mut ctx = ToolContext::new("inv", "agent", State::default());
        let got = GetStateTool
            .execute(args(json!({"key": "nothing"})), &mut ctx)
            .await
            .unwrap();
        assert!(!got.is_success());

        let blank = SetStateTool
            .execute(args(json!({"key": " ", "value": 1})), &mut ctx)
            .await
            .unwrap();
        assert!(!blank.is_success());
    }

    #[tokio::test]
    async fn exit_loop_escalates() {
        let mut ctx = ToolContext::new("inv", "agent", State::default());
        ExitLoopTool.execute(Map::new(), &mut ctx).await.unwrap();
        assert!(ctx.escalate);
    }
}
