//! Dispatcher for agent tool calls.
//!
//! Routes the model's requested tool invocations to the registered tools,
//! checking arguments against each tool's declared schema first.

use adkit_core::{AdkError, ToolCall, ToolContext, ToolDeclaration, ToolRegistry, ToolResult};
use serde_json::{Map, Value};
use tracing::{debug, warn};

#[derive(Clone, Default)]
pub struct ToolDispatcher {
    registry: ToolRegistry,
}

impl ToolDispatcher {
    pub fn new(registry: ToolRegistry) -> Self {
        Self { registry }
    }

    pub fn declarations(&self) -> Vec<ToolDeclaration> {
        self.registry.declarations()
    }

    /// Dispatch a single tool call to the corresponding handler.
    pub async fn dispatch(
        &self,
        call: &ToolCall,
        ctx: &mut ToolContext,
    ) -> Result<ToolResult, AdkError> {
        let tool = self
            .registry
            .get(&call.name)
            .ok_or_else(|| AdkError::UnknownTool(call.name.clone()))?;

        validate_arguments(&call.name, &tool.parameters(), &call.arguments)?;

        debug!(tool = %call.name, agent = %ctx.agent_name, "Dispatching tool call");
        ctx.function_call_id = call.id.clone();
        tool.execute(call.arguments.clone(), ctx)
            .await
            .map_err(|e| AdkError::ToolFailed {
                tool: call.name.clone(),
                message: format!("{e:#}"),
            })
    }

    /// Like [`dispatch`](Self::dispatch), but every failure becomes an error
    /// result the model can read.
    pub async fn dispatch_or_error(&self, call: &ToolCall, ctx: &mut ToolContext) -> ToolResult {
        match self.dispatch(call, ctx).await {
            Ok(result) => result,
            Err(e) => {
                warn!(tool = %call.name, error = %e, "Tool call failed");
                ToolResult::error(e.to_string())
            }
        }
    }
}

fn type_matches(expected: &str, value: &Value) -> bool {
    match expected {
        "string" => value.is_string(),
        "number" => value.is_number(),
        "integer" => {
            value.is_i64()
                || value.is_u64()
                || value.as_f64().is_some_and(|f| f.fract() == 0.0)
        }
        "boolean" => value.is_boolean(),
        "object" => value.is_object(),
        "array" => value.is_array(),
        "null" => value.is_null(),
        _ => true,
    }
}

/// Check `arguments` against a JSON-schema style `{type, properties, required}` object.
pub fn validate_arguments(
    tool: &str,
    schema: &Value,
    arguments: &Map<String, Value>,
) -> Result<(), AdkError> {
    let empty = Map::new();
    let properties = schema
        .get("properties")
        .and_then(Value::as_object)
        .unwrap_or(&empty);
    let required: Vec<&str> = schema
        .get("required")
        .and_then(Value::as_array)
        .map(|r| r.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default();

    for name in &required {
        match arguments.get(*name) {
            None | Some(Value::Null) => {
                return Err(AdkError::invalid_arguments(
                    tool,
                    format!("missing required argument '{name}'"),
                ));
            }
            Some(_) => {}
        }
    }

    for (name, value) in arguments {
        let Some(property) = properties.get(name) else {
            if properties.is_empty() {
                continue;
            }
            return Err(AdkError::invalid_arguments(
                tool,
                format!("unexpected argument '{name}'"),
            ));
        };
        if value.is_null() && !required.contains(&name.as_str()) {
            continue;
        }
        if let Some(expected) = property.get("type").and_then(Value::as_str) {
            if !type_matches(expected, value) {
                return Err(AdkError::invalid_arguments(
                    tool,
                    format!("argument '{name}' must be of type {expected}"),
                ));
            }
        }
        if let Some(allowed) = property.get("enum").and_then(Value::as_array) {
            if !allowed.contains(value) {
                return Err(AdkError::invalid_arguments(
                    tool,
                    format!("argument '{name}' must be one of {}", Value::Array(allowed.clone())),
                ));
            }
        }
    }
    Ok(())
}
