use adkit_core::{Tool, ToolContext, ToolResult};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Map, Value, json};

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Add,
    Subtract,
    Multiply,
    Divide,
}

impl Operation {
    /// Fails on division by zero and on results that JSON cannot carry (overflow to infinity).
    pub fn apply(self, a: f64, b: f64) -> Result<f64, String> {
        let result = match self {
            Self::Add => a + b,
            Self::Subtract => a - b,
            Self::Multiply => a * b,
            Self::Divide if b == 0.0 => return Err("division by zero".to_string()),
            Self::Divide => a / b,
        };
        if result.is_finite() {
            Ok(result)
        } else {
            Err("result is not a finite number".to_string())
        }
    }
}

#[derive(Debug, Deserialize)]
struct CalculateInput {
    a: f64,
    b: f64,
    operation: Operation,
}

/// Basic arithmetic on two numbers.
pub struct CalculatorTool;

#[async_trait]
impl Tool for CalculatorTool {
    fn name(&self) -> &str {
        "calculate"
    }

    fn description(&self) -> &str {
        "Performs basic arithmetic on two numbers: add, subtract, multiply or divide."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "a": { "type": "number", "description": "Left operand" },
                "b": { "type": "number", "description": "Right operand" },
                "operation": {
                    "type": "string",
                    "enum": ["add", "subtract", "multiply", "divide"],
                    "description": "Operation to apply"
                }
            },
            "required": ["a", "b", "operation"]
        })
    }

    async fn execute(
        &self,
        arguments: Map<String, Value>,
        _ctx: &mut ToolContext,
    ) -> anyhow::Result<ToolResult> {
        let input: CalculateInput = match serde_json::from_value(Value::Object(arguments)) {
            Ok(input) => input,
            Err(e) => return Ok(ToolResult::error(format!("invalid input: {e}"))),
        };

        Ok(match input.operation.apply(input.a, input.b) {
            Ok(result) => ToolResult::success(Map::new()).with("result", result),
            Err(message) => ToolResult::error(message),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use adkit_core::State;

    async fn run(args: Value) -> ToolResult {
        let mut ctx = ToolContext::new("inv", "agent", State::default());
        let args = args.as_object().cloned().unwrap();
        CalculatorTool.execute(args, &mut ctx).await.unwrap()
    }

    #[tokio::test]
    async fn multiplies() {
        let result = run(json!({"a": 6, "b": 7, "operation": "multiply"})).await;
        assert!(result.is_success());
        assert_eq!(result.get("result"), Some(&json!(42.0)));
    }

    #[tokio::test]
    async fn divide_by_zero_is_an_error_result() {
        let result = run(json!({"a": 1, "b": 0, "operation": "divide"})).await;
        assert_eq!(result.error_message(), Some("division by zero"));
    }

    #[tokio::test]
    async fn unknown_operation_is_an_error_result() {
        let result = run(json!({"a": 1, "b": 2, "operation": "pow"})).await;
        assert!(!result.is_success());
    }

    #[tokio::test]
    async fn overflow_is_an_error_result() {
        let result = run(json!({"a": 1e308, "b": 10, "operation": "multiply"})).await;
        assert!(!result.is_success());
        assert_eq!(result.error_message(), Some("result is not a finite number"));
        assert_eq!(
            Operation::Add.apply(f64::MAX, f64::MAX),
            Err("result is not a finite number".to_string())
        );
    }

    #[test]
    fn subtract_order() {
        assert_eq!(Operation::Subtract.apply(10.0, 4.0), Ok(6.0));
    }
}
