use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Default upper bound on model round-trips within one agent turn.
pub const DEFAULT_MAX_STEPS: usize = 10;

/// A structured tool invocation decided by the hosted model.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolCall {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub arguments: Map<String, Value>,
}

impl ToolCall {
    pub fn new(name: impl Into<String>, arguments: Map<String, Value>) -> Self {
        Self {
            id: None,
            name: name.into(),
            arguments,
        }
    }

    /// Build a call from a JSON object literal. Non-object values yield no arguments.
    pub fn from_json(name: impl Into<String>, arguments: Value) -> Self {
        let arguments = match arguments {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        Self::new(name, arguments)
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }
}

/// Outcome of a tool function.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ToolStatus {
    Success,
    Error,
}

/// Structured tool result, serialized flat as `{"status": ..., ...payload}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolResult {
    pub status: ToolStatus,
    #[serde(flatten)]
    pub payload: Map<String, Value>,
}

impl ToolResult {
    pub fn success(mut payload: Map<String, Value>) -> Self {
        payload.remove("status");
        Self {
            status: ToolStatus::Success,
            payload,
        }
    }

    /// Wrap any JSON value. Objects become the payload, everything else lands under `result`.
    pub fn success_value(value: Value) -> Self {
        match value {
            Value::Object(map) => Self::success(map),
            other => {
                let mut payload = Map::new();
                payload.insert("result".to_string(), other);
                Self::success(payload)
            }
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        let mut payload = Map::new();
        payload.insert("error_message".to_string(), Value::String(message.into()));
        Self {
            status: ToolStatus::Error,
            payload,
        }
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        let key = key.into();
        if key != "status" {
            self.payload.insert(key, value.into());
        }
        self
    }

    pub fn is_success(&self) -> bool {
        self.status == ToolStatus::Success
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.payload.get(key)
    }

    pub fn error_message(&self) -> Option<&str> {
        self.payload.get("error_message").and_then(Value::as_str)
    }

    pub fn to_value(&self) -> Value {
        let mut map = self.payload.clone();
        map.insert(
            "status".to_string(),
            Value::String(
                match self.status {
                    ToolStatus::Success => "success",
                    ToolStatus::Error => "error",
                }
                .to_string(),
            ),
        );
        Value::Object(map)
    }
}

/// What the model sees of a tool: name, description and parameter schema.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolDeclaration {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

/// Static description of an LLM agent.
///
/// Agents keep their config behind an `Arc` and never mutate it after construction.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AgentConfig {
    pub name: String,
    /// Backing model identifier, e.g. `gemini-2.0-flash`.
    pub model: String,
    #[serde(default)]
    pub description: String,
    /// Instruction template; `{key}` placeholders are filled from session state.
    #[serde(default)]
    pub instruction: String,
    #[serde(default)]
    pub tools: Vec<String>,
    /// State key that receives the agent's final text answer.
    #[serde(default)]
    pub output_key: Option<String>,
    #[serde(default)]
    pub temperature: Option<f32>,
    #[serde(default)]
    pub max_output_tokens: Option<u32>,
    #[serde(default = "default_max_steps")]
    pub max_steps: usize,
}

fn default_max_steps() -> usize {
    DEFAULT_MAX_STEPS
}

impl AgentConfig {
    pub fn new(name: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            model: model.into(),
            description: String::new(),
            instruction: String::new(),
            tools: Vec::new(),
            output_key: None,
            temperature: None,
            max_output_tokens: None,
            max_steps: DEFAULT_MAX_STEPS,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_instruction(mut self, instruction: impl Into<String>) -> Self {
        self.instruction = instruction.into();
        self
    }

    pub fn with_tools<I, S>(mut self, tools: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tools = tools.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_output_key(mut self, key: impl Into<String>) -> Self {
        self.output_key = Some(key.into());
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_max_output_tokens(mut self, max: u32) -> Self {
        self.max_output_tokens = Some(max);
        self
    }

    pub fn with_max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = max_steps.max(1);
        self
    }
}
