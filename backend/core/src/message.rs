use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::types::ToolCall;

/// Who produced a turn of conversation, from the model's point of view.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Model,
}

/// The result of a tool call, returned to the model on the next turn.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FunctionResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    pub response: Value,
}

/// One piece of a conversation turn.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum Part {
    Text(String),
    FunctionCall(ToolCall),
    FunctionResponse(FunctionResponse),
}

/// A single turn of conversation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Content {
    pub role: Role,
    pub parts: Vec<Part>,
}

impl Content {
    pub fn new(role: Role, parts: Vec<Part>) -> Self {
        Self { role, parts }
    }

    pub fn user_text(text: impl Into<String>) -> Self {
        Self::new(Role::User, vec![Part::Text(text.into())])
    }

    pub fn model_text(text: impl Into<String>) -> Self {
        Self::new(Role::Model, vec![Part::Text(text.into())])
    }

    /// Concatenated text of all text parts.
    pub fn text(&self) -> String {
        self.parts
            .iter()
            .filter_map(|p| match p {
                Part::Text(t) => Some(t.as_str()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("")
    }

    pub fn function_calls(&self) -> Vec<ToolCall> {
        self.parts
            .iter()
            .filter_map(|p| match p {
                Part::FunctionCall(call) => Some(call.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn has_function_calls(&self) -> bool {
        self.parts.iter().any(|p| matches!(p, Part::FunctionCall(_)))
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_text_concatenation() {
        let content = Content::new(
            Role::Model,
            vec![
                Part::Text("Hello, ".into()),
                Part::FunctionCall(ToolCall::new("noop", serde_json::Map::new())),
                Part::Text("world".into()),
            ],
        );
        assert_eq!(content.text(), "Hello, world");
        assert!(content.has_function_calls());
        assert_eq!(content.function_calls()[0].name, "noop");
    }

    #[test]
    fn test_part_serialization_shape() {
        let part = Part::Text("hi".into());
        assert_eq!(serde_json::to_value(&part).unwrap(), json!({"text": "hi"}));

        let part = Part::FunctionResponse(FunctionResponse {
            id: None,
            name: "get_state".into(),
            response: json!({"status": "success"}),
        });
        assert_eq!(
            serde_json::to_value(&part).unwrap(),
            json!({"function_response": {"name": "get_state", "response": {"status": "success"}}})
        );
    }
}
