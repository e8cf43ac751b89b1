use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::message::Content;

/// Author name used for events carrying end-user input.
pub const USER_AUTHOR: &str = "user";

/// Side effects carried by an event.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct EventActions {
    /// State changes to apply when the event is appended. `null` removes a key.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub state_delta: Map<String, Value>,
    /// Ask the enclosing loop to stop.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub escalate: bool,
}

/// An immutable record in a session's history.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Event {
    pub id: Uuid,
    pub invocation_id: String,
    /// `"user"` or the name of the agent that produced the event.
    pub author: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<Content>,
    #[serde(default)]
    pub actions: EventActions,
}

impl Event {
    pub fn new(
        invocation_id: impl Into<String>,
        author: impl Into<String>,
        content: Option<Content>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            invocation_id: invocation_id.into(),
            author: author.into(),
            timestamp: Utc::now(),
            content,
            actions: EventActions::default(),
        }
    }

    pub fn user_message(invocation_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self::new(invocation_id, USER_AUTHOR, Some(Content::user_text(text)))
    }

    pub fn with_state_delta(mut self, delta: Map<String, Value>) -> Self {
        self.actions.state_delta = delta;
        self
    }

    pub fn is_from_user(&self) -> bool {
        self.author == USER_AUTHOR
    }

    /// A text-only answer from an agent, as opposed to a tool round-trip.
    pub fn is_final_response(&self) -> bool {
        !self.is_from_user()
            && self.content.as_ref().is_some_and(|c| {
                !c.has_function_calls()
                    && c.parts
                        .iter()
                        .all(|p| matches!(p, crate::message::Part::Text(_)))
                    && !c.is_empty()
            })
    }

    pub fn text(&self) -> Option<String> {
        self.content.as_ref().map(Content::text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::{Part, Role};
    use crate::types::ToolCall;
    use serde_json::json;

    #[test]
    fn test_user_event() {
        let event = Event::user_message("inv-1", "hello");
        assert!(event.is_from_user());
        assert!(!event.is_final_response());
        assert_eq!(event.text().as_deref(), Some("hello"));
    }

    #[test]
    fn test_final_response_detection() {
        let answer = Event::new("inv-1", "writer", Some(Content::model_text("done")));
        assert!(answer.is_final_response());

        let call = Event::new(
            "inv-1",
            "writer",
            Some(Content::new(
                Role::Model,
                vec![Part::FunctionCall(ToolCall::from_json("noop", json!({})))],
            )),
        );
        assert!(!call.is_final_response());
    }

    #[test]
    fn test_event_serialization_skips_empty_actions() {
        let event = Event::new("inv-1", "a", None);
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["actions"], json!({}));
        let back: Event = serde_json::from_value(value).unwrap();
        assert_eq!(back, event);
    }
}
