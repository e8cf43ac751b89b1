//! Agent Event Logger
//!
//! Structured records of what agents did (tool calls, tool results, model
//! turns, errors), redacted and emitted on the `agent_events` target.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

use crate::redact::redact_sensitive_data;

pub const EVENT_TARGET: &str = "agent_events";

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AgentEvent {
    ToolCall {
        agent: String,
        tool_name: String,
        arguments_json: String,
    },
    ToolResult {
        agent: String,
        tool_name: String,
        status: String,
        payload_json: String,
    },
    ModelResponse {
        agent: String,
        model: String,
        tokens_used: u64,
        latency_ms: u64,
        text: String,
    },
    Error {
        agent: String,
        error_msg: String,
    },
}

impl AgentEvent {
    fn redact(&mut self) {
        match self {
            AgentEvent::ToolCall { arguments_json, .. } => {
                *arguments_json = redact_sensitive_data(arguments_json);
            }
            AgentEvent::ToolResult { payload_json, .. } => {
                *payload_json = redact_sensitive_data(payload_json);
            }
            AgentEvent::ModelResponse { text, .. } => {
                *text = redact_sensitive_data(text);
            }
            AgentEvent::Error { error_msg, .. } => {
                *error_msg = redact_sensitive_data(error_msg);
            }
        }
    }
}

#[derive(Debug, Serialize)]
pub struct EventLogEntry {
    pub session_id: String,
    pub timestamp: DateTime<Utc>,
    pub event: AgentEvent,
}

impl EventLogEntry {
    pub fn new(session_id: &str, mut event: AgentEvent) -> Self {
        event.redact();
        Self {
            session_id: session_id.into(),
            timestamp: Utc::now(),
            event,
        }
    }
}

pub struct EventLogger;

impl EventLogger {
    /// Redacts `event` and emits it as one JSON field on the tracing system.
    pub fn log_event(session_id: &str, event: AgentEvent) {
        let entry = EventLogEntry::new(session_id, event);
        let json = serde_json::to_string(&entry).unwrap_or_else(|e| format!("{{\"error\":\"{e}\"}}"));
        info!(target: EVENT_TARGET, session_id = %entry.session_id, event = %json, "Agent trace event");
    }
}
