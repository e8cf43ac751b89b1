use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::error::AdkError;
use crate::message::Content;
use crate::state::State;
use crate::types::{ToolDeclaration, ToolResult};

/// Per-call context handed to a tool: where the call comes from and the state it may read or write.
#[derive(Debug, Clone)]
pub struct ToolContext {
    pub invocation_id: String,
    pub agent_name: String,
    pub function_call_id: Option<String>,
    pub state: State,
    /// Set by a tool to ask the enclosing loop agent to stop.
    pub escalate: bool,
}

impl ToolContext {
    pub fn new(
        invocation_id: impl Into<String>,
        agent_name: impl Into<String>,
        state: State,
    ) -> Self {
        Self {
            invocation_id: invocation_id.into(),
            agent_name: agent_name.into(),
            function_call_id: None,
            state,
            escalate: false,
        }
    }
}

/// A capability that an agent exposes to its model.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Unique name of the tool (e.g., "get_current_time").
    fn name(&self) -> &str;

    /// Description for the model.
    fn description(&self) -> &str;

    /// JSON Schema for the tool's parameters.
    fn parameters(&self) -> Value;

    fn declaration(&self) -> ToolDeclaration {
        ToolDeclaration {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: self.parameters(),
        }
    }

    /// Execute the tool. Expected failures belong in `ToolResult::error`;
    /// `Err` is reserved for failures the tool cannot describe to the model.
    async fn execute(
        &self,
        arguments: Map<String, Value>,
        ctx: &mut ToolContext,
    ) -> anyhow::Result<ToolResult>;
}

/// Trait for hosted LLM backends.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Provider name (e.g., "gemini").
    fn name(&self) -> &str;

    /// Send one generation request and return the model's turn.
    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse, AdkError>;
}

/// Request to an LLM provider.
#[derive(Debug, Clone, PartialEq)]
pub struct LlmRequest {
    pub model: String,
    pub system_instruction: Option<String>,
    pub contents: Vec<Content>,
    pub tools: Vec<ToolDeclaration>,
    pub temperature: Option<f32>,
    pub max_output_tokens: Option<u32>,
}

impl LlmRequest {
    pub fn new(model: impl Into<String>, contents: Vec<Content>) -> Self {
        Self {
            model: model.into(),
            system_instruction: None,
            contents,
            tools: Vec::new(),
            temperature: None,
            max_output_tokens: None,
        }
    }
}

/// Response from an LLM provider.
#[derive(Debug, Clone, PartialEq)]
pub struct LlmResponse {
    pub content: Content,
    pub provider: String,
    pub model: String,
    pub finish_reason: Option<String>,
    pub tokens_used: u64,
    pub latency_ms: u64,
}
