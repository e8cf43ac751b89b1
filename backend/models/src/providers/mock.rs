use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;

use adkit_core::{AdkError, Content, LlmProvider, LlmRequest, LlmResponse, Part, Role, ToolCall};

/// A provider that replays a queue of canned model turns and records what it was asked.
pub struct ScriptedProvider {
    name: String,
    responses: Mutex<VecDeque<Content>>,
    requests: Mutex<Vec<LlmRequest>>,
    fallback: Option<String>,
}

impl ScriptedProvider {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            responses: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
            fallback: None,
        }
    }

    pub fn with_response(self, content: Content) -> Self {
        self.push(content);
        self
    }

    pub fn with_text(self, text: impl Into<String>) -> Self {
        self.with_response(Content::model_text(text))
    }

    /// Queue a turn in which the model calls one tool.
    pub fn with_call(self, tool: impl Into<String>, arguments: Value) -> Self {
        self.with_response(Content::new(
            Role::Model,
            vec![Part::FunctionCall(ToolCall::from_json(tool, arguments))],
        ))
    }

    /// Text returned once the queue is exhausted. Without it an empty queue is an error.
    pub fn with_fallback(mut self, text: impl Into<String>) -> Self {
        self.fallback = Some(text.into());
        self
    }

    pub fn push(&self, content: Content) {
        if let Ok(mut queue) = self.responses.lock() {
            queue.push_back(content);
        }
    }

    pub fn requests(&self) -> Vec<LlmRequest> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }

    pub fn remaining(&self) -> usize {
        self.responses.lock().map(|q| q.len()).unwrap_or(0)
    }
}

#[async_trait]
impl LlmProvider for ScriptedProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse, AdkError> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request.clone());
        }

        let next = self
            .responses
            .lock()
            .map_err(|_| AdkError::LlmError {
                provider: self.name.clone(),
                message: "response queue poisoned".to_string(),
            })?
            .pop_front();

        let content = match (next, &self.fallback) {
            (Some(content), _) => content,
            (None, Some(text)) => Content::model_text(text.clone()),
            (None, None) => {
                return Err(AdkError::LlmError {
                    provider: self.name.clone(),
                    message: "no scripted responses left".to_string(),
                })
            }
        };

        Ok(LlmResponse {
            content,
            provider: self.name.clone(),
            model: request.model.clone(),
            finish_reason: Some("STOP".to_string()),
            tokens_used: 0,
            latency_ms: 0,
        })
    }
}
