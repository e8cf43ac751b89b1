//! Agent callbacks.
//!
//! Callbacks observe or replace values around model and tool calls. They run
//! in registration order; the first callback to return a replacement wins and
//! the rest of the chain is skipped. A callback error is logged and treated as
//! "no replacement".

use std::sync::Arc;

use adkit_core::{Content, LlmRequest, State, ToolCall, ToolResult};
use anyhow::Result;
use async_trait::async_trait;
use tracing::{debug, warn};

/// Where in the tree a callback is firing, plus the session state it may
/// read and change. Writes land in the next event the agent appends.
#[derive(Debug, Clone, PartialEq)]
pub struct CallbackContext {
    pub invocation_id: String,
    pub agent_name: String,
    pub session_id: String,
    pub state: State,
}

#[async_trait]
pub trait AgentCallback: Send + Sync {
    /// Human-readable name for logging.
    fn name(&self) -> &str;

    /// Return `Some` to skip the model call and use this content instead.
    async fn before_model(
        &self,
        _ctx: &mut CallbackContext,
        _request: &LlmRequest,
    ) -> Result<Option<Content>> {
        Ok(None)
    }

    /// Return `Some` to replace the model's response.
    async fn after_model(
        &self,
        _ctx: &mut CallbackContext,
        _response: &Content,
    ) -> Result<Option<Content>> {
        Ok(None)
    }

    /// Return `Some` to skip the tool and use this result instead.
    async fn before_tool(
        &self,
        _ctx: &mut CallbackContext,
        _call: &ToolCall,
    ) -> Result<Option<ToolResult>> {
        Ok(None)
    }

    /// Return `Some` to replace the tool's result.
    async fn after_tool(
        &self,
        _ctx: &mut CallbackContext,
        _call: &ToolCall,
        _result: &ToolResult,
    ) -> Result<Option<ToolResult>> {
        Ok(None)
    }
}

#[derive(Clone, Default)]
pub struct CallbackChain {
    callbacks: Vec<Arc<dyn AgentCallback>>,
}

/// Runs one hook over the chain until a callback returns a replacement.
macro_rules! first_replacement {
    ($self:ident, $phase:literal, |$cb:ident| $call:expr) => {{
        for $cb in &$self.callbacks {
            debug!(callback = $cb.name(), phase = $phase, "Running callback");
            match $call.await {
                Ok(Some(replacement)) => return Some(replacement),
                Ok(None) => {}
                Err(e) => warn!(callback = $cb.name(), phase = $phase, error = %e, "Callback failed"),
            }
        }
        None
    }};
}

impl CallbackChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, callback: Arc<dyn AgentCallback>) {
        self.callbacks.push(callback);
    }

    pub fn len(&self) -> usize {
        self.callbacks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.callbacks.is_empty()
    }

    pub async fn before_model(&self, ctx: &mut CallbackContext, request: &LlmRequest) -> Option<Content> {
        first_replacement!(self, "before_model", |cb| cb.before_model(ctx, request))
    }

    pub async fn after_model(&self, ctx: &mut CallbackContext, response: &Content) -> Option<Content> {
        first_replacement!(self, "after_model", |cb| cb.after_model(ctx, response))
    }

    pub async fn before_tool(&self, ctx: &mut CallbackContext, call: &ToolCall) -> Option<ToolResult> {
        first_replacement!(self, "before_tool", |cb| cb.before_tool(ctx, call))
    }

    pub async fn after_tool(
        &self,
        ctx: &mut CallbackContext,
        call: &ToolCall,
        result: &ToolResult,
    ) -> Option<ToolResult> {
        first_replacement!(self, "after_tool", |cb| cb.after_tool(ctx, call, result))
    }
}
