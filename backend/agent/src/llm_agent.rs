//! Model-driven agent loop.
//!
//! Each step renders the instruction, sends the history and tool
//! declarations to the provider, and either records a final answer or
//! dispatches the requested tool calls one at a time and loops.

use std::sync::Arc;

use adkit_core::{
    AdkError, AgentConfig, Content, Event, FunctionResponse, LlmProvider, LlmRequest, Part, Role,
    ToolCall, ToolContext, ToolRegistry, ToolResult,
};
use adkit_logging::{AgentEvent, EventLogger};
use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::agent::Agent;
use crate::callbacks::{AgentCallback, CallbackChain, CallbackContext};
use crate::context::InvocationContext;
use crate::dispatcher::ToolDispatcher;
use crate::template::render_instruction;

/// Result of a single model round-trip.
#[derive(Debug, Clone, PartialEq)]
pub enum StepResult {
    /// The model answered in text; the turn is over.
    Response(String),
    /// The model called tools; their results were recorded and we loop.
    ToolCalls(usize),
}

pub struct LlmAgent {
    config: Arc<AgentConfig>,
    provider: Arc<dyn LlmProvider>,
    dispatcher: ToolDispatcher,
    callbacks: CallbackChain,
}

impl LlmAgent {
    /// Build an agent whose tools are looked up by name in `tools`.
    pub fn new(
        config: AgentConfig,
        provider: Arc<dyn LlmProvider>,
        tools: &ToolRegistry,
    ) -> Result<Self, AdkError> {
        let registry = tools.subset(&config.tools)?;
        Ok(Self {
            config: Arc::new(config),
            provider,
            dispatcher: ToolDispatcher::new(registry),
            callbacks: CallbackChain::new(),
        })
    }

    pub fn with_callback(mut self, callback: Arc<dyn AgentCallback>) -> Self {
        self.callbacks.push(callback);
        self
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    fn callback_context(&self, ctx: &InvocationContext) -> CallbackContext {
        CallbackContext {
            invocation_id: ctx.invocation_id().to_string(),
            agent_name: self.config.name.clone(),
            session_id: ctx.session().id.clone(),
            state: ctx.state_view(),
        }
    }

    fn build_request(&self, ctx: &InvocationContext) -> Result<LlmRequest, AdkError> {
        let mut request = LlmRequest::new(
            self.config.model.clone(),
            history_for(&self.config.name, ctx),
        );
        if !self.config.instruction.trim().is_empty() {
            request.system_instruction =
                Some(render_instruction(&self.config.instruction, &ctx.state_view())?);
        }
        request.tools = self.dispatcher.declarations();
        request.temperature = self.config.temperature;
        request.max_output_tokens = self.config.max_output_tokens;
        Ok(request)
    }

    async fn call_model(
        &self,
        ctx: &InvocationContext,
        request: &LlmRequest,
        cb_ctx: &mut CallbackContext,
    ) -> Result<Content, AdkError> {
        if let Some(content) = self.callbacks.before_model(cb_ctx, request).await {
            debug!(agent = %self.config.name, "Model call replaced by callback");
            return Ok(content);
        }

        let response = match self.provider.complete(request).await {
            Ok(response) => response,
            Err(e) => {
                EventLogger::log_event(
                    &ctx.session().id,
                    AgentEvent::Error {
                        agent: self.config.name.clone(),
                        error_msg: e.to_string(),
                    },
                );
                return Err(e);
            }
        };
        EventLogger::log_event(
            &ctx.session().id,
            AgentEvent::ModelResponse {
                agent: self.config.name.clone(),
                model: response.model.clone(),
                tokens_used: response.tokens_used,
                latency_ms: response.latency_ms,
                text: response.content.text(),
            },
        );

        Ok(self
            .callbacks
            .after_model(cb_ctx, &response.content)
            .await
            .unwrap_or(response.content))
    }

    async fn run_tool(
        &self,
        call: &ToolCall,
        tool_ctx: &mut ToolContext,
        cb_ctx: &mut CallbackContext,
        session_id: &str,
    ) -> ToolResult {
        EventLogger::log_event(
            session_id,
            AgentEvent::ToolCall {
                agent: self.config.name.clone(),
                tool_name: call.name.clone(),
                arguments_json: Value::Object(call.arguments.clone()).to_string(),
            },
        );

        let result = match self.callbacks.before_tool(cb_ctx, call).await {
            Some(result) => result,
            None => self.dispatcher.dispatch_or_error(call, tool_ctx).await,
        };
        let result = self
            .callbacks
            .after_tool(cb_ctx, call, &result)
            .await
            .unwrap_or(result);

        EventLogger::log_event(
            session_id,
            AgentEvent::ToolResult {
                agent: self.config.name.clone(),
                tool_name: call.name.clone(),
                status: if result.is_success() { "success" } else { "error" }.to_string(),
                payload_json: result.to_value().to_string(),
            },
        );
        result
    }

    /// Single interaction with the model, plus any tool calls it asks for.
    pub async fn step(&self, ctx: &mut InvocationContext) -> Result<StepResult, AdkError> {
        let mut cb_ctx = self.callback_context(ctx);
        let request = self.build_request(ctx)?;
        debug!(
            agent = %self.config.name,
            history = request.contents.len(),
            tools = request.tools.len(),
            "Calling model"
        );

        let mut content = self.call_model(ctx, &request, &mut cb_ctx).await?;
        content.role = Role::Model;
        assign_call_ids(&mut content);
        let calls = content.function_calls();

        if calls.is_empty() {
            let text = content.text();
            let mut event = Event::new(ctx.invocation_id(), &self.config.name, Some(content))
                .with_state_delta(cb_ctx.state.take_delta());
            if let Some(key) = &self.config.output_key {
                event
                    .actions
                    .state_delta
                    .insert(key.clone(), Value::String(text.clone()));
            }
            ctx.append_event(event).await?;
            return Ok(StepResult::Response(text));
        }

        ctx.append_event(
            Event::new(ctx.invocation_id(), &self.config.name, Some(content))
                .with_state_delta(cb_ctx.state.take_delta()),
        )
        .await?;

        let mut tool_ctx = ToolContext::new(ctx.invocation_id(), &self.config.name, ctx.state_view());
        let mut parts = Vec::with_capacity(calls.len());
        for call in &calls {
            let result = self
                .run_tool(call, &mut tool_ctx, &mut cb_ctx, &ctx.session().id)
                .await;
            parts.push(Part::FunctionResponse(FunctionResponse {
                id: call.id.clone(),
                name: call.name.clone(),
                response: result.to_value(),
            }));
        }

        let mut delta = tool_ctx.state.take_delta();
        delta.extend(cb_ctx.state.take_delta());
        let mut event = Event::new(
            ctx.invocation_id(),
            &self.config.name,
            Some(Content::new(Role::User, parts)),
        )
        .with_state_delta(delta);
        event.actions.escalate = tool_ctx.escalate;
        ctx.append_event(event).await?;

        Ok(StepResult::ToolCalls(calls.len()))
    }
}

/// Gemini may omit call ids; responses are matched to calls by id.
fn assign_call_ids(content: &mut Content) {
    for part in &mut content.parts {
        if let Part::FunctionCall(call) = part {
            if call.id.is_none() {
                call.id = Some(format!("call-{}", Uuid::new_v4()));
            }
        }
    }
}

/// The conversation as `agent` should see it. Turns by other agents are
/// handed over as user-role context so the model does not mistake them for
/// its own.
pub fn history_for(agent: &str, ctx: &InvocationContext) -> Vec<Content> {
    ctx.events()
        .iter()
        .filter_map(|event| {
            let content = event.content.as_ref().filter(|c| !c.is_empty())?;
            if event.is_from_user() || event.author == agent {
                return Some(content.clone());
            }
            Some(reframe(&event.author, content))
        })
        .collect()
}

fn reframe(author: &str, content: &Content) -> Content {
    let mut parts = vec![Part::Text("For context:".to_string())];
    for part in &content.parts {
        let text = match part {
            Part::Text(text) => format!("[{author}] said: {text}"),
            Part::FunctionCall(call) => format!(
                "[{author}] called tool `{}` with parameters: {}",
                call.name,
                Value::Object(call.arguments.clone())
            ),
            Part::FunctionResponse(response) => format!(
                "[{author}] `{}` tool returned result: {}",
                response.name, response.response
            ),
        };
        parts.push(Part::Text(text));
    }
    Content::new(Role::User, parts)
}

#[async_trait]
impl Agent for LlmAgent {
    fn name(&self) -> &str {
        &self.config.name
    }

    fn description(&self) -> &str {
        &self.config.description
    }

    #[instrument(skip_all, fields(agent = %self.config.name, invocation = %ctx.invocation_id()))]
    async fn run(&self, ctx: &mut InvocationContext) -> Result<(), AdkError> {
        info!("Starting agent loop");

        for step in 1..=self.config.max_steps {
            debug!("Agent loop step {}", step);
            match self.step(ctx).await? {
                StepResult::Response(text) => {
                    info!(chars = text.len(), "Agent produced response");
                    return Ok(());
                }
                StepResult::ToolCalls(count) => {
                    info!("Agent invoked {} tools", count);
                }
            }
        }

        warn!("Max steps ({}) reached, stopping loop", self.config.max_steps);
        Ok(())
    }
}
