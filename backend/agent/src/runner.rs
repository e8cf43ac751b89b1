use std::sync::Arc;

use adkit_core::{AdkError, Event};
use adkit_logging::{AgentEvent, EventLogger};
use adkit_sessions::{SessionService, strip_temp};
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{error, info, instrument};

use crate::agent::Agent;
use crate::context::InvocationContext;

/// What one call to [`Runner::run`] produced.
#[derive(Debug, Clone, Serialize)]
pub struct RunOutcome {
    pub invocation_id: String,
    /// Agent events in the order they were appended; the user message is not included.
    pub events: Vec<Event>,
    pub final_response: Option<String>,
    /// Session state after the run, without `temp:` keys.
    pub state: Map<String, Value>,
}

/// Drives one agent tree against a session service.
#[derive(Clone)]
pub struct Runner {
    app_name: String,
    agent: Arc<dyn Agent>,
    sessions: Arc<dyn SessionService>,
}

impl Runner {
    pub fn new(
        app_name: impl Into<String>,
        agent: Arc<dyn Agent>,
        sessions: Arc<dyn SessionService>,
    ) -> Self {
        Self {
            app_name: app_name.into(),
            agent,
            sessions,
        }
    }

    pub fn app_name(&self) -> &str {
        &self.app_name
    }

    pub fn agent(&self) -> &Arc<dyn Agent> {
        &self.agent
    }

    pub fn sessions(&self) -> &Arc<dyn SessionService> {
        &self.sessions
    }

    /// Append `message` to the session as a user turn and run the root agent.
    #[instrument(skip(self, message), fields(app = %self.app_name, agent = self.agent.name()))]
    pub async fn run(
        &self,
        user: &str,
        session_id: &str,
        message: &str,
    ) -> Result<RunOutcome, AdkError> {
        let session = self
            .sessions
            .get_session(&self.app_name, user, session_id)
            .await?
            .ok_or_else(|| AdkError::session_not_found(&self.app_name, user, session_id))?;

        let mut ctx = InvocationContext::new(session, Some(self.sessions.clone()));
        let invocation_id = ctx.invocation_id().to_string();
        info!(invocation = %invocation_id, "Starting invocation");

        let user_event = Event::user_message(&invocation_id, message);
        let user_event_id = user_event.id;
        ctx.append_event(user_event).await?;

        if let Err(e) = self.agent.run(&mut ctx).await {
            error!(invocation = %invocation_id, error = %e, "Invocation failed");
            EventLogger::log_event(
                session_id,
                AgentEvent::Error {
                    agent: self.agent.name().to_string(),
                    error_msg: e.to_string(),
                },
            );
            return Err(e);
        }

        let state = strip_temp(ctx.state());
        let events: Vec<Event> = ctx
            .into_produced()
            .into_iter()
            .filter(|e| e.id != user_event_id)
            .collect();
        let final_response = events
            .iter()
            .rev()
            .find(|e| e.is_final_response())
            .and_then(Event::text);

        info!(
            invocation = %invocation_id,
            events = events.len(),
            answered = final_response.is_some(),
            "Invocation finished"
        );
        Ok(RunOutcome {
            invocation_id,
            events,
            final_response,
            state,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm_agent::LlmAgent;
    use crate::orchestrator::SequentialAgent;
    use adkit_core::AgentConfig;
    use adkit_models::ScriptedProvider;
    use adkit_sessions::InMemorySessionService;
    use adkit_tools::builtin_registry;
    use serde_json::json;

    #[tokio::test]
    async fn missing_session_is_reported() {
        let provider = Arc::new(ScriptedProvider::new("scripted").with_fallback("hi"));
        let agent = LlmAgent::new(AgentConfig::new("a", "m"), provider, &builtin_registry()).unwrap();
        let runner = Runner::new("app", Arc::new(agent), Arc::new(InMemorySessionService::new()));
        let err = runner.run("u1", "nope", "hello").await.unwrap_err();
        assert!(matches!(err, AdkError::SessionNotFound { .. }));
    }

    #[tokio::test]
    async fn writer_then_reviewer_pipeline() {
        let provider = Arc::new(
            ScriptedProvider::new("scripted")
                .with_call("set_state", json!({"key": "temp:notes", "value": "be brief"}))
                .with_text("Tides are caused by the moon.")
                .with_text("Looks good."),
        );
        let tools = builtin_registry();
        let writer = LlmAgent::new(
            AgentConfig::new("writer", "m")
                .with_instruction("Write about {user:topic}.")
                .with_tools(["set_state"])
                .with_output_key("draft"),
            provider.clone(),
            &tools,
        )
        .unwrap();
        let reviewer = LlmAgent::new(
            AgentConfig::new("reviewer", "m")
                .with_instruction("Review this draft: {draft}. Notes: {temp:notes?}")
                .with_output_key("review"),
            provider.clone(),
            &tools,
        )
        .unwrap();
        let pipeline = SequentialAgent::new("pipeline", vec![Arc::new(writer), Arc::new(reviewer)]);

        let sessions = Arc::new(InMemorySessionService::new());
        let mut initial = Map::new();
        initial.insert("user:topic".into(), json!("tides"));
        sessions
            .create_session("app", "u1", Some("s1"), initial)
            .await
            .unwrap();

        let runner = Runner::new("app", Arc::new(pipeline), sessions.clone());
        let outcome = runner.run("u1", "s1", "go").await.unwrap();

        assert_eq!(outcome.final_response.as_deref(), Some("Looks good."));
        assert_eq!(outcome.events.len(), 4);
        assert_eq!(outcome.state.get("draft"), Some(&json!("Tides are caused by the moon.")));
        assert!(!outcome.state.contains_key("temp:notes"));

        let requests = provider.requests();
        assert_eq!(
            requests[0].system_instruction.as_deref(),
            Some("Write about tides.")
        );
        assert_eq!(
            requests[2].system_instruction.as_deref(),
            Some("Review this draft: Tides are caused by the moon.. Notes: be brief")
        );

        let stored = sessions.get_session("app", "u1", "s1").await.unwrap().unwrap();
        assert_eq!(stored.events.len(), 5);
        assert_eq!(stored.state.get("review"), Some(&json!("Looks good.")));
        assert!(!stored.state.contains_key("temp:notes"));
    }
}
