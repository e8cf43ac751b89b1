//! Per-invocation working context shared by every agent in the tree.

use std::sync::Arc;

use adkit_core::{AdkError, Event, State, apply_delta};
use adkit_sessions::{Session, SessionService};
use serde_json::{Map, Value};
use tracing::debug;
use uuid::Uuid;

pub fn new_invocation_id() -> String {
    format!("e-{}", Uuid::new_v4())
}

/// Working copy of a session for the duration of one invocation.
///
/// Deltas are applied in full, `temp:` keys included, so later agents in the
/// same invocation can read them. The service only sees what it persists.
pub struct InvocationContext {
    invocation_id: String,
    session: Session,
    service: Option<Arc<dyn SessionService>>,
    produced: Vec<Event>,
    escalated: bool,
}

impl InvocationContext {
    pub fn new(session: Session, service: Option<Arc<dyn SessionService>>) -> Self {
        Self {
            invocation_id: new_invocation_id(),
            session,
            service,
            produced: Vec::new(),
            escalated: false,
        }
    }

    pub fn invocation_id(&self) -> &str {
        &self.invocation_id
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn state(&self) -> &Map<String, Value> {
        &self.session.state
    }

    pub fn state_view(&self) -> State {
        self.session.state_view()
    }

    /// Full conversation history, including events from this invocation.
    pub fn events(&self) -> &[Event] {
        &self.session.events
    }

    /// Events appended during this invocation only.
    pub fn produced(&self) -> &[Event] {
        &self.produced
    }

    pub fn escalated(&self) -> bool {
        self.escalated
    }

    pub fn reset_escalation(&mut self) {
        self.escalated = false;
    }

    pub async fn append_event(&mut self, event: Event) -> Result<(), AdkError> {
        if let Some(service) = &self.service {
            service
                .append_event(
                    &self.session.app_name,
                    &self.session.user_id,
                    &self.session.id,
                    event.clone(),
                )
                .await?;
        }

        apply_delta(&mut self.session.state, &event.actions.state_delta);
        if event.actions.escalate {
            debug!(author = %event.author, "Escalation requested");
            self.escalated = true;
        }
        self.session.last_update_time = event.timestamp;
        self.session.events.push(event.clone());
        self.produced.push(event);
        Ok(())
    }

    /// Snapshot for a concurrent branch. Branches never persist; their
    /// events are folded back with [`merge_branch`](Self::merge_branch).
    pub fn branch(&self) -> Self {
        Self {
            invocation_id: self.invocation_id.clone(),
            session: self.session.clone(),
            service: None,
            produced: Vec::new(),
            escalated: false,
        }
    }

    pub async fn merge_branch(&mut self, branch: InvocationContext) -> Result<(), AdkError> {
        for event in branch.produced {
            self.append_event(event).await?;
        }
        Ok(())
    }

    pub fn into_produced(self) -> Vec<Event> {
        self.produced
    }
}
