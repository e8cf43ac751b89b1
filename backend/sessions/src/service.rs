use async_trait::async_trait;
use serde_json::{Map, Value};

use adkit_core::{AdkError, Event};

use crate::session::{Session, SessionSummary};

/// Read/write access to sessions and their scoped state.
#[async_trait]
pub trait SessionService: Send + Sync {
    /// Create a session. A fresh UUID is used when `session_id` is `None`.
    async fn create_session(
        &self,
        app: &str,
        user: &str,
        session_id: Option<&str>,
        initial_state: Map<String, Value>,
    ) -> Result<Session, AdkError>;

    async fn get_session(
        &self,
        app: &str,
        user: &str,
        session_id: &str,
    ) -> Result<Option<Session>, AdkError>;

    /// Sessions of one user, newest first.
    async fn list_sessions(&self, app: &str, user: &str) -> Result<Vec<SessionSummary>, AdkError>;

    async fn delete_session(&self, app: &str, user: &str, session_id: &str)
    -> Result<(), AdkError>;

    /// Persist an event and its state delta. Returns the event as stored,
    /// i.e. without `temp:` keys in its delta.
    async fn append_event(
        &self,
        app: &str,
        user: &str,
        session_id: &str,
        event: Event,
    ) -> Result<Event, AdkError>;

    async fn get_or_create_session(
        &self,
        app: &str,
        user: &str,
        session_id: &str,
    ) -> Result<Session, AdkError> {
        match self.get_session(app, user, session_id).await? {
            Some(session) => Ok(session),
            None => {
                self.create_session(app, user, Some(session_id), Map::new())
                    .await
            }
        }
    }
}
