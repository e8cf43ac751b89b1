//! In-memory session service. State lives for the life of the process.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use adkit_core::{AdkError, Event};

use crate::delta::{ScopedDelta, strip_temp};
use crate::service::SessionService;
use crate::session::{Session, SessionSummary, StoredSession, sort_summaries};

type UserKey = (String, String);
type SessionKey = (String, String, String);

#[derive(Default)]
struct Inner {
    app_state: HashMap<String, Map<String, Value>>,
    user_state: HashMap<UserKey, Map<String, Value>>,
    sessions: HashMap<SessionKey, StoredSession>,
}

impl Inner {
    fn view(&self, stored: &StoredSession) -> Session {
        let empty = Map::new();
        let app = self.app_state.get(&stored.app_name).unwrap_or(&empty);
        let user = self
            .user_state
            .get(&(stored.app_name.clone(), stored.user_id.clone()))
            .unwrap_or(&empty);
        stored.to_session(app, user)
    }

    /// Applies the app and user parts; the session part is the caller's.
    fn apply_shared(&mut self, app: &str, user: &str, scoped: &ScopedDelta) {
        let app_state = self.app_state.entry(app.to_string()).or_default();
        adkit_core::apply_delta(app_state, &scoped.app);
        let user_state = self
            .user_state
            .entry((app.to_string(), user.to_string()))
            .or_default();
        adkit_core::apply_delta(user_state, &scoped.user);
    }
}

/// Session service backed by process memory.
#[derive(Clone, Default)]
pub struct InMemorySessionService {
    inner: Arc<RwLock<Inner>>,
}

impl InMemorySessionService {
    pub fn new() -> Self {
        Self::default()
    }
}

fn session_key(app: &str, user: &str, id: &str) -> SessionKey {
    (app.to_string(), user.to_string(), id.to_string())
}

#[async_trait]
impl SessionService for InMemorySessionService {
    async fn create_session(
        &self,
        app: &str,
        user: &str,
        session_id: Option<&str>,
        initial_state: Map<String, Value>,
    ) -> Result<Session, AdkError> {
        let id = session_id
            .map(str::to_string)
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        let key = session_key(app, user, &id);

        let mut inner = self.inner.write().await;
        if inner.sessions.contains_key(&key) {
            return Err(AdkError::SessionExists(id));
        }

        let scoped = ScopedDelta::partition(&initial_state);
        inner.apply_shared(app, user, &scoped);
        let stored = StoredSession::new(app, user, &id, scoped.session);
        let session = inner.view(&stored);
        inner.sessions.insert(key, stored);

        debug!(app, user, session_id = %id, "Created in-memory session");
        Ok(session)
    }

    async fn get_session(
        &self,
        app: &str,
        user: &str,
        session_id: &str,
    ) -> Result<Option<Session>, AdkError> {
        let inner = self.inner.read().await;
        Ok(inner
            .sessions
            .get(&session_key(app, user, session_id))
            .map(|stored| inner.view(stored)))
    }

    async fn list_sessions(&self, app: &str, user: &str) -> Result<Vec<SessionSummary>, AdkError> {
        let inner = self.inner.read().await;
        let mut summaries: Vec<SessionSummary> = inner
            .sessions
            .values()
            .filter(|s| s.app_name == app && s.user_id == user)
            .map(StoredSession::summary)
            .collect();
        sort_summaries(&mut summaries);
        Ok(summaries)
    }

    async fn delete_session(
        &self,
        app: &str,
        user: &str,
        session_id: &str,
    ) -> Result<(), AdkError> {
        let mut inner = self.inner.write().await;
        inner
            .sessions
            .remove(&session_key(app, user, session_id))
            .map(|_| ())
            .ok_or_else(|| AdkError::session_not_found(app, user, session_id))
    }

    async fn append_event(
        &self,
        app: &str,
        user: &str,
        session_id: &str,
        mut event: Event,
    ) -> Result<Event, AdkError> {
        let key = session_key(app, user, session_id);
        let mut inner = self.inner.write().await;
        if !inner.sessions.contains_key(&key) {
            return Err(AdkError::session_not_found(app, user, session_id));
        }

        event.actions.state_delta = strip_temp(&event.actions.state_delta);
        let scoped = ScopedDelta::partition(&event.actions.state_delta);
        inner.apply_shared(app, user, &scoped);

        if let Some(stored) = inner.sessions.get_mut(&key) {
            adkit_core::apply_delta(&mut stored.state, &scoped.session);
            stored.last_update_time = event.timestamp;
            stored.events.push(event.clone());
        }
        Ok(event)
    }
}
