use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use adkit_core::{Event, State};

use crate::delta::merged_state;

/// A conversation session as seen by an agent: history plus merged state.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Session {
    pub id: String,
    pub app_name: String,
    pub user_id: String,
    /// Session keys merged with the app- and user-scoped keys.
    pub state: Map<String, Value>,
    pub events: Vec<Event>,
    pub last_update_time: DateTime<Utc>,
}

impl Session {
    pub fn state_view(&self) -> State {
        State::new(self.state.clone())
    }

    pub fn summary(&self) -> SessionSummary {
        SessionSummary {
            id: self.id.clone(),
            app_name: self.app_name.clone(),
            user_id: self.user_id.clone(),
            event_count: self.events.len(),
            last_update_time: self.last_update_time,
        }
    }

    /// Text of the most recent final agent answer, if any.
    pub fn last_response(&self) -> Option<String> {
        self.events
            .iter()
            .rev()
            .find(|e| e.is_final_response())
            .and_then(Event::text)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionSummary {
    pub id: String,
    pub app_name: String,
    pub user_id: String,
    pub event_count: usize,
    pub last_update_time: DateTime<Utc>,
}

/// What a service keeps per session: only session-scoped keys.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct StoredSession {
    pub id: String,
    pub app_name: String,
    pub user_id: String,
    #[serde(default)]
    pub state: Map<String, Value>,
    #[serde(default)]
    pub events: Vec<Event>,
    pub last_update_time: DateTime<Utc>,
}

impl StoredSession {
    pub fn new(app: &str, user: &str, id: &str, state: Map<String, Value>) -> Self {
        Self {
            id: id.to_string(),
            app_name: app.to_string(),
            user_id: user.to_string(),
            state,
            events: Vec::new(),
            last_update_time: Utc::now(),
        }
    }

    pub fn to_session(
        &self,
        app_state: &Map<String, Value>,
        user_state: &Map<String, Value>,
    ) -> Session {
        Session {
            id: self.id.clone(),
            app_name: self.app_name.clone(),
            user_id: self.user_id.clone(),
            state: merged_state(app_state, user_state, &self.state),
            events: self.events.clone(),
            last_update_time: self.last_update_time,
        }
    }

    pub fn summary(&self) -> SessionSummary {
        SessionSummary {
            id: self.id.clone(),
            app_name: self.app_name.clone(),
            user_id: self.user_id.clone(),
            event_count: self.events.len(),
            last_update_time: self.last_update_time,
        }
    }
}

/// Newest first, ties broken by id so listings are stable.
pub(crate) fn sort_summaries(summaries: &mut [SessionSummary]) {
    summaries.sort_by(|a, b| {
        b.last_update_time
            .cmp(&a.last_update_time)
            .then_with(|| a.id.cmp(&b.id))
    });
}
