//! File-backed session service.
//!
//! Layout under the root directory:
//!
//! ```text
//! <root>/<app>/app_state.json
//! <root>/<app>/<user>/user_state.json
//! <root>/<app>/<user>/sessions/<id>.json
//! ```
//!
//! Every write goes to a sibling `.tmp` file first and is then renamed into place.

use std::path::{Path, PathBuf};

use anyhow::Context;
use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use tokio::sync::Mutex;
use tracing::{debug, warn};
use uuid::Uuid;

use adkit_core::{AdkError, Event};

use crate::delta::{ScopedDelta, strip_temp};
use crate::service::SessionService;
use crate::session::{Session, SessionSummary, StoredSession, sort_summaries};

const APP_STATE_FILE: &str = "app_state.json";
const USER_STATE_FILE: &str = "user_state.json";
const SESSIONS_DIR: &str = "sessions";

pub struct FileSessionService {
    root: PathBuf,
    lock: Mutex<()>,
}

impl FileSessionService {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn app_dir(&self, app: &str) -> Result<PathBuf, AdkError> {
        Ok(self.root.join(check_segment(app)?))
    }

    fn user_dir(&self, app: &str, user: &str) -> Result<PathBuf, AdkError> {
        Ok(self.app_dir(app)?.join(check_segment(user)?))
    }

    fn session_path(&self, app: &str, user: &str, id: &str) -> Result<PathBuf, AdkError> {
        Ok(self
            .user_dir(app, user)?
            .join(SESSIONS_DIR)
            .join(format!("{}.json", check_segment(id)?)))
    }

    async fn load_view(&self, stored: &StoredSession) -> Result<Session, AdkError> {
        let app_state: Map<String, Value> =
            read_json_or_default(&self.app_dir(&stored.app_name)?.join(APP_STATE_FILE)).await?;
        let user_state: Map<String, Value> = read_json_or_default(
            &self
                .user_dir(&stored.app_name, &stored.user_id)?
                .join(USER_STATE_FILE),
        )
        .await?;
        Ok(stored.to_session(&app_state, &user_state))
    }

    async fn apply_shared(
        &self,
        app: &str,
        user: &str,
        scoped: &ScopedDelta,
    ) -> Result<(), AdkError> {
        if !scoped.app.is_empty() {
            let path = self.app_dir(app)?.join(APP_STATE_FILE);
            let mut state: Map<String, Value> = read_json_or_default(&path).await?;
            adkit_core::apply_delta(&mut state, &scoped.app);
            write_json_atomic(&path, &state).await?;
        }
        if !scoped.user.is_empty() {
            let path = self.user_dir(app, user)?.join(USER_STATE_FILE);
            let mut state: Map<String, Value> = read_json_or_default(&path).await?;
            adkit_core::apply_delta(&mut state, &scoped.user);
            write_json_atomic(&path, &state).await?;
        }
        Ok(())
    }
}

/// Rejects ids that would escape their directory.
fn check_segment(segment: &str) -> Result<&str, AdkError> {
    let bad = segment.is_empty()
        || segment == "."
        || segment == ".."
        || segment.contains(['/', '\\', '\0']);
    if bad {
        Err(AdkError::InvalidSessionKey(segment.to_string()))
    } else {
        Ok(segment)
    }
}

fn storage(err: anyhow::Error) -> AdkError {
    AdkError::StorageError(format!("{err:#}"))
}

async fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, AdkError> {
    let raw = match tokio::fs::read_to_string(path).await {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => {
            return Err(storage(
                anyhow::Error::new(e).context(format!("reading {}", path.display())),
            ));
        }
    };
    serde_json::from_str(&raw)
        .with_context(|| format!("parsing {}", path.display()))
        .map(Some)
        .map_err(storage)
}

async fn read_json_or_default<T: DeserializeOwned + Default>(path: &Path) -> Result<T, AdkError> {
    Ok(read_json(path).await?.unwrap_or_default())
}

async fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> Result<(), AdkError> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("creating {}", parent.display()))
            .map_err(storage)?;
    }
    let body = serde_json::to_vec_pretty(value)?;
    let tmp = path.with_extension("json.tmp");
    tokio::fs::write(&tmp, body)
        .await
        .with_context(|| format!("writing {}", tmp.display()))
        .map_err(storage)?;
    tokio::fs::rename(&tmp, path)
        .await
        .with_context(|| format!("renaming into {}", path.display()))
        .map_err(storage)
}

#[async_trait]
impl SessionService for FileSessionService {
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
        let path = self.session_path(app, user, &id)?;

        let _guard = self.lock.lock().await;
        if tokio::fs::try_exists(&path).await.unwrap_or(false) {
            return Err(AdkError::SessionExists(id));
        }

        let scoped = ScopedDelta::partition(&initial_state);
        self.apply_shared(app, user, &scoped).await?;
        let stored = StoredSession::new(app, user, &id, scoped.session);
        write_json_atomic(&path, &stored).await?;

        debug!(app, user, session_id = %id, path = %path.display(), "Created session file");
        self.load_view(&stored).await
    }

    async fn get_session(
        &self,
        app: &str,
        user: &str,
        session_id: &str,
    ) -> Result<Option<Session>, AdkError> {
        let path = self.session_path(app, user, session_id)?;
        let _guard = self.lock.lock().await;
        match read_json::<StoredSession>(&path).await? {
            Some(stored) => Ok(Some(self.load_view(&stored).await?)),
            None => Ok(None),
        }
    }

    async fn list_sessions(&self, app: &str, user: &str) -> Result<Vec<SessionSummary>, AdkError> {
        let dir = self.user_dir(app, user)?.join(SESSIONS_DIR);
        let _guard = self.lock.lock().await;

        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut summaries = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            match read_json::<StoredSession>(&path).await {
                Ok(Some(stored)) => summaries.push(stored.summary()),
                Ok(None) => {}
                Err(e) => warn!(path = %path.display(), error = %e, "Skipping unreadable session file"),
            }
        }
        sort_summaries(&mut summaries);
        Ok(summaries)
    }

    async fn delete_session(
        &self,
        app: &str,
        user: &str,
        session_id: &str,
    ) -> Result<(), AdkError> {
        let path = self.session_path(app, user, session_id)?;
        let _guard = self.lock.lock().await;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                debug!(app, user, session_id, "Deleted session file");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(AdkError::session_not_found(app, user, session_id))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn append_event(
        &self,
        app: &str,
        user: &str,
        session_id: &str,
        mut event: Event,
    ) -> Result<Event, AdkError> {
        let path = self.session_path(app, user, session_id)?;
        let _guard = self.lock.lock().await;
        let mut stored: StoredSession = read_json(&path)
            .await?
            .ok_or_else(|| AdkError::session_not_found(app, user, session_id))?;

        event.actions.state_delta = strip_temp(&event.actions.state_delta);
        let scoped = ScopedDelta::partition(&event.actions.state_delta);
        self.apply_shared(app, user, &scoped).await?;

        adkit_core::apply_delta(&mut stored.state, &scoped.session);
        stored.last_update_time = event.timestamp;
        stored.events.push(event.clone());
        write_json_atomic(&path, &stored).await?;
        Ok(event)
    }
}
