//! Scoped key-value session state.
//!
//! Keys carry their scope as a prefix: `app:` (shared across the app),
//! `user:` (shared across one user's sessions), `temp:` (never persisted)
//! and unprefixed keys, which live with the session.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const APP_PREFIX: &str = "app:";
pub const USER_PREFIX: &str = "user:";
pub const TEMP_PREFIX: &str = "temp:";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StateScope {
    App,
    User,
    Session,
    Temp,
}

impl StateScope {
    pub fn of(key: &str) -> Self {
        if key.starts_with(APP_PREFIX) {
            Self::App
        } else if key.starts_with(USER_PREFIX) {
            Self::User
        } else if key.starts_with(TEMP_PREFIX) {
            Self::Temp
        } else {
            Self::Session
        }
    }

    pub fn prefix(&self) -> &'static str {
        match self {
            Self::App => APP_PREFIX,
            Self::User => USER_PREFIX,
            Self::Temp => TEMP_PREFIX,
            Self::Session => "",
        }
    }

    pub fn is_persistent(&self) -> bool {
        !matches!(self, Self::Temp)
    }
}

/// Apply a delta to a state map. A `null` value removes the key.
pub fn apply_delta(target: &mut Map<String, Value>, delta: &Map<String, Value>) {
    for (key, value) in delta {
        if value.is_null() {
            target.remove(key);
        } else {
            target.insert(key.clone(), value.clone());
        }
    }
}

/// A view over committed state plus the changes made since it was taken.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct State {
    base: Map<String, Value>,
    delta: Map<String, Value>,
}

impl State {
    pub fn new(base: Map<String, Value>) -> Self {
        Self {
            base,
            delta: Map::new(),
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        match self.delta.get(key) {
            Some(Value::Null) => None,
            Some(value) => Some(value),
            None => self.base.get(key),
        }
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.delta.insert(key.into(), value.into());
    }

    pub fn remove(&mut self, key: &str) {
        self.delta.insert(key.to_string(), Value::Null);
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn has_delta(&self) -> bool {
        !self.delta.is_empty()
    }

    pub fn delta(&self) -> &Map<String, Value> {
        &self.delta
    }

    /// Hand the pending changes to the caller and fold them into the base view.
    pub fn take_delta(&mut self) -> Map<String, Value> {
        let delta = std::mem::take(&mut self.delta);
        apply_delta(&mut self.base, &delta);
        delta
    }

    pub fn to_map(&self) -> Map<String, Value> {
        let mut merged = self.base.clone();
        apply_delta(&mut merged, &self.delta);
        merged
    }
}
