use serde_json::{Map, Value};

use adkit_core::StateScope;

/// A state delta split by the store that owns each key. `temp:` keys are dropped.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ScopedDelta {
    pub app: Map<String, Value>,
    pub user: Map<String, Value>,
    pub session: Map<String, Value>,
}

impl ScopedDelta {
    pub fn partition(delta: &Map<String, Value>) -> Self {
        let mut scoped = Self::default();
        for (key, value) in delta {
            let target = match StateScope::of(key) {
                StateScope::App => &mut scoped.app,
                StateScope::User => &mut scoped.user,
                StateScope::Session => &mut scoped.session,
                StateScope::Temp => continue,
            };
            target.insert(key.clone(), value.clone());
        }
        scoped
    }

    pub fn is_empty(&self) -> bool {
        self.app.is_empty() && self.user.is_empty() && self.session.is_empty()
    }
}

/// The delta as it is persisted: everything except `temp:` keys.
pub fn strip_temp(delta: &Map<String, Value>) -> Map<String, Value> {
    delta
        .iter()
        .filter(|(key, _)| StateScope::of(key).is_persistent())
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect()
}

/// The state a session sees: its own keys plus the app- and user-wide ones.
pub fn merged_state(
    app: &Map<String, Value>,
    user: &Map<String, Value>,
    session: &Map<String, Value>,
) -> Map<String, Value> {
    let mut merged = session.clone();
    merged.extend(app.iter().map(|(k, v)| (k.clone(), v.clone())));
    merged.extend(user.iter().map(|(k, v)| (k.clone(), v.clone())));
    merged
}
