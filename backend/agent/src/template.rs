//! Instruction templates.
//!
//! `{key}` is replaced with the state value under `key`; `{key?}` renders
//! empty when the key is missing. Scoped keys use their prefix, e.g.
//! `{user:name}`. Anything else in braces is left as written.

use adkit_core::{AdkError, State, StateScope};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

static PLACEHOLDER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\{([A-Za-z_][A-Za-z0-9_]*(?::[A-Za-z_][A-Za-z0-9_]*)?)(\?)?\}")
        .expect("valid placeholder regex")
});

fn is_state_key(name: &str) -> bool {
    !name.contains(':') || StateScope::of(name) != StateScope::Session
}

fn render_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Fill the placeholders of `template` from `state`.
pub fn render_instruction(template: &str, state: &State) -> Result<String, AdkError> {
    let mut out = String::with_capacity(template.len());
    let mut last = 0;

    for caps in PLACEHOLDER.captures_iter(template) {
        let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        let name = name.as_str();
        if !is_state_key(name) {
            continue;
        }
        let optional = caps.get(2).is_some();

        out.push_str(&template[last..whole.start()]);
        match state.get(name) {
            Some(value) => out.push_str(&render_value(value)),
            None if optional => {}
            None => {
                return Err(AdkError::Template(format!(
                    "context variable not found: `{name}`"
                )));
            }
        }
        last = whole.end();
    }

    out.push_str(&template[last..]);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Map, json};

    fn state(value: Value) -> State {
        State::new(value.as_object().cloned().unwrap_or_else(Map::new))
    }

    #[test]
    fn substitutes_values() {
        let s = state(json!({"topic": "tides", "user:name": "Ada", "count": 3, "tags": ["a"]}));
        let out = render_instruction(
            "Hi {user:name}, write about {topic} in {count} points. Tags: {tags}",
            &s,
        )
        .unwrap();
        assert_eq!(out, "Hi Ada, write about tides in 3 points. Tags: [\"a\"]");
    }

    #[test]
    fn optional_and_missing() {
        let s = state(json!({}));
        assert_eq!(render_instruction("Draft: {draft?}.", &s).unwrap(), "Draft: .");
        let err = render_instruction("Draft: {draft}", &s).unwrap_err();
        assert!(matches!(err, AdkError::Template(msg) if msg.contains("draft")));
    }

    #[test]
    fn leaves_non_placeholders() {
        let s = state(json!({"x": 1}));
        let text = r#"Reply as JSON like {"answer": 42} or { spaced } or {other:thing}; x={x}"#;
        assert_eq!(
            render_instruction(text, &s).unwrap(),
            r#"Reply as JSON like {"answer": 42} or { spaced } or {other:thing}; x=1"#
        );
    }

    #[test]
    fn pending_writes_are_visible() {
        let mut s = state(json!({"draft": "v1"}));
        s.set("draft", "v2");
        assert_eq!(render_instruction("{draft}", &s).unwrap(), "v2");
    }
}
