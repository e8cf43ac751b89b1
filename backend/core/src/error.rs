use thiserror::Error;

/// Top-level error type for the adkit runtime.
#[derive(Debug, Error)]
pub enum AdkError {
    #[error("unknown tool: {0}")]
    UnknownTool(String),

    #[error("invalid arguments for tool '{tool}': {message}")]
    InvalidArguments { tool: String, message: String },

    #[error("tool '{tool}' failed: {message}")]
    ToolFailed { tool: String, message: String },

    #[error("LLM provider error ({provider}): {message}")]
    LlmError { provider: String, message: String },

    #[error("no LLM provider registered under '{0}'")]
    ProviderNotFound(String),

    #[error("agent not found: {0}")]
    AgentNotFound(String),

    #[error("session not found: {app}/{user}/{session_id}")]
    SessionNotFound {
        app: String,
        user: String,
        session_id: String,
    },

    #[error("session already exists: {0}")]
    SessionExists(String),

    #[error("invalid session key segment: {0:?}")]
    InvalidSessionKey(String),

    #[error("instruction template error: {0}")]
    Template(String),

    #[error("configuration error: {0}")]
    ConfigError(String),

    #[error("storage error: {0}")]
    StorageError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl AdkError {
    pub fn invalid_arguments(tool: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidArguments {
            tool: tool.into(),
            message: message.into(),
        }
    }

    pub fn session_not_found(
        app: impl Into<String>,
        user: impl Into<String>,
        session_id: impl Into<String>,
    ) -> Self {
        Self::SessionNotFound {
            app: app.into(),
            user: user.into(),
            session_id: session_id.into(),
        }
    }
}

impl From<std::io::Error> for AdkError {
    fn from(err: std::io::Error) -> Self {
        Self::StorageError(err.to_string())
    }
}

impl From<serde_json::Error> for AdkError {
    fn from(err: serde_json::Error) -> Self {
        Self::StorageError(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        assert_eq!(
            AdkError::UnknownTool("get_weather".into()).to_string(),
            "unknown tool: get_weather"
        );
        assert_eq!(
            AdkError::invalid_arguments("calculate", "missing required parameter(s): b")
                .to_string(),
            "invalid arguments for tool 'calculate': missing required parameter(s): b"
        );
        assert_eq!(
            AdkError::session_not_found("app", "u1", "s1").to_string(),
            "session not found: app/u1/s1"
        );
    }
}
