//! Config defaults: applies sensible default values to parsed config.

use crate::io::config_dir;
use crate::schema::{
    AdkConfig, GeminiConfig, LoggingConfig, ModelsConfig, SessionBackend, SessionsConfig,
};

pub const DEFAULT_APP_NAME: &str = "adkit";

pub const DEFAULT_PROVIDER: &str = "gemini";

pub const DEFAULT_MODEL: &str = "gemini-2.0-flash";

/// Gemini request timeout (seconds).
pub const DEFAULT_GEMINI_TIMEOUT_SECS: u64 = 60;

pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Apply all defaults to a freshly loaded config.
pub fn apply_all_defaults(config: AdkConfig) -> AdkConfig {
    let config = apply_app_defaults(config);
    let config = apply_model_defaults(config);
    let config = apply_root_default(config);
    let config = apply_session_defaults(config);
    apply_logging_defaults(config)
}

fn apply_app_defaults(mut config: AdkConfig) -> AdkConfig {
    if config.app.as_deref().map(str::trim).unwrap_or("").is_empty() {
        config.app = Some(DEFAULT_APP_NAME.to_string());
    }
    config
}

fn apply_model_defaults(mut config: AdkConfig) -> AdkConfig {
    let models = config.models.get_or_insert_with(ModelsConfig::default);
    if models.default_provider.is_none() {
        models.default_provider = Some(DEFAULT_PROVIDER.to_string());
    }
    if models.default_model.is_none() {
        models.default_model = Some(DEFAULT_MODEL.to_string());
    }
    if models.default_provider.as_deref() == Some("gemini") {
        let gemini = models.gemini.get_or_insert_with(GeminiConfig::default);
        if gemini.timeout_secs.is_none() {
            gemini.timeout_secs = Some(DEFAULT_GEMINI_TIMEOUT_SECS);
        }
    }
    config
}

/// Without an explicit root, the last pipeline wins, else the first agent.
fn apply_root_default(mut config: AdkConfig) -> AdkConfig {
    if config.root.is_none() {
        config.root = config
            .pipelines
            .last()
            .map(|p| p.name.clone())
            .or_else(|| config.agents.first().map(|a| a.name.clone()));
    }
    config
}

fn apply_session_defaults(mut config: AdkConfig) -> AdkConfig {
    let sessions = config.sessions.get_or_insert_with(SessionsConfig::default);
    let backend = *sessions.backend.get_or_insert(SessionBackend::Memory);
    if backend == SessionBackend::File && sessions.dir.is_none() {
        sessions.dir = Some(config_dir().join("sessions").display().to_string());
    }
    config
}

fn apply_logging_defaults(mut config: AdkConfig) -> AdkConfig {
    let logging = config.logging.get_or_insert_with(LoggingConfig::default);
    if logging.level.is_none() {
        logging.level = Some(DEFAULT_LOG_LEVEL.to_string());
    }
    if logging.json.is_none() {
        logging.json = Some(false);
    }
    config
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{AgentEntry, PipelineConfig};

    #[test]
    fn fills_empty_config() {
        let cfg = apply_all_defaults(AdkConfig::default());
        assert_eq!(cfg.app_name(), DEFAULT_APP_NAME);
        assert_eq!(cfg.default_provider(), "gemini");
        assert_eq!(cfg.default_model(), DEFAULT_MODEL);
        assert_eq!(
            cfg.models.unwrap().gemini.unwrap().timeout_secs,
            Some(DEFAULT_GEMINI_TIMEOUT_SECS)
        );
        assert_eq!(cfg.sessions.unwrap().backend, Some(SessionBackend::Memory));
        assert_eq!(cfg.logging.unwrap().level.as_deref(), Some("info"));
        assert!(cfg.root.is_none());
    }

    #[test]
    fn root_prefers_last_pipeline() {
        let mut cfg = AdkConfig::default();
        cfg.agents.push(AgentEntry {
            name: "solo".into(),
            ..Default::default()
        });
        assert_eq!(apply_all_defaults(cfg.clone()).root.as_deref(), Some("solo"));

        cfg.pipelines.push(PipelineConfig {
            name: "flow".into(),
            agents: vec!["solo".into()],
            ..Default::default()
        });
        assert_eq!(apply_all_defaults(cfg).root.as_deref(), Some("flow"));
    }

    #[test]
    fn file_backend_gets_a_dir() {
        let mut cfg = AdkConfig::default();
        cfg.sessions = Some(SessionsConfig {
            backend: Some(SessionBackend::File),
            dir: None,
        });
        let cfg = apply_all_defaults(cfg);
        assert!(cfg.sessions.unwrap().dir.unwrap().ends_with("sessions"));
    }

    #[test]
    fn does_not_override_user_values() {
        let mut cfg = AdkConfig::default();
        cfg.root = Some("custom".into());
        cfg.logging = Some(LoggingConfig {
            level: Some("debug".into()),
            ..Default::default()
        });
        let cfg = apply_all_defaults(cfg);
        assert_eq!(cfg.root.as_deref(), Some("custom"));
        assert_eq!(cfg.logging.unwrap().level.as_deref(), Some("debug"));
    }
}
