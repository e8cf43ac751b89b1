//! `adkit-config` - adkit runtime configuration management.
//!
//! Provides:
//! - Typed config schema (models, agents, pipelines, sessions, logging)
//! - YAML read/write with atomic backup rotation
//! - `${ENV_VAR}` substitution
//! - Config redaction for safe display
//! - Default value application
//! - Reference and cycle validation

pub mod defaults;
pub mod env;
pub mod io;
pub mod redact;
pub mod schema;
pub mod validation;

// Re-export most-used types at crate root.
pub use defaults::apply_all_defaults;
pub use env::{collect_referenced_vars, resolve_env_vars, resolve_env_vars_with, MissingEnvVarError};
pub use io::{
    config_dir, config_file_path, load_config, load_raw_config, resolve_config_path,
    write_config, CONFIG_ENV_VAR, LOCAL_CONFIG_FILE,
};
pub use redact::{collect_redacted_paths, redact};
pub use schema::{
    AdkConfig, AgentEntry, GeminiConfig, LoggingConfig, ModelsConfig, PipelineConfig,
    PipelineKind, SessionBackend, SessionsConfig,
};
pub use validation::{validate, ConfigValidationError, ValidationReport, KNOWN_PROVIDERS};

use anyhow::{bail, Context, Result};
use serde_json::Value;
use std::path::Path;

/// Env substitution, typed parse, defaults and validation of a raw config tree.
pub fn prepare<S: AsRef<str>>(
    value: &Value,
    known_tools: &[S],
) -> Result<(AdkConfig, ValidationReport)> {
    let value = resolve_env_vars(value).context("Failed to resolve env vars in config")?;
    let config: AdkConfig =
        serde_json::from_value(value).context("Failed to deserialize config after processing")?;
    let config = apply_all_defaults(config);
    let report = validate(&config, known_tools);
    Ok((config, report))
}

/// Load a config file and run [`prepare`] on it without failing on validation errors.
pub async fn load_with_report<S: AsRef<str>>(
    path: &Path,
    known_tools: &[S],
) -> Result<(AdkConfig, ValidationReport)> {
    let raw = load_raw_config(path).await?;
    prepare(&raw, known_tools).with_context(|| format!("Invalid config: {}", path.display()))
}

/// Load, apply env substitution and defaults, and validate a config file.
///
/// This is the main entry point for loading a config at runtime. Warnings are
/// logged; any validation error fails the load.
pub async fn load_and_prepare<S: AsRef<str>>(path: &Path, known_tools: &[S]) -> Result<AdkConfig> {
    let (config, report) = load_with_report(path, known_tools).await?;

    for warning in &report.warnings {
        tracing::warn!(path = %warning.path, message = %warning.message, "Config warning");
    }
    if !report.is_valid() {
        for error in &report.errors {
            tracing::error!(path = %error.path, message = %error.message, "Config error");
        }
        let joined: Vec<String> = report.errors.iter().map(ToString::to_string).collect();
        bail!("{}", joined.join("\n"));
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const TOOLS: &[&str] = &["get_current_time", "exit_loop"];

    #[test]
    fn prepare_fills_defaults_and_validates() {
        let raw = json!({
            "models": { "defaultProvider": "scripted" },
            "agents": [{ "name": "helper", "instruction": "Help.", "tools": ["get_current_time"] }]
        });
        let (config, report) = prepare(&raw, TOOLS).unwrap();
        assert!(report.is_valid(), "errors: {:?}", report.errors);
        assert_eq!(config.root.as_deref(), Some("helper"));
        assert_eq!(config.app_name(), "adkit");
    }

    #[test]
    fn prepare_reports_unknown_tool() {
        let raw = json!({
            "models": { "defaultProvider": "scripted" },
            "agents": [{ "name": "helper", "tools": ["rm_rf"] }]
        });
        let (_, report) = prepare(&raw, TOOLS).unwrap();
        assert!(!report.is_valid());
    }

    #[tokio::test]
    async fn load_and_prepare_fails_on_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("adkit.yaml");
        tokio::fs::write(
            &path,
            "models:\n  defaultProvider: scripted\nagents:\n  - name: a\nroot: missing\n",
        )
        .await
        .unwrap();
        let err = load_and_prepare(&path, TOOLS).await.unwrap_err();
        assert!(err.to_string().contains("Unknown agent or pipeline 'missing'"));
    }

    #[tokio::test]
    async fn load_and_prepare_missing_file_is_default() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_and_prepare(&dir.path().join("absent.yaml"), TOOLS)
            .await
            .unwrap();
        assert!(config.agents.is_empty());
        assert_eq!(config.default_model(), defaults::DEFAULT_MODEL);
    }
}
