//! CLI Config Subcommands
//!
//! `adkit config show|init` and `adkit validate`.

use std::path::Path;

use anyhow::{bail, Context, Result};
use clap::Subcommand;

use adkit_config::{
    collect_redacted_paths, redact, write_config, AdkConfig, AgentEntry, ModelsConfig, GeminiConfig, PipelineConfig,
    PipelineKind, ValidationReport,
};

use crate::terminal_output::{note_error, note_info, note_success, note_warn};

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Print the effective config with secrets masked
    Show,
    /// Write a starter config file
    Init {
        /// Overwrite an existing file (the old one is kept as a backup)
        #[arg(long)]
        force: bool,
    },
}

/// Log warnings and fail on errors.
pub fn require_valid(config: AdkConfig, report: &ValidationReport) -> Result<AdkConfig> {
    for warning in &report.warnings {
        tracing::warn!(path = %warning.path, message = %warning.message, "Config warning");
    }
    if !report.is_valid() {
        for error in &report.errors {
            note_error(&error.to_string());
        }
        bail!(
            "config has {} error(s); run `adkit validate` for details",
            report.errors.len()
        );
    }
    Ok(config)
}

pub async fn run(cmd: ConfigCommands, path: &Path, config: &AdkConfig) -> Result<()> {
    match cmd {
        ConfigCommands::Show => {
            note_info(&format!("Config file: {}", path.display()));
            let (yaml, masked) = render_redacted(config)?;
            print!("{yaml}");
            if !masked.is_empty() {
                note_info(&format!("Masked: {}", masked.join(", ")));
            }
        }
        ConfigCommands::Init { force } => {
            if path.exists() && !force {
                bail!(
                    "{} already exists; pass --force to overwrite it",
                    path.display()
                );
            }
            write_config(&starter_config(), path).await?;
            note_success(&format!("Wrote {}", path.display()));
        }
    }
    Ok(())
}

/// The config as YAML with secrets masked, plus the paths that were masked.
pub fn render_redacted(config: &AdkConfig) -> Result<(String, Vec<String>)> {
    let value = serde_json::to_value(config).context("Failed to serialize config")?;
    let yaml = serde_yaml::to_string(&redact(&value))?;
    Ok((yaml, collect_redacted_paths(&value)))
}

fn env_vars_note(env_vars: &[String]) -> Option<String> {
    if env_vars.is_empty() {
        return None;
    }
    let names: Vec<String> = env_vars.iter().map(|v| format!("${v}")).collect();
    Some(format!("Reads environment variables: {}", names.join(", ")))
}

/// Print the validation report. Fails when the config has errors.
pub fn validate(path: &Path, report: &ValidationReport, env_vars: &[String]) -> Result<()> {
    if let Some(note) = env_vars_note(env_vars) {
        note_info(&note);
    }
    for warning in &report.warnings {
        note_warn(&warning.to_string());
    }
    if !report.is_valid() {
        for error in &report.errors {
            note_error(&error.to_string());
        }
        bail!("{} is invalid", path.display());
    }
    note_success(&format!(
        "{} is valid ({} warning(s))",
        path.display(),
        report.warnings.len()
    ));
    Ok(())
}

/// A writer/reviewer loop that runs against Gemini.
pub fn starter_config() -> AdkConfig {
    AdkConfig {
        app: Some("adkit".into()),
        models: Some(ModelsConfig {
            default_provider: Some("gemini".into()),
            gemini: Some(GeminiConfig {
                api_key: Some("${GOOGLE_API_KEY}".into()),
                ..Default::default()
            }),
            ..Default::default()
        }),
        agents: vec![
            AgentEntry {
                name: "writer".into(),
                description: "Drafts an answer".into(),
                instruction: "Answer the user's request. Use get_current_time if the date matters."
                    .into(),
                tools: vec!["get_current_time".into()],
                output_key: Some("draft".into()),
                ..Default::default()
            },
            AgentEntry {
                name: "reviewer".into(),
                description: "Reviews the draft".into(),
                instruction: "Review this draft:\n{draft}\nIf it is good, call exit_loop. \
                              Otherwise list concrete fixes."
                    .into(),
                tools: vec!["exit_loop".into()],
                ..Default::default()
            },
        ],
        pipelines: vec![PipelineConfig {
            name: "refine".into(),
            kind: PipelineKind::Loop,
            description: "Draft, review, repeat".into(),
            agents: vec!["writer".into(), "reviewer".into()],
            max_iterations: Some(3),
        }],
        root: Some("refine".into()),
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use adkit_tools::builtin_registry;
    use serde_json::json;
    use std::collections::HashMap;

    #[test]
    fn starter_config_validates() {
        let value = serde_json::to_value(starter_config()).unwrap();
        let env = HashMap::from([("GOOGLE_API_KEY".to_string(), "AIza-test".to_string())]);
        let value = adkit_config::resolve_env_vars_with(&value, &env).unwrap();
        let (_, report) = adkit_config::prepare(&value, &builtin_registry().list()).unwrap();
        assert!(report.is_valid(), "errors: {:?}", report.errors);
        assert!(report.warnings.is_empty());
    }

    #[test]
    fn require_valid_rejects_errors() {
        let raw = json!({ "root": "ghost" });
        let (config, report) = adkit_config::prepare(&raw, &builtin_registry().list()).unwrap();
        assert!(require_valid(config, &report).is_err());
    }

    #[test]
    fn show_masks_the_api_key() {
        let mut config = starter_config();
        if let Some(gemini) = config.models.as_mut().and_then(|m| m.gemini.as_mut()) {
            gemini.api_key = Some("AIzaSyD-abcdef123456".into());
        }
        let (yaml, masked) = render_redacted(&config).unwrap();
        assert!(yaml.contains("AIza***"));
        assert!(!yaml.contains("abcdef123456"));
        assert_eq!(masked, vec!["models.gemini.apiKey".to_string()]);
    }

    #[test]
    fn env_vars_are_listed() {
        let raw = serde_json::to_value(starter_config()).unwrap();
        let vars = adkit_config::collect_referenced_vars(&raw);
        assert_eq!(
            env_vars_note(&vars).as_deref(),
            Some("Reads environment variables: $GOOGLE_API_KEY")
        );
        assert_eq!(env_vars_note(&[]), None);
    }

    #[tokio::test]
    async fn init_refuses_to_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("adkit.yaml");
        let config = AdkConfig::default();
        run(ConfigCommands::Init { force: false }, &path, &config)
            .await
            .unwrap();
        assert!(path.exists());
        assert!(run(ConfigCommands::Init { force: false }, &path, &config)
            .await
            .is_err());
        run(ConfigCommands::Init { force: true }, &path, &config)
            .await
            .unwrap();
    }
}
