//! Config file read/write with atomic backup rotation.

use crate::schema::AdkConfig;
use anyhow::{Context, Result};
use serde_json::Value;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info, warn};

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV_VAR: &str = "ADKIT_CONFIG";

/// Config file looked up in the working directory.
pub const LOCAL_CONFIG_FILE: &str = "adkit.yaml";

/// Default config file name within the config directory.
const CONFIG_FILE_NAME: &str = "config.yaml";

/// Number of rolling backups to keep.
const MAX_BACKUPS: usize = 5;

/// Resolve the adkit config directory (`~/.adkit`).
pub fn config_dir() -> PathBuf {
    dirs::home_dir()
        .map(|home| home.join(".adkit"))
        .unwrap_or_else(|| PathBuf::from(".adkit"))
}

/// Resolve the full path to the main config file inside `config_dir`.
pub fn config_file_path(config_dir: &Path) -> PathBuf {
    config_dir.join(CONFIG_FILE_NAME)
}

/// Pick the config file to use.
///
/// Priority: `explicit` > `ADKIT_CONFIG` env > `./adkit.yaml` > `~/.adkit/config.yaml`.
pub fn resolve_config_path(explicit: Option<&Path>) -> PathBuf {
    if let Some(path) = explicit {
        return path.to_path_buf();
    }
    if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
        if !path.trim().is_empty() {
            return PathBuf::from(path);
        }
    }
    let local = PathBuf::from(LOCAL_CONFIG_FILE);
    if local.exists() {
        return local;
    }
    config_file_path(&config_dir())
}

/// Load the config file as an untyped tree, before env substitution.
///
/// Returns an empty object if the file doesn't exist (first run).
pub async fn load_raw_config(path: &Path) -> Result<Value> {
    if !path.exists() {
        debug!(path = %path.display(), "Config file does not exist; using defaults");
        return Ok(Value::Object(Default::default()));
    }

    let raw = fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let value: Value = serde_yaml::from_str(&raw)
        .with_context(|| format!("Failed to parse config YAML at: {}", path.display()))?;

    info!(path = %path.display(), "Loaded config");
    Ok(match value {
        Value::Null => Value::Object(Default::default()),
        other => other,
    })
}

/// Load and parse the config from disk without env substitution or defaults.
pub async fn load_config(path: &Path) -> Result<AdkConfig> {
    let value = load_raw_config(path).await?;
    serde_json::from_value(value)
        .with_context(|| format!("Invalid config structure in: {}", path.display()))
}

/// Write config to disk atomically (write to temp file, rename).
///
/// Creates a rolling backup of the previous config before overwriting.
pub async fn write_config(config: &AdkConfig, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).await.with_context(|| {
            format!("Failed to create config directory: {}", parent.display())
        })?;
    }

    if path.exists() {
        rotate_backups(path).await?;
    }

    let yaml = serde_yaml::to_string(config).context("Failed to serialize config to YAML")?;

    let tmp_path = path.with_extension("yaml.tmp");
    fs::write(&tmp_path, yaml.as_bytes())
        .await
        .with_context(|| format!("Failed to write temp config: {}", tmp_path.display()))?;

    fs::rename(&tmp_path, path)
        .await
        .with_context(|| format!("Failed to rename temp config to: {}", path.display()))?;

    info!(path = %path.display(), "Wrote config");
    Ok(())
}

/// Rotate backup files: config.yaml.bak.1 → .bak.2 → ... → .bak.N
async fn rotate_backups(path: &Path) -> Result<()> {
    for i in (1..MAX_BACKUPS).rev() {
        let old = path.with_extension(format!("yaml.bak.{}", i));
        let new = path.with_extension(format!("yaml.bak.{}", i + 1));
        if old.exists() {
            if let Err(e) = fs::rename(&old, &new).await {
                warn!("Failed to rotate backup {}: {}", old.display(), e);
            }
        }
    }

    let bak = path.with_extension("yaml.bak.1");
    if let Err(e) = fs::copy(path, &bak).await {
        warn!("Failed to create backup {}: {}", bak.display(), e);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::AgentEntry;

    #[test]
    fn explicit_path_wins() {
        let p = resolve_config_path(Some(Path::new("/tmp/custom.yaml")));
        assert_eq!(p, PathBuf::from("/tmp/custom.yaml"));
    }

    #[tokio::test]
    async fn missing_file_is_empty_config() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config(&dir.path().join("none.yaml")).await.unwrap();
        assert_eq!(config, AdkConfig::default());
    }

    #[tokio::test]
    async fn write_then_load_with_backups() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("adkit.yaml");

        let mut config = AdkConfig {
            app: Some("demo".into()),
            ..Default::default()
        };
        write_config(&config, &path).await.unwrap();
        config.agents.push(AgentEntry {
            name: "helper".into(),
            ..Default::default()
        });
        write_config(&config, &path).await.unwrap();

        let loaded = load_config(&path).await.unwrap();
        assert_eq!(loaded, config);
        assert!(dir.path().join("adkit.yaml.bak.1").exists());
        assert!(!dir.path().join("adkit.yaml.tmp").exists());
    }

    #[tokio::test]
    async fn malformed_yaml_names_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.yaml");
        tokio::fs::write(&path, "agents: [unclosed").await.unwrap();
        let err = load_config(&path).await.unwrap_err();
        assert!(format!("{err:#}").contains("bad.yaml"));
    }
}
