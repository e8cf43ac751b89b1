//! adkit runtime configuration schema.
//!
//! Typed for serde YAML/JSON deserialization. Every section is optional so a
//! partial file still parses; defaults fill the gaps after loading.

use adkit_core::AgentConfig;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Root configuration for adkit.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdkConfig {
    /// Application name; sessions are grouped under it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app: Option<String>,

    /// Model providers
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub models: Option<ModelsConfig>,

    /// LLM agent definitions
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub agents: Vec<AgentEntry>,

    /// Sequential, parallel and loop compositions of agents or other pipelines
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub pipelines: Vec<PipelineConfig>,

    /// Name of the agent or pipeline that handles user messages
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root: Option<String>,

    /// Session storage
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sessions: Option<SessionsConfig>,

    /// Logging configuration
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logging: Option<LoggingConfig>,
}

impl AdkConfig {
    pub fn app_name(&self) -> &str {
        self.app.as_deref().unwrap_or(crate::defaults::DEFAULT_APP_NAME)
    }

    pub fn agent(&self, name: &str) -> Option<&AgentEntry> {
        self.agents.iter().find(|a| a.name == name)
    }

    pub fn pipeline(&self, name: &str) -> Option<&PipelineConfig> {
        self.pipelines.iter().find(|p| p.name == name)
    }

    pub fn default_provider(&self) -> &str {
        self.models
            .as_ref()
            .and_then(|m| m.default_provider.as_deref())
            .unwrap_or(crate::defaults::DEFAULT_PROVIDER)
    }

    pub fn default_model(&self) -> &str {
        self.models
            .as_ref()
            .and_then(|m| m.default_model.as_deref())
            .unwrap_or(crate::defaults::DEFAULT_MODEL)
    }
}

// ---------------------------------------------------------------------------
// Models
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelsConfig {
    /// `gemini` or `scripted` (offline canned replies)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_provider: Option<String>,

    /// Model used by agents that do not name one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_model: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gemini: Option<GeminiConfig>,

    /// Reply text of the `scripted` provider
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scripted_reply: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeminiConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

// ---------------------------------------------------------------------------
// Agents and pipelines
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentEntry {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,

    /// Instruction template; `{key}` placeholders are filled from session state.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub instruction: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<String>,

    /// State key that receives the agent's final answer
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_key: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_output_tokens: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_steps: Option<usize>,
}

impl AgentEntry {
    /// The runtime description of this agent, with `default_model` filling a missing model.
    pub fn to_agent_config(&self, default_model: &str) -> AgentConfig {
        let mut config = AgentConfig::new(
            self.name.clone(),
            self.model.clone().unwrap_or_else(|| default_model.to_string()),
        )
        .with_description(self.description.clone())
        .with_instruction(self.instruction.clone())
        .with_tools(self.tools.iter().cloned());
        if let Some(key) = &self.output_key {
            config = config.with_output_key(key.clone());
        }
        if let Some(t) = self.temperature {
            config = config.with_temperature(t);
        }
        if let Some(max) = self.max_output_tokens {
            config = config.with_max_output_tokens(max);
        }
        if let Some(steps) = self.max_steps {
            config = config.with_max_steps(steps);
        }
        config
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PipelineKind {
    #[default]
    Sequential,
    Parallel,
    Loop,
}

impl std::fmt::Display for PipelineKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Sequential => "sequential",
            Self::Parallel => "parallel",
            Self::Loop => "loop",
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineConfig {
    pub name: String,

    #[serde(default)]
    pub kind: PipelineKind,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,

    /// Members by name: agents or other pipelines
    #[serde(default)]
    pub agents: Vec<String>,

    /// Loop pipelines only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_iterations: Option<usize>,
}

// ---------------------------------------------------------------------------
// Sessions and logging
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionBackend {
    #[default]
    Memory,
    File,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionsConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backend: Option<SessionBackend>,

    /// Root directory of the file backend
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dir: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoggingConfig {
    /// Filter directive when `RUST_LOG` is unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,

    /// Directory for daily-rolling NDJSON logs
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dir: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub json: Option<bool>,
}
