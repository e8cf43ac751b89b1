//! Wiring: turns a prepared `AdkConfig` into providers, an agent tree,
//! a session service and a `Runner`.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use tracing::info;

use adkit_agent::{Agent, LlmAgent, LoopAgent, ParallelAgent, Runner, SequentialAgent};
use adkit_config::{AdkConfig, PipelineKind, SessionBackend};
use adkit_core::{LlmProvider, ToolRegistry};
use adkit_logging::LoggingOptions;
use adkit_models::{GeminiProvider, ProviderRegistry, ScriptedProvider};
use adkit_sessions::{FileSessionService, InMemorySessionService, SessionService};

/// Reply of the offline `scripted` provider when no `scriptedReply` is configured.
pub const DEFAULT_SCRIPTED_REPLY: &str = "(scripted provider: no model configured)";

/// Everything a command needs to run agents.
pub struct App {
    pub config: AdkConfig,
    pub tools: ToolRegistry,
    pub runner: Runner,
}

impl App {
    pub fn build(config: AdkConfig, tools: ToolRegistry) -> Result<Self> {
        let root = config
            .root
            .clone()
            .context("No agents configured; add an `agents:` section to the config")?;
        let provider = build_provider(&config)?;
        let agent = build_agent(&config, &root, &provider, &tools)?;
        let sessions = build_session_service(&config);
        info!(
            app = config.app_name(),
            root = %root,
            provider = config.default_provider(),
            "Agent tree ready"
        );
        let runner = Runner::new(config.app_name(), agent, sessions);
        Ok(Self {
            config,
            tools,
            runner,
        })
    }
}

/// Every provider the config can reach. `scripted` is always present; `gemini`
/// is registered once it has an API key.
pub fn build_providers(config: &AdkConfig) -> Result<ProviderRegistry> {
    let models = config.models.clone().unwrap_or_default();
    let mut registry = ProviderRegistry::new();

    let reply = models
        .scripted_reply
        .unwrap_or_else(|| DEFAULT_SCRIPTED_REPLY.to_string());
    registry.register(
        "scripted",
        Arc::new(ScriptedProvider::new("scripted").with_fallback(reply)),
    );

    let gemini = models.gemini.unwrap_or_default();
    match gemini.api_key.filter(|k| !k.trim().is_empty()) {
        Some(api_key) => {
            let mut provider = GeminiProvider::new(api_key);
            if let Some(url) = gemini.base_url {
                provider = provider.with_base_url(url);
            }
            if let Some(secs) = gemini.timeout_secs {
                provider = provider.with_timeout(Duration::from_secs(secs));
            }
            registry.register("gemini", Arc::new(provider));
        }
        None if config.default_provider() == "gemini" => {
            bail!("models.gemini.apiKey is not set")
        }
        None => {}
    }
    Ok(registry)
}

/// The provider named by `models.defaultProvider`.
pub fn build_provider(config: &AdkConfig) -> Result<Arc<dyn LlmProvider>> {
    let registry = build_providers(config)?;
    Ok(registry.get(config.default_provider())?)
}

/// Build the agent or pipeline called `name`, recursively.
///
/// Assumes a validated config: names resolve and pipelines are acyclic.
pub fn build_agent(
    config: &AdkConfig,
    name: &str,
    provider: &Arc<dyn LlmProvider>,
    tools: &ToolRegistry,
) -> Result<Arc<dyn Agent>> {
    if let Some(entry) = config.agent(name) {
        let agent = LlmAgent::new(
            entry.to_agent_config(config.default_model()),
            provider.clone(),
            tools,
        )
        .with_context(|| format!("Failed to build agent '{name}'"))?;
        return Ok(Arc::new(agent));
    }

    let pipeline = config
        .pipeline(name)
        .with_context(|| format!("Unknown agent or pipeline '{name}'"))?;
    let members = pipeline
        .agents
        .iter()
        .map(|member| build_agent(config, member, provider, tools))
        .collect::<Result<Vec<_>>>()?;

    let agent: Arc<dyn Agent> = match pipeline.kind {
        PipelineKind::Sequential => Arc::new(
            SequentialAgent::new(&pipeline.name, members)
                .with_description(&pipeline.description),
        ),
        PipelineKind::Parallel => Arc::new(
            ParallelAgent::new(&pipeline.name, members).with_description(&pipeline.description),
        ),
        PipelineKind::Loop => Arc::new(
            LoopAgent::new(&pipeline.name, members, pipeline.max_iterations)
                .with_description(&pipeline.description),
        ),
    };
    Ok(agent)
}

pub fn build_session_service(config: &AdkConfig) -> Arc<dyn SessionService> {
    let sessions = config.sessions.clone().unwrap_or_default();
    match (sessions.backend.unwrap_or_default(), sessions.dir) {
        (SessionBackend::File, Some(dir)) => Arc::new(FileSessionService::new(dir)),
        (SessionBackend::File, None) => Arc::new(FileSessionService::new(
            adkit_config::config_dir().join("sessions"),
        )),
        (SessionBackend::Memory, _) => Arc::new(InMemorySessionService::new()),
    }
}

/// Logger settings from config, with `--log-level` taking precedence.
pub fn logging_options(config: Option<&AdkConfig>, level_override: Option<&str>) -> LoggingOptions {
    let logging = config.and_then(|c| c.logging.clone()).unwrap_or_default();
    let mut options = LoggingOptions::default();
    if let Some(level) = level_override.map(str::to_string).or(logging.level) {
        options.level = level;
    }
    options.dir = logging.dir.map(PathBuf::from);
    options.json = logging.json.unwrap_or(false);
    options
}

#[cfg(test)]
mod tests {
    use super::*;
    use adkit_config::{AgentEntry, GeminiConfig, ModelsConfig};
    use adkit_core::AdkError;
    use adkit_tools::builtin_registry;
    use serde_json::json;

    fn scripted_config() -> AdkConfig {
        let raw = json!({
            "models": { "defaultProvider": "scripted", "scriptedReply": "hello from script" },
            "agents": [
                { "name": "drafter", "instruction": "Draft.", "outputKey": "draft" },
                { "name": "critic", "instruction": "Review {draft}.", "tools": ["exit_loop"] }
            ],
            "pipelines": [
                { "name": "refine", "kind": "loop", "agents": ["critic"], "maxIterations": 2 },
                { "name": "main", "agents": ["drafter", "refine"] }
            ]
        });
        let tools = builtin_registry();
        let (config, report) = adkit_config::prepare(&raw, &tools.list()).unwrap();
        assert!(report.is_valid(), "errors: {:?}", report.errors);
        config
    }

    #[test]
    fn builds_nested_pipeline_tree() {
        let config = scripted_config();
        let provider = build_provider(&config).unwrap();
        let root = build_agent(&config, "main", &provider, &builtin_registry()).unwrap();
        assert_eq!(root.name(), "main");
        let children: Vec<&str> = root.sub_agents().iter().map(|a| a.name()).collect();
        assert_eq!(children, vec!["drafter", "refine"]);
        assert_eq!(root.sub_agents()[1].sub_agents()[0].name(), "critic");
    }

    #[test]
    fn unknown_tool_fails_agent_build() {
        let config = AdkConfig {
            models: Some(ModelsConfig {
                default_provider: Some("scripted".into()),
                ..Default::default()
            }),
            agents: vec![AgentEntry {
                name: "a".into(),
                tools: vec!["nope".into()],
                ..Default::default()
            }],
            ..Default::default()
        };
        let provider = build_provider(&config).unwrap();
        let err = match build_agent(&config, "a", &provider, &builtin_registry()) {
            Ok(_) => panic!("expected an error"),
            Err(e) => format!("{e:#}"),
        };
        assert!(err.contains("unknown tool: nope"), "{err}");
    }

    #[test]
    fn gemini_requires_key() {
        let mut config = AdkConfig::default();
        assert!(build_provider(&config).is_err());

        config.models = Some(ModelsConfig {
            gemini: Some(GeminiConfig {
                api_key: Some("AIza-test".into()),
                timeout_secs: Some(5),
                ..Default::default()
            }),
            ..Default::default()
        });
        assert!(build_provider(&config).is_ok());
    }

    #[test]
    fn default_provider_resolves_through_registry() {
        let mut config = scripted_config();
        let registry = build_providers(&config).unwrap();
        assert_eq!(registry.list(), vec!["scripted"]);
        assert_eq!(build_provider(&config).unwrap().name(), "scripted");

        if let Some(models) = config.models.as_mut() {
            models.default_provider = Some("openai".into());
        }
        let err = build_provider(&config).err().unwrap();
        assert!(
            matches!(
                err.downcast_ref::<AdkError>(),
                Some(AdkError::ProviderNotFound(name)) if name == "openai"
            ),
            "{err}"
        );
    }

    #[test]
    fn log_level_flag_wins() {
        let config = scripted_config();
        assert_eq!(logging_options(Some(&config), None).level, "info");
        assert_eq!(logging_options(Some(&config), Some("debug")).level, "debug");
        assert_eq!(logging_options(None, None), LoggingOptions::default());
    }

    #[tokio::test]
    async fn scripted_app_runs_end_to_end() {
        let app = App::build(scripted_config(), builtin_registry()).unwrap();
        let sessions = app.runner.sessions().clone();
        sessions
            .create_session(app.config.app_name(), "u1", Some("s1"), Default::default())
            .await
            .unwrap();
        let outcome = app.runner.run("u1", "s1", "write a poem").await.unwrap();
        assert_eq!(outcome.final_response.as_deref(), Some("hello from script"));
        assert_eq!(outcome.state["draft"], "hello from script");
    }
}
