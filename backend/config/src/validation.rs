//! Config validation: reference, cycle and provider checks with user-friendly messages.

use std::collections::{HashMap, HashSet};

use crate::schema::{AdkConfig, PipelineKind, SessionBackend};
use thiserror::Error;

/// Providers the runtime knows how to build.
pub const KNOWN_PROVIDERS: &[&str] = &["gemini", "scripted"];

/// A config validation error with field path and message.
#[derive(Debug, Error)]
#[error("Config validation error at '{path}': {message}")]
pub struct ConfigValidationError {
    pub path: String,
    pub message: String,
}

/// A collection of validation errors found in one pass.
#[derive(Debug, Default)]
pub struct ValidationReport {
    pub errors: Vec<ConfigValidationError>,
    pub warnings: Vec<ConfigValidationError>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    fn error(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ConfigValidationError {
            path: path.into(),
            message: message.into(),
        });
    }

    fn warn(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ConfigValidationError {
            path: path.into(),
            message: message.into(),
        });
    }
}

/// Validate the config and return a report of all errors and warnings.
///
/// `known_tools` lists the tool names agents may reference.
pub fn validate<S: AsRef<str>>(config: &AdkConfig, known_tools: &[S]) -> ValidationReport {
    let mut report = ValidationReport::default();
    validate_models(config, &mut report);
    validate_agents(config, known_tools, &mut report);
    validate_pipelines(config, &mut report);
    validate_root(config, &mut report);
    validate_sessions(config, &mut report);
    report
}

fn validate_models(config: &AdkConfig, report: &mut ValidationReport) {
    let provider = config.default_provider();
    if !KNOWN_PROVIDERS.contains(&provider) {
        report.error(
            "models.defaultProvider",
            format!(
                "Unknown provider '{provider}'. Use one of: {}",
                KNOWN_PROVIDERS.join(", ")
            ),
        );
        return;
    }

    if provider == "gemini" && !config.agents.is_empty() {
        let key = config
            .models
            .as_ref()
            .and_then(|m| m.gemini.as_ref())
            .and_then(|g| g.api_key.as_deref())
            .unwrap_or("");
        if key.trim().is_empty() {
            report.error(
                "models.gemini.apiKey",
                "Gemini API key is required (e.g. apiKey: ${GOOGLE_API_KEY})",
            );
        }
    }

    if let Some(gemini) = config.models.as_ref().and_then(|m| m.gemini.as_ref()) {
        if gemini.timeout_secs == Some(0) {
            report.error("models.gemini.timeoutSecs", "timeoutSecs must be >= 1");
        }
    }
}

fn validate_agents<S: AsRef<str>>(
    config: &AdkConfig,
    known_tools: &[S],
    report: &mut ValidationReport,
) {
    let known: HashSet<&str> = known_tools.iter().map(|t| t.as_ref()).collect();
    let mut seen = HashSet::new();

    for (i, agent) in config.agents.iter().enumerate() {
        let path = format!("agents[{i}]");
        if agent.name.trim().is_empty() {
            report.error(format!("{path}.name"), "Agent name cannot be empty");
        } else if !seen.insert(agent.name.as_str()) {
            report.error(
                format!("{path}.name"),
                format!("Duplicate agent name '{}'", agent.name),
            );
        }
        if agent.instruction.trim().is_empty() {
            report.warn(format!("{path}.instruction"), "Agent has no instruction");
        }
        for tool in &agent.tools {
            if !known.contains(tool.as_str()) {
                report.error(format!("{path}.tools"), format!("Unknown tool '{tool}'"));
            }
        }
        if let Some(t) = agent.temperature {
            if !(0.0..=2.0).contains(&t) {
                report.error(
                    format!("{path}.temperature"),
                    "temperature must be between 0 and 2",
                );
            }
        }
        if agent.max_steps == Some(0) {
            report.error(format!("{path}.maxSteps"), "maxSteps must be >= 1");
        }
    }
}

fn validate_pipelines(config: &AdkConfig, report: &mut ValidationReport) {
    let agent_names: HashSet<&str> = config.agents.iter().map(|a| a.name.as_str()).collect();
    let mut seen = HashSet::new();

    for (i, pipeline) in config.pipelines.iter().enumerate() {
        let path = format!("pipelines[{i}]");
        if pipeline.name.trim().is_empty() {
            report.error(format!("{path}.name"), "Pipeline name cannot be empty");
        } else if agent_names.contains(pipeline.name.as_str())
            || !seen.insert(pipeline.name.as_str())
        {
            report.error(
                format!("{path}.name"),
                format!("Name '{}' is already used", pipeline.name),
            );
        }

        if pipeline.agents.is_empty() {
            report.error(format!("{path}.agents"), "Pipeline has no members");
        }
        for member in &pipeline.agents {
            if config.agent(member).is_none() && config.pipeline(member).is_none() {
                report.error(
                    format!("{path}.agents"),
                    format!("Unknown agent or pipeline '{member}'"),
                );
            }
        }

        match (pipeline.kind, pipeline.max_iterations) {
            (PipelineKind::Loop, Some(0)) => {
                report.error(format!("{path}.maxIterations"), "maxIterations must be >= 1");
            }
            (PipelineKind::Loop, None) => {
                report.warn(
                    format!("{path}.maxIterations"),
                    "Loop has no maxIterations; it only stops when an agent calls exit_loop",
                );
            }
            (PipelineKind::Sequential | PipelineKind::Parallel, Some(_)) => {
                report.warn(
                    format!("{path}.maxIterations"),
                    format!("maxIterations is ignored for {} pipelines", pipeline.kind),
                );
            }
            _ => {}
        }
    }

    if let Some(cycle) = find_cycle(config) {
        report.error("pipelines", format!("Pipeline cycle: {}", cycle.join(" -> ")));
    }
}

/// Depth-first search for a pipeline that (transitively) contains itself.
fn find_cycle(config: &AdkConfig) -> Option<Vec<String>> {
    let graph: HashMap<&str, Vec<&str>> = config
        .pipelines
        .iter()
        .map(|p| {
            let members = p
                .agents
                .iter()
                .map(String::as_str)
                .filter(|m| config.pipeline(m).is_some())
                .collect();
            (p.name.as_str(), members)
        })
        .collect();

    fn visit<'a>(
        node: &'a str,
        graph: &HashMap<&'a str, Vec<&'a str>>,
        stack: &mut Vec<&'a str>,
        done: &mut HashSet<&'a str>,
    ) -> Option<Vec<String>> {
        if let Some(pos) = stack.iter().position(|n| *n == node) {
            let mut cycle: Vec<String> = stack[pos..].iter().map(|s| s.to_string()).collect();
            cycle.push(node.to_string());
            return Some(cycle);
        }
        if done.contains(node) {
            return None;
        }
        stack.push(node);
        for next in graph.get(node).into_iter().flatten() {
            if let Some(cycle) = visit(*next, graph, stack, done) {
                return Some(cycle);
            }
        }
        stack.pop();
        done.insert(node);
        None
    }

    let mut done = HashSet::new();
    for p in &config.pipelines {
        let mut stack = Vec::new();
        if let Some(cycle) = visit(p.name.as_str(), &graph, &mut stack, &mut done) {
            return Some(cycle);
        }
    }
    None
}

fn validate_root(config: &AdkConfig, report: &mut ValidationReport) {
    match config.root.as_deref() {
        Some(root) if config.agent(root).is_none() && config.pipeline(root).is_none() => {
            report.error("root", format!("Unknown agent or pipeline '{root}'"));
        }
        Some(_) => {}
        None if config.agents.is_empty() => {
            report.warn("agents", "No agents configured");
        }
        None => report.error("root", "No root agent or pipeline"),
    }
}

fn validate_sessions(config: &AdkConfig, report: &mut ValidationReport) {
    let Some(sessions) = &config.sessions else { return };
    if sessions.backend == Some(SessionBackend::File)
        && sessions.dir.as_deref().map(str::trim).unwrap_or("").is_empty()
    {
        report.error("sessions.dir", "The file backend needs a directory");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{AgentEntry, GeminiConfig, ModelsConfig, PipelineConfig};

    const TOOLS: &[&str] = &["calculate", "exit_loop"];

    fn agent(name: &str) -> AgentEntry {
        AgentEntry {
            name: name.into(),
            instruction: "Help.".into(),
            ..Default::default()
        }
    }

    fn pipeline(name: &str, kind: PipelineKind, members: &[&str]) -> PipelineConfig {
        PipelineConfig {
            name: name.into(),
            kind,
            agents: members.iter().map(|m| m.to_string()).collect(),
            max_iterations: (kind == PipelineKind::Loop).then_some(3),
            ..Default::default()
        }
    }

    fn base() -> AdkConfig {
        AdkConfig {
            models: Some(ModelsConfig {
                default_provider: Some("gemini".into()),
                gemini: Some(GeminiConfig {
                    api_key: Some("AIza-test".into()),
                    ..Default::default()
                }),
                ..Default::default()
            }),
            agents: vec![agent("writer"), agent("critic")],
            root: Some("writer".into()),
            ..Default::default()
        }
    }

    #[test]
    fn empty_config_is_valid() {
        let report = validate(&AdkConfig::default(), TOOLS);
        assert!(report.is_valid(), "errors: {:?}", report.errors);
        assert_eq!(report.warnings.len(), 1);
    }

    #[test]
    fn valid_pipeline_config() {
        let mut cfg = base();
        cfg.pipelines.push(pipeline("review", PipelineKind::Loop, &["writer", "critic"]));
        cfg.pipelines.push(pipeline("main", PipelineKind::Sequential, &["review"]));
        cfg.root = Some("main".into());
        let report = validate(&cfg, TOOLS);
        assert!(report.is_valid(), "errors: {:?}", report.errors);
    }

    #[test]
    fn missing_gemini_key_is_error() {
        let mut cfg = base();
        cfg.models = None;
        let report = validate(&cfg, TOOLS);
        assert!(report.errors.iter().any(|e| e.path == "models.gemini.apiKey"));

        cfg.models = Some(ModelsConfig {
            default_provider: Some("scripted".into()),
            ..Default::default()
        });
        assert!(validate(&cfg, TOOLS).is_valid());
    }

    #[test]
    fn unknown_references_are_errors() {
        let mut cfg = base();
        cfg.agents[0].tools = vec!["teleport".into()];
        cfg.pipelines.push(pipeline("flow", PipelineKind::Sequential, &["ghost"]));
        cfg.root = Some("nowhere".into());
        let report = validate(&cfg, TOOLS);
        let paths: Vec<&str> = report.errors.iter().map(|e| e.path.as_str()).collect();
        assert!(paths.contains(&"agents[0].tools"));
        assert!(paths.contains(&"pipelines[0].agents"));
        assert!(paths.contains(&"root"));
    }

    #[test]
    fn duplicate_names_are_errors() {
        let mut cfg = base();
        cfg.agents.push(agent("writer"));
        cfg.pipelines.push(pipeline("critic", PipelineKind::Parallel, &["writer"]));
        let report = validate(&cfg, TOOLS);
        assert_eq!(report.errors.len(), 2, "errors: {:?}", report.errors);
    }

    #[test]
    fn detects_pipeline_cycles() {
        let mut cfg = base();
        cfg.pipelines.push(pipeline("a", PipelineKind::Sequential, &["writer", "b"]));
        cfg.pipelines.push(pipeline("b", PipelineKind::Parallel, &["a"]));
        let report = validate(&cfg, TOOLS);
        let cycle = report.errors.iter().find(|e| e.path == "pipelines").unwrap();
        assert!(cycle.message.contains("a -> b -> a"));
    }

    #[test]
    fn loop_iterations_checked() {
        let mut cfg = base();
        let mut looped = pipeline("l", PipelineKind::Loop, &["writer"]);
        looped.max_iterations = Some(0);
        cfg.pipelines.push(looped);
        assert!(!validate(&cfg, TOOLS).is_valid());

        cfg.pipelines[0].max_iterations = None;
        let report = validate(&cfg, TOOLS);
        assert!(report.is_valid());
        assert!(report.warnings.iter().any(|w| w.path.ends_with("maxIterations")));
    }
}
