use std::sync::Arc;

use adkit_agent::{Agent, LlmAgent, LoopAgent, ParallelAgent, Runner, SequentialAgent, find_agent};
use adkit_core::{AgentConfig, ToolRegistry};
use adkit_models::ScriptedProvider;
use adkit_sessions::{InMemorySessionService, SessionService};
use adkit_tools::builtin_registry;
use serde_json::{Map, json};

fn researcher(name: &str, finding: &str, tools: &ToolRegistry) -> Arc<dyn Agent> {
    let provider = Arc::new(ScriptedProvider::new(name).with_text(finding));
    let config = AgentConfig::new(name, "gemini-2.0-flash")
        .with_instruction("Research one topic.")
        .with_output_key(format!("{name}_result"));
    Arc::new(LlmAgent::new(config, provider, tools).unwrap())
}

#[tokio::test]
async fn parallel_research_then_synthesis() {
    let tools = builtin_registry();
    let research = ParallelAgent::new(
        "research",
        vec![
            researcher("energy", "Solar is cheap.", &tools),
            researcher("transport", "EVs are growing.", &tools),
        ],
    );

    let synth_provider = Arc::new(ScriptedProvider::new("synth").with_text("Summary ready."));
    let synthesizer = LlmAgent::new(
        AgentConfig::new("synthesizer", "gemini-2.0-flash")
            .with_instruction("Combine: {energy_result} | {transport_result}"),
        synth_provider.clone(),
        &tools,
    )
    .unwrap();

    let root: Arc<dyn Agent> = Arc::new(SequentialAgent::new(
        "root",
        vec![Arc::new(research), Arc::new(synthesizer)],
    ));
    assert!(find_agent(&root, "transport").is_some());
    assert!(find_agent(&root, "missing").is_none());

    let sessions = Arc::new(InMemorySessionService::new());
    sessions
        .create_session("app", "u1", Some("s1"), Map::new())
        .await
        .unwrap();
    let runner = Runner::new("app", root, sessions.clone());
    let outcome = runner.run("u1", "s1", "state of climate tech").await.unwrap();

    let authors: Vec<&str> = outcome.events.iter().map(|e| e.author.as_str()).collect();
    assert_eq!(authors, vec!["energy", "transport", "synthesizer"]);
    assert_eq!(outcome.final_response.as_deref(), Some("Summary ready."));

    let request = &synth_provider.requests()[0];
    assert_eq!(
        request.system_instruction.as_deref(),
        Some("Combine: Solar is cheap. | EVs are growing.")
    );
    // user turn plus the two researchers' answers, reframed as context
    assert_eq!(request.contents.len(), 3);
    assert!(request.contents[1].text().contains("[energy] said: Solar is cheap."));
}

#[tokio::test]
async fn refinement_loop_exits_via_tool() {
    let tools = builtin_registry();
    let provider = Arc::new(
        ScriptedProvider::new("critic")
            .with_text("Needs work.")
            .with_call("exit_loop", json!({}))
            .with_text("Approved."),
    );
    let critic = LlmAgent::new(
        AgentConfig::new("critic", "gemini-2.0-flash").with_tools(["exit_loop"]),
        provider.clone(),
        &tools,
    )
    .unwrap();
    let looped = LoopAgent::new("refine", vec![Arc::new(critic)], Some(5));

    let sessions = Arc::new(InMemorySessionService::new());
    sessions
        .create_session("app", "u1", Some("s1"), Map::new())
        .await
        .unwrap();
    let runner = Runner::new("app", Arc::new(looped), sessions);
    let outcome = runner.run("u1", "s1", "review my essay").await.unwrap();

    assert_eq!(provider.remaining(), 0);
    assert_eq!(outcome.final_response.as_deref(), Some("Approved."));
    assert!(outcome.events.iter().any(|e| e.actions.escalate));
}
