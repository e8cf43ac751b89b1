//! `adkit run` and `adkit chat`: drive the root agent from the terminal.

use anyhow::Result;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::debug;

use adkit_agent::{RunOutcome, Runner};

use crate::terminal_output::{note_error, note_info, render_event, BOLD, RESET};

/// Resolve the session to use, creating it when needed. A fresh id is generated when none is given.
pub async fn open_session(runner: &Runner, user: &str, session: Option<String>) -> Result<String> {
    let id = session.unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
    runner
        .sessions()
        .get_or_create_session(runner.app_name(), user, &id)
        .await?;
    debug!(session = %id, "Session ready");
    Ok(id)
}

fn print_outcome(outcome: &RunOutcome, verbose: bool) {
    if verbose {
        for event in &outcome.events {
            for line in render_event(event) {
                println!("{line}");
            }
        }
    } else {
        match &outcome.final_response {
            Some(text) => println!("{text}"),
            None => note_info("The agent produced no final answer."),
        }
    }
}

pub async fn run_once(
    runner: &Runner,
    user: &str,
    session: Option<String>,
    message: &str,
    json: bool,
    verbose: bool,
) -> Result<()> {
    let session_id = open_session(runner, user, session).await?;
    let outcome = runner.run(user, &session_id, message).await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
    } else {
        print_outcome(&outcome, verbose);
    }
    Ok(())
}

/// Read lines from stdin until EOF or `/exit`. `/state` prints the session state.
pub async fn chat(runner: &Runner, user: &str, session: Option<String>) -> Result<()> {
    let session_id = open_session(runner, user, session).await?;
    note_info(&format!(
        "Chatting with '{}' in session {session_id}. /state shows state, /exit quits.",
        runner.agent().name()
    ));

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        eprint!("{BOLD}you>{RESET} ");
        let Some(line) = lines.next_line().await? else {
            break;
        };
        let message = line.trim();
        match message {
            "" => continue,
            "/exit" | "/quit" => break,
            "/state" => {
                if let Some(session) = runner
                    .sessions()
                    .get_session(runner.app_name(), user, &session_id)
                    .await?
                {
                    println!("{}", serde_json::to_string_pretty(&session.state)?);
                }
                continue;
            }
            _ => {}
        }

        match runner.run(user, &session_id, message).await {
            Ok(outcome) => print_outcome(&outcome, true),
            Err(e) => note_error(&e.to_string()),
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use adkit_agent::LlmAgent;
    use adkit_core::AgentConfig;
    use adkit_models::ScriptedProvider;
    use adkit_sessions::{InMemorySessionService, SessionService};
    use adkit_tools::builtin_registry;

    fn runner() -> Runner {
        let provider = Arc::new(ScriptedProvider::new("scripted").with_fallback("hi"));
        let agent =
            LlmAgent::new(AgentConfig::new("greeter", "m"), provider, &builtin_registry()).unwrap();
        Runner::new("cli", Arc::new(agent), Arc::new(InMemorySessionService::new()))
    }

    #[tokio::test]
    async fn open_session_reuses_existing() {
        let runner = runner();
        let id = open_session(&runner, "u", None).await.unwrap();
        assert!(uuid::Uuid::parse_str(&id).is_ok());
        runner.run("u", &id, "hello").await.unwrap();

        let again = open_session(&runner, "u", Some(id.clone())).await.unwrap();
        assert_eq!(again, id);
        let session = runner.sessions().get_session("cli", "u", &id).await.unwrap().unwrap();
        assert_eq!(session.events.len(), 2);
    }
}
