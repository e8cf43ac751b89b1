//! CLI Sessions Subcommands
//!
//! Inspect and delete stored sessions. Only the file backend keeps sessions
//! between CLI invocations.

use anyhow::{Context, Result};
use clap::Subcommand;

use adkit_config::{AdkConfig, SessionBackend};
use adkit_sessions::SessionService;

use crate::terminal_output::{note_info, note_success, render_event, render_table};

/// Warning shown when sessions live only as long as this process.
pub fn memory_backend_note(config: &AdkConfig) -> Option<&'static str> {
    let backend = config
        .sessions
        .as_ref()
        .and_then(|s| s.backend)
        .unwrap_or_default();
    (backend == SessionBackend::Memory).then_some(
        "Sessions use the in-memory backend and are lost when adkit exits; \
         set `sessions.backend: file` to keep them between runs.",
    )
}

#[derive(Subcommand)]
pub enum SessionCommands {
    /// List sessions of the current user, newest first
    List,
    /// Show a session's state and history
    Show { id: String },
    /// Delete a session
    Delete { id: String },
}

pub async fn run(
    cmd: SessionCommands,
    sessions: &dyn SessionService,
    app: &str,
    user: &str,
) -> Result<()> {
    match cmd {
        SessionCommands::List => {
            let list = sessions.list_sessions(app, user).await?;
            if list.is_empty() {
                note_info(&format!("No sessions for user '{user}'."));
                return Ok(());
            }
            let rows: Vec<Vec<String>> = list
                .into_iter()
                .map(|s| {
                    vec![
                        s.id,
                        s.event_count.to_string(),
                        s.last_update_time.format("%Y-%m-%d %H:%M:%S").to_string(),
                    ]
                })
                .collect();
            print!("{}", render_table(&["Session", "Events", "Updated"], &rows, 40));
        }
        SessionCommands::Show { id } => {
            let session = sessions
                .get_session(app, user, &id)
                .await?
                .with_context(|| format!("Session '{id}' not found"))?;
            println!("State:");
            println!("{}", serde_json::to_string_pretty(&session.state)?);
            println!("\nHistory:");
            for event in &session.events {
                for line in render_event(event) {
                    println!("{line}");
                }
            }
        }
        SessionCommands::Delete { id } => {
            sessions.delete_session(app, user, &id).await?;
            note_success(&format!("Deleted session {id}"));
        }
    }
    Ok(())
}
