mod agents_cmd;
mod api;
mod app;
mod config_cmd;
mod run_cmd;
mod sessions_cmd;
mod status_cmd;
mod terminal_output;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tokio::net::TcpListener;
use tracing::info;

use adkit_config::{collect_referenced_vars, load_raw_config, resolve_config_path};
use adkit_logging::init_logger;
use adkit_tools::builtin_registry;

use api::AppState;
use app::{build_session_service, logging_options, App};
use config_cmd::{require_valid, ConfigCommands};
use sessions_cmd::SessionCommands;
use terminal_output::note_warn;

#[derive(Parser)]
#[command(name = "adkit")]
#[command(about = "adkit: tool-calling agents with scoped session state")]
#[command(version)]
struct Cli {
    /// Config file [default: $ADKIT_CONFIG, ./adkit.yaml, ~/.adkit/config.yaml]
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// User id that owns the sessions
    #[arg(short, long, global = true, default_value = "local")]
    user: String,

    /// Log filter when RUST_LOG is unset (e.g. `debug`, `adkit_agent=trace`)
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Send one message to the root agent and print the answer
    Run {
        message: String,
        /// Session to continue; a new one is created when omitted
        #[arg(short, long)]
        session: Option<String>,
        /// Print the full run outcome as JSON
        #[arg(long)]
        json: bool,
        /// Print every event, including tool calls
        #[arg(short, long)]
        verbose: bool,
    },
    /// Interactive conversation with the root agent
    Chat {
        #[arg(short, long)]
        session: Option<String>,
    },
    /// Show the configured agent tree
    Agents,
    /// List built-in tools
    Tools,
    /// Check the config file and report problems
    Validate,
    /// Inspect or create the config file
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
    /// Inspect stored sessions
    Sessions {
        #[command(subcommand)]
        command: SessionCommands,
    },
    /// Start the HTTP API
    Serve {
        /// Port to bind the HTTP server to
        #[arg(short, long, default_value_t = 8080)]
        port: u16,
        #[arg(long, default_value = "127.0.0.1")]
        bind: String,
    },
    /// Probe a running server
    Status {
        #[arg(long, default_value = "http://127.0.0.1:8080")]
        url: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let path = resolve_config_path(cli.config.as_deref());
    let tools = builtin_registry();

    let loaded = adkit_config::load_with_report(&path, &tools.list()).await;
    init_logger(&logging_options(
        loaded.as_ref().ok().map(|(config, _)| config),
        cli.log_level.as_deref(),
    ));
    let (config, report) = loaded?;

    match cli.command {
        Commands::Validate => {
            let raw = load_raw_config(&path).await?;
            config_cmd::validate(&path, &report, &collect_referenced_vars(&raw))?;
        }
        Commands::Config { command } => config_cmd::run(command, &path, &config).await?,
        Commands::Tools => agents_cmd::list_tools(&tools),
        Commands::Status { url } => status_cmd::run(&url).await?,
        Commands::Agents => {
            let config = require_valid(config, &report)?;
            agents_cmd::list_agents(&config);
        }
        Commands::Sessions { command } => {
            let config = require_valid(config, &report)?;
            if let Some(note) = sessions_cmd::memory_backend_note(&config) {
                note_warn(note);
            }
            let sessions = build_session_service(&config);
            sessions_cmd::run(command, sessions.as_ref(), config.app_name(), &cli.user).await?;
        }
        Commands::Run {
            message,
            session,
            json,
            verbose,
        } => {
            let config = require_valid(config, &report)?;
            if session.is_some() {
                if let Some(note) = sessions_cmd::memory_backend_note(&config) {
                    note_warn(note);
                }
            }
            let app = App::build(config, tools)?;
            run_cmd::run_once(&app.runner, &cli.user, session, &message, json, verbose).await?;
        }
        Commands::Chat { session } => {
            let app = App::build(require_valid(config, &report)?, tools)?;
            run_cmd::chat(&app.runner, &cli.user, session).await?;
        }
        Commands::Serve { port, bind } => {
            let app = App::build(require_valid(config, &report)?, tools)?;
            run_server(app, &bind, port).await?;
        }
    }

    Ok(())
}

async fn run_server(app: App, bind: &str, port: u16) -> Result<()> {
    let addr = format!("{bind}:{port}");
    info!(
        addr = %addr,
        app = app.config.app_name(),
        root = app.runner.agent().name(),
        "Starting adkit API"
    );

    let state = Arc::new(AppState {
        runner: app.runner,
        tools: app.tools,
    });
    let listener = TcpListener::bind(&addr).await?;
    info!(addr = %addr, "HTTP API listening");
    axum::serve(listener, api::build_router(state)).await?;
    Ok(())
}
