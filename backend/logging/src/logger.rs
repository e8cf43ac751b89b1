//! Structured Logger
//!
//! Wraps `tracing` with a console layer, an optional daily-rolling NDJSON
//! file and `RUST_LOG`-based level control.

use std::path::PathBuf;

use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

pub const LOG_FILE_PREFIX: &str = "adkit.log";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingOptions {
    /// Filter directive used when `RUST_LOG` is unset, e.g. `info` or `adkit_agent=debug`.
    pub level: String,
    /// Directory for `adkit.log.YYYY-MM-DD`; no file output when `None`.
    pub dir: Option<PathBuf>,
    /// Emit JSON lines on the console instead of human-readable text.
    pub json: bool,
}

impl Default for LoggingOptions {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            dir: None,
            json: false,
        }
    }
}

fn env_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Initialize the global structured logger.
///
/// Safe to call more than once; later calls are ignored. Console output goes
/// to stderr so command output on stdout stays clean.
pub fn init_logger(options: &LoggingOptions) {
    let json_console = options.json.then(|| {
        fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_ansi(false)
    });
    let text_console = (!options.json).then(|| {
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false)
    });

    let file_layer = options.dir.as_ref().map(|dir| {
        let appender = RollingFileAppender::new(Rotation::DAILY, dir, LOG_FILE_PREFIX);
        fmt::layer()
            .json()
            .with_writer(appender)
            .with_ansi(false)
    });

    let _ = tracing_subscriber::registry()
        .with(json_console)
        .with(text_console)
        .with(file_layer)
        .with(env_filter(&options.level))
        .try_init();
}
