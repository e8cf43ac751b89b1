//! Telemetry and structured logging components for adkit.
//!
//! Handles log redaction, console and NDJSON file output, and agent event records.

pub mod event_logger;
pub mod logger;
pub mod redact;

pub use event_logger::{AgentEvent, EventLogEntry, EventLogger};
pub use logger::{LoggingOptions, init_logger};
pub use redact::redact_sensitive_data;
