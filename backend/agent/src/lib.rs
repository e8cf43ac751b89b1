//! adkit Agent Runtime
//!
//! Tool dispatch, model-driven agents, sequential/parallel/loop composition
//! and the runner that drives one invocation against a session store.

pub mod agent;
pub mod callbacks;
pub mod context;
pub mod dispatcher;
pub mod llm_agent;
pub mod orchestrator;
pub mod runner;
pub mod template;

pub use agent::{Agent, find_agent};
pub use callbacks::{AgentCallback, CallbackChain, CallbackContext};
pub use context::InvocationContext;
pub use dispatcher::{ToolDispatcher, validate_arguments};
pub use llm_agent::{LlmAgent, StepResult};
pub use orchestrator::{LoopAgent, ParallelAgent, SequentialAgent};
pub use runner::{RunOutcome, Runner};
pub use template::render_instruction;
