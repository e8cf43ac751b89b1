pub mod error;
pub mod event;
pub mod message;
pub mod state;
pub mod tools;
pub mod traits;
pub mod types;

pub use error::AdkError;
pub use event::{Event, EventActions, USER_AUTHOR};
pub use message::{Content, FunctionResponse, Part, Role};
pub use state::{apply_delta, State, StateScope};
pub use tools::ToolRegistry;
pub use traits::{LlmProvider, LlmRequest, LlmResponse, Tool, ToolContext};
pub use types::{AgentConfig, ToolCall, ToolDeclaration, ToolResult, ToolStatus};
