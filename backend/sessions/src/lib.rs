//! Session state store.
//!
//! A session is an ordered list of events plus scoped state. `app:` and
//! `user:` keys are stored once per app / user and merged into every session
//! view; `temp:` keys are never persisted.

pub mod delta;
pub mod file;
pub mod memory;
pub mod service;
pub mod session;

pub use delta::{merged_state, strip_temp, ScopedDelta};
pub use file::FileSessionService;
pub use memory::InMemorySessionService;
pub use service::SessionService;
pub use session::{Session, SessionSummary};
