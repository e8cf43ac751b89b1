//! LLM providers for adkit.
//!
//! The hosted model is an external collaborator; this crate only speaks its
//! wire format and maps it to the core `Content` model.

pub mod providers;

pub use providers::gemini::GeminiProvider;
pub use providers::mock::ScriptedProvider;
pub use providers::ProviderRegistry;
