//! LLM Provider implementations for PersonaChat.
//!
//! All providers implement the `personachat_core::Provider` trait.
//! [`build_provider`] turns a configured model deployment into one.

pub mod openai_compat;
pub mod router;

pub use openai_compat::OpenAiCompatProvider;
pub use router::{build_provider, default_base_url};
