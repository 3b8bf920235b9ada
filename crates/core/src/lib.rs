//! # PersonaChat Core
//!
//! Domain types, traits, and error definitions for the PersonaChat response
//! pipeline. Every other crate depends inward on this one.
//!
//! The two seams that matter:
//! - [`Provider`] - a vendor backend (HTTP wire format, auth)
//! - [`TextCompletion`] - the capability the pipeline consumes: messages in,
//!   text out. [`ModelEndpoint`] binds a provider to a model and decoding
//!   settings to produce one.

pub mod completion;
pub mod error;
pub mod message;
pub mod profile;
pub mod provider;

// Re-export key types at crate root for ergonomics
pub use completion::{DecodingSettings, ModelEndpoint, TextCompletion};
pub use error::{ProfileError, ProviderError};
pub use message::{ConversationTurn, Message, Role, TurnRole};
pub use profile::{ProfileContext, ProfileSources};
pub use provider::{Provider, ProviderRequest, ProviderResponse, ResponseFormat, Usage};
