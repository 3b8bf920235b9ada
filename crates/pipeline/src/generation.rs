//! The only component that talks to the primary model.

use std::sync::Arc;

use personachat_core::completion::TextCompletion;
use personachat_core::error::ProviderError;
use personachat_core::message::Message;
use tracing::debug;

/// An answer produced by the primary model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateAnswer {
    pub text: String,
    /// 1 for the first generation, 2 for the regenerated answer.
    pub attempt: u32,
}

impl CandidateAnswer {
    pub fn first(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            attempt: 1,
        }
    }
}

/// Calls the primary model with assembled messages.
#[derive(Clone)]
pub struct GenerationClient {
    completion: Arc<dyn TextCompletion>,
}

impl GenerationClient {
    pub fn new(completion: Arc<dyn TextCompletion>) -> Self {
        Self { completion }
    }

    pub fn model(&self) -> &str {
        self.completion.model()
    }

    /// Generate answer text. A blank reply counts as an upstream failure.
    pub async fn generate(&self, messages: Vec<Message>) -> Result<String, ProviderError> {
        debug!(model = %self.completion.model(), messages = messages.len(), "Generating answer");

        let text = self.completion.complete(messages).await?;
        let text = text.trim();
        if text.is_empty() {
            return Err(ProviderError::EmptyResponse(format!(
                "model '{}' returned blank text",
                self.completion.model()
            )));
        }

        Ok(text.to_string())
    }
}
