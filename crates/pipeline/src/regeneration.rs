//! One corrective pass over a rejected answer.
//!
//! The corrected answer is never judged again: one generation, one verdict,
//! at most one rewrite.

use std::sync::Arc;

use personachat_core::error::ProviderError;
use personachat_core::message::ConversationTurn;
use tracing::debug;

use crate::generation::{CandidateAnswer, GenerationClient};
use crate::prompt::{Intent, PromptAssembler};

#[derive(Clone)]
pub struct RegenerationStrategy {
    generator: GenerationClient,
    prompts: Arc<PromptAssembler>,
}

impl RegenerationStrategy {
    pub fn new(generator: GenerationClient, prompts: Arc<PromptAssembler>) -> Self {
        Self { generator, prompts }
    }

    /// Rewrite `rejected` so that it addresses `feedback`. Calls the primary
    /// model exactly once.
    pub async fn regenerate(
        &self,
        question: &str,
        history: &[ConversationTurn],
        rejected: &CandidateAnswer,
        feedback: &str,
    ) -> Result<CandidateAnswer, ProviderError> {
        let prompt = self.prompts.assemble(
            Intent::Regeneration {
                rejected: &rejected.text,
                feedback,
            },
            question,
            history,
        );

        debug!(attempt = rejected.attempt + 1, "Regenerating rejected answer");
        let text = self.generator.generate(prompt.messages).await?;

        Ok(CandidateAnswer {
            text,
            attempt: rejected.attempt + 1,
        })
    }
}
