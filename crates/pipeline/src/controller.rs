//! The response controller: one request through the pipeline.
//!
//! ```text
//! START → GENERATED → EVALUATED → {ACCEPTED | REGENERATING} → DONE
//! ```
//!
//! Blank questions and override hits return before any model call. After
//! that the primary model is called once, the judge once, and, only when the
//! judge rejects, the primary model once more. The regenerated answer is
//! returned without being judged, so a request costs at most three calls.

use std::sync::Arc;

use personachat_config::{AppConfig, ModelConfig};
use personachat_core::completion::{DecodingSettings, ModelEndpoint, TextCompletion};
use personachat_core::error::ProviderError;
use personachat_core::message::ConversationTurn;
use personachat_core::profile::ProfileContext;
use personachat_providers::build_provider;
use serde::Serialize;
use tracing::{error, info, warn};

use crate::evaluation::{EvaluationClient, verdict_response_format};
use crate::generation::{CandidateAnswer, GenerationClient};
use crate::overrides::OverrideRules;
use crate::prompt::{Intent, PromptAssembler};
use crate::regeneration::RegenerationStrategy;

/// Reply to a blank question.
pub const EMPTY_QUESTION_REPLY: &str =
    "Please ask me a question about my background, experience, or skills!";

/// The only error a request surfaces: the first generation failed.
#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("answer generation failed: {0}")]
    Generation(#[from] ProviderError),
}

/// How a reply was produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ResponsePath {
    /// Blank question, answered with a fixed nudge.
    EmptyQuestion,
    /// An override rule matched.
    Override { rule: String },
    /// The judge accepted the first answer.
    Accepted,
    /// The judge could not be reached; the first answer went out unjudged.
    AcceptedFailOpen { reason: String },
    /// The judge rejected and the rewrite succeeded.
    Regenerated { feedback: String },
    /// The judge rejected, the rewrite failed, the first answer went out.
    RegenerationFailed { feedback: String },
}

/// The reply plus how it was produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatOutcome {
    pub reply: String,
    pub path: ResponsePath,
    /// Model calls spent on this request (0 to 3).
    pub model_calls: u32,
}

impl ChatOutcome {
    fn new(reply: impl Into<String>, path: ResponsePath, model_calls: u32) -> Self {
        Self {
            reply: reply.into(),
            path,
            model_calls,
        }
    }
}

/// Drives a question through override check, generation, evaluation and at
/// most one regeneration.
///
/// Holds no per-request state; share it behind an `Arc`.
#[derive(Clone)]
pub struct ResponseController {
    prompts: Arc<PromptAssembler>,
    generator: GenerationClient,
    evaluator: EvaluationClient,
    regenerator: RegenerationStrategy,
    overrides: OverrideRules,
}

impl ResponseController {
    pub fn new(
        profile: Arc<ProfileContext>,
        primary: Arc<dyn TextCompletion>,
        judge: Arc<dyn TextCompletion>,
        overrides: OverrideRules,
    ) -> Self {
        let prompts = Arc::new(PromptAssembler::new(profile));
        let generator = GenerationClient::new(primary);
        Self {
            evaluator: EvaluationClient::new(judge, prompts.clone()),
            regenerator: RegenerationStrategy::new(generator.clone(), prompts.clone()),
            generator,
            prompts,
            overrides,
        }
    }

    /// Wire up the primary and judge endpoints described by `config`.
    ///
    /// Fails with `NotConfigured` when either model lacks credentials.
    pub fn from_config(
        config: &AppConfig,
        profile: Arc<ProfileContext>,
    ) -> Result<Self, ProviderError> {
        let primary = ModelEndpoint::new(build_provider(config, &config.primary)?, &config.primary.model)
            .with_settings(decoding_settings(&config.primary));

        let mut judge = ModelEndpoint::new(build_provider(config, &config.judge)?, &config.judge.model)
            .with_settings(decoding_settings(&config.judge));
        if config.judge.structured_output {
            judge = judge.with_response_format(verdict_response_format());
        }

        let overrides = OverrideRules::from_config(&config.overrides, &profile.name);
        info!(
            persona = %profile.name,
            primary = %config.primary.model,
            judge = %config.judge.model,
            overrides = overrides.len(),
            "Response pipeline ready"
        );

        Ok(Self::new(profile, Arc::new(primary), Arc::new(judge), overrides))
    }

    pub fn profile(&self) -> &ProfileContext {
        self.prompts.profile()
    }

    pub fn primary_model(&self) -> &str {
        self.generator.model()
    }

    pub fn judge_model(&self) -> &str {
        self.evaluator.model()
    }

    /// Answer `question` and return only the reply text.
    pub async fn chat(
        &self,
        question: &str,
        history: &[ConversationTurn],
    ) -> Result<String, ChatError> {
        self.respond(question, history).await.map(|o| o.reply)
    }

    /// Answer `question` and report how the reply was produced.
    pub async fn respond(
        &self,
        question: &str,
        history: &[ConversationTurn],
    ) -> Result<ChatOutcome, ChatError> {
        if question.trim().is_empty() {
            return Ok(ChatOutcome::new(
                EMPTY_QUESTION_REPLY,
                ResponsePath::EmptyQuestion,
                0,
            ));
        }

        if let Some(rule) = self.overrides.first_match(question) {
            info!(rule = %rule.name, "Override matched, skipping models");
            return Ok(ChatOutcome::new(
                rule.response.clone(),
                ResponsePath::Override {
                    rule: rule.name.clone(),
                },
                0,
            ));
        }

        // GENERATED
        let prompt = self
            .prompts
            .assemble(Intent::Generation, question, history);
        let candidate = match self.generator.generate(prompt.messages).await {
            Ok(text) => CandidateAnswer::first(text),
            Err(e) => {
                error!(model = %self.generator.model(), error = %e, "Generation failed");
                return Err(ChatError::Generation(e));
            }
        };

        // EVALUATED
        let verdict = match self
            .evaluator
            .evaluate(question, history, &candidate.text)
            .await
        {
            Ok(verdict) => verdict,
            Err(e) => {
                warn!(model = %self.evaluator.model(), error = %e, "Judge unavailable, accepting answer");
                return Ok(ChatOutcome::new(
                    candidate.text,
                    ResponsePath::AcceptedFailOpen {
                        reason: e.to_string(),
                    },
                    2,
                ));
            }
        };

        if verdict.acceptable {
            info!("Answer passed evaluation");
            return Ok(ChatOutcome::new(candidate.text, ResponsePath::Accepted, 2));
        }

        // REGENERATING
        info!(feedback = %verdict.feedback, "Answer failed evaluation, regenerating");
        match self
            .regenerator
            .regenerate(question, history, &candidate, &verdict.feedback)
            .await
        {
            Ok(better) => Ok(ChatOutcome::new(
                better.text,
                ResponsePath::Regenerated {
                    feedback: verdict.feedback,
                },
                3,
            )),
            Err(e) => {
                warn!(error = %e, "Regeneration failed, returning original answer");
                Ok(ChatOutcome::new(
                    candidate.text,
                    ResponsePath::RegenerationFailed {
                        feedback: verdict.feedback,
                    },
                    3,
                ))
            }
        }
    }
}

fn decoding_settings(model: &ModelConfig) -> DecodingSettings {
    DecodingSettings {
        temperature: model.temperature,
        max_tokens: Some(model.max_tokens),
        response_format: None,
    }
}
