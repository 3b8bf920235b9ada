//! The response pipeline: generate, judge, regenerate once.
//!
//! 1. **Short-circuit** blank questions and override hits (no model calls)
//! 2. **Generate** a candidate answer with the primary model
//! 3. **Evaluate** it once with an independent judge model
//! 4. **If rejected**: rewrite once with the judge's feedback and return the
//!    rewrite without judging it again
//!
//! A judge that is unreachable or talks nonsense never blocks an answer: the
//! candidate goes out as-is.

pub mod controller;
pub mod evaluation;
pub mod generation;
pub mod overrides;
pub mod prompt;
pub mod regeneration;

#[cfg(test)]
mod test_helpers;

pub use controller::{ChatError, ChatOutcome, EMPTY_QUESTION_REPLY, ResponseController, ResponsePath};
pub use evaluation::{EvaluationClient, ParseError, Verdict, parse_verdict, verdict_response_format};
pub use generation::{CandidateAnswer, GenerationClient};
pub use overrides::{OverrideRule, OverrideRules, Trigger, pig_latin};
pub use prompt::{AssembledPrompt, Intent, PromptAssembler, format_history};
pub use regeneration::RegenerationStrategy;
