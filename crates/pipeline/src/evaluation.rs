//! Judge-model evaluation of candidate answers.
//!
//! The judge is asked for `{"is_acceptable": bool, "feedback": string}`.
//! Replies are parsed leniently (code fences, surrounding prose, a
//! `ACCEPTABLE:` / `FEEDBACK:` line format). A reply that still cannot be
//! decomposed into a verdict is treated as acceptable: a flaky judge must
//! never block an answer.

use std::sync::Arc;

use personachat_core::completion::TextCompletion;
use personachat_core::error::ProviderError;
use personachat_core::message::ConversationTurn;
use personachat_core::provider::ResponseFormat;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::prompt::{Intent, PromptAssembler};

/// Feedback used when the judge rejects without saying why.
pub const UNSPECIFIED_FEEDBACK: &str =
    "The response was judged unacceptable. Make it more professional, grounded in the profile, and relevant to the question.";

/// The judge's decision on one candidate answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verdict {
    pub acceptable: bool,
    /// Empty when acceptable.
    pub feedback: String,
}

impl Verdict {
    pub fn accept() -> Self {
        Self {
            acceptable: true,
            feedback: String::new(),
        }
    }

    /// A rejection always carries feedback for the regeneration prompt.
    pub fn reject(feedback: impl Into<String>) -> Self {
        let feedback = feedback.into().trim().to_string();
        Self {
            acceptable: false,
            feedback: if feedback.is_empty() {
                UNSPECIFIED_FEEDBACK.into()
            } else {
                feedback
            },
        }
    }

    fn from_parts(acceptable: bool, feedback: &str) -> Self {
        if acceptable {
            Self::accept()
        } else {
            Self::reject(feedback)
        }
    }
}

/// The judge's reply could not be decomposed into a verdict.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("judge reply is empty")]
    Empty,

    #[error("judge reply has no acceptability flag")]
    MissingFlag,

    #[error("unrecognised acceptability value: {0}")]
    InvalidFlag(String),
}

#[derive(Debug, Deserialize)]
struct RawVerdict {
    #[serde(alias = "acceptable", alias = "isAcceptable")]
    is_acceptable: Option<serde_json::Value>,
    #[serde(default)]
    feedback: Option<String>,
}

/// Parse a judge reply into a verdict.
pub fn parse_verdict(raw: &str) -> Result<Verdict, ParseError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(ParseError::Empty);
    }

    if let Some(verdict) = parse_json_verdict(raw)? {
        return Ok(verdict);
    }

    parse_line_verdict(raw)
}

/// Parse the first `{ ... }` span as JSON. `Ok(None)` when there is no JSON
/// object to look at.
fn parse_json_verdict(raw: &str) -> Result<Option<Verdict>, ParseError> {
    let (Some(start), Some(end)) = (raw.find('{'), raw.rfind('}')) else {
        return Ok(None);
    };
    if end < start {
        return Ok(None);
    }

    let Ok(parsed) = serde_json::from_str::<RawVerdict>(&raw[start..=end]) else {
        return Ok(None);
    };

    let flag = parsed.is_acceptable.ok_or(ParseError::MissingFlag)?;
    let (acceptable, reason) = match &flag {
        serde_json::Value::Bool(b) => (*b, ""),
        serde_json::Value::String(s) => parse_flag(s)?,
        other => return Err(ParseError::InvalidFlag(other.to_string())),
    };

    let feedback = parsed.feedback.as_deref().unwrap_or_default();
    Ok(Some(Verdict::from_parts(
        acceptable,
        if feedback.trim().is_empty() { reason } else { feedback },
    )))
}

/// `ACCEPTABLE: yes` / `FEEDBACK: ...` (feedback may span several lines).
fn parse_line_verdict(raw: &str) -> Result<Verdict, ParseError> {
    let mut acceptable = None;
    let mut reason = "";
    let mut feedback: Vec<&str> = Vec::new();
    let mut in_feedback = false;

    for line in raw.lines() {
        let trimmed = line.trim();
        if let Some(value) = strip_label(trimmed, "acceptable") {
            let (flag, rest) = parse_flag(value)?;
            acceptable = Some(flag);
            reason = rest;
            in_feedback = false;
        } else if let Some(value) = strip_label(trimmed, "feedback") {
            feedback.push(value);
            in_feedback = true;
        } else if in_feedback {
            feedback.push(trimmed);
        }
    }

    let acceptable = acceptable.ok_or(ParseError::MissingFlag)?;
    let feedback = feedback.join("\n");
    let feedback = feedback.trim();
    Ok(Verdict::from_parts(
        acceptable,
        if feedback.is_empty() { reason } else { feedback },
    ))
}

/// Case-insensitive `label:` prefix match, tolerating markdown bold.
fn strip_label<'a>(line: &'a str, label: &str) -> Option<&'a str> {
    let line = line.trim_start_matches(['*', '#', ' ']);
    let (head, rest) = line.split_once(':')?;
    let head = head.trim().trim_end_matches('*').trim();
    if head.eq_ignore_ascii_case(label) || head.eq_ignore_ascii_case(&format!("is_{label}")) {
        Some(rest.trim_start_matches('*').trim())
    } else {
        None
    }
}

/// Read the flag from the leading word of `value`. Whatever follows it
/// (`No, the tone is too informal.`) comes back as the reason.
fn parse_flag(value: &str) -> Result<(bool, &str), ParseError> {
    let value = value.trim().trim_matches(['"', '\'', '*']);
    let end = value
        .find(|c: char| !c.is_ascii_alphabetic())
        .unwrap_or(value.len());
    let (word, rest) = value.split_at(end);

    let acceptable = match word.to_ascii_lowercase().as_str() {
        "true" | "yes" | "acceptable" | "pass" => true,
        "false" | "no" | "not" | "unacceptable" | "fail" => false,
        _ => return Err(ParseError::InvalidFlag(value.to_ascii_lowercase())),
    };
    let reason = rest.trim_start_matches(|c: char| c.is_ascii_punctuation() || c.is_whitespace());
    Ok((acceptable, reason.trim_end()))
}

/// JSON schema asked of vendors that support structured output.
pub fn verdict_response_format() -> ResponseFormat {
    ResponseFormat::JsonSchema {
        name: "evaluation".into(),
        schema: serde_json::json!({
            "type": "object",
            "properties": {
                "is_acceptable": { "type": "boolean" },
                "feedback": { "type": "string" }
            },
            "required": ["is_acceptable", "feedback"],
            "additionalProperties": false
        }),
    }
}

/// Calls the judge model. Independent from the primary model by construction:
/// it holds its own completion endpoint.
#[derive(Clone)]
pub struct EvaluationClient {
    judge: Arc<dyn TextCompletion>,
    prompts: Arc<PromptAssembler>,
}

impl EvaluationClient {
    pub fn new(judge: Arc<dyn TextCompletion>, prompts: Arc<PromptAssembler>) -> Self {
        Self { judge, prompts }
    }

    pub fn model(&self) -> &str {
        self.judge.model()
    }

    /// Judge `candidate` as an answer to `question`.
    ///
    /// Transport failures are returned as errors; unparseable replies come
    /// back as an acceptable verdict.
    pub async fn evaluate(
        &self,
        question: &str,
        history: &[ConversationTurn],
        candidate: &str,
    ) -> Result<Verdict, ProviderError> {
        let prompt = self
            .prompts
            .assemble(Intent::Evaluation { candidate }, question, history);

        debug!(model = %self.judge.model(), "Requesting verdict");
        let raw = self.judge.complete(prompt.messages).await?;

        match parse_verdict(&raw) {
            Ok(verdict) => Ok(verdict),
            Err(e) => {
                warn!(
                    model = %self.judge.model(),
                    error = %e,
                    reply = %raw.chars().take(200).collect::<String>(),
                    "Unparseable verdict, accepting answer"
                );
                Ok(Verdict::accept())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{ScriptedCompletion, verdict_json};
    use personachat_core::profile::ProfileContext;

    fn client(judge: Arc<ScriptedCompletion>) -> EvaluationClient {
        let prompts = Arc::new(PromptAssembler::new(Arc::new(ProfileContext::new(
            "Ada", "Mathematician.", "",
        ))));
        EvaluationClient::new(judge, prompts)
    }

    #[test]
    fn parses_plain_json() {
        let v = parse_verdict(r#"{"is_acceptable": true, "feedback": "Great answer"}"#).unwrap();
        assert_eq!(v, Verdict::accept());
    }

    #[test]
    fn acceptable_verdict_drops_feedback() {
        let v = parse_verdict(&verdict_json(true, "Nice and concise")).unwrap();
        assert!(v.acceptable);
        assert!(v.feedback.is_empty());
    }

    #[test]
    fn parses_fenced_json_with_prose() {
        let raw = "Here is my evaluation:\n```json\n{\"acceptable\": false, \"feedback\": \"too informal\"}\n```";
        let v = parse_verdict(raw).unwrap();
        assert_eq!(v, Verdict::reject("too informal"));
    }

    #[test]
    fn parses_string_flag() {
        let v = parse_verdict(r#"{"is_acceptable": "no", "feedback": "off-topic"}"#).unwrap();
        assert!(!v.acceptable);
        assert_eq!(v.feedback, "off-topic");
    }

    #[test]
    fn parses_line_format() {
        let raw = "**Acceptable:** no\n**Feedback:** The answer invents a degree.\nIt also rambles.";
        let v = parse_verdict(raw).unwrap();
        assert!(!v.acceptable);
        assert_eq!(v.feedback, "The answer invents a degree.\nIt also rambles.");
    }

    #[test]
    fn flag_followed_by_a_reason_reads_the_leading_word() {
        let v = parse_verdict("ACCEPTABLE: No, the tone is too informal.").unwrap();
        assert_eq!(v, Verdict::reject("the tone is too informal."));

        let v = parse_verdict(r#"{"is_acceptable": "no - too casual", "feedback": ""}"#).unwrap();
        assert_eq!(v, Verdict::reject("too casual"));

        let v = parse_verdict(r#"{"is_acceptable": "Yes.", "feedback": "fine"}"#).unwrap();
        assert!(v.acceptable);
    }

    #[test]
    fn explicit_feedback_wins_over_the_flag_reason() {
        let raw = "Acceptable: no, too casual\nFeedback: Drop the slang and cite the thesis.";
        let v = parse_verdict(raw).unwrap();
        assert_eq!(v, Verdict::reject("Drop the slang and cite the thesis."));
    }

    #[test]
    fn rejection_without_feedback_gets_generic_reason() {
        let v = parse_verdict(r#"{"is_acceptable": false}"#).unwrap();
        assert!(!v.acceptable);
        assert_eq!(v.feedback, UNSPECIFIED_FEEDBACK);
    }

    #[test]
    fn unparseable_replies_are_errors() {
        assert_eq!(parse_verdict("   "), Err(ParseError::Empty));
        assert_eq!(
            parse_verdict("Looks fine to me!"),
            Err(ParseError::MissingFlag)
        );
        assert_eq!(
            parse_verdict(r#"{"feedback": "ok"}"#),
            Err(ParseError::MissingFlag)
        );
        assert!(matches!(
            parse_verdict(r#"{"is_acceptable": 3}"#),
            Err(ParseError::InvalidFlag(_))
        ));
        assert!(matches!(
            parse_verdict("Acceptable: maybe"),
            Err(ParseError::InvalidFlag(_))
        ));
    }

    #[test]
    fn response_format_requires_both_fields() {
        let ResponseFormat::JsonSchema { schema, .. } = verdict_response_format() else {
            panic!("expected a JSON schema");
        };
        assert_eq!(schema["required"], serde_json::json!(["is_acceptable", "feedback"]));
    }

    #[tokio::test]
    async fn evaluate_sends_judge_prompt() {
        let judge = Arc::new(ScriptedCompletion::text("judge", &verdict_json(false, "too informal")));
        let verdict = client(judge.clone())
            .evaluate("What is your experience?", &[], "lol lots")
            .await
            .unwrap();

        assert_eq!(verdict, Verdict::reject("too informal"));
        assert_eq!(judge.call_count(), 1);
        let sent = judge.request(0);
        assert!(sent[0].content.contains("You are an evaluator"));
        assert!(sent[1].content.contains("lol lots"));
        assert!(sent[1].content.contains("No previous conversation."));
    }

    #[tokio::test]
    async fn unparseable_reply_fails_open() {
        let judge = Arc::new(ScriptedCompletion::text("judge", "I cannot decide."));
        let verdict = client(judge).evaluate("q", &[], "a").await.unwrap();
        assert_eq!(verdict, Verdict::accept());
    }

    #[tokio::test]
    async fn rejection_with_trailing_reason_is_not_failed_open() {
        let judge = Arc::new(ScriptedCompletion::text(
            "judge",
            "ACCEPTABLE: No, the tone is too informal.",
        ));
        let verdict = client(judge).evaluate("q", &[], "lol").await.unwrap();
        assert!(!verdict.acceptable);
        assert_eq!(verdict.feedback, "the tone is too informal.");
    }

    #[tokio::test]
    async fn transport_error_is_returned() {
        let judge = Arc::new(ScriptedCompletion::new(
            "judge",
            vec![Err(ProviderError::RateLimited { retry_after_secs: 5 })],
        ));
        let err = client(judge).evaluate("q", &[], "a").await.unwrap_err();
        assert!(matches!(err, ProviderError::RateLimited { .. }));
    }
}
