//! Prompt assembly for the three model calls of a request.
//!
//! Every prompt embeds the same profile text. What differs is the system
//! instruction and what goes in the message list:
//!
//! | intent | system instruction | messages |
//! |---|---|---|
//! | generation | persona + profile | history, question |
//! | evaluation | judge rubric + profile | one transcript message |
//! | regeneration | persona + profile + rejected answer + feedback | history, question |
//!
//! Assembly is pure: identical inputs always produce identical prompts.

use std::sync::Arc;

use personachat_core::message::{ConversationTurn, Message};
use personachat_core::profile::ProfileContext;

/// What the assembled prompt is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent<'a> {
    /// First answer from the primary model.
    Generation,
    /// Judge the candidate answer.
    Evaluation { candidate: &'a str },
    /// Rewrite a rejected answer using the judge's feedback.
    Regeneration { rejected: &'a str, feedback: &'a str },
}

/// A system instruction plus the full ordered message list.
#[derive(Debug, Clone)]
pub struct AssembledPrompt {
    pub system: String,
    pub messages: Vec<Message>,
}

/// Builds prompts from a shared, read-only profile.
#[derive(Debug, Clone)]
pub struct PromptAssembler {
    profile: Arc<ProfileContext>,
    persona_prompt: String,
    judge_prompt: String,
}

impl PromptAssembler {
    pub fn new(profile: Arc<ProfileContext>) -> Self {
        let persona_prompt = Self::build_persona_prompt(&profile);
        let judge_prompt = Self::build_judge_prompt(&profile);
        Self {
            profile,
            persona_prompt,
            judge_prompt,
        }
    }

    pub fn profile(&self) -> &ProfileContext {
        &self.profile
    }

    /// System instruction for answering as the persona.
    pub fn persona_prompt(&self) -> &str {
        &self.persona_prompt
    }

    /// System instruction for the judge.
    pub fn judge_prompt(&self) -> &str {
        &self.judge_prompt
    }

    /// Assemble the prompt for one model call.
    pub fn assemble(
        &self,
        intent: Intent<'_>,
        question: &str,
        history: &[ConversationTurn],
    ) -> AssembledPrompt {
        match intent {
            Intent::Generation => {
                let system = self.persona_prompt.clone();
                let messages = Self::chat_messages(&system, question, history);
                AssembledPrompt { system, messages }
            }
            Intent::Evaluation { candidate } => {
                let system = self.judge_prompt.clone();
                let transcript = Self::evaluation_request(question, history, candidate);
                let messages = vec![Message::system(&system), Message::user(transcript)];
                AssembledPrompt { system, messages }
            }
            Intent::Regeneration { rejected, feedback } => {
                let system = self.regeneration_prompt(rejected, feedback);
                let messages = Self::chat_messages(&system, question, history);
                AssembledPrompt { system, messages }
            }
        }
    }

    /// Persona prompt extended with the rejected answer and the judge's reason.
    fn regeneration_prompt(&self, rejected: &str, feedback: &str) -> String {
        format!(
            "{}\n\n## Previous answer rejected\n\
             You just tried to reply, but the quality control rejected your reply.\n\
             ## Your attempted answer:\n{}\n\n\
             ## Reason for rejection:\n{}\n\n\
             Please provide a better response that addresses the feedback.",
            self.persona_prompt, rejected, feedback
        )
    }

    /// system + history + current question
    fn chat_messages(system: &str, question: &str, history: &[ConversationTurn]) -> Vec<Message> {
        let mut messages = Vec::with_capacity(history.len() + 2);
        messages.push(Message::system(system));
        messages.extend(history.iter().map(ConversationTurn::to_message));
        messages.push(Message::user(question));
        messages
    }

    fn evaluation_request(question: &str, history: &[ConversationTurn], candidate: &str) -> String {
        format!(
            "Here's the conversation between the User and the Agent:\n\n{}\n\n\
             Here's the latest message from the User:\n\n{}\n\n\
             Here's the latest response from the Agent:\n\n{}\n\n\
             Please evaluate the response, replying with whether it is acceptable and your feedback.",
            format_history(history),
            question,
            candidate
        )
    }

    fn build_persona_prompt(profile: &ProfileContext) -> String {
        let name = &profile.name;
        let mut prompt = format!(
            "You are acting as {name}. You are answering questions on {name}'s website, \
             particularly questions related to {name}'s career, background, skills and experience. \
             Your responsibility is to represent {name} for interactions on the website as faithfully as possible. \
             You are given a summary of {name}'s background and profile which you can use to answer questions. \
             Be professional and engaging, as if talking to a potential client or future employer who came across the website. \
             Speak in the first person and keep answers concise. \
             Do not speculate about facts that are not in the profile: if you don't know the answer, \
             say so politely and suggest they contact {name} directly."
        );
        push_profile_sections(&mut prompt, profile);
        prompt.push_str(&format!(
            "\n\nWith this context, please chat with the user, always staying in character as {name}."
        ));
        prompt
    }

    fn build_judge_prompt(profile: &ProfileContext) -> String {
        let name = &profile.name;
        let mut prompt = format!(
            "You are an evaluator that decides whether a response to a question is acceptable quality. \
             You are provided with a conversation between a User and an Agent. \
             Your task is to decide whether the Agent's latest response is acceptable. \
             The Agent is playing the role of {name} and is representing {name} on their website. \
             The Agent has been instructed to be professional and engaging, as if talking to a potential client or future employer. \
             Judge the response on three things: professionalism of tone, factual grounding in the \
             information below (no invented claims), and relevance to the User's question. \
             The Agent has been provided with context on {name}. Here's the information:"
        );
        push_profile_sections(&mut prompt, profile);
        prompt.push_str(
            "\n\nWith this context, please evaluate the latest response. \
             Reply with a JSON object only, in the form \
             {\"is_acceptable\": true|false, \"feedback\": \"...\"}. \
             When the response is not acceptable, the feedback must name the specific problem.",
        );
        prompt
    }
}

/// Append the `## Summary` and `## Profile` sections, each only when present.
fn push_profile_sections(prompt: &mut String, profile: &ProfileContext) {
    if !profile.summary.is_empty() {
        prompt.push_str("\n\n## Summary:\n");
        prompt.push_str(&profile.summary);
    }
    if !profile.document.is_empty() {
        prompt.push_str("\n\n## Profile:\n");
        prompt.push_str(&profile.document);
    }
}

/// Render a history as a plain transcript for the judge.
pub fn format_history(history: &[ConversationTurn]) -> String {
    if history.is_empty() {
        return "No previous conversation.".into();
    }

    history
        .iter()
        .map(|turn| format!("{}: {}", turn.role.label(), turn.content))
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use personachat_core::message::Role;

    fn assembler() -> PromptAssembler {
        PromptAssembler::new(Arc::new(ProfileContext::new(
            "Ada Lovelace",
            "Mathematician and writer.",
            "Experience\n- Analytical Engine notes, 1843",
        )))
    }

    fn history() -> Vec<ConversationTurn> {
        vec![
            ConversationTurn::user("Hi"),
            ConversationTurn::assistant("Hello! Ask me anything."),
        ]
    }

    #[test]
    fn persona_prompt_embeds_profile_and_rules() {
        let a = assembler();
        let prompt = a.persona_prompt();
        assert!(prompt.starts_with("You are acting as Ada Lovelace."));
        assert!(prompt.contains("## Summary:\nMathematician and writer."));
        assert!(prompt.contains("## Profile:\nExperience"));
        assert!(prompt.contains("first person"));
        assert!(prompt.contains("contact Ada Lovelace directly"));
        assert!(prompt.ends_with("always staying in character as Ada Lovelace."));
    }

    #[test]
    fn empty_sections_are_omitted() {
        let a = PromptAssembler::new(Arc::new(ProfileContext::new("Ada", "", "")));
        assert!(!a.persona_prompt().contains("## Summary"));
        assert!(!a.judge_prompt().contains("## Profile"));
    }

    #[test]
    fn generation_messages_order() {
        let a = assembler();
        let prompt = a.assemble(Intent::Generation, "What is your experience?", &history());

        assert_eq!(prompt.messages.len(), 4);
        assert_eq!(prompt.messages[0].role, Role::System);
        assert_eq!(prompt.messages[0].content, a.persona_prompt());
        assert_eq!(prompt.messages[1].role, Role::User);
        assert_eq!(prompt.messages[2].role, Role::Assistant);
        assert_eq!(prompt.messages[3].role, Role::User);
        assert_eq!(prompt.messages[3].content, "What is your experience?");
    }

    #[test]
    fn evaluation_prompt_contains_transcript() {
        let a = assembler();
        let prompt = a.assemble(
            Intent::Evaluation {
                candidate: "I wrote the first program.",
            },
            "What did you build?",
            &history(),
        );

        assert_eq!(prompt.system, a.judge_prompt());
        assert!(prompt.system.contains("is_acceptable"));
        assert!(prompt.system.contains("## Summary:"));
        assert_eq!(prompt.messages.len(), 2);
        let body = &prompt.messages[1].content;
        assert!(body.contains("User: Hi\n\nAssistant: Hello! Ask me anything."));
        assert!(body.contains("latest message from the User:\n\nWhat did you build?"));
        assert!(body.contains("latest response from the Agent:\n\nI wrote the first program."));
    }

    #[test]
    fn regeneration_prompt_carries_rejection() {
        let a = assembler();
        let prompt = a.assemble(
            Intent::Regeneration {
                rejected: "yo i did stuff",
                feedback: "too informal",
            },
            "What is your experience?",
            &[],
        );

        assert!(prompt.system.starts_with(a.persona_prompt()));
        assert!(prompt.system.contains("## Your attempted answer:\nyo i did stuff"));
        assert!(prompt.system.contains("## Reason for rejection:\ntoo informal"));
        assert_eq!(prompt.messages.len(), 2);
        assert_eq!(prompt.messages[0].content, prompt.system);
        assert_eq!(prompt.messages[1].content, "What is your experience?");
    }

    #[test]
    fn empty_history_formats_placeholder() {
        assert_eq!(format_history(&[]), "No previous conversation.");
    }

    #[test]
    fn assembly_is_deterministic() {
        let a = assembler();
        let first = a.assemble(Intent::Generation, "q", &history());
        let second = a.assemble(Intent::Generation, "q", &history());
        assert_eq!(first.system, second.system);
        let contents = |p: &AssembledPrompt| {
            p.messages.iter().map(|m| m.content.clone()).collect::<Vec<_>>()
        };
        assert_eq!(contents(&first), contents(&second));
    }
}
