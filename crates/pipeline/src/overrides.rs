//! Fixed replies that short-circuit the pipeline.
//!
//! An ordered list of (trigger, fixed response) rules checked before any
//! model call. The first matching rule wins and its text is returned as-is.
//! This is deliberately not a rule engine: triggers are keyword sets or a
//! plain predicate.

use std::fmt;
use std::sync::Arc;

use personachat_config::OverrideConfig;

/// Deflection used for rules configured without a response of their own.
/// `{name}` is replaced with the persona name before stylizing.
pub const DEFAULT_DEFLECTION: &str = "Thank you for asking about that topic. \
     It is something I prefer to discuss directly, so please contact {name} for details.";

/// What makes a rule fire.
#[derive(Clone)]
pub enum Trigger {
    /// Case-insensitive substring match on any keyword.
    Keywords(Vec<String>),
    /// Arbitrary test on the raw question.
    Predicate(Arc<dyn Fn(&str) -> bool + Send + Sync>),
}

impl Trigger {
    pub fn keywords<I, S>(keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self::Keywords(
            keywords
                .into_iter()
                .map(|k| k.as_ref().trim().to_lowercase())
                .filter(|k| !k.is_empty())
                .collect(),
        )
    }

    pub fn matches(&self, question: &str) -> bool {
        match self {
            Trigger::Keywords(keywords) => {
                let question = question.to_lowercase();
                keywords.iter().any(|k| question.contains(k.as_str()))
            }
            Trigger::Predicate(predicate) => predicate(question),
        }
    }
}

impl fmt::Debug for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Trigger::Keywords(k) => f.debug_tuple("Keywords").field(k).finish(),
            Trigger::Predicate(_) => f.write_str("Predicate(..)"),
        }
    }
}

/// One short-circuit rule.
#[derive(Debug, Clone)]
pub struct OverrideRule {
    pub name: String,
    pub trigger: Trigger,
    pub response: String,
}

impl OverrideRule {
    pub fn new(name: impl Into<String>, trigger: Trigger, response: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            trigger,
            response: response.into(),
        }
    }

    /// Questions about patents get a fixed pig-latin deflection.
    pub fn patents(persona_name: &str) -> Self {
        Self::new(
            "patents",
            Trigger::keywords(["patent"]),
            pig_latin(&DEFAULT_DEFLECTION.replace("{name}", persona_name)),
        )
    }

    /// Build a rule from config. A missing response renders the default
    /// deflection in pig latin.
    pub fn from_config(config: &OverrideConfig, persona_name: &str) -> Self {
        let response = config
            .response
            .clone()
            .unwrap_or_else(|| pig_latin(&DEFAULT_DEFLECTION.replace("{name}", persona_name)));
        Self::new(&config.name, Trigger::keywords(&config.keywords), response)
    }
}

/// Ordered rules; first match wins.
#[derive(Debug, Clone, Default)]
pub struct OverrideRules {
    rules: Vec<OverrideRule>,
}

impl OverrideRules {
    pub fn new(rules: Vec<OverrideRule>) -> Self {
        Self { rules }
    }

    pub fn from_config(configs: &[OverrideConfig], persona_name: &str) -> Self {
        Self::new(
            configs
                .iter()
                .map(|c| OverrideRule::from_config(c, persona_name))
                .collect(),
        )
    }

    pub fn first_match(&self, question: &str) -> Option<&OverrideRule> {
        self.rules.iter().find(|r| r.trigger.matches(question))
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

/// Render English text in pig latin, keeping punctuation and capitalization.
pub fn pig_latin(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + text.len() / 2);
    let mut word = String::new();

    for c in text.chars() {
        if c.is_ascii_alphabetic() {
            word.push(c);
        } else {
            if !word.is_empty() {
                out.push_str(&pig_latin_word(&word));
                word.clear();
            }
            out.push(c);
        }
    }
    if !word.is_empty() {
        out.push_str(&pig_latin_word(&word));
    }

    out
}

fn pig_latin_word(word: &str) -> String {
    let chars: Vec<char> = word.chars().collect();
    let is_vowel = |c: char| matches!(c.to_ascii_lowercase(), 'a' | 'e' | 'i' | 'o' | 'u');

    if is_vowel(chars[0]) {
        return format!("{word}way");
    }

    // Leading consonant cluster; "qu" sticks together, "y" after the first
    // letter acts as a vowel.
    let mut split = 0;
    while split < chars.len() {
        let c = chars[split];
        if is_vowel(c) || (split > 0 && c.eq_ignore_ascii_case(&'y')) {
            break;
        }
        if c.eq_ignore_ascii_case(&'q')
            && chars.get(split + 1).is_some_and(|n| n.eq_ignore_ascii_case(&'u'))
        {
            split += 2;
            break;
        }
        split += 1;
    }

    if split >= chars.len() {
        return format!("{word}ay");
    }

    let capitalized = chars[0].is_ascii_uppercase();
    let mut result: String = chars[split..]
        .iter()
        .chain(chars[..split].iter())
        .map(|c| if capitalized { c.to_ascii_lowercase() } else { *c })
        .collect();
    result.push_str("ay");

    if capitalized {
        let mut letters = result.chars();
        if let Some(first) = letters.next() {
            return first.to_ascii_uppercase().to_string() + letters.as_str();
        }
    }
    result
}
