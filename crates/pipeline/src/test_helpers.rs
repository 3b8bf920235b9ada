//! Shared test helpers for pipeline tests.

use personachat_core::completion::TextCompletion;
use personachat_core::error::ProviderError;
use personachat_core::message::Message;
use std::collections::VecDeque;
use std::sync::Mutex;

/// A mock completion that returns a sequence of scripted results.
///
/// Each call to `complete` pops the next result and records the messages it
/// was given. Panics if more calls are made than results provided.
pub struct ScriptedCompletion {
    model: String,
    results: Mutex<VecDeque<Result<String, ProviderError>>>,
    requests: Mutex<Vec<Vec<Message>>>,
}

impl ScriptedCompletion {
    pub fn new(model: &str, results: Vec<Result<String, ProviderError>>) -> Self {
        Self {
            model: model.to_string(),
            results: Mutex::new(results.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// A completion that must never be called.
    pub fn unused(model: &str) -> Self {
        Self::new(model, vec![])
    }

    /// A completion that answers once with `text`.
    pub fn text(model: &str, text: &str) -> Self {
        Self::new(model, vec![Ok(text.to_string())])
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    /// Messages sent on call `index` (0-based).
    pub fn request(&self, index: usize) -> Vec<Message> {
        self.requests.lock().unwrap()[index].clone()
    }
}

#[async_trait::async_trait]
impl TextCompletion for ScriptedCompletion {
    fn model(&self) -> &str {
        &self.model
    }

    async fn complete(&self, messages: Vec<Message>) -> Result<String, ProviderError> {
        let mut requests = self.requests.lock().unwrap();
        let call = requests.len();
        requests.push(messages);

        self.results.lock().unwrap().pop_front().unwrap_or_else(|| {
            panic!(
                "ScriptedCompletion '{}': no more results (call #{})",
                self.model, call
            )
        })
    }
}

/// Judge reply in the structured JSON shape.
pub fn verdict_json(acceptable: bool, feedback: &str) -> String {
    serde_json::json!({ "is_acceptable": acceptable, "feedback": feedback }).to_string()
}
