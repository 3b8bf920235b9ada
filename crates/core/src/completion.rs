//! The text-completion capability used by the response pipeline.
//!
//! The pipeline depends on one small contract: messages in, text out. The
//! primary and judge models are two instances of it, each bound to its own
//! provider, model id and decoding settings through [`ModelEndpoint`].

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::error::ProviderError;
use crate::message::Message;
use crate::provider::{Provider, ProviderRequest, ResponseFormat};

/// Messages in, text out.
#[async_trait]
pub trait TextCompletion: Send + Sync {
    /// Identifier of the model behind this capability (for logs).
    fn model(&self) -> &str;

    /// Complete the conversation and return the raw text of the reply.
    async fn complete(&self, messages: Vec<Message>) -> Result<String, ProviderError>;
}

/// Fixed decoding settings for one deployment of a model.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodingSettings {
    pub temperature: f32,
    pub max_tokens: Option<u32>,
    pub response_format: Option<ResponseFormat>,
}

impl Default for DecodingSettings {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            max_tokens: Some(1000),
            response_format: None,
        }
    }
}

/// A provider bound to one model id and one set of decoding settings.
pub struct ModelEndpoint {
    provider: Arc<dyn Provider>,
    model: String,
    settings: DecodingSettings,
}

impl ModelEndpoint {
    pub fn new(provider: Arc<dyn Provider>, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
            settings: DecodingSettings::default(),
        }
    }

    /// Replace the decoding settings.
    pub fn with_settings(mut self, settings: DecodingSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Ask the vendor for structured output on every call.
    pub fn with_response_format(mut self, format: ResponseFormat) -> Self {
        self.settings.response_format = Some(format);
        self
    }
}

#[async_trait]
impl TextCompletion for ModelEndpoint {
    fn model(&self) -> &str {
        &self.model
    }

    async fn complete(&self, messages: Vec<Message>) -> Result<String, ProviderError> {
        let request = ProviderRequest {
            model: self.model.clone(),
            messages,
            temperature: self.settings.temperature,
            max_tokens: self.settings.max_tokens,
            response_format: self.settings.response_format.clone(),
            stop: vec![],
        };

        let response = self.provider.complete(request).await?;

        if let Some(usage) = &response.usage {
            debug!(
                provider = %self.provider.name(),
                model = %response.model,
                prompt_tokens = usage.prompt_tokens,
                completion_tokens = usage.completion_tokens,
                "Completion finished"
            );
        }

        Ok(response.message.content)
    }
}
