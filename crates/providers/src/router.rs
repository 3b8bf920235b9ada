//! Provider construction - turns a model deployment from config into a
//! concrete provider.
//!
//! The primary and judge deployments are built independently, so they can
//! point at different vendors with different credentials.

use std::sync::Arc;
use std::time::Duration;

use personachat_config::{AppConfig, ModelConfig};
use personachat_core::error::ProviderError;
use personachat_core::provider::Provider;
use tracing::debug;

use crate::openai_compat::OpenAiCompatProvider;

/// Build the provider backing one model deployment.
///
/// Fails with `NotConfigured` when a hosted provider has no API key, or when
/// a provider we have no default URL for has no `api_url` either.
pub fn build_provider(
    config: &AppConfig,
    model: &ModelConfig,
) -> Result<Arc<dyn Provider>, ProviderError> {
    let base_url = match config.api_url_for(model) {
        Some(url) => url,
        None => default_base_url(&model.provider)
            .ok_or_else(|| {
                ProviderError::NotConfigured(format!(
                    "unknown provider '{}': set api_url for it",
                    model.provider
                ))
            })?
            .to_string(),
    };

    let api_key = match config.api_key_for(model) {
        Some(key) => key,
        None if is_local(&model.provider) => String::new(),
        None => {
            return Err(ProviderError::NotConfigured(format!(
                "no API key for provider '{}' (model '{}')",
                model.provider, model.model
            )));
        }
    };

    debug!(provider = %model.provider, base_url = %base_url, model = %model.model, "Building provider");

    Ok(Arc::new(OpenAiCompatProvider::with_timeout(
        &model.provider,
        base_url,
        api_key,
        Duration::from_secs(model.request_timeout_secs),
    )))
}

/// Providers that run on the local machine and need no key.
fn is_local(provider_name: &str) -> bool {
    matches!(provider_name, "ollama" | "vllm" | "llamacpp" | "llama.cpp")
}

/// Get the default base URL for well-known providers.
pub fn default_base_url(provider_name: &str) -> Option<&'static str> {
    let url = match provider_name {
        "openrouter" => "https://openrouter.ai/api/v1",
        "openai" => "https://api.openai.com/v1",
        "gemini" | "google" => "https://generativelanguage.googleapis.com/v1beta/openai",
        "ollama" => "http://localhost:11434/v1",
        "deepseek" => "https://api.deepseek.com/v1",
        "groq" => "https://api.groq.com/openai/v1",
        "together" => "https://api.together.xyz/v1",
        "fireworks" => "https://api.fireworks.ai/inference/v1",
        "vllm" => "http://localhost:8000/v1",
        "llamacpp" | "llama.cpp" => "http://localhost:8080/v1",
        _ => return None,
    };
    Some(url)
}
