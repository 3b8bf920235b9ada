pub mod ask;
pub mod chat;
pub mod doctor;
pub mod serve;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use personachat_config::AppConfig;
use personachat_core::error::ProviderError;
use personachat_core::profile::{ProfileContext, ProfileSources};
use personachat_pipeline::ResponseController;

/// Load config from `--config` or the default location, with env overrides.
pub fn load_config(path: Option<&Path>) -> Result<AppConfig, Box<dyn std::error::Error>> {
    let config = match path {
        Some(path) => AppConfig::load_with_env(path),
        None => AppConfig::load(),
    };
    config.map_err(|e| format!("Failed to load config: {e}").into())
}

/// Profile source paths from the persona section; blank paths are skipped.
pub fn profile_sources(config: &AppConfig) -> ProfileSources {
    let path = |p: &str| (!p.trim().is_empty()).then(|| PathBuf::from(p));
    ProfileSources {
        summary_path: path(&config.persona.summary_path),
        document_path: path(&config.persona.document_path),
    }
}

/// Load the profile and wire up the pipeline. Any failure here is fatal.
pub fn build_controller(
    config: &AppConfig,
) -> Result<Arc<ResponseController>, Box<dyn std::error::Error>> {
    let profile = ProfileContext::load(&config.persona.name, &profile_sources(config))
        .map_err(|e| format!("Failed to load profile: {e}"))?;

    match ResponseController::from_config(config, Arc::new(profile)) {
        Ok(controller) => Ok(Arc::new(controller)),
        Err(ProviderError::NotConfigured(reason)) => {
            print_key_help();
            Err(format!("Model not configured: {reason}").into())
        }
        Err(e) => Err(e.into()),
    }
}

fn print_key_help() {
    eprintln!();
    eprintln!("  ERROR: No API key configured!");
    eprintln!();
    eprintln!("  Set these environment variables:");
    eprintln!("    PERSONACHAT_PRIMARY_API_KEY  (or OPENROUTER_API_KEY / OPENAI_API_KEY)");
    eprintln!("    PERSONACHAT_JUDGE_API_KEY    (or GOOGLE_API_KEY)");
    eprintln!();
    eprintln!("  Or add api_key to [primary] and [judge] in:");
    eprintln!("    {}", AppConfig::config_dir().join("config.toml").display());
    eprintln!();
}
