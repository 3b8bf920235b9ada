//! `personachat doctor` - Diagnose config, profile and credentials.

use std::path::Path;

use personachat_config::{AppConfig, ModelConfig};
use personachat_core::profile::ProfileContext;
use personachat_pipeline::OverrideRules;

pub async fn run(
    config_path: Option<&Path>,
    online: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    println!("PersonaChat Doctor — System Diagnostics");
    println!("=======================================\n");

    let mut issues = 0;

    // Config
    let default_path = AppConfig::config_dir().join("config.toml");
    let path = config_path.unwrap_or(default_path.as_path());
    if !path.exists() {
        println!("  ⚠️  No config file at {} — using defaults", path.display());
    }
    let config = match super::load_config(config_path) {
        Ok(config) => {
            println!("  ✅ Config valid");
            config
        }
        Err(e) => {
            println!("  ❌ {e}");
            println!("\n  1 issue(s) found. Fix the config before anything else.");
            return Ok(());
        }
    };

    // Profile
    let sources = super::profile_sources(&config);
    for (label, source) in [
        ("Summary", &sources.summary_path),
        ("Profile document", &sources.document_path),
    ] {
        match source {
            Some(p) if p.exists() => println!("  ✅ {label}: {}", p.display()),
            Some(p) => {
                println!("  ⚠️  {label} not found: {}", p.display());
                issues += 1;
            }
            None => println!("  ⚠️  {label}: not configured"),
        }
    }
    match ProfileContext::load(&config.persona.name, &sources) {
        Ok(profile) if profile.is_empty() => {
            println!("  ⚠️  Profile for '{}' is empty", profile.name);
            issues += 1;
        }
        Ok(profile) => {
            println!("  ✅ Profile for '{}' loaded", profile.name);
            for line in profile.diagnostic_summary().lines() {
                println!("       {line}");
            }
        }
        Err(e) => {
            println!("  ❌ {e}");
            issues += 1;
        }
    }

    // Models
    issues += check_model(&config, "Primary", &config.primary, online).await;
    issues += check_model(&config, "Judge", &config.judge, online).await;
    if config.judge.structured_output {
        println!("  ✅ Judge requests structured (JSON schema) output");
    }

    let rules = OverrideRules::from_config(&config.overrides, &config.persona.name);
    if rules.is_empty() {
        println!("  ⚠️  No override rules: every question goes to the models");
    } else {
        println!("  ✅ {} override rule(s)", rules.len());
    }

    // Summary
    println!();
    if issues == 0 {
        println!("  🎉 All checks passed!");
    } else {
        println!("  ⚠️  {issues} issue(s) found. See above for details.");
    }

    Ok(())
}

async fn check_model(
    config: &AppConfig,
    label: &str,
    model: &ModelConfig,
    online: bool,
) -> u32 {
    let provider = match personachat_providers::build_provider(config, model) {
        Ok(provider) => provider,
        Err(e) => {
            println!("  ❌ {label} model: {e}");
            return 1;
        }
    };

    let key = if config.api_key_for(model).is_some() {
        "API key set"
    } else {
        "no key needed"
    };
    println!(
        "  ✅ {label} model: {} via {} ({key})",
        model.model,
        provider.name()
    );

    if !online {
        return 0;
    }
    match provider.health_check().await {
        Ok(true) => {
            println!("  ✅ {} is reachable", provider.name());
            0
        }
        Ok(false) => {
            println!("  ❌ {} answered but rejected the request", provider.name());
            1
        }
        Err(e) => {
            println!("  ❌ {} unreachable: {e}", provider.name());
            1
        }
    }
}
