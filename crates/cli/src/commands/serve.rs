//! `personachat serve` - Start the HTTP API server.

use std::path::Path;

pub async fn run(
    config_path: Option<&Path>,
    port_override: Option<u16>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = super::load_config(config_path)?;

    if let Some(port) = port_override {
        config.gateway.port = port;
    }

    let controller = super::build_controller(&config)?;

    println!("PersonaChat Gateway");
    println!("   Persona:   {}", controller.profile().name);
    println!("   Listening: {}:{}", config.gateway.host, config.gateway.port);

    personachat_gateway::start(&config.gateway, controller).await?;

    Ok(())
}
