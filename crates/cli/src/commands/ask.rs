//! `personachat ask` - Answer a single question.

use std::path::Path;

pub async fn run(
    config_path: Option<&Path>,
    message: String,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = super::load_config(config_path)?;
    let controller = super::build_controller(&config)?;

    let outcome = controller.respond(&message, &[]).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
    } else {
        println!("{}", outcome.reply);
    }

    Ok(())
}
