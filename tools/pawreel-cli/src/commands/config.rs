//! Show or persist the effective configuration.

use pawreel_common::config::{config_file_path, AppConfig};

pub fn run(config: &AppConfig, save: bool) -> anyhow::Result<()> {
    if let Err(e) = config.validate() {
        println!("Warning: {e}");
    }

    if save {
        let path = config.save()?;
        println!("Configuration saved to: {}", path.display());
        return Ok(());
    }

    println!("# {}", config_file_path().display());
    println!("{}", serde_json::to_string_pretty(config)?);
    Ok(())
}
