//! Settings view and initialization (`tilewall config`).

use anyhow::{Result, bail};

use super::super::ConfigCommands;
use tilewall::context::WallContext;
use tilewall::settings::Settings;

pub fn cmd_config(ctx: &WallContext, command: Option<ConfigCommands>) -> Result<()> {
    let path = &ctx.config.settings_file;

    match command {
        None | Some(ConfigCommands::Show) => {
            println!();
            println!("Tilewall Settings");
            println!("=================");
            println!();
            if path.exists() {
                println!("Settings file: {}", path.display());
            } else {
                println!("No tilewall.toml found at {}", path.display());
                println!("Using default settings.");
            }
            println!();

            let deploy = &ctx.settings.deploy;
            println!("[deploy]");
            println!("  port = {}", deploy.port);
            println!("  connect_timeout_secs = {}", deploy.connect_timeout_secs);
            println!("  command_timeout_secs = {}", deploy.command_timeout_secs);
            println!("  connect_attempts = {}", deploy.connect_attempts);
            println!("  retry_backoff_ms = {}", deploy.retry_backoff_ms);
            println!(
                "  abort_on_connection_failure = {}",
                deploy.abort_on_connection_failure
            );
            println!("  continue_on_tile_failure = {}", deploy.continue_on_tile_failure);
            println!("  elevation = \"{}\"", deploy.elevation);
            if let Some(file) = &deploy.known_hosts {
                println!("  known_hosts = \"{}\"", file.display());
            }
            println!();

            let service = &ctx.settings.service;
            println!("[service]");
            println!("  name = \"{}\"", service.name);
            if let Some(file) = &service.config_file {
                println!("  config_file = \"{}\"", file.display());
            }
            if let Some(file) = &service.script_file {
                println!("  script_file = \"{}\"", file.display());
            }
            println!();

            // Password is never shown, even when it came from the environment.
            println!("Effective values (with env overrides):");
            println!("  username = \"{}\"", ctx.settings.username());
            println!("  password = <hidden>");

            let warnings = ctx.settings.validate();
            if !warnings.is_empty() {
                println!();
                println!("Warnings:");
                for warning in warnings {
                    println!("  - {}", warning);
                }
            }
        }
        Some(ConfigCommands::Init) => {
            if path.exists() {
                bail!("Settings file already exists: {}", path.display());
            }
            Settings::default().save(path)?;
            println!("Created {}", path.display());
        }
    }

    Ok(())
}
