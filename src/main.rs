use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use tilewall::config::Config;
use tilewall::context::WallContext;

mod cmd;

#[derive(Parser)]
#[command(name = "tilewall")]
#[command(version, about = "Configure and deploy a tiled video wall")]
pub struct Cli {
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Installation root holding config/ and .tilewall/ (defaults to the current directory)
    #[arg(long, global = true)]
    pub root: Option<PathBuf>,

    /// Without a subcommand the interactive menu is shown
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Compute the wall geometry and write the player configuration
    Generate {
        /// Monitor arrangement as <columns>x<rows>, e.g. 2x2
        #[arg(long)]
        arrangement: Option<String>,
        /// Monitor width in pixels
        #[arg(long)]
        width: Option<u32>,
        /// Monitor height in pixels
        #[arg(long)]
        height: Option<u32>,
        /// Visible width of one monitor in millimeters
        #[arg(long)]
        inside_width_mm: Option<f64>,
        /// Bezel width in millimeters
        #[arg(long)]
        bezel_mm: Option<f64>,
        /// Seed for reproducible wall and tile names
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Provision every tile's node with the generated configuration
    Deploy {
        /// Node address, once per tile in sequence order (skips host prompts)
        #[arg(long = "host")]
        hosts: Vec<String>,
        /// Login name for every node
        #[arg(long)]
        username: Option<String>,
        /// Keep deploying the remaining tiles after a file transfer failure
        #[arg(long)]
        continue_on_tile_failure: bool,
        /// Keep deploying the remaining tiles after a connection failure
        #[arg(long)]
        keep_going_on_connection_failure: bool,
    },
    /// Remove generated configuration, the saved plan and deploy reports
    Clean {
        /// Do not list removed files
        #[arg(short, long)]
        quiet: bool,
    },
    /// Show the saved plan and the latest deployment
    Status,
    /// View or initialize settings
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Show effective settings
    Show,
    /// Write a default tilewall.toml
    Init,
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();

    let root = match &cli.root {
        Some(root) => root.clone(),
        None => std::env::current_dir().context("Failed to get current directory")?,
    };
    let config = Config::new(&root, cli.verbose)?;
    config.ensure_directories()?;
    let _log_guard = tilewall::logging::init(cli.verbose, Some(&config.log_dir))?;

    let mut ctx = WallContext::load(config)?;

    match cli.command {
        None => cmd::cmd_menu(&mut ctx).await?,
        Some(Commands::Generate {
            arrangement,
            width,
            height,
            inside_width_mm,
            bezel_mm,
            seed,
        }) => {
            let input = cmd::generate::wall_input(
                arrangement.as_deref(),
                width,
                height,
                inside_width_mm,
                bezel_mm,
            )?;
            cmd::cmd_generate(&mut ctx, &input, seed)?;
        }
        Some(Commands::Deploy {
            hosts,
            username,
            continue_on_tile_failure,
            keep_going_on_connection_failure,
        }) => {
            let options = cmd::DeployOptions {
                hosts,
                username,
                continue_on_tile_failure,
                keep_going_on_connection_failure,
            };
            cmd::cmd_deploy(&ctx, &options).await?;
        }
        Some(Commands::Clean { quiet }) => cmd::cmd_clean(&mut ctx, quiet)?,
        Some(Commands::Status) => cmd::cmd_status(&ctx)?,
        Some(Commands::Config { command }) => cmd::cmd_config(&ctx, command)?,
    }

    Ok(())
}
