//! Interactive main menu, shown when no subcommand is given.

use anyhow::Result;
use console::style;

use super::deploy::{DeployOptions, cmd_deploy};
use super::{cmd_clean, cmd_generate};
use tilewall::context::WallContext;
use tilewall::prompt::menu::{MenuAction, select_action};
use tilewall::prompt::{DialoguerPrompter, WallSpecInput};

/// Run menu actions until the operator quits.
///
/// A failed action is reported and the menu is shown again.
pub async fn cmd_menu(ctx: &mut WallContext) -> Result<()> {
    let mut prompter = DialoguerPrompter::new();
    loop {
        println!();
        let action = select_action(&mut prompter)?;
        tracing::debug!(?action, "menu selection");

        let result = match action {
            MenuAction::Generate => cmd_generate(ctx, &WallSpecInput::default(), None),
            MenuAction::GenerateAndDeploy => {
                match cmd_generate(ctx, &WallSpecInput::default(), None) {
                    Ok(()) => cmd_deploy(ctx, &DeployOptions::default()).await,
                    Err(e) => Err(e),
                }
            }
            MenuAction::Clean => cmd_clean(ctx, false),
            MenuAction::Quit => return Ok(()),
        };

        if let Err(e) = result {
            eprintln!("{} {:#}", style("Error:").red().bold(), e);
        }
    }
}
