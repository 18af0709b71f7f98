//! Saved plan and last deployment (`tilewall status`).

use anyhow::Result;
use console::style;

use tilewall::context::WallContext;
use tilewall::deploy::DeployReport;
use tilewall::deploy::report::list_reports;
use tilewall::errors::StateError;
use tilewall::ui::summary::{print_plan, print_report};

pub fn cmd_status(ctx: &WallContext) -> Result<()> {
    let store = ctx.plan_store();
    match store.load() {
        Ok(plan) => {
            println!("Plan: {}", store.path().display());
            print_plan(&plan);
        }
        Err(StateError::NotFound { .. }) => {
            println!("No plan. Run 'tilewall generate' to create one.");
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    }

    println!();
    match list_reports(&ctx.config.reports_dir)?.first() {
        Some(latest) => {
            let report = DeployReport::load(latest)?;
            println!(
                "Last deployment: {} ({})",
                report.started_at.format("%Y-%m-%d %H:%M:%S UTC"),
                style(&report.run_id.to_string()[..8]).dim()
            );
            print_report(&report);
        }
        None => println!("No deployments yet."),
    }
    Ok(())
}
