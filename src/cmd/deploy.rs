//! Node provisioning (`tilewall deploy`).

use anyhow::{Context, Result, bail};

use tilewall::context::WallContext;
use tilewall::deploy::{
    CancelToken, CredentialDefaults, CredentialProvider, DeployReport, Deployer, PromptCredentials,
    SshConnector, StaticCredentials,
};
use tilewall::plan::{Plan, resolve_plan};
use tilewall::prompt::DialoguerPrompter;
use tilewall::ui::DeployUI;
use tilewall::ui::summary::print_report;

/// Exit status after a second interrupt, as for SIGINT.
const INTERRUPTED_EXIT_CODE: i32 = 130;

/// Command-line overrides for one deployment.
#[derive(Debug, Clone, Default)]
pub struct DeployOptions {
    pub hosts: Vec<String>,
    pub username: Option<String>,
    pub continue_on_tile_failure: bool,
    pub keep_going_on_connection_failure: bool,
}

pub async fn cmd_deploy(ctx: &WallContext, options: &DeployOptions) -> Result<()> {
    // Resolve the plan before asking for anything or touching the network.
    let plan = resolve_plan(ctx.plan.clone(), &ctx.plan_store())?;

    if !options.hosts.is_empty() && options.hosts.len() != plan.tiles().len() {
        bail!(
            "Expected one --host per tile ({} tiles), got {}",
            plan.tiles().len(),
            options.hosts.len()
        );
    }

    let report = run_deployment(ctx, plan, options).await?;
    let path = report.save(&ctx.config.reports_dir)?;
    tracing::info!(path = %path.display(), "deploy report saved");

    println!();
    print_report(&report);

    if !report.is_success() {
        bail!(
            "Deployment did not complete ({} of {} tiles provisioned). Report: {}",
            report.succeeded_count(),
            report.tiles.len(),
            path.display()
        );
    }
    Ok(())
}

fn credential_provider(ctx: &WallContext, options: &DeployOptions) -> Box<dyn CredentialProvider> {
    let mut defaults: CredentialDefaults = ctx.settings.credential_defaults();
    if let Some(username) = &options.username {
        defaults.username = username.clone();
    }

    if options.hosts.is_empty() {
        Box::new(PromptCredentials::new(DialoguerPrompter::new(), defaults))
    } else {
        Box::new(StaticCredentials::new(options.hosts.clone(), defaults))
    }
}

async fn run_deployment(
    ctx: &WallContext,
    plan: Plan,
    options: &DeployOptions,
) -> Result<DeployReport> {
    let mut settings = ctx.deploy_settings();
    if options.continue_on_tile_failure {
        settings = settings.with_continue_on_tile_failure(true);
    }
    if options.keep_going_on_connection_failure {
        settings = settings.with_abort_on_connection_failure(false);
    }

    let service = ctx.service_bundle()?;
    let ui = DeployUI::new(plan.tiles().len() as u64, ctx.config.verbose);
    let deployer = Deployer::new(SshConnector, settings, service).with_observer(Box::new(ui.clone()));
    let mut credentials = credential_provider(ctx, options);

    let cancel = CancelToken::new();
    let interrupt = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_err() {
                return;
            }
            eprintln!("Interrupted: finishing the current tile. Press Ctrl-C again to abort.");
            cancel.cancel();
            if tokio::signal::ctrl_c().await.is_ok() {
                std::process::exit(INTERRUPTED_EXIT_CODE);
            }
        })
    };

    let report = tokio::task::spawn_blocking(move || {
        deployer.deploy(&plan, credentials.as_mut(), &cancel)
    })
    .await
    .context("Deployment task failed")?;

    interrupt.abort();
    ui.finish();
    Ok(report)
}
