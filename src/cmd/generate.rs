//! Wall geometry and artifact generation (`tilewall generate`).

use anyhow::{Context, Result};

use tilewall::artifacts::{serialize, write_artifacts};
use tilewall::context::WallContext;
use tilewall::plan::{RandomNames, compute_plan};
use tilewall::prompt::{DialoguerPrompter, WallSpecInput, capture_wall_spec, parse_arrangement};
use tilewall::ui::summary::{print_plan, print_written};

/// Collect the values given as flags. Anything left out is prompted for.
pub fn wall_input(
    arrangement: Option<&str>,
    width: Option<u32>,
    height: Option<u32>,
    inside_width_mm: Option<f64>,
    bezel_mm: Option<f64>,
) -> Result<WallSpecInput> {
    let arrangement = arrangement.map(parse_arrangement).transpose()?;
    Ok(WallSpecInput {
        arrangement,
        monitor_width_px: width,
        monitor_height_px: height,
        monitor_inside_width_mm: inside_width_mm,
        bezel_mm,
    })
}

pub fn cmd_generate(ctx: &mut WallContext, input: &WallSpecInput, seed: Option<u64>) -> Result<()> {
    if !input.is_complete() {
        println!("Enter the wall dimensions.");
    }
    let spec = capture_wall_spec(&mut DialoguerPrompter::new(), input)?;

    if let Some(seed) = seed {
        ctx.names = RandomNames::seeded(seed);
    }
    let plan = compute_plan(&spec, &mut ctx.names)?;
    tracing::info!(
        wall = %plan.wall().id,
        tiles = plan.tiles().len(),
        bezel_px = plan.wall().bezel_px,
        "plan computed"
    );

    let written = write_artifacts(&ctx.config.config_dir, &serialize(&plan))?;
    ctx.plan_store()
        .save(&plan)
        .context("Failed to save plan snapshot")?;

    print_plan(&plan);
    print_written(&written);
    ctx.plan = Some(plan);
    Ok(())
}
