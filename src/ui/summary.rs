//! Plain-text rendering of plans and deploy reports.

use console::style;
use std::path::Path;

use crate::deploy::DeployReport;
use crate::plan::Plan;
use crate::ui::icons::{CHECK, CROSS, FILE_NEW, SPARKLE};
use crate::ui::progress::tile_line;

pub fn render_plan(plan: &Plan) -> String {
    let wall = plan.wall();
    let mut out = format!(
        "{}Wall {}: {} tiles ({}), {}x{} px, bezel {} px\n",
        SPARKLE,
        style(&wall.id).bold(),
        plan.tiles().len(),
        plan.spec.arrangement(),
        wall.width,
        wall.height,
        wall.bezel_px
    );
    for tile in plan.tiles() {
        out.push_str(&format!(
            "  pi{:<3} {}  row {} col {}  {}x{}+{}+{}\n",
            tile.sequence_id,
            tile.name,
            tile.row,
            tile.column,
            tile.width,
            tile.height,
            tile.x,
            tile.y
        ));
    }
    out
}

pub fn print_plan(plan: &Plan) {
    print!("{}", render_plan(plan));
}

pub fn print_written(paths: &[impl AsRef<Path>]) {
    for path in paths {
        println!("  {}{}", FILE_NEW, path.as_ref().display());
    }
}

pub fn render_report(report: &DeployReport) -> String {
    let mut out = String::new();
    for tile in &report.tiles {
        out.push_str(&tile_line(tile));
        out.push('\n');
    }
    let headline = if report.is_success() {
        format!("{}Deployment complete", CHECK)
    } else if report.cancelled {
        format!("{}Deployment cancelled", CROSS)
    } else {
        format!("{}Deployment incomplete", CROSS)
    };
    out.push_str(&format!(
        "{}: {} succeeded, {} failed, {} not attempted, {} warnings\n",
        headline,
        report.succeeded_count(),
        report.failed_count(),
        report.not_attempted_count(),
        report.warning_count()
    ));
    out
}

pub fn print_report(report: &DeployReport) {
    print!("{}", render_report(report));
}
