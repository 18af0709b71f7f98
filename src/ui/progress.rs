use crate::deploy::{DeployObserver, TileOutcome, TileReport};
use crate::errors::ConnectionError;
use crate::plan::Tile;
use crate::ui::icons::{CHECK, CROSS, RETRY, SCREEN, SKIPPED, UPLOAD, WARN};
use console::style;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use std::time::Duration;

/// Terminal progress for a deployment run, rendered via `indicatif`.
///
/// Two bars are stacked vertically:
/// - Tile bar: how many tiles have been handled
/// - Step bar: spinner with the current tile's host and step
#[derive(Clone)]
pub struct DeployUI {
    multi: MultiProgress,
    tile_bar: ProgressBar,
    step_bar: ProgressBar,
    verbose: bool,
}

impl DeployUI {
    pub fn new(total_tiles: u64, verbose: bool) -> Self {
        let multi = MultiProgress::new();

        let tile_style = ProgressStyle::default_bar()
            .template("{prefix:.bold.dim} [{bar:30.cyan/blue}] {pos}/{len} {msg}")
            .expect("progress bar template is a valid static string")
            .progress_chars("█▓▒░");
        let tile_bar = multi.add(ProgressBar::new(total_tiles));
        tile_bar.set_style(tile_style);
        tile_bar.set_prefix("Tiles");

        let step_style = ProgressStyle::default_spinner()
            .template("{prefix:.bold.dim} {spinner} {msg}")
            .expect("progress bar template is a valid static string");
        let step_bar = multi.add(ProgressBar::new_spinner());
        step_bar.set_style(step_style);
        step_bar.set_prefix(" Step");

        Self {
            multi,
            tile_bar,
            step_bar,
            verbose,
        }
    }

    /// Print a line above the bars, falling back to `eprintln!` if that fails.
    fn print_line(&self, msg: impl AsRef<str>) {
        if self.multi.println(msg.as_ref()).is_err() {
            eprintln!("{}", msg.as_ref());
        }
    }

    /// Remove both bars once the run is over.
    pub fn finish(&self) {
        self.step_bar.finish_and_clear();
        self.tile_bar.finish_and_clear();
    }
}

impl DeployObserver for DeployUI {
    fn tile_started(&self, tile: &Tile, hostname: &str) {
        self.tile_bar.set_message(format!(
            "{}tile {} ({})",
            SCREEN,
            style(tile.sequence_id).yellow(),
            hostname
        ));
        self.step_bar.set_message("connecting".to_string());
        self.step_bar.enable_steady_tick(Duration::from_millis(100));
    }

    fn step(&self, _tile: &Tile, step: &str) {
        self.step_bar.set_message(step.to_string());
        if self.verbose {
            self.print_line(format!("    {}{}", UPLOAD, style(step).dim()));
        }
    }

    fn retrying(&self, tile: &Tile, attempt: u32, error: &ConnectionError) {
        self.print_line(format!(
            "    {}tile {}: attempt {} failed ({}), retrying",
            RETRY,
            tile.sequence_id,
            attempt,
            style(error).dim()
        ));
    }

    fn tile_finished(&self, report: &TileReport) {
        self.step_bar.disable_steady_tick();
        self.step_bar.set_message(String::new());
        self.print_line(tile_line(report));
        for warning in &report.warnings {
            self.print_line(format!("      {}{}", WARN, style(warning).yellow()));
        }
        self.tile_bar.inc(1);
    }
}

/// One status line for a tile.
pub fn tile_line(report: &TileReport) -> String {
    let host = if report.hostname.is_empty() {
        String::new()
    } else {
        format!(" @ {}", report.hostname)
    };
    match &report.outcome {
        TileOutcome::Succeeded => format!(
            "  {}pi{} {}{}",
            CHECK,
            report.sequence_id,
            report.tile_name,
            style(host).dim()
        ),
        TileOutcome::Failed { kind, message } => format!(
            "  {}pi{} {}{}: {} failure: {}",
            CROSS,
            report.sequence_id,
            report.tile_name,
            style(host).dim(),
            kind,
            style(message).red()
        ),
        TileOutcome::NotAttempted => format!(
            "  {}pi{} {}{}",
            SKIPPED,
            report.sequence_id,
            report.tile_name,
            style(" not attempted").dim()
        ),
    }
}
