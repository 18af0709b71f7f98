use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// File name prefix of saved reports (`deploy-<timestamp>-<run>.json`).
pub const REPORT_PREFIX: &str = "deploy-";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FailureKind {
    /// No target could be obtained for the tile
    Credentials,
    /// Unreachable host or rejected login
    Connection,
    /// A file upload failed
    Transfer,
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FailureKind::Credentials => write!(f, "credentials"),
            FailureKind::Connection => write!(f, "connection"),
            FailureKind::Transfer => write!(f, "transfer"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TileOutcome {
    Succeeded,
    Failed { kind: FailureKind, message: String },
    NotAttempted,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TileReport {
    pub sequence_id: u32,
    pub tile_name: String,
    /// Empty when no target was obtained
    #[serde(default)]
    pub hostname: String,
    pub outcome: TileOutcome,
    /// Remote commands that failed without stopping the tile
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

impl TileReport {
    pub fn not_attempted(sequence_id: u32, tile_name: &str) -> Self {
        Self {
            sequence_id,
            tile_name: tile_name.to_string(),
            hostname: String::new(),
            outcome: TileOutcome::NotAttempted,
            warnings: Vec::new(),
        }
    }

    pub fn succeeded(&self) -> bool {
        self.outcome == TileOutcome::Succeeded
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeployReport {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub wall_id: String,
    /// Stopped early by an interrupt
    #[serde(default)]
    pub cancelled: bool,
    pub tiles: Vec<TileReport>,
}

impl DeployReport {
    pub fn new(wall_id: &str) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            started_at: Utc::now(),
            finished_at: None,
            wall_id: wall_id.to_string(),
            cancelled: false,
            tiles: Vec::new(),
        }
    }

    pub fn finish(&mut self) {
        self.finished_at = Some(Utc::now());
    }

    pub fn succeeded_count(&self) -> usize {
        self.tiles.iter().filter(|t| t.succeeded()).count()
    }

    pub fn failed_count(&self) -> usize {
        self.tiles
            .iter()
            .filter(|t| matches!(t.outcome, TileOutcome::Failed { .. }))
            .count()
    }

    pub fn not_attempted_count(&self) -> usize {
        self.tiles
            .iter()
            .filter(|t| t.outcome == TileOutcome::NotAttempted)
            .count()
    }

    pub fn warning_count(&self) -> usize {
        self.tiles.iter().map(|t| t.warnings.len()).sum()
    }

    /// Every tile was provisioned. Warnings do not count against success.
    pub fn is_success(&self) -> bool {
        !self.cancelled && !self.tiles.is_empty() && self.tiles.iter().all(|t| t.succeeded())
    }

    /// Save into `reports_dir`, returning the written path.
    pub fn save(&self, reports_dir: &Path) -> Result<PathBuf> {
        fs::create_dir_all(reports_dir)
            .with_context(|| format!("Failed to create {}", reports_dir.display()))?;
        let filename = format!(
            "{}{}-{}.json",
            REPORT_PREFIX,
            self.started_at.format("%Y-%m-%dT%H-%M-%S"),
            &self.run_id.to_string()[..8]
        );
        let path = reports_dir.join(filename);
        let json = serde_json::to_string_pretty(self).context("Failed to serialize deploy report")?;
        fs::write(&path, json)
            .with_context(|| format!("Failed to write deploy report {}", path.display()))?;
        Ok(path)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read deploy report {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse deploy report {}", path.display()))
    }
}

/// Saved reports, most recent first.
pub fn list_reports(reports_dir: &Path) -> Result<Vec<PathBuf>> {
    if !reports_dir.exists() {
        return Ok(Vec::new());
    }
    let mut reports: Vec<PathBuf> = fs::read_dir(reports_dir)?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| {
            p.file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.starts_with(REPORT_PREFIX) && n.ends_with(".json"))
        })
        .collect();
    reports.sort();
    reports.reverse();
    Ok(reports)
}
