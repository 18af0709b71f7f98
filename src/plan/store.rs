//! Durable snapshot of the generated plan.
//!
//! The snapshot lets `deploy` run as a separate invocation from `generate`
//! and reconstruct the exact plan without recomputing geometry or parsing
//! the textual wall config back.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};

use super::geometry::Plan;
use crate::errors::StateError;

/// Snapshot format version written by this build.
pub const SNAPSHOT_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct PlanSnapshot {
    version: u32,
    generated_at: DateTime<Utc>,
    /// sha256 of the compact JSON encoding of `plan`
    checksum: String,
    plan: Plan,
}

fn checksum(plan: &Plan) -> Result<String, serde_json::Error> {
    let canonical = serde_json::to_string(plan)?;
    Ok(format!("{:x}", Sha256::digest(canonical.as_bytes())))
}

pub struct PlanStore {
    path: PathBuf,
}

impl PlanStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// Write the snapshot, replacing any previous one.
    pub fn save(&self, plan: &Plan) -> Result<(), StateError> {
        let corrupt = |e: serde_json::Error| StateError::Corrupt {
            path: self.path.clone(),
            reason: e.to_string(),
        };
        let snapshot = PlanSnapshot {
            version: SNAPSHOT_VERSION,
            generated_at: Utc::now(),
            checksum: checksum(plan).map_err(corrupt)?,
            plan: plan.clone(),
        };
        let json = serde_json::to_string_pretty(&snapshot).map_err(corrupt)?;

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|source| self.io_error(source))?;
        }
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json).map_err(|source| self.io_error(source))?;
        fs::rename(&tmp, &self.path).map_err(|source| self.io_error(source))?;

        tracing::info!(path = %self.path.display(), wall = %plan.wall().id, "saved plan snapshot");
        Ok(())
    }

    /// Load and verify the snapshot.
    pub fn load(&self) -> Result<Plan, StateError> {
        if !self.exists() {
            return Err(StateError::NotFound {
                path: self.path.clone(),
            });
        }
        let content = fs::read_to_string(&self.path).map_err(|source| self.io_error(source))?;
        let snapshot: PlanSnapshot =
            serde_json::from_str(&content).map_err(|e| self.corrupt(e.to_string()))?;

        if snapshot.version != SNAPSHOT_VERSION {
            return Err(self.corrupt(format!(
                "unsupported snapshot version {} (expected {})",
                snapshot.version, SNAPSHOT_VERSION
            )));
        }
        let actual = checksum(&snapshot.plan).map_err(|e| self.corrupt(e.to_string()))?;
        if actual != snapshot.checksum {
            return Err(self.corrupt("checksum mismatch".to_string()));
        }
        snapshot
            .plan
            .check_invariants()
            .map_err(|reason| self.corrupt(reason))?;

        tracing::debug!(
            path = %self.path.display(),
            generated_at = %snapshot.generated_at,
            "loaded plan snapshot"
        );
        Ok(snapshot.plan)
    }

    /// Remove the snapshot. Returns whether a file was removed.
    pub fn clear(&self) -> Result<bool, StateError> {
        if !self.exists() {
            return Ok(false);
        }
        fs::remove_file(&self.path).map_err(|source| self.io_error(source))?;
        Ok(true)
    }

    fn io_error(&self, source: std::io::Error) -> StateError {
        StateError::Io {
            path: self.path.clone(),
            source,
        }
    }

    fn corrupt(&self, reason: String) -> StateError {
        StateError::Corrupt {
            path: self.path.clone(),
            reason,
        }
    }
}

/// Pick the plan to deploy: the in-memory one if present, else the snapshot.
pub fn resolve_plan(in_memory: Option<Plan>, store: &PlanStore) -> Result<Plan, StateError> {
    match in_memory {
        Some(plan) => Ok(plan),
        None => store.load(),
    }
}
