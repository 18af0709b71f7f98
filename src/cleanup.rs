//! Removal of everything `generate` and `deploy` leave behind.

use anyhow::{Context, Result};
use glob::glob;
use std::fs;
use std::path::{Path, PathBuf};

use crate::artifacts::serializer::{DESCRIPTOR_PREFIX, WALL_CONFIG_FILE, is_descriptor_file_name};
use crate::config::Config;
use crate::deploy::report::REPORT_PREFIX;
use crate::plan::PlanStore;

pub struct CleanupManager {
    config_dir: PathBuf,
    reports_dir: PathBuf,
    store: PlanStore,
}

impl CleanupManager {
    pub fn new(config: &Config) -> Self {
        Self {
            config_dir: config.config_dir.clone(),
            reports_dir: config.reports_dir.clone(),
            store: PlanStore::new(config.state_file.clone()),
        }
    }

    /// Every existing file that `clean` would remove, sorted.
    pub fn candidates(&self) -> Result<Vec<PathBuf>> {
        let mut paths = Vec::new();

        let wall = self.config_dir.join(WALL_CONFIG_FILE);
        if wall.is_file() {
            paths.push(wall);
        }
        let descriptors = matching(&self.config_dir, &format!("{}*", DESCRIPTOR_PREFIX))?;
        paths.extend(descriptors.into_iter().filter(|p| {
            p.file_name()
                .and_then(|n| n.to_str())
                .is_some_and(is_descriptor_file_name)
        }));
        if self.store.exists() {
            paths.push(self.store.path().to_path_buf());
        }
        paths.extend(matching(&self.reports_dir, &format!("{}*.json", REPORT_PREFIX))?);

        paths.sort();
        Ok(paths)
    }

    /// Remove every generated artifact, the plan snapshot and stored deploy
    /// reports. Returns what was removed; nothing to remove is not an error.
    pub fn clean(&self, notify: bool) -> Result<Vec<PathBuf>> {
        let removed = self.candidates()?;
        for path in &removed {
            fs::remove_file(path).with_context(|| format!("Failed to remove {}", path.display()))?;
            tracing::info!(path = %path.display(), "removed");
            if notify {
                println!("Removed {}", path.display());
            }
        }
        if removed.is_empty() && notify {
            println!("Nothing to clean.");
        }
        Ok(removed)
    }
}

fn matching(dir: &Path, pattern: &str) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }
    let pattern = glob::Pattern::escape(&dir.to_string_lossy()) + "/" + pattern;
    Ok(glob(&pattern)
        .context("Failed to read glob pattern")?
        .filter_map(|entry| entry.ok())
        .filter(|p| p.is_file())
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifacts::{serialize, write_artifacts};
    use crate::deploy::report::DeployReport;
    use crate::plan::{RandomNames, WallSpec, compute_plan};
    use tempfile::tempdir;

    fn setup() -> (Config, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let config = Config::new(dir.path(), false).unwrap();
        config.ensure_directories().unwrap();
        (config, dir)
    }

    fn generate(config: &Config, columns: u32, names: &mut RandomNames) {
        let spec = WallSpec {
            columns,
            rows: 2,
            monitor_width_px: 1024,
            monitor_height_px: 768,
            monitor_inside_width_mm: 300.0,
            bezel_mm: 4.0,
        };
        let plan = compute_plan(&spec, names).unwrap();
        write_artifacts(&config.config_dir, &serialize(&plan)).unwrap();
        PlanStore::new(config.state_file.clone()).save(&plan).unwrap();
    }

    #[test]
    fn test_clean_removes_generated_files_only() {
        let (config, _dir) = setup();
        generate(&config, 2, &mut RandomNames::seeded(1));
        DeployReport::new("w").save(&config.reports_dir).unwrap();
        fs::write(config.config_dir.join("README"), "keep").unwrap();
        fs::write(config.config_dir.join("pitile-notes"), "keep").unwrap();
        fs::write(config.reports_dir.join("summary.json"), "{}").unwrap();

        let removed = CleanupManager::new(&config).clean(false).unwrap();
        assert_eq!(removed.len(), 1 + 4 + 1 + 1);
        let mut sorted = removed.clone();
        sorted.sort();
        assert_eq!(removed, sorted);

        assert!(!config.config_dir.join("piwall").exists());
        assert!(!config.config_dir.join("pitile4").exists());
        assert!(!config.state_file.exists());
        assert!(config.config_dir.join("README").exists());
        assert!(config.config_dir.join("pitile-notes").exists());
        assert!(config.reports_dir.join("summary.json").exists());
    }

    #[test]
    fn test_clean_is_idempotent() {
        let (config, _dir) = setup();
        generate(&config, 1, &mut RandomNames::seeded(2));
        let manager = CleanupManager::new(&config);
        assert!(!manager.clean(false).unwrap().is_empty());
        assert!(manager.clean(false).unwrap().is_empty());
    }

    #[test]
    fn test_clean_on_fresh_root() {
        let dir = tempdir().unwrap();
        let config = Config::new(dir.path(), false).unwrap();
        assert!(CleanupManager::new(&config).clean(true).unwrap().is_empty());
    }

    #[test]
    fn test_clean_then_generate_leaves_only_new_plan() {
        let (config, _dir) = setup();
        let mut names = RandomNames::seeded(3);
        generate(&config, 3, &mut names);
        CleanupManager::new(&config).clean(false).unwrap();
        generate(&config, 1, &mut names);

        let remaining = CleanupManager::new(&config).candidates().unwrap();
        let names: Vec<String> = remaining
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        // Sorted by full path: `.tilewall/` sorts before `config/`
        assert_eq!(names, vec!["plan.json", "pitile1", "pitile2", "piwall"]);
    }
}
