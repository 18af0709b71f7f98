use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Directory under the installation root holding tool state.
pub const STATE_DIR: &str = ".tilewall";
/// Directory under the installation root holding generated artifacts.
pub const CONFIG_DIR: &str = "config";
pub const SETTINGS_FILE: &str = "tilewall.toml";

/// Runtime paths for one installation root.
///
/// ```text
/// <root>/config/               piwall, pitile<n>
/// <root>/.tilewall/plan.json   plan snapshot
/// <root>/.tilewall/reports/    deploy-*.json
/// <root>/.tilewall/logs/       tilewall.log
/// <root>/.tilewall/tilewall.toml
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    pub root: PathBuf,
    pub config_dir: PathBuf,
    pub state_dir: PathBuf,
    pub state_file: PathBuf,
    pub reports_dir: PathBuf,
    pub log_dir: PathBuf,
    pub settings_file: PathBuf,
    pub verbose: bool,
}

impl Config {
    pub fn new(root: &Path, verbose: bool) -> Result<Self> {
        let root = root
            .canonicalize()
            .with_context(|| format!("Failed to resolve installation root {}", root.display()))?;
        let state_dir = root.join(STATE_DIR);

        Ok(Self {
            config_dir: root.join(CONFIG_DIR),
            state_file: state_dir.join("plan.json"),
            reports_dir: state_dir.join("reports"),
            log_dir: state_dir.join("logs"),
            settings_file: state_dir.join(SETTINGS_FILE),
            state_dir,
            root,
            verbose,
        })
    }

    pub fn ensure_directories(&self) -> Result<()> {
        std::fs::create_dir_all(&self.config_dir).context("Failed to create config directory")?;
        std::fs::create_dir_all(&self.reports_dir).context("Failed to create reports directory")?;
        std::fs::create_dir_all(&self.log_dir).context("Failed to create log directory")?;
        Ok(())
    }

    /// Resolve a path from the settings file against the installation root.
    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }
}
