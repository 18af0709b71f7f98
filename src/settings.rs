//! Settings file for an installation root.
//!
//! Read from `.tilewall/tilewall.toml`. Every key is optional. Values are
//! layered file → environment → CLI.
//!
//! ```toml
//! [deploy]
//! port = 22
//! connect_timeout_secs = 10
//! command_timeout_secs = 120
//! connect_attempts = 3
//! retry_backoff_ms = 500
//! abort_on_connection_failure = true
//! continue_on_tile_failure = false
//! default_username = "pi"
//! default_password = "raspberry"
//! elevation = "sudo"
//! known_hosts = "known_hosts"
//!
//! [service]
//! name = "tilewall-player"
//! config_file = "service/player.conf"
//! script_file = "service/player.init"
//! ```

use anyhow::{Context, Result};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::deploy::{ConnectOptions, CredentialDefaults, DeploySettings, Elevation};

pub const USERNAME_ENV: &str = "TILEWALL_USERNAME";
pub const PASSWORD_ENV: &str = "TILEWALL_PASSWORD";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeploySection {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    #[serde(default = "default_command_timeout_secs")]
    pub command_timeout_secs: u64,
    #[serde(default = "default_connect_attempts")]
    pub connect_attempts: u32,
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,
    #[serde(default = "default_true")]
    pub abort_on_connection_failure: bool,
    #[serde(default)]
    pub continue_on_tile_failure: bool,
    #[serde(default = "default_username")]
    pub default_username: String,
    /// Factory password of the node image
    #[serde(default = "default_password")]
    pub default_password: String,
    #[serde(default)]
    pub elevation: Elevation,
    /// OpenSSH known_hosts file; host keys are only logged when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub known_hosts: Option<PathBuf>,
}

fn default_port() -> u16 {
    22
}

fn default_connect_timeout_secs() -> u64 {
    10
}

fn default_command_timeout_secs() -> u64 {
    120
}

fn default_connect_attempts() -> u32 {
    3
}

fn default_retry_backoff_ms() -> u64 {
    500
}

fn default_true() -> bool {
    true
}

fn default_username() -> String {
    "pi".to_string()
}

fn default_password() -> String {
    "raspberry".to_string()
}

impl Default for DeploySection {
    fn default() -> Self {
        Self {
            port: default_port(),
            connect_timeout_secs: default_connect_timeout_secs(),
            command_timeout_secs: default_command_timeout_secs(),
            connect_attempts: default_connect_attempts(),
            retry_backoff_ms: default_retry_backoff_ms(),
            abort_on_connection_failure: true,
            continue_on_tile_failure: false,
            default_username: default_username(),
            default_password: default_password(),
            elevation: Elevation::default(),
            known_hosts: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceSection {
    #[serde(default = "default_service_name")]
    pub name: String,
    /// Local replacement for the built-in service configuration
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config_file: Option<PathBuf>,
    /// Local replacement for the built-in init script
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub script_file: Option<PathBuf>,
}

fn default_service_name() -> String {
    "tilewall-player".to_string()
}

impl Default for ServiceSection {
    fn default() -> Self {
        Self {
            name: default_service_name(),
            config_file: None,
            script_file: None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub deploy: DeploySection,
    #[serde(default)]
    pub service: ServiceSection,
}

impl Settings {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings file: {}", path.display()))?;
        Self::parse(&content)
            .with_context(|| format!("Invalid settings file: {}", path.display()))
    }

    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse tilewall.toml")
    }

    /// Defaults when the file does not exist.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let content = toml::to_string_pretty(self).context("Failed to serialize tilewall.toml")?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write settings file: {}", path.display()))?;
        Ok(())
    }

    /// Login username (env → file).
    pub fn username(&self) -> String {
        std::env::var(USERNAME_ENV)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| self.deploy.default_username.clone())
    }

    /// Login password (env → file).
    pub fn password(&self) -> SecretString {
        let password = std::env::var(PASSWORD_ENV)
            .ok()
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| self.deploy.default_password.clone());
        SecretString::from(password)
    }

    pub fn credential_defaults(&self) -> CredentialDefaults {
        CredentialDefaults::new(self.username(), self.password())
    }

    pub fn deploy_settings(&self) -> DeploySettings {
        DeploySettings::default()
            .with_connect_options(ConnectOptions {
                port: self.deploy.port,
                connect_timeout: Duration::from_secs(self.deploy.connect_timeout_secs),
                command_timeout: Duration::from_secs(self.deploy.command_timeout_secs),
                known_hosts: self.deploy.known_hosts.clone(),
            })
            .with_connect_attempts(self.deploy.connect_attempts)
            .with_retry_backoff(Duration::from_millis(self.deploy.retry_backoff_ms))
            .with_abort_on_connection_failure(self.deploy.abort_on_connection_failure)
            .with_continue_on_tile_failure(self.deploy.continue_on_tile_failure)
            .with_elevation(self.deploy.elevation)
    }

    /// Validate the settings and return any warnings.
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        if self.deploy.connect_attempts == 0 {
            warnings.push("connect_attempts is 0; one attempt will be made".to_string());
        }
        if self.deploy.connect_timeout_secs == 0 {
            warnings.push("connect_timeout_secs is 0; connections will time out at once".to_string());
        }
        if self.deploy.command_timeout_secs == 0 {
            warnings.push("command_timeout_secs is 0; commands are not bounded".to_string());
        }
        warnings
    }
}
