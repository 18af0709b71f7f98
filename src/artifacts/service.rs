//! Playback service shipped to every node.
//!
//! The default configuration and init script are compiled into the binary.
//! Either one can be replaced by a local file named in the settings file.
//! `@SERVICE@` in either text is replaced by the configured service name and
//! `@INDEX@` by the wall config's index section. `@USER@` is left in place
//! until the login user of a tile is known.

use anyhow::{Context, Result, bail};
use rust_embed::RustEmbed;
use std::fs;
use std::path::Path;

use super::serializer::INDEX_SECTION;

#[derive(RustEmbed)]
#[folder = "$CARGO_MANIFEST_DIR/assets/service/"]
struct ServiceAssets;

const DEFAULT_CONFIG: &str = "player.conf";
const DEFAULT_SCRIPT: &str = "player.init";
const NAME_PLACEHOLDER: &str = "@SERVICE@";
const INDEX_PLACEHOLDER: &str = "@INDEX@";
const USER_PLACEHOLDER: &str = "@USER@";

/// Upload mode for the staged service files.
pub const SERVICE_FILE_MODE: i32 = 0o755;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceBundle {
    pub name: String,
    pub config: String,
    pub script: String,
}

impl ServiceBundle {
    /// Build the bundle for service `name`, preferring the override files
    /// when given.
    pub fn load(name: &str, config_file: Option<&Path>, script_file: Option<&Path>) -> Result<Self> {
        validate_service_name(name)?;
        let config = match config_file {
            Some(path) => read_override(path)?,
            None => embedded(DEFAULT_CONFIG)?,
        };
        let script = match script_file {
            Some(path) => read_override(path)?,
            None => embedded(DEFAULT_SCRIPT)?,
        };
        let render = |text: String| {
            text.replace(NAME_PLACEHOLDER, name)
                .replace(INDEX_PLACEHOLDER, INDEX_SECTION)
        };
        Ok(Self {
            name: name.to_string(),
            config: render(config),
            script: render(script),
        })
    }

    /// Service configuration for a node logged into as `username`.
    pub fn config_for(&self, username: &str) -> String {
        self.config.replace(USER_PLACEHOLDER, username)
    }

    /// Init script for a node logged into as `username`.
    pub fn script_for(&self, username: &str) -> String {
        self.script.replace(USER_PLACEHOLDER, username)
    }

    pub fn staged_config_name(&self) -> String {
        format!("{}.conf.staged", self.name)
    }

    pub fn staged_script_name(&self) -> String {
        format!("{}.init.staged", self.name)
    }

    /// Privileged commands that install and start the staged service, in
    /// execution order.
    pub fn activation_commands(&self) -> Vec<String> {
        vec![
            format!("mv {} /etc/{}.conf", self.staged_config_name(), self.name),
            format!("mv {} /etc/init.d/{}", self.staged_script_name(), self.name),
            format!("update-rc.d {} defaults", self.name),
            format!("service {} start", self.name),
        ]
    }
}

/// Service names end up in shell commands and file paths.
fn validate_service_name(name: &str) -> Result<()> {
    let valid = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.')
        && !name.starts_with('.');
    if !valid {
        bail!(
            "Invalid service name '{}': use letters, digits, '-', '_' or '.'",
            name
        );
    }
    Ok(())
}

fn embedded(file: &str) -> Result<String> {
    let asset = ServiceAssets::get(file)
        .with_context(|| format!("Embedded service asset '{}' is missing", file))?;
    String::from_utf8(asset.data.into_owned())
        .with_context(|| format!("Embedded service asset '{}' is not UTF-8", file))
}

fn read_override(path: &Path) -> Result<String> {
    fs::read_to_string(path)
        .with_context(|| format!("Failed to read service file {}", path.display()))
}
