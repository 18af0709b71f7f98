//! Where each tile's host and login come from.

use secrecy::{ExposeSecret, SecretString};
use std::fmt;

use crate::errors::CredentialError;
use crate::plan::Tile;
use crate::prompt::{InputKind, Prompter};

/// Host and login for one tile's deployment session.
pub struct DeploymentTarget {
    pub hostname: String,
    pub username: String,
    pub password: SecretString,
}

impl fmt::Debug for DeploymentTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeploymentTarget")
            .field("hostname", &self.hostname)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Login used when the operator leaves username or password blank.
#[derive(Clone)]
pub struct CredentialDefaults {
    pub username: String,
    pub password: SecretString,
}

impl CredentialDefaults {
    pub fn new(username: impl Into<String>, password: SecretString) -> Self {
        Self {
            username: username.into(),
            password,
        }
    }

    fn username_or_default(&self, username: &str) -> String {
        let username = username.trim();
        if username.is_empty() {
            self.username.clone()
        } else {
            username.to_string()
        }
    }

    fn password_or_default(&self, password: SecretString) -> SecretString {
        if password.expose_secret().is_empty() {
            self.password.clone()
        } else {
            password
        }
    }
}

pub trait CredentialProvider: Send {
    fn target_for(&mut self, tile: &Tile) -> Result<DeploymentTarget, CredentialError>;
}

/// Ask the operator for every tile's host and login.
pub struct PromptCredentials<P> {
    prompter: P,
    defaults: CredentialDefaults,
}

impl<P: Prompter + Send> PromptCredentials<P> {
    pub fn new(prompter: P, defaults: CredentialDefaults) -> Self {
        Self { prompter, defaults }
    }
}

impl<P: Prompter + Send> CredentialProvider for PromptCredentials<P> {
    fn target_for(&mut self, tile: &Tile) -> Result<DeploymentTarget, CredentialError> {
        self.prompter.say(&format!(
            "Tile {} ({}) at {}x{}+{}+{}",
            tile.sequence_id, tile.name, tile.width, tile.height, tile.x, tile.y
        ));
        let hostname = self
            .prompter
            .ask("Hostname or IP", "hostname", InputKind::Hostname, None)
            .map_err(CredentialError::Prompt)?;
        let username = self
            .prompter
            .ask(
                "Username",
                "username",
                InputKind::FreeText,
                Some(self.defaults.username.as_str()),
            )
            .map_err(CredentialError::Prompt)?;
        let password = self
            .prompter
            .ask_secret("Password (blank for default)")
            .map_err(CredentialError::Prompt)?;

        Ok(DeploymentTarget {
            hostname,
            username: self.defaults.username_or_default(&username),
            password: self.defaults.password_or_default(password),
        })
    }
}

/// Hosts given up front, one per tile in sequence order, sharing one login.
pub struct StaticCredentials {
    hosts: Vec<String>,
    defaults: CredentialDefaults,
}

impl StaticCredentials {
    pub fn new(hosts: Vec<String>, defaults: CredentialDefaults) -> Self {
        Self { hosts, defaults }
    }
}

impl CredentialProvider for StaticCredentials {
    fn target_for(&mut self, tile: &Tile) -> Result<DeploymentTarget, CredentialError> {
        let hostname = tile
            .sequence_id
            .checked_sub(1)
            .and_then(|idx| self.hosts.get(idx as usize))
            .map(|h| h.trim())
            .filter(|h| !h.is_empty())
            .ok_or(CredentialError::MissingHost {
                sequence_id: tile.sequence_id,
            })?;
        Ok(DeploymentTarget {
            hostname: hostname.to_string(),
            username: self.defaults.username.clone(),
            password: self.defaults.password.clone(),
        })
    }
}
