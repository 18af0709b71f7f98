//! Running provisioning commands with root privileges.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How privileged commands are run on a node.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Elevation {
    /// `sudo -S`, fed the login password on stdin
    #[default]
    Sudo,
    /// The login user is already root
    None,
}

impl Elevation {
    /// The command line to execute remotely.
    pub fn wrap(&self, command: &str) -> String {
        match self {
            Elevation::Sudo => format!("sudo -S -p '' sh -c {}", shell_quote(command)),
            Elevation::None => command.to_string(),
        }
    }

    /// Whether the password must be written to the command's stdin.
    pub fn needs_password(&self) -> bool {
        matches!(self, Elevation::Sudo)
    }
}

impl fmt::Display for Elevation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Elevation::Sudo => write!(f, "sudo"),
            Elevation::None => write!(f, "none"),
        }
    }
}

impl FromStr for Elevation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sudo" => Ok(Elevation::Sudo),
            "none" => Ok(Elevation::None),
            other => Err(format!("unknown elevation '{}' (expected sudo or none)", other)),
        }
    }
}

/// Single-quote `s` for a POSIX shell.
pub fn shell_quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', r"'\''"))
}
