//! Transport seam between the orchestrator and a node.
//!
//! The orchestrator only ever talks to `Connector` and `RemoteSession`, so
//! the SSH implementation can be swapped for an in-memory one in tests.

use secrecy::SecretString;
use std::path::PathBuf;
use std::time::Duration;

use super::elevation::Elevation;
use crate::errors::{CommandError, ConnectionError, TransferError};

/// Where and as whom to connect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectOptions {
    pub port: u16,
    /// Bounds TCP connect and the SSH handshake
    pub connect_timeout: Duration,
    /// Bounds every blocking operation once connected
    pub command_timeout: Duration,
    /// OpenSSH known_hosts file to check host keys against; unchecked when unset
    pub known_hosts: Option<PathBuf>,
}

impl Default for ConnectOptions {
    fn default() -> Self {
        Self {
            port: 22,
            connect_timeout: Duration::from_secs(10),
            command_timeout: Duration::from_secs(120),
            known_hosts: None,
        }
    }
}

/// Output of a completed remote command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub exit_code: i32,
    /// stdout and stderr, merged
    pub output: String,
}

/// Opens authenticated sessions.
pub trait Connector: Send {
    fn connect(
        &self,
        host: &str,
        username: &str,
        password: &SecretString,
        options: &ConnectOptions,
    ) -> Result<Box<dyn RemoteSession>, ConnectionError>;
}

/// One authenticated session with one node.
pub trait RemoteSession {
    /// Write `contents` to `remote_path` (relative to the login home).
    fn upload(&mut self, remote_path: &str, contents: &[u8], mode: i32)
    -> Result<(), TransferError>;

    /// Run `command` with the given elevation. A non-zero exit status is a
    /// `CommandError::NonZeroExit`.
    fn run_elevated(
        &mut self,
        command: &str,
        elevation: Elevation,
        password: &SecretString,
    ) -> Result<CommandOutput, CommandError>;

    /// Close the session. Safe to call more than once.
    fn close(&mut self);
}
