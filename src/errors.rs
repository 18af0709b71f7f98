//! Typed error hierarchy for tilewall.
//!
//! Each subsystem owns its error type:
//! - `ValidationError`: malformed wall geometry input
//! - `ParseError`: malformed section document or wall config
//! - `StateError`: missing or corrupt persisted plan
//! - `ConnectionError`: unreachable node or rejected credentials
//! - `TransferError`: file upload failure
//! - `CommandError`: remote command that failed or exited non-zero
//! - `CredentialError`: deployment target could not be obtained

use std::path::PathBuf;
use thiserror::Error;

/// A wall specification value outside its allowed range.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("Invalid {field}: {message}")]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

/// Errors from parsing a section document or the combined wall config.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("line {line}: {message}")]
    Syntax { line: usize, message: String },

    #[error("duplicate section [{section}] at line {line}")]
    DuplicateSection { section: String, line: usize },

    #[error("wall config has no sections")]
    Empty,

    #[error("section [{section}] is missing key '{key}'")]
    MissingKey { section: String, key: String },

    #[error("section [{section}] key '{key}' is not a valid number: '{value}'")]
    InvalidNumber {
        section: String,
        key: String,
        value: String,
    },

    #[error("wall config has no [{0}] index section")]
    MissingIndex(String),

    #[error("inconsistent wall config: {0}")]
    Inconsistent(String),
}

/// Errors from the persisted plan snapshot.
#[derive(Debug, Error)]
pub enum StateError {
    #[error("No plan found at {path}. Run 'tilewall generate' first.")]
    NotFound { path: PathBuf },

    #[error("Plan snapshot at {path} is corrupt: {reason}")]
    Corrupt { path: PathBuf, reason: String },

    #[error("Failed to access plan snapshot at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors establishing an authenticated session with a node.
#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error("Cannot resolve host '{host}': {message}")]
    Resolve { host: String, message: String },

    #[error("Host {host} is unreachable: {source}")]
    Unreachable {
        host: String,
        #[source]
        source: std::io::Error,
    },

    #[error("SSH handshake with {host} failed: {message}")]
    Handshake { host: String, message: String },

    #[error("Host key of {host} does not match known_hosts (offered {fingerprint})")]
    HostKeyMismatch { host: String, fingerprint: String },

    #[error("Authentication rejected for {username}@{host}: {message}")]
    AuthRejected {
        host: String,
        username: String,
        message: String,
    },
}

impl ConnectionError {
    /// Whether retrying the connection could plausibly succeed.
    ///
    /// Rejected credentials and mismatched host keys are never retried.
    /// Lookup, TCP and handshake failures are.
    pub fn is_transient(&self) -> bool {
        !matches!(
            self,
            ConnectionError::AuthRejected { .. } | ConnectionError::HostKeyMismatch { .. }
        )
    }
}

/// Errors uploading a file to a node.
#[derive(Debug, Error)]
pub enum TransferError {
    #[error("Failed to open transfer channel for {remote_path}: {message}")]
    Channel {
        remote_path: String,
        message: String,
    },

    #[error("I/O failure while uploading {remote_path}: {source}")]
    Io {
        remote_path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Remote rejected {remote_path}: {message}")]
    Rejected {
        remote_path: String,
        message: String,
    },
}

/// A remote command that did not complete successfully.
///
/// Recorded as a warning on the tile report, never fatal.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    #[error("'{command}' exited with status {exit_code}: {output}")]
    NonZeroExit {
        command: String,
        exit_code: i32,
        output: String,
    },

    #[error("'{command}' could not be executed: {message}")]
    Execution { command: String, message: String },
}

/// The credential provider could not produce a deployment target.
#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("No host given for tile {sequence_id}")]
    MissingHost { sequence_id: u32 },

    #[error("Credential prompt failed: {0}")]
    Prompt(#[source] anyhow::Error),
}
