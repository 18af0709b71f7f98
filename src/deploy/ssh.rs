//! SSH transport built on libssh2.

use secrecy::{ExposeSecret, SecretString};
use ssh2::{Channel, CheckResult, ExtendedData, HashType, KnownHostFileKind, Session};
use std::io::{self, Read, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::path::Path;
use std::time::Duration;

use super::elevation::Elevation;
use super::scp;
use super::session::{CommandOutput, ConnectOptions, Connector, RemoteSession};
use crate::errors::{CommandError, ConnectionError, TransferError};

fn millis(duration: Duration) -> u32 {
    u32::try_from(duration.as_millis()).unwrap_or(u32::MAX)
}

/// Colon-separated lowercase hex, as printed next to a host name in logs.
fn fingerprint(hash: &[u8]) -> String {
    hash.iter()
        .map(|b| format!("{:02x}", b))
        .collect::<Vec<_>>()
        .join(":")
}

/// Check the server's key against an OpenSSH known_hosts file.
///
/// A host missing from the file is logged and accepted; a different key
/// for a listed host is refused.
fn verify_host_key(
    session: &Session,
    host: &str,
    port: u16,
    known_hosts: &Path,
    offered: &str,
) -> Result<(), ConnectionError> {
    let failed = |message: String| ConnectionError::Handshake {
        host: host.to_string(),
        message,
    };

    let mut known = session.known_hosts().map_err(|e| failed(e.to_string()))?;
    known
        .read_file(known_hosts, KnownHostFileKind::OpenSSH)
        .map_err(|e| failed(format!("cannot read {}: {}", known_hosts.display(), e)))?;
    let (key, _) = session
        .host_key()
        .ok_or_else(|| failed("server offered no host key".to_string()))?;

    match known.check_port(host, port, key) {
        CheckResult::Match => Ok(()),
        CheckResult::NotFound => {
            tracing::warn!(
                host,
                fingerprint = offered,
                known_hosts = %known_hosts.display(),
                "host not listed in known_hosts"
            );
            Ok(())
        }
        CheckResult::Mismatch => Err(ConnectionError::HostKeyMismatch {
            host: host.to_string(),
            fingerprint: offered.to_string(),
        }),
        CheckResult::Failure => Err(failed("known_hosts lookup failed".to_string())),
    }
}

/// Password-authenticated SSH sessions over TCP.
#[derive(Debug, Default, Clone, Copy)]
pub struct SshConnector;

impl SshConnector {
    fn open_tcp(host: &str, options: &ConnectOptions) -> Result<TcpStream, ConnectionError> {
        let addrs = (host, options.port)
            .to_socket_addrs()
            .map_err(|e| ConnectionError::Resolve {
                host: host.to_string(),
                message: e.to_string(),
            })?;

        let mut last_error = None;
        for addr in addrs {
            match TcpStream::connect_timeout(&addr, options.connect_timeout) {
                Ok(stream) => return Ok(stream),
                Err(e) => {
                    tracing::debug!(%addr, error = %e, "tcp connect failed");
                    last_error = Some(e);
                }
            }
        }
        Err(ConnectionError::Unreachable {
            host: host.to_string(),
            source: last_error.unwrap_or_else(|| {
                io::Error::new(io::ErrorKind::NotFound, "host resolved to no addresses")
            }),
        })
    }
}

impl Connector for SshConnector {
    fn connect(
        &self,
        host: &str,
        username: &str,
        password: &SecretString,
        options: &ConnectOptions,
    ) -> Result<Box<dyn RemoteSession>, ConnectionError> {
        let handshake_err = |e: ssh2::Error| ConnectionError::Handshake {
            host: host.to_string(),
            message: e.to_string(),
        };

        let tcp = Self::open_tcp(host, options)?;
        let mut session = Session::new().map_err(handshake_err)?;
        session.set_tcp_stream(tcp);
        session.set_timeout(millis(options.connect_timeout));
        session.handshake().map_err(handshake_err)?;

        let offered = session
            .host_key_hash(HashType::Sha256)
            .map(fingerprint)
            .unwrap_or_else(|| "unavailable".to_string());
        tracing::info!(host, fingerprint = %offered, "host key (sha256)");
        if let Some(known_hosts) = &options.known_hosts {
            verify_host_key(&session, host, options.port, known_hosts, &offered)?;
        }

        let rejected = |message: String| ConnectionError::AuthRejected {
            host: host.to_string(),
            username: username.to_string(),
            message,
        };
        session
            .userauth_password(username, password.expose_secret())
            .map_err(|e| rejected(e.to_string()))?;
        if !session.authenticated() {
            return Err(rejected("server did not accept the password".to_string()));
        }

        session.set_timeout(millis(options.command_timeout));
        tracing::debug!(host, username, "ssh session established");
        Ok(Box::new(SshSession {
            host: host.to_string(),
            session: Some(session),
        }))
    }
}

pub struct SshSession {
    host: String,
    session: Option<Session>,
}

impl SshSession {
    fn channel(&self) -> Result<Channel, ssh2::Error> {
        match &self.session {
            Some(session) => session.channel_session(),
            None => Err(ssh2::Error::new(
                ssh2::ErrorCode::Session(-7),
                "session already closed",
            )),
        }
    }
}

/// Signal EOF, wait for the remote side to finish and return its exit status.
fn finish(channel: &mut Channel) -> Result<i32, ssh2::Error> {
    channel.send_eof()?;
    channel.wait_eof()?;
    channel.close()?;
    channel.wait_close()?;
    channel.exit_status()
}

impl RemoteSession for SshSession {
    fn upload(
        &mut self,
        remote_path: &str,
        contents: &[u8],
        mode: i32,
    ) -> Result<(), TransferError> {
        let channel_err = |e: ssh2::Error| TransferError::Channel {
            remote_path: remote_path.to_string(),
            message: e.to_string(),
        };

        let mut channel = self.channel().map_err(channel_err)?;
        channel
            .exec(&scp::sink_command(remote_path))
            .map_err(channel_err)?;
        scp::send_file(&mut channel, remote_path, contents, mode)?;
        let status = finish(&mut channel).map_err(channel_err)?;
        if status != 0 {
            return Err(TransferError::Rejected {
                remote_path: remote_path.to_string(),
                message: format!("scp exited with status {}", status),
            });
        }

        tracing::debug!(host = %self.host, remote_path, bytes = contents.len(), "uploaded");
        Ok(())
    }

    fn run_elevated(
        &mut self,
        command: &str,
        elevation: Elevation,
        password: &SecretString,
    ) -> Result<CommandOutput, CommandError> {
        let exec_err = |e: ssh2::Error| CommandError::Execution {
            command: command.to_string(),
            message: e.to_string(),
        };
        let io_err = |e: io::Error| CommandError::Execution {
            command: command.to_string(),
            message: e.to_string(),
        };

        let mut channel = self.channel().map_err(exec_err)?;
        channel
            .handle_extended_data(ExtendedData::Merge)
            .map_err(exec_err)?;
        channel.exec(&elevation.wrap(command)).map_err(exec_err)?;

        if elevation.needs_password() {
            channel
                .write_all(format!("{}\n", password.expose_secret()).as_bytes())
                .map_err(io_err)?;
            channel.flush().map_err(io_err)?;
        }
        channel.send_eof().map_err(exec_err)?;

        let mut output = String::new();
        channel.read_to_string(&mut output).map_err(io_err)?;
        channel.wait_close().map_err(exec_err)?;
        let exit_code = channel.exit_status().map_err(exec_err)?;
        let output = output.trim().to_string();

        if exit_code != 0 {
            return Err(CommandError::NonZeroExit {
                command: command.to_string(),
                exit_code,
                output,
            });
        }
        Ok(CommandOutput { exit_code, output })
    }

    fn close(&mut self) {
        if let Some(session) = self.session.take() {
            if let Err(e) = session.disconnect(None, "provisioning complete", None) {
                tracing::debug!(host = %self.host, error = %e, "disconnect failed");
            }
            tracing::debug!(host = %self.host, "ssh session closed");
        }
    }
}

impl Drop for SshSession {
    fn drop(&mut self) {
        self.close();
    }
}
