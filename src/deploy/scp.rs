//! Sending side of the SCP protocol.
//!
//! The remote end runs `scp -t <path>` and the exchange over its channel is:
//!
//! ```text
//! <- \0
//! -> C0644 <len> <basename>\n
//! <- \0
//! -> <len bytes> \0
//! <- \0
//! ```
//!
//! Any ack of `\x01` (warning) or `\x02` (fatal) is followed by a message
//! line and aborts the transfer.

use std::io::{self, Read, Write};

use crate::errors::TransferError;

/// Command that starts the receiving side for `remote_path`.
pub fn sink_command(remote_path: &str) -> String {
    format!("scp -t {}", super::elevation::shell_quote(remote_path))
}

/// File name component of `remote_path`.
fn basename(remote_path: &str) -> &str {
    remote_path.rsplit('/').next().unwrap_or(remote_path)
}

/// Push one file through an already started `scp -t` channel.
pub fn send_file<S: Read + Write>(
    stream: &mut S,
    remote_path: &str,
    contents: &[u8],
    mode: i32,
) -> Result<(), TransferError> {
    let io_err = |source: io::Error| TransferError::Io {
        remote_path: remote_path.to_string(),
        source,
    };

    read_ack(stream, remote_path)?;

    let header = format!(
        "C{:04o} {} {}\n",
        mode & 0o7777,
        contents.len(),
        basename(remote_path)
    );
    tracing::debug!(remote_path, header = header.trim_end(), "scp header");
    stream.write_all(header.as_bytes()).map_err(io_err)?;
    stream.flush().map_err(io_err)?;
    read_ack(stream, remote_path)?;

    stream.write_all(contents).map_err(io_err)?;
    stream.write_all(&[0]).map_err(io_err)?;
    stream.flush().map_err(io_err)?;
    read_ack(stream, remote_path)?;

    Ok(())
}

fn read_ack<S: Read>(stream: &mut S, remote_path: &str) -> Result<(), TransferError> {
    let mut byte = [0u8; 1];
    stream
        .read_exact(&mut byte)
        .map_err(|source| TransferError::Io {
            remote_path: remote_path.to_string(),
            source,
        })?;

    match byte[0] {
        0 => Ok(()),
        level @ (1 | 2) => {
            let message = read_line(stream);
            let message = if message.is_empty() {
                format!("scp error (level {})", level)
            } else {
                message
            };
            Err(TransferError::Rejected {
                remote_path: remote_path.to_string(),
                message,
            })
        }
        other => Err(TransferError::Rejected {
            remote_path: remote_path.to_string(),
            message: format!("unexpected scp response byte 0x{:02x}", other),
        }),
    }
}

/// Read up to a newline or EOF, whichever comes first.
fn read_line<S: Read>(stream: &mut S) -> String {
    let mut line = Vec::new();
    let mut byte = [0u8; 1];
    while let Ok(1) = stream.read(&mut byte) {
        if byte[0] == b'\n' {
            break;
        }
        line.push(byte[0]);
    }
    String::from_utf8_lossy(&line).trim().to_string()
}
