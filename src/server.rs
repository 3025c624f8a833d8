//! Server side: accept loop, request dispatch, and the three transfer
//! handlers (LIST, GET, PUT).
//!
//! Connections are handled strictly one at a time: the next accept does not
//! run until the current request has been answered and its socket dropped.
//! Reads and writes are blocking with no timeout, so a stalled peer blocks
//! the whole server.

use std::fs::{self, File};
use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::frame::{self, Encoding, ProtocolError, Request, Response};
use crate::logger::Logger;
use crate::protocol::CHUNK_SIZE;
use crate::sanitize::secure_filename;

/// Immutable server configuration, passed into [`serve`]. The listening
/// socket itself lives only inside `serve` and closes on every exit path.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind, e.g. `0.0.0.0:9041`.
    pub bind_addr: String,
    /// Working directory served to clients. Read by LIST/GET, written by PUT.
    pub root: PathBuf,
}

pub fn serve(config: &ServerConfig, logger: &dyn Logger) -> Result<()> {
    let listener = TcpListener::bind(&config.bind_addr)
        .with_context(|| format!("bind {}", config.bind_addr))?;
    for conn in listener.incoming() {
        match conn {
            Ok(mut stream) => {
                let peer = stream
                    .peer_addr()
                    .map(|a| a.to_string())
                    .unwrap_or_else(|_| "unknown".to_string());
                if let Err(e) = handle_conn(&mut stream, &config.root, &peer, logger) {
                    logger.error(&peer, &format!("connection error: {e}"));
                }
            }
            Err(e) => {
                logger.error("accept", &e.to_string());
            }
        }
    }
    Ok(())
}

/// Decode exactly one request frame and dispatch it. Per-request failures
/// are answered or logged here; only unexpected I/O escapes to the caller,
/// where it is logged without stopping the accept loop.
fn handle_conn(
    stream: &mut TcpStream,
    root: &Path,
    peer: &str,
    logger: &dyn Logger,
) -> Result<()> {
    let request = match frame::decode_request(stream) {
        Ok(request) => request,
        Err(ProtocolError::UnknownMethod(m)) => {
            // No response frame for an unrecognized method, just close.
            logger.error(peer, &format!("Method Unknown: {m:?}"));
            return Ok(());
        }
        Err(e) => {
            logger.error(peer, &format!("Could not extract the header: {e}"));
            // Best effort; the peer may already be gone.
            let _ = send_error(stream, "send request with a header, see documentation.");
            return Ok(());
        }
    };
    match request {
        Request::List => list_handler(stream, root, peer, logger),
        Request::Get { filename } => get_handler(stream, root, &filename, peer, logger),
        Request::Put {
            filename,
            content_length,
        } => put_handler(stream, root, &filename, content_length, peer, logger),
    }
}

fn send_error(stream: &mut TcpStream, msg: &str) -> Result<(), ProtocolError> {
    let payload = msg.as_bytes();
    let header = frame::encode_response(&Response::Error {
        content_length: payload.len() as u64,
    })?;
    stream.write_all(&header)?;
    stream.write_all(payload)?;
    Ok(())
}

/// Regular files in the working directory, newline-joined. An empty
/// directory yields an empty payload, never an error.
fn list_handler(
    stream: &mut TcpStream,
    root: &Path,
    peer: &str,
    logger: &dyn Logger,
) -> Result<()> {
    let mut names = Vec::new();
    for entry in fs::read_dir(root).with_context(|| format!("read dir {}", root.display()))? {
        let entry = entry?;
        if entry.file_type()?.is_file() {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
    }
    let payload = names.join("\n").into_bytes();
    let header = frame::encode_response(&Response::Ok {
        encoding: Encoding::Utf8,
        content_length: payload.len() as u64,
        filename: None,
    })?;
    stream.write_all(&header)?;
    stream.write_all(&payload)?;
    logger.info(peer, "LIST - OK -");
    Ok(())
}

fn get_handler(
    stream: &mut TcpStream,
    root: &Path,
    raw_name: &str,
    peer: &str,
    logger: &dyn Logger,
) -> Result<()> {
    let name = secure_filename(raw_name);
    let path = root.join(&name);
    if name.is_empty() || !path.is_file() {
        send_error(stream, &format!("File not found \"{name}\""))?;
        logger.error(peer, &format!("GET - Error - File not found \"{name}\""));
        return Ok(());
    }

    // Size is captured once; concurrent modification mid-stream is out of
    // scope for this protocol.
    let file_len = fs::metadata(&path)?.len();
    let header = frame::encode_response(&Response::Ok {
        encoding: Encoding::Binary,
        content_length: file_len,
        filename: Some(name.clone()),
    })?;
    stream.write_all(&header)?;

    let mut file = File::open(&path)?;
    let mut buf = vec![0u8; CHUNK_SIZE];
    let mut remaining = file_len;
    while remaining > 0 {
        let want = remaining.min(CHUNK_SIZE as u64) as usize;
        let n = file.read(&mut buf[..want])?;
        if n == 0 {
            break;
        }
        if let Err(e) = stream.write_all(&buf[..n]) {
            logger.info(
                peer,
                &format!("GET {name} - Error - Client Disconnected ({e})"),
            );
            return Ok(());
        }
        remaining -= n as u64;
    }
    logger.info(peer, &format!("GET {name} - OK -"));
    Ok(())
}

fn put_handler(
    stream: &mut TcpStream,
    root: &Path,
    raw_name: &str,
    content_length: u64,
    peer: &str,
    logger: &dyn Logger,
) -> Result<()> {
    let name = secure_filename(raw_name);
    if name.is_empty() {
        // An empty sanitized name can never exist or be created.
        send_error(stream, &format!("File not found \"{name}\""))?;
        logger.error(peer, "PUT - Error - empty filename after sanitization");
        return Ok(());
    }
    let path = root.join(&name);
    // Any filesystem entry counts as a conflict, not just regular files.
    // The declared payload is not drained; the connection closes after this.
    if path.symlink_metadata().is_ok() {
        let msg = format!("File Exists: \"{name}\"");
        send_error(stream, &msg)?;
        logger.error(peer, &format!("PUT - Error - {msg}"));
        return Ok(());
    }

    let ack = frame::encode_response(&Response::Ok {
        encoding: Encoding::Utf8,
        content_length: 0,
        filename: None,
    })?;
    stream.write_all(&ack)?;

    if content_length == 0 {
        logger.error(peer, "Ignoring zero sized file");
        return Ok(());
    }

    let mut file =
        File::create(&path).with_context(|| format!("create {}", path.display()))?;
    let mut buf = vec![0u8; CHUNK_SIZE];
    let mut received: u64 = 0;
    while received < content_length {
        let want = (content_length - received).min(CHUNK_SIZE as u64) as usize;
        let n = match stream.read(&mut buf[..want]) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(_) => break,
        };
        file.write_all(&buf[..n])?;
        received += n as u64;
    }

    // Early disconnect leaves the partial file in place; no rollback.
    if received < content_length {
        logger.error(
            peer,
            &format!("PUT {name} - Error - short transfer: {received} of {content_length} bytes"),
        );
    } else {
        logger.info(peer, &format!("PUT {name} - OK -"));
    }
    Ok(())
}
