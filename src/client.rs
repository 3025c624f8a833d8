//! Client-side operations. Each call opens its own TCP connection, sends
//! one request frame, reads one response, and drops the socket.

use std::fs::{self, File};
use std::io::{Read, Write};
use std::net::TcpStream;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};

use crate::frame::{self, Request, Response};
use crate::protocol::CHUNK_SIZE;

/// What a GET produced: a saved file, or the server's error text.
#[derive(Debug)]
pub enum GetOutcome {
    Saved { path: PathBuf, bytes: u64 },
    ServerError(String),
}

/// What a PUT produced: a completed upload, or the server's error text.
#[derive(Debug)]
pub enum PutOutcome {
    Sent { bytes: u64 },
    ServerError(String),
}

fn connect(addr: &str) -> Result<TcpStream> {
    TcpStream::connect(addr).with_context(|| format!("connect {addr}"))
}

fn read_error_text(stream: &mut TcpStream, content_length: u64) -> Result<String> {
    let payload = frame::read_exact(stream, content_length as usize)?;
    Ok(String::from_utf8_lossy(&payload).into_owned())
}

/// Asks the server for its file listing.
pub fn list(addr: &str) -> Result<Vec<String>> {
    let mut stream = connect(addr)?;
    stream.write_all(&frame::encode_request(&Request::List)?)?;
    match frame::decode_response(&mut stream)? {
        Response::Ok { content_length, .. } => {
            let payload = frame::read_exact(&mut stream, content_length as usize)?;
            if (payload.len() as u64) < content_length {
                bail!(
                    "listing truncated: got {} of {} bytes",
                    payload.len(),
                    content_length
                );
            }
            let text = String::from_utf8(payload).context("listing is not valid utf-8")?;
            Ok(text.lines().map(str::to_string).collect())
        }
        Response::Error { content_length } => {
            bail!("server error: {}", read_error_text(&mut stream, content_length)?)
        }
    }
}

/// Downloads `filename` into `dest_dir`, saving under the server-supplied
/// (sanitized) name.
pub fn get(addr: &str, filename: &str, dest_dir: &Path) -> Result<GetOutcome> {
    let mut stream = connect(addr)?;
    stream.write_all(&frame::encode_request(&Request::Get {
        filename: filename.to_string(),
    })?)?;
    match frame::decode_response(&mut stream)? {
        Response::Error { content_length } => Ok(GetOutcome::ServerError(read_error_text(
            &mut stream,
            content_length,
        )?)),
        Response::Ok {
            content_length,
            filename: server_name,
            ..
        } => {
            let name = server_name.unwrap_or_else(|| filename.to_string());
            let path = dest_dir.join(name);
            let mut file =
                File::create(&path).with_context(|| format!("create {}", path.display()))?;
            let mut buf = vec![0u8; CHUNK_SIZE];
            let mut received: u64 = 0;
            while received < content_length {
                let want = (content_length - received).min(CHUNK_SIZE as u64) as usize;
                let n = stream.read(&mut buf[..want])?;
                if n == 0 {
                    break;
                }
                file.write_all(&buf[..n])?;
                received += n as u64;
            }
            if received < content_length {
                bail!("short transfer: got {received} of {content_length} bytes");
            }
            Ok(GetOutcome::Saved {
                path,
                bytes: received,
            })
        }
    }
}

/// Uploads the local file at `local` under `remote_name`. The name is sent
/// as given; the server sanitizes before touching its filesystem.
pub fn put(addr: &str, local: &Path, remote_name: &str) -> Result<PutOutcome> {
    let size = fs::metadata(local)
        .with_context(|| format!("stat {}", local.display()))?
        .len();
    let mut stream = connect(addr)?;
    stream.write_all(&frame::encode_request(&Request::Put {
        filename: remote_name.to_string(),
        content_length: size,
    })?)?;
    match frame::decode_response(&mut stream)? {
        Response::Error { content_length } => Ok(PutOutcome::ServerError(read_error_text(
            &mut stream,
            content_length,
        )?)),
        Response::Ok { .. } => {
            let mut file =
                File::open(local).with_context(|| format!("open {}", local.display()))?;
            let mut buf = vec![0u8; CHUNK_SIZE];
            let mut sent: u64 = 0;
            while sent < size {
                let n = file.read(&mut buf)?;
                if n == 0 {
                    break;
                }
                stream.write_all(&buf[..n])?;
                sent += n as u64;
            }
            Ok(PutOutcome::Sent { bytes: sent })
        }
    }
}
