//! Frame codec for the skiff wire protocol.
//!
//! Every frame is a 2-byte big-endian length prefix followed by that many
//! bytes of UTF-8 JSON describing a request or response, optionally followed
//! by exactly `content-length` raw payload bytes on the same connection.
//! One connection carries one request frame and at most one response frame.

use std::io::Read;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::protocol::{encoding_label, method, status, MAX_HEADER_SIZE};

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("encoded header is {0} bytes, too large for the u16 length prefix")]
    EncodingTooLarge(usize),
    #[error("malformed frame: {0}")]
    Framing(String),
    #[error("unknown method {0:?}")]
    UnknownMethod(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Payload encoding declared in a response header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    Utf8,
    Binary,
}

impl Encoding {
    pub fn as_str(self) -> &'static str {
        match self {
            Encoding::Utf8 => encoding_label::UTF8,
            Encoding::Binary => encoding_label::BINARY,
        }
    }

    fn parse(label: &str) -> Result<Self, ProtocolError> {
        match label {
            encoding_label::UTF8 => Ok(Encoding::Utf8),
            encoding_label::BINARY => Ok(Encoding::Binary),
            other => Err(ProtocolError::Framing(format!(
                "unknown encoding {other:?}"
            ))),
        }
    }
}

/// A decoded request header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    List,
    Get {
        filename: String,
    },
    Put {
        filename: String,
        content_length: u64,
    },
}

/// A decoded response header. `content_length` on the error side is the
/// byte length of the UTF-8 message that follows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    Ok {
        encoding: Encoding,
        content_length: u64,
        filename: Option<String>,
    },
    Error {
        content_length: u64,
    },
}

/// Loose field table matching the JSON wire encoding. Typed message kinds
/// cross this boundary only inside encode/decode.
#[derive(Debug, Serialize, Deserialize)]
struct HeaderFields {
    #[serde(skip_serializing_if = "Option::is_none")]
    method: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    status: Option<u8>,
    encoding: String,
    #[serde(rename = "content-length", default)]
    content_length: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    filename: Option<String>,
}

fn encode_fields(fields: &HeaderFields) -> Result<Vec<u8>, ProtocolError> {
    let body =
        serde_json::to_vec(fields).map_err(|e| ProtocolError::Framing(e.to_string()))?;
    if body.len() > MAX_HEADER_SIZE {
        return Err(ProtocolError::EncodingTooLarge(body.len()));
    }
    let mut buf = Vec::with_capacity(2 + body.len());
    buf.extend_from_slice(&(body.len() as u16).to_be_bytes());
    buf.extend_from_slice(&body);
    Ok(buf)
}

pub fn encode_request(request: &Request) -> Result<Vec<u8>, ProtocolError> {
    let fields = match request {
        Request::List => HeaderFields {
            method: Some(method::LIST.to_string()),
            status: None,
            encoding: encoding_label::UTF8.to_string(),
            content_length: 0,
            filename: None,
        },
        Request::Get { filename } => HeaderFields {
            method: Some(method::GET.to_string()),
            status: None,
            encoding: encoding_label::BINARY.to_string(),
            content_length: 0,
            filename: Some(filename.clone()),
        },
        Request::Put {
            filename,
            content_length,
        } => HeaderFields {
            method: Some(method::PUT.to_string()),
            status: None,
            encoding: encoding_label::BINARY.to_string(),
            content_length: *content_length,
            filename: Some(filename.clone()),
        },
    };
    encode_fields(&fields)
}

pub fn encode_response(response: &Response) -> Result<Vec<u8>, ProtocolError> {
    let fields = match response {
        Response::Ok {
            encoding,
            content_length,
            filename,
        } => HeaderFields {
            method: None,
            status: Some(status::OK),
            encoding: encoding.as_str().to_string(),
            content_length: *content_length,
            filename: filename.clone(),
        },
        Response::Error { content_length } => HeaderFields {
            method: None,
            status: Some(status::ERROR),
            encoding: encoding_label::UTF8.to_string(),
            content_length: *content_length,
            filename: None,
        },
    };
    encode_fields(&fields)
}

/// Read up to `n` bytes, looping over partial deliveries. Returns a shorter
/// buffer only when the peer closed the connection early; callers compare
/// the returned length against `n` to detect a truncated transfer.
pub fn read_exact<R: Read>(reader: &mut R, n: usize) -> std::io::Result<Vec<u8>> {
    let mut buf = vec![0u8; n];
    let mut filled = 0;
    while filled < n {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(k) => filled += k,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    buf.truncate(filled);
    Ok(buf)
}

fn read_header_fields<R: Read>(reader: &mut R) -> Result<HeaderFields, ProtocolError> {
    let prefix = read_exact(reader, 2)?;
    if prefix.len() < 2 {
        return Err(ProtocolError::Framing(
            "connection closed before length prefix".to_string(),
        ));
    }
    let len = u16::from_be_bytes([prefix[0], prefix[1]]) as usize;
    let body = read_exact(reader, len)?;
    if body.len() < len {
        return Err(ProtocolError::Framing(format!(
            "header truncated: got {} of {} bytes",
            body.len(),
            len
        )));
    }
    serde_json::from_slice(&body).map_err(|e| ProtocolError::Framing(e.to_string()))
}

pub fn decode_request<R: Read>(reader: &mut R) -> Result<Request, ProtocolError> {
    let fields = read_header_fields(reader)?;
    let method_name = fields
        .method
        .ok_or_else(|| ProtocolError::Framing("request header missing method".to_string()))?;
    match method_name.as_str() {
        method::LIST => Ok(Request::List),
        method::GET => {
            let filename = fields.filename.ok_or_else(|| {
                ProtocolError::Framing("GET header missing filename".to_string())
            })?;
            Ok(Request::Get { filename })
        }
        method::PUT => {
            let filename = fields.filename.ok_or_else(|| {
                ProtocolError::Framing("PUT header missing filename".to_string())
            })?;
            Ok(Request::Put {
                filename,
                content_length: fields.content_length,
            })
        }
        _ => Err(ProtocolError::UnknownMethod(method_name)),
    }
}

pub fn decode_response<R: Read>(reader: &mut R) -> Result<Response, ProtocolError> {
    let fields = read_header_fields(reader)?;
    match fields.status {
        Some(status::OK) => Ok(Response::Ok {
            encoding: Encoding::parse(&fields.encoding)?,
            content_length: fields.content_length,
            filename: fields.filename,
        }),
        Some(status::ERROR) => Ok(Response::Error {
            content_length: fields.content_length,
        }),
        Some(other) => Err(ProtocolError::Framing(format!("unknown status {other}"))),
        None => Err(ProtocolError::Framing(
            "response header missing status".to_string(),
        )),
    }
}
