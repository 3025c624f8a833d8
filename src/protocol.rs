//! Shared wire constants for the skiff framed transport

/// Status codes carried in response headers.
pub mod status {
    pub const OK: u8 = 0;
    pub const ERROR: u8 = 1;
}

/// Method strings carried in request headers.
pub mod method {
    pub const LIST: &str = "LIST";
    pub const GET: &str = "GET";
    pub const PUT: &str = "PUT";
}

/// Payload encoding labels carried in the `encoding` header field.
pub mod encoding_label {
    pub const UTF8: &str = "utf-8";
    pub const BINARY: &str = "binary";
}

// A header is prefixed by its byte length as an unsigned 16-bit big-endian
// integer, so an encoded header can never exceed this.
pub const MAX_HEADER_SIZE: usize = u16::MAX as usize;

// Transfer chunk size for file payloads in both directions.
pub const CHUNK_SIZE: usize = 64 * 1024;
