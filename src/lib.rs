//! Skiff — minimal remote file access over TCP
//!
//! A client can LIST the files a server holds, GET one by name, or PUT a
//! new one, with exactly one request per connection. Headers travel as
//! length-prefixed JSON; payloads follow as raw bytes.

pub mod cli;
pub mod client;
pub mod frame;
pub mod logger;
pub mod netutil;
pub mod protocol;
pub mod sanitize;
pub mod server;
