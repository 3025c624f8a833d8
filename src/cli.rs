//! Shared CLI fragments for the skiff and skiffd binaries

use clap::Parser;
use std::path::PathBuf;

/// Daemon options used by skiffd
#[derive(Clone, Debug, Parser)]
pub struct DaemonOpts {
    /// Port to listen on (binds all interfaces)
    pub port: u16,

    /// Root directory to serve
    #[arg(long, default_value = ".")]
    pub root: PathBuf,

    /// Append log lines to this file instead of stderr
    #[arg(long = "log-file")]
    pub log_file: Option<PathBuf>,
}
