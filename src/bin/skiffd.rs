//! skiffd — the skiff file server daemon.

use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;

use skiff::cli::DaemonOpts;
use skiff::logger::{Logger, StderrLogger, TextLogger};
use skiff::netutil;
use skiff::server::{serve, ServerConfig};

fn main() -> Result<()> {
    let opts = DaemonOpts::parse();

    ctrlc::set_handler(|| {
        eprintln!("\nExiting...");
        std::process::exit(0);
    })
    .context("Error setting Ctrl-C handler")?;

    if !opts.root.is_dir() {
        anyhow::bail!("Root path is not a directory: {}", opts.root.display());
    }
    let root = std::fs::canonicalize(&opts.root)
        .with_context(|| format!("canonicalize root {}", opts.root.display()))?;

    let logger: Arc<dyn Logger> = match opts.log_file {
        Some(ref path) => Arc::new(TextLogger::new(path)?),
        None => Arc::new(StderrLogger),
    };

    let config = ServerConfig {
        bind_addr: format!("0.0.0.0:{}", opts.port),
        root,
    };
    println!(
        "Server up and running at {}:{} ...",
        netutil::display_ip(),
        opts.port
    );
    serve(&config, logger.as_ref())
}
