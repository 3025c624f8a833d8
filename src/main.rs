//! skiff — command-line client for the skiff file server.

use anyhow::Result;
use clap::Parser;
use std::path::Path;

use skiff::client::{self, GetOutcome, PutOutcome};
use skiff::protocol::method;

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Simple file server client: LIST, GET and PUT over TCP"
)]
struct Args {
    /// Hostname to connect to
    host: String,

    /// Port to connect to
    port: u16,

    /// Method to perform [LIST, GET, PUT]
    method: String,

    /// Filename for the GET and PUT methods
    #[arg(default_value = "")]
    filename: String,
}

fn main() -> Result<()> {
    let args = Args::parse();
    let method_name = args.method.to_ascii_uppercase();

    if !matches!(
        method_name.as_str(),
        method::LIST | method::GET | method::PUT
    ) {
        eprintln!("Method Unknown: Only LIST, GET and PUT are supported");
        std::process::exit(1);
    }
    if method_name == method::PUT && !Path::new(&args.filename).exists() {
        eprintln!("No file named \"{}\"", args.filename);
        std::process::exit(1);
    }

    let addr = format!("{}:{}", args.host, args.port);
    match method_name.as_str() {
        method::LIST => {
            for name in client::list(&addr)? {
                println!("{name}");
            }
        }
        method::GET => match client::get(&addr, &args.filename, Path::new("."))? {
            GetOutcome::Saved { path, bytes } => {
                println!("Saved {} ({} bytes)", path.display(), bytes);
            }
            GetOutcome::ServerError(msg) => {
                eprintln!("{msg}");
                std::process::exit(1);
            }
        },
        method::PUT => match client::put(&addr, Path::new(&args.filename), &args.filename)? {
            PutOutcome::Sent { bytes } => {
                println!("Sent {} ({} bytes)", args.filename, bytes);
            }
            PutOutcome::ServerError(msg) => {
                eprintln!("{msg}");
                std::process::exit(1);
            }
        },
        _ => unreachable!(),
    }
    Ok(())
}
