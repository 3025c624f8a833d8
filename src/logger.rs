use anyhow::Result;
use chrono::Utc;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;

const TIME_FORMAT: &str = "%d/%b/%y %H:%M:%S";

pub trait Logger: Send + Sync {
    fn info(&self, _peer: &str, _msg: &str) {}
    fn error(&self, _peer: &str, _msg: &str) {}
}

pub struct NoopLogger;
impl Logger for NoopLogger {}

/// Default daemon logger: one line per protocol event on stderr.
pub struct StderrLogger;

impl Logger for StderrLogger {
    fn info(&self, peer: &str, msg: &str) {
        eprintln!("{} - {} - {}", peer, Utc::now().format(TIME_FORMAT), msg);
    }
    fn error(&self, peer: &str, msg: &str) {
        eprintln!("{} - {} - ERROR - {}", peer, Utc::now().format(TIME_FORMAT), msg);
    }
}

pub struct TextLogger {
    file: Mutex<File>,
}

impl TextLogger {
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent).ok();
        }
        let f = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            file: Mutex::new(f),
        })
    }

    fn line(&self, s: &str) {
        if let Ok(mut f) = self.file.lock() {
            let _ = writeln!(f, "[{}] {}", Utc::now().to_rfc3339(), s);
        }
    }
}

impl Logger for TextLogger {
    fn info(&self, peer: &str, msg: &str) {
        self.line(&format!("{peer} {msg}"));
    }
    fn error(&self, peer: &str, msg: &str) {
        self.line(&format!("ERROR {peer} {msg}"));
    }
}
