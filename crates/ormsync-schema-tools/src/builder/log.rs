//! SQL audit log
//!
//! Every statement a builder runs can be appended to a per-connection log
//! file so deployments keep a record of schema changes.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use parking_lot::Mutex;

/// Destination for logged statements
pub trait SqlLogSink: Send + Sync {
    /// Append `text` to the log at `path`
    fn append(&self, path: &Path, text: &str) -> std::io::Result<()>;
}

/// Text appended for one statement
pub fn format_entry(sql: &str, at: DateTime<Local>) -> String {
    format!("\n--\n--{}\n--\n{}", at.format("%Y-%m-%d %H:%M:%S"), sql)
}

/// Appends to files on disk. The log directory must already exist.
#[derive(Debug, Default, Clone, Copy)]
pub struct FileLogSink;

impl SqlLogSink for FileLogSink {
    fn append(&self, path: &Path, text: &str) -> std::io::Result<()> {
        let mut file = OpenOptions::new().create(true).append(true).open(path)?;
        file.write_all(text.as_bytes())
    }
}

/// Keeps log entries in memory
#[derive(Debug, Default)]
pub struct MemoryLogSink {
    entries: Mutex<Vec<(PathBuf, String)>>,
}

impl MemoryLogSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<(PathBuf, String)> {
        self.entries.lock().clone()
    }

    /// Everything appended to `path`, concatenated
    pub fn contents(&self, path: &Path) -> String {
        self.entries
            .lock()
            .iter()
            .filter(|(p, _)| p == path)
            .map(|(_, text)| text.as_str())
            .collect()
    }
}

impl SqlLogSink for MemoryLogSink {
    fn append(&self, path: &Path, text: &str) -> std::io::Result<()> {
        self.entries
            .lock()
            .push((path.to_path_buf(), text.to_string()));
        Ok(())
    }
}
