//! # Execution log
//!
//! Durable, append-only record of every `/execute` decision in JSON Lines
//! form, one object per line:
//!
//! ```json
//! {"timestamp":"2026-01-15T12:00:00Z","agent_did":"did:example:a","role":"notifier","action":"notify","status":"success","message":"notify authorized for notifier"}
//! ```
//!
//! Appends from concurrent requests are serialized by a mutex and each
//! record is a single `write_all` of a newline-terminated buffer, so lines
//! never interleave.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LogError {
    #[error("cannot serialize execution record: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("cannot write execution log {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionStatus {
    Success,
    Failure,
}

/// One line of the execution log. Unknown fields are written as `""`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionRecord {
    pub timestamp: String,
    pub agent_did: String,
    pub role: String,
    pub action: String,
    pub status: ExecutionStatus,
    pub message: String,
}

/// Sink for execution records.
pub trait ExecutionLog: Send + Sync {
    fn append(&self, record: &ExecutionRecord) -> Result<(), LogError>;
}

/// Appends to a JSON Lines file, creating it (and its directory) on demand.
#[derive(Debug)]
pub struct JsonlExecutionLog {
    path: PathBuf,
    lock: Mutex<()>,
}

impl JsonlExecutionLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_err(&self, source: std::io::Error) -> LogError {
        LogError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

impl ExecutionLog for JsonlExecutionLog {
    fn append(&self, record: &ExecutionRecord) -> Result<(), LogError> {
        let mut line = serde_json::to_vec(record)?;
        line.push(b'\n');

        let _guard = self.lock.lock();
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir).map_err(|e| self.io_err(e))?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| self.io_err(e))?;
        file.write_all(&line).map_err(|e| self.io_err(e))
    }
}

/// Keeps records in memory. Used by tests and the offline CLI.
#[derive(Debug, Default)]
pub struct MemoryExecutionLog {
    records: Mutex<Vec<ExecutionRecord>>,
}

impl MemoryExecutionLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<ExecutionRecord> {
        self.records.lock().clone()
    }
}

impl ExecutionLog for MemoryExecutionLog {
    fn append(&self, record: &ExecutionRecord) -> Result<(), LogError> {
        self.records.lock().push(record.clone());
        Ok(())
    }
}
