//! Session logging
//!
//! One record per finished session, appended to a durable sink. The JSONL
//! sink writes each record as a single line while holding a lock, so records
//! from concurrent sessions never interleave.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::catalog::TaskCategory;
use crate::session::{SessionId, Submission};
use crate::value::IoPair;
use crate::Result;

/// Full trace of one session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub session_id: SessionId,
    pub user_name: String,
    pub task_id: String,
    pub task_category: TaskCategory,
    pub rule_description: String,
    pub queries_used: usize,
    pub query_history: Vec<IoPair>,
    pub submissions: Vec<Submission>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    /// True iff any submission succeeded
    pub success: bool,
}

/// Append-only sink for session records
pub trait SessionLogger: Send + Sync {
    fn append(&self, record: &SessionRecord) -> Result<()>;
}

/// Appends records as JSON lines to a file
#[derive(Debug)]
pub struct JsonlSessionLogger {
    path: PathBuf,
    file: Mutex<File>,
}

impl JsonlSessionLogger {
    /// Open (or create) the log file in append mode, creating parent directories
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        tracing::info!("Session log: {}", path.display());
        Ok(Self {
            path,
            file: Mutex::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SessionLogger for JsonlSessionLogger {
    fn append(&self, record: &SessionRecord) -> Result<()> {
        let mut line = serde_json::to_vec(record)?;
        line.push(b'\n');

        let mut file = self.file.lock();
        file.write_all(&line)?;
        file.flush()?;
        Ok(())
    }
}

/// Keeps records in memory; used for tests and dry runs
#[derive(Debug, Default)]
pub struct MemorySessionLogger {
    records: Mutex<Vec<SessionRecord>>,
}

impl MemorySessionLogger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<SessionRecord> {
        self.records.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }
}

impl SessionLogger for MemorySessionLogger {
    fn append(&self, record: &SessionRecord) -> Result<()> {
        self.records.lock().push(record.clone());
        Ok(())
    }
}
