//! Append-only JSON-lines record of every pre-push hook run, rotated by size.
//! Nothing in the workflow reads it back; logging failures are swallowed.

use crate::config::Config;
use crate::error::Result;
use crate::squash::Outcome;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub result: Outcome,
    pub wip_count: usize,
    pub duration_ms: u64,
    pub plan_file: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ExecutionLog {
    path: PathBuf,
    max_bytes: u64,
    max_backups: u32,
}

impl ExecutionLog {
    pub fn new(path: impl Into<PathBuf>, max_bytes: u64, max_backups: u32) -> Self {
        Self {
            path: path.into(),
            max_bytes,
            max_backups,
        }
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self::new(
            config.log_file_path()?,
            config.log_max_bytes,
            config.log_max_backups,
        ))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append an entry, rotating first when the file has outgrown its limit.
    /// Errors are logged at debug level and otherwise ignored.
    pub fn record(&self, entry: &LogEntry) {
        if let Err(e) = self.try_record(entry) {
            tracing::debug!("failed to write execution log: {e}");
        }
    }

    fn try_record(&self, entry: &LogEntry) -> Result<()> {
        if let Ok(meta) = std::fs::metadata(&self.path) {
            if meta.len() > self.max_bytes {
                self.rotate();
            }
        }
        let mut line = serde_json::to_string(entry)?;
        line.push('\n');
        crate::io::append_text(&self.path, &line)
    }

    /// `x.log.(n-1)` → `x.log.n`, …, `x.log` → `x.log.1`. The oldest backup
    /// is overwritten.
    pub fn rotate(&self) {
        for i in (1..self.max_backups).rev() {
            let old = self.backup_path(i);
            if old.exists() {
                if let Err(e) = std::fs::rename(&old, self.backup_path(i + 1)) {
                    tracing::debug!("failed to rotate {}: {e}", old.display());
                }
            }
        }
        if self.path.exists() && self.max_backups > 0 {
            if let Err(e) = std::fs::rename(&self.path, self.backup_path(1)) {
                tracing::debug!("failed to rotate {}: {e}", self.path.display());
            }
        }
    }

    pub fn backup_path(&self, n: u32) -> PathBuf {
        let mut name = self.path.as_os_str().to_owned();
        name.push(format!(".{n}"));
        PathBuf::from(name)
    }
}
