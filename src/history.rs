//! Session history
//!
//! One JSON line per finished session, appended to `sessions.jsonl` under
//! the history directory. Lines that fail to parse are skipped on read.

use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::distribution::SessionSummary;
use crate::error::Result;

const HISTORY_FILE: &str = "sessions.jsonl";

/// Flattened record of one finished session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub started_at: DateTime<Utc>,
    pub elapsed_secs: u64,
    pub end_reason: String,
    pub total_sent: u64,
    pub total_requested: u64,
    pub attempts: usize,
    pub permanent_skips: usize,
    pub temporary_skips: usize,
}

impl From<&SessionSummary> for HistoryEntry {
    fn from(summary: &SessionSummary) -> Self {
        Self {
            started_at: summary.started_at,
            elapsed_secs: summary.elapsed.as_secs(),
            end_reason: summary.end_reason.to_string(),
            total_sent: summary.total_sent,
            total_requested: summary.total_requested,
            attempts: summary.attempts,
            permanent_skips: summary.permanent_skips,
            temporary_skips: summary.temporary_skips,
        }
    }
}

/// Append-only JSONL log of session summaries
#[derive(Debug, Clone)]
pub struct SessionHistory {
    path: PathBuf,
}

impl SessionHistory {
    /// Open (creating if needed) the history directory
    pub fn new(dir: impl AsRef<Path>) -> Result<Self> {
        fs::create_dir_all(dir.as_ref())?;
        Ok(Self {
            path: dir.as_ref().join(HISTORY_FILE),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn append(&self, summary: &SessionSummary) -> Result<HistoryEntry> {
        let entry = HistoryEntry::from(summary);
        let mut file = OpenOptions::new().create(true).append(true).open(&self.path)?;
        writeln!(file, "{}", serde_json::to_string(&entry)?)?;
        Ok(entry)
    }

    /// The last `limit` entries, oldest first
    pub fn recent(&self, limit: usize) -> Result<Vec<HistoryEntry>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let reader = BufReader::new(File::open(&self.path)?);
        let mut entries = Vec::new();
        for line in reader.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<HistoryEntry>(&line) {
                Ok(entry) => entries.push(entry),
                Err(e) => log::warn!("Skipping malformed history line in {}: {}", self.path.display(), e),
            }
        }
        let skip = entries.len().saturating_sub(limit);
        Ok(entries.split_off(skip))
    }
}
