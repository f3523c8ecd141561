//! Run history: JSONL append-only persistence.
//!
//! Each finished run is stored as one JSON object per line: the strategy
//! definition, the run parameters, the dataset hash and the result snapshot.
//! The format survives partial writes: a torn last line is skipped on read.

use std::fs::{self, OpenOptions};
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use tradelab_core::config::{RunParams, StrategyConfig, StrategyDefinition};

use crate::metrics::BacktestResult;
use crate::runner::BacktestRun;

/// A single history entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub strategy: StrategyDefinition,
    pub run_params: RunParams,
    pub dataset_hash: String,
    pub result: BacktestResult,
    pub recorded_at: DateTime<Utc>,
}

impl HistoryEntry {
    pub fn new(config: &StrategyConfig, params: &RunParams, run: &BacktestRun) -> Self {
        Self {
            strategy: config.to_definition(),
            run_params: *params,
            dataset_hash: run.dataset_hash.clone(),
            result: run.result.clone(),
            recorded_at: Utc::now(),
        }
    }
}

/// JSONL history file.
pub struct RunHistory {
    path: PathBuf,
}

impl RunHistory {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Append one entry, creating the file and its parent directory if needed.
    pub fn append(&self, entry: &HistoryEntry) -> io::Result<()> {
        let json = serde_json::to_string(entry)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;

        writeln!(file, "{json}")?;
        file.flush()
    }

    /// Read all entries in file order.
    ///
    /// A missing file is an empty history. Malformed lines are skipped with a warning.
    pub fn read_all(&self) -> io::Result<Vec<HistoryEntry>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let file = fs::File::open(&self.path)?;
        let reader = io::BufReader::new(file);
        let mut entries = Vec::new();

        for (line_no, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<HistoryEntry>(&line) {
                Ok(entry) => entries.push(entry),
                Err(e) => warn!(line = line_no + 1, error = %e, "skipping malformed history line"),
            }
        }

        Ok(entries)
    }

    /// Get the current file size in bytes.
    pub fn file_size_bytes(&self) -> io::Result<u64> {
        match fs::metadata(&self.path) {
            Ok(meta) => Ok(meta.len()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(0),
            Err(e) => Err(e),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Entries sorted by total return, best first.
pub fn best_by_return(entries: &[HistoryEntry], limit: usize) -> Vec<&HistoryEntry> {
    let mut sorted: Vec<&HistoryEntry> = entries.iter().collect();
    sorted.sort_by(|a, b| b.result.total_return_pct.total_cmp(&a.result.total_return_pct));
    sorted.truncate(limit);
    sorted
}

// ─── Tests ───────────────────────────────────────────────────────────
