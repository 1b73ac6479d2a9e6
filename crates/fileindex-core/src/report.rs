//! Aggregated index report and its summary.

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use crate::record::FileRecord;

/// Summary statistics over a finished file set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexSummary {
    /// Number of files in the report.
    pub total_files: u64,
    /// Sum of all file sizes in bytes.
    pub total_size: u64,
    /// Root paths requested for this run, in request order.
    pub indexed_paths: Vec<String>,
    /// When the aggregation was captured.
    pub timestamp: DateTime<Local>,
}

impl IndexSummary {
    /// Compute a summary from a file set.
    pub fn compute(files: &[FileRecord], indexed_paths: Vec<String>) -> Self {
        Self {
            total_files: files.len() as u64,
            total_size: files.iter().map(|f| f.size).sum(),
            indexed_paths,
            timestamp: Local::now(),
        }
    }
}

/// The persisted unit of one indexing run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexReport {
    /// Indexed files, in the order of the active sort key.
    pub files: Vec<FileRecord>,
    /// Summary over `files`.
    pub summary: IndexSummary,
}

impl IndexReport {
    /// Aggregate a finished file set into a report.
    ///
    /// Counts and sizes are always recomputed from `files`. The indexed path
    /// list is carried through verbatim.
    pub fn aggregate(files: Vec<FileRecord>, indexed_paths: Vec<String>) -> Self {
        let summary = IndexSummary::compute(&files, indexed_paths);
        Self { files, summary }
    }

    /// Get the total size of all files.
    pub fn total_size(&self) -> u64 {
        self.summary.total_size
    }

    /// Get the total number of files.
    pub fn total_files(&self) -> u64 {
        self.summary.total_files
    }

    /// Check if the report contains no files.
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}
