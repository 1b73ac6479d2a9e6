//! Per-run indexing configuration.

use std::path::PathBuf;
use std::time::Duration;

use derive_builder::Builder;
use serde::{Deserialize, Serialize};

use crate::sort::SortKey;

/// Path segment names excluded by default.
pub const DEFAULT_EXCLUDED_NAMES: &[&str] = &[
    "$Recycle.Bin",
    "System Volume Information",
    "$WinREAgent",
    "Config.Msi",
    "lost+found",
];

const MAX_BATCH_SIZE: usize = 1_000_000;

/// Configuration for one indexing run.
///
/// Built once and passed by reference to the throttle, the exclusion filter
/// and the writer; nothing mutates it afterwards.
#[derive(Debug, Clone, Builder, Serialize, Deserialize)]
#[builder(setter(into), build_fn(validate = "Self::validate"))]
pub struct IndexConfig {
    /// Records committed between pacing pauses.
    #[builder(default = "1000")]
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Pause inserted after every batch.
    #[builder(default = "Duration::from_millis(10)")]
    #[serde(default = "default_batch_delay")]
    pub batch_delay: Duration,

    /// Resident memory ceiling in bytes (0 = no check).
    #[builder(default = "2 * 1024 * 1024 * 1024")]
    #[serde(default = "default_memory_ceiling")]
    pub memory_ceiling: u64,

    /// Apply the exclusion filter after scanning.
    #[builder(default = "true")]
    #[serde(default = "default_true")]
    pub exclude_enabled: bool,

    /// Path segment names whose subtrees are dropped from the report.
    #[builder(default = "Self::default_excluded_names()")]
    #[serde(default = "default_excluded_names")]
    pub excluded_names: Vec<String>,

    /// Directory the writer places output files in.
    #[builder(default = "PathBuf::from(\"file_indexer/output\")")]
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Order of files in the written report.
    #[builder(default)]
    #[serde(default)]
    pub sort_key: SortKey,

    /// Broadcast progress every N found files.
    #[builder(default = "1000")]
    #[serde(default = "default_progress_interval")]
    pub progress_interval: u64,
}

fn default_batch_size() -> usize {
    1000
}

fn default_batch_delay() -> Duration {
    Duration::from_millis(10)
}

fn default_memory_ceiling() -> u64 {
    2 * 1024 * 1024 * 1024
}

fn default_true() -> bool {
    true
}

fn default_excluded_names() -> Vec<String> {
    IndexConfigBuilder::default_excluded_names()
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("file_indexer/output")
}

fn default_progress_interval() -> u64 {
    1000
}

impl IndexConfigBuilder {
    fn default_excluded_names() -> Vec<String> {
        DEFAULT_EXCLUDED_NAMES.iter().map(|s| s.to_string()).collect()
    }

    fn validate(&self) -> Result<(), String> {
        if let Some(size) = self.batch_size {
            if size == 0 || size > MAX_BATCH_SIZE {
                return Err(format!("Batch size must be between 1 and {MAX_BATCH_SIZE}"));
            }
        }
        if let Some(ref dir) = self.output_dir {
            if dir.as_os_str().is_empty() {
                return Err("Output directory cannot be empty".to_string());
            }
        }
        if self.progress_interval == Some(0) {
            return Err("Progress interval must be at least 1".to_string());
        }
        Ok(())
    }
}

impl IndexConfig {
    /// Create a new config builder.
    pub fn builder() -> IndexConfigBuilder {
        IndexConfigBuilder::default()
    }

    /// Check if a path segment is on the exclusion list.
    pub fn is_excluded_name(&self, segment: &str) -> bool {
        self.excluded_names.iter().any(|n| n == segment)
    }
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            batch_delay: default_batch_delay(),
            memory_ceiling: default_memory_ceiling(),
            exclude_enabled: true,
            excluded_names: default_excluded_names(),
            output_dir: default_output_dir(),
            sort_key: SortKey::default(),
            progress_interval: default_progress_interval(),
        }
    }
}
