//! Filesystem scanning pipeline for fileindex.
//!
//! # Overview
//!
//! `fileindex-scan` turns root paths into a committed set of file records:
//!
//! - **Sequential traversal** via jwalk, tolerant of unreadable subtrees
//! - **Metadata extraction** with best-effort platform attribute bits
//! - **Post-scan exclusion** of system path segments
//! - **Batch throttling** with pacing and memory-ceiling reclamation
//! - **Progress updates** via broadcast channels
//!
//! # Example
//!
//! ```rust,no_run
//! use fileindex_scan::{IndexConfig, Indexer, SortKey};
//!
//! let indexer = Indexer::new(IndexConfig::default());
//! let report = indexer.run(&["/path/to/scan"]).into_report(SortKey::Path);
//!
//! println!("Total size: {} bytes", report.total_size());
//! println!("Total files: {}", report.total_files());
//! ```
//!
//! # Progress Monitoring
//!
//! ```rust,no_run
//! use fileindex_scan::{IndexConfig, Indexer};
//!
//! let indexer = Indexer::new(IndexConfig::default());
//! let mut progress_rx = indexer.subscribe();
//!
//! std::thread::spawn(move || {
//!     while let Ok(progress) = progress_rx.blocking_recv() {
//!         println!("Found {} files", progress.files_found);
//!         if progress.is_done() {
//!             break;
//!         }
//!     }
//! });
//! ```

mod exclude;
mod extract;
mod indexer;
mod progress;
mod throttle;
mod volumes;
mod walker;

pub use exclude::ExclusionFilter;
pub use extract::{AttributeReader, Extraction, MetadataExtractor, PlatformAttributes};
pub use indexer::{IndexRun, Indexer};
pub use progress::{ScanPhase, ScanProgress};
pub use throttle::{BatchThrottle, MemorySampler, ProcessMemory, ThrottleStats};
pub use volumes::{ALL_VOLUMES, LocalVolumes, VolumeSource, is_all_volumes};
pub use walker::{TreeWalker, Walk};

// Re-export core types for convenience
pub use fileindex_core::{
    FileAttributes, FileRecord, IndexConfig, IndexError, IndexReport, IndexSummary, ScanWarning,
    SkipReason, SortKey, WarningKind,
};
