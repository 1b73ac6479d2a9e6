//! Core types for fileindex.
//!
//! This crate provides the data model shared by the scanner and the report
//! writer: per-file records, the aggregated report, the sort contract and the
//! per-run configuration.

mod config;
mod error;
mod record;
mod report;
mod sort;

pub use config::{DEFAULT_EXCLUDED_NAMES, IndexConfig, IndexConfigBuilder};
pub use error::{IndexError, ScanWarning, SkipReason, WarningKind};
pub use record::{FileAttributes, FileRecord};
pub use report::{IndexReport, IndexSummary};
pub use sort::{SortKey, sort_records};
