//! Report rendering and persistence for fileindex.
//!
//! This crate turns an [`IndexReport`](fileindex_core::IndexReport) into its
//! on-disk form: the JSON index file and the box-drawing structure file.
//! Writes never replace an existing file.
//!
//! ```rust,no_run
//! use fileindex_core::IndexReport;
//! use fileindex_report::ReportWriter;
//!
//! # fn demo(report: &IndexReport) -> Result<(), fileindex_core::IndexError> {
//! let written = ReportWriter::new("file_indexer/output").write(report, "nightly")?;
//! println!("{}", written.index_file.display());
//! # Ok(())
//! # }
//! ```

mod schema;
mod tree;
mod writer;

pub use schema::{index_schema, validate_index_value};
pub use tree::{DirectoryTree, EMPTY_TREE, render_tree_text};
pub use writer::{ReportWriter, WrittenFiles, normalize_base_name, write_report};
