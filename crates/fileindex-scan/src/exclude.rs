//! Post-scan exclusion of system subtrees.

use std::collections::HashSet;
use std::path::{Component, Path};

use fileindex_core::{FileRecord, IndexConfig};

/// Drops records that live under an excluded path segment.
///
/// Matching is case-sensitive and per segment: `cache` excludes
/// `a/cache/b.txt` but not `a/caches/b.txt`.
#[derive(Debug, Clone, Default)]
pub struct ExclusionFilter {
    names: HashSet<String>,
}

impl ExclusionFilter {
    /// Create a filter for a set of segment names.
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names.into_iter().map(Into::into).collect(),
        }
    }

    /// Build the filter a config asks for; disabled configs exclude nothing.
    pub fn from_config(config: &IndexConfig) -> Self {
        if config.exclude_enabled {
            Self::new(config.excluded_names.iter().cloned())
        } else {
            Self::default()
        }
    }

    /// Check if the filter excludes nothing.
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Check if a path has an excluded segment.
    pub fn is_excluded(&self, path: &Path) -> bool {
        if self.names.is_empty() {
            return false;
        }
        path.components().any(|c| match c {
            Component::Normal(segment) => segment
                .to_str()
                .is_some_and(|s| self.names.contains(s)),
            _ => false,
        })
    }

    /// Split a full scan result into kept records and an excluded count.
    ///
    /// Kept records stay in their original order.
    pub fn filter(&self, records: Vec<FileRecord>) -> (Vec<FileRecord>, u64) {
        if self.names.is_empty() {
            return (records, 0);
        }
        let before = records.len();
        let kept: Vec<FileRecord> = records
            .into_iter()
            .filter(|r| !self.is_excluded(Path::new(&r.path)))
            .collect();
        let skipped = (before - kept.len()) as u64;
        (kept, skipped)
    }
}
