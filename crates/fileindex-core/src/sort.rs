//! Sort keys for report ordering.

use std::cmp::Ordering;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, VariantNames};

use crate::record::FileRecord;

/// Field a report's files are ordered by.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Display,
    EnumString,
    EnumIter,
    VariantNames,
    Serialize,
    Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
    Name,
    #[default]
    Path,
    Size,
    ModifiedTime,
    CreatedTime,
}

impl SortKey {
    /// Resolve a key name, falling back to [`SortKey::Path`] for anything
    /// unrecognised.
    pub fn from_name(name: &str) -> Self {
        Self::from_str(name.trim()).unwrap_or_default()
    }

    /// Compare two records by this key.
    pub fn compare(self, a: &FileRecord, b: &FileRecord) -> Ordering {
        match self {
            Self::Name => a.name.as_str().cmp(b.name.as_str()),
            Self::Path => a.path.cmp(&b.path),
            Self::Size => a.size.cmp(&b.size),
            Self::ModifiedTime => a.modified_time.cmp(&b.modified_time),
            Self::CreatedTime => a.created_time.cmp(&b.created_time),
        }
    }
}

/// Stable sort of `files` by `key`; ties keep their collection order.
pub fn sort_records(files: &mut [FileRecord], key: SortKey) {
    files.sort_by(|a, b| key.compare(a, b));
}
