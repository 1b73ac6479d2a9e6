//! Per-file metadata records.

use chrono::{DateTime, Local};
use compact_str::CompactString;
use serde::{Deserialize, Serialize};

/// Platform file-attribute bits.
///
/// Every flag is `false` when the platform cannot supply attribute bits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FileAttributes {
    pub is_hidden: bool,
    pub is_readonly: bool,
    pub is_system: bool,
    pub is_archive: bool,
}

impl FileAttributes {
    pub const HIDDEN: u32 = 0x2;
    pub const READONLY: u32 = 0x1;
    pub const SYSTEM: u32 = 0x4;
    pub const ARCHIVE: u32 = 0x20;

    /// Decode a Windows `FILE_ATTRIBUTE_*` bit set.
    pub fn from_bits(bits: u32) -> Self {
        Self {
            is_hidden: bits & Self::HIDDEN != 0,
            is_readonly: bits & Self::READONLY != 0,
            is_system: bits & Self::SYSTEM != 0,
            is_archive: bits & Self::ARCHIVE != 0,
        }
    }
}

/// One indexed file.
///
/// Records are only ever built from a successful status query; there is no
/// partially populated form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    /// Base name of the file.
    pub name: CompactString,

    /// Full path as scanned, separators preserved verbatim.
    pub path: String,

    /// Size in bytes.
    pub size: u64,

    /// Last modification time.
    pub modified_time: DateTime<Local>,

    /// Creation time, or the closest platform equivalent.
    pub created_time: DateTime<Local>,

    #[serde(flatten)]
    pub attributes: FileAttributes,
}

impl FileRecord {
    /// Create a new record with default (all `false`) attributes.
    pub fn new(
        name: impl Into<CompactString>,
        path: impl Into<String>,
        size: u64,
        modified_time: DateTime<Local>,
        created_time: DateTime<Local>,
    ) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            size,
            modified_time,
            created_time,
            attributes: FileAttributes::default(),
        }
    }

    /// Replace the attribute flags.
    pub fn with_attributes(mut self, attributes: FileAttributes) -> Self {
        self.attributes = attributes;
        self
    }
}
