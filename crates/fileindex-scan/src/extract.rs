//! Per-file metadata extraction.

use std::fs::Metadata;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use chrono::{DateTime, Local};
use compact_str::CompactString;
use tracing::{debug, trace};

use fileindex_core::{FileAttributes, FileRecord, SkipReason};

/// Source of platform attribute bits for a file.
pub trait AttributeReader {
    /// Read the attribute flags of `path`.
    ///
    /// `metadata` is the result of the status query already made for the
    /// record. Errors are absorbed by the extractor.
    fn read(&self, path: &Path, metadata: &Metadata) -> io::Result<FileAttributes>;
}

/// Attribute reader for the current platform.
///
/// Windows reports `FILE_ATTRIBUTE_*` bits; other platforms have no
/// equivalent and report `Unsupported`.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlatformAttributes;

impl AttributeReader for PlatformAttributes {
    #[cfg(windows)]
    fn read(&self, _path: &Path, metadata: &Metadata) -> io::Result<FileAttributes> {
        use std::os::windows::fs::MetadataExt;
        Ok(FileAttributes::from_bits(metadata.file_attributes()))
    }

    #[cfg(not(windows))]
    fn read(&self, _path: &Path, _metadata: &Metadata) -> io::Result<FileAttributes> {
        Err(io::Error::new(
            io::ErrorKind::Unsupported,
            "file attribute bits are not available on this platform",
        ))
    }
}

/// Outcome of extracting one path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Extraction {
    /// A fully populated record.
    Record(FileRecord),
    /// No record for this path.
    Skipped { path: PathBuf, reason: SkipReason },
}

impl Extraction {
    /// Convert into the record, dropping the skip reason.
    pub fn into_record(self) -> Option<FileRecord> {
        match self {
            Self::Record(record) => Some(record),
            Self::Skipped { .. } => None,
        }
    }

    /// Check if a record was produced.
    pub fn is_record(&self) -> bool {
        matches!(self, Self::Record(_))
    }
}

/// Builds [`FileRecord`]s from filesystem status queries.
#[derive(Debug, Clone, Default)]
pub struct MetadataExtractor<A = PlatformAttributes> {
    attributes: A,
}

impl MetadataExtractor {
    /// Create an extractor using the platform attribute reader.
    pub fn new() -> Self {
        Self::with_attributes(PlatformAttributes)
    }
}

impl<A: AttributeReader> MetadataExtractor<A> {
    /// Create an extractor with a custom attribute reader.
    pub fn with_attributes(attributes: A) -> Self {
        Self { attributes }
    }

    /// Extract metadata for a single path.
    ///
    /// Symbolic links are followed; a link resolving to a regular file yields
    /// a record for the link path.
    pub fn extract(&self, path: &Path) -> Extraction {
        let metadata = match std::fs::metadata(path) {
            Ok(m) => m,
            Err(err) => return skipped(path, SkipReason::Stat(err.kind())),
        };

        if !metadata.is_file() {
            return skipped(path, SkipReason::NotAFile);
        }

        let Ok(modified) = metadata.modified() else {
            return skipped(path, SkipReason::Timestamp);
        };
        let created = created_time(&metadata).unwrap_or(modified);

        let attributes = match self.attributes.read(path, &metadata) {
            Ok(attrs) => attrs,
            Err(err) => {
                trace!(path = %path.display(), error = %err, "attribute query failed, using defaults");
                FileAttributes::default()
            }
        };

        let name = path
            .file_name()
            .map(|n| CompactString::new(n.to_string_lossy()))
            .unwrap_or_else(|| CompactString::new(path.to_string_lossy()));

        Extraction::Record(
            FileRecord::new(
                name,
                path.to_string_lossy().into_owned(),
                metadata.len(),
                DateTime::<Local>::from(modified),
                DateTime::<Local>::from(created),
            )
            .with_attributes(attributes),
        )
    }
}

fn skipped(path: &Path, reason: SkipReason) -> Extraction {
    debug!(path = %path.display(), %reason, "skipping file");
    Extraction::Skipped {
        path: path.to_path_buf(),
        reason,
    }
}

/// Birth time where supported, otherwise the inode change time on Unix.
fn created_time(metadata: &Metadata) -> Option<SystemTime> {
    metadata.created().ok().or_else(|| change_time(metadata))
}

#[cfg(unix)]
fn change_time(metadata: &Metadata) -> Option<SystemTime> {
    use std::os::unix::fs::MetadataExt;
    use std::time::{Duration, UNIX_EPOCH};

    let secs = u64::try_from(metadata.ctime()).ok()?;
    let nanos = u32::try_from(metadata.ctime_nsec()).unwrap_or(0);
    UNIX_EPOCH.checked_add(Duration::new(secs, nanos))
}

#[cfg(not(unix))]
fn change_time(_metadata: &Metadata) -> Option<SystemTime> {
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    struct FailingAttributes;

    impl AttributeReader for FailingAttributes {
        fn read(&self, _path: &Path, _metadata: &Metadata) -> io::Result<FileAttributes> {
            Err(io::Error::other("attribute query failed"))
        }
    }

    struct FixedAttributes(FileAttributes);

    impl AttributeReader for FixedAttributes {
        fn read(&self, _path: &Path, _metadata: &Metadata) -> io::Result<FileAttributes> {
            Ok(self.0)
        }
    }

    #[test]
    fn test_extract_regular_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("hello.txt");
        fs::write(&path, "hello world").unwrap();

        let record = MetadataExtractor::new().extract(&path).into_record().unwrap();
        assert_eq!(record.name.as_str(), "hello.txt");
        assert_eq!(record.path, path.to_string_lossy());
        assert_eq!(record.size, 11);
    }

    #[test]
    fn test_attribute_failure_keeps_record() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("data.bin");
        fs::write(&path, [0u8; 64]).unwrap();

        let extraction = MetadataExtractor::with_attributes(FailingAttributes).extract(&path);
        let record = extraction.into_record().expect("record despite attribute failure");
        assert_eq!(record.attributes, FileAttributes::default());
        assert_eq!(record.size, 64);
        assert_eq!(record.name.as_str(), "data.bin");
    }

    #[test]
    fn test_attributes_are_applied() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("flagged");
        fs::write(&path, "x").unwrap();

        let attrs = FileAttributes {
            is_hidden: true,
            is_system: true,
            ..Default::default()
        };
        let record = MetadataExtractor::with_attributes(FixedAttributes(attrs))
            .extract(&path)
            .into_record()
            .unwrap();
        assert_eq!(record.attributes, attrs);
    }

    #[test]
    fn test_missing_file_is_skipped() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("gone.txt");

        match MetadataExtractor::new().extract(&path) {
            Extraction::Skipped { reason, .. } => {
                assert_eq!(reason, SkipReason::Stat(io::ErrorKind::NotFound));
            }
            Extraction::Record(_) => panic!("missing file must not produce a record"),
        }
    }

    #[test]
    fn test_directory_is_skipped() {
        let temp = TempDir::new().unwrap();
        let extraction = MetadataExtractor::new().extract(temp.path());
        assert!(matches!(
            extraction,
            Extraction::Skipped {
                reason: SkipReason::NotAFile,
                ..
            }
        ));
    }

    #[cfg(unix)]
    #[test]
    fn test_symlink_to_file_is_followed() {
        let temp = TempDir::new().unwrap();
        let target = temp.path().join("target.txt");
        fs::write(&target, "12345").unwrap();
        let link = temp.path().join("link.txt");
        std::os::unix::fs::symlink(&target, &link).unwrap();

        let record = MetadataExtractor::new().extract(&link).into_record().unwrap();
        assert_eq!(record.name.as_str(), "link.txt");
        assert_eq!(record.size, 5);

        fs::remove_file(&target).unwrap();
        assert!(!MetadataExtractor::new().extract(&link).is_record());
    }
}
