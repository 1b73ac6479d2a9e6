//! Error, skip and warning types.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Whole-operation errors surfaced to the caller of the pipeline.
///
/// Per-file and per-directory failures never become an `IndexError`; they are
/// absorbed by the extractor and walker.
#[derive(Debug, Error)]
pub enum IndexError {
    /// A target output file already exists.
    #[error("Output file already exists: {path}")]
    Collision { path: PathBuf },

    /// Permission denied for a path.
    #[error("Permission denied: {path}")]
    PermissionDenied { path: PathBuf },

    /// Path not found.
    #[error("Path not found: {path}")]
    NotFound { path: PathBuf },

    /// Generic I/O error.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The report could not be serialized.
    #[error("Failed to serialize report: {0}")]
    Serialize(String),

    /// Invalid configuration.
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },
}

impl IndexError {
    /// Create an I/O error with path context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        match source.kind() {
            std::io::ErrorKind::PermissionDenied => Self::PermissionDenied { path },
            std::io::ErrorKind::NotFound => Self::NotFound { path },
            std::io::ErrorKind::AlreadyExists => Self::Collision { path },
            _ => Self::Io { path, source },
        }
    }

    /// Check if this is a collision with an existing output file.
    pub fn is_collision(&self) -> bool {
        matches!(self, Self::Collision { .. })
    }
}

/// Why a single path produced no record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The mandatory status query failed.
    Stat(std::io::ErrorKind),
    /// The path exists but is not a regular file (or a link to one).
    NotAFile,
    /// The platform could not report a modification time.
    Timestamp,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stat(kind) => write!(f, "stat failed: {kind}"),
            Self::NotAFile => write!(f, "not a regular file"),
            Self::Timestamp => write!(f, "modification time unavailable"),
        }
    }
}

/// Kind of scan warning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WarningKind {
    /// A requested root does not exist.
    RootNotFound,
    /// A directory could not be listed.
    ReadError,
    /// Resident memory exceeded the configured ceiling.
    MemoryPressure,
    /// A directory on another filesystem was not entered.
    CrossFilesystem,
}

/// Non-fatal warning encountered during a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanWarning {
    /// Path where the warning occurred.
    pub path: PathBuf,
    /// Human-readable message.
    pub message: String,
    /// Kind of warning.
    pub kind: WarningKind,
}

impl ScanWarning {
    /// Create a new scan warning.
    pub fn new(path: impl Into<PathBuf>, message: impl Into<String>, kind: WarningKind) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
            kind,
        }
    }

    /// Create a missing-root warning.
    pub fn root_not_found(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        Self {
            message: format!("Path does not exist: {}", path.display()),
            path,
            kind: WarningKind::RootNotFound,
        }
    }

    /// Create an unreadable-directory warning.
    pub fn read_error(path: impl Into<PathBuf>, error: impl fmt::Display) -> Self {
        Self {
            message: format!("Read error: {error}"),
            path: path.into(),
            kind: WarningKind::ReadError,
        }
    }

    /// Create a warning for a mount point that was not descended into.
    pub fn cross_filesystem(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        Self {
            message: format!("Skipped mount point on another filesystem: {}", path.display()),
            path,
            kind: WarningKind::CrossFilesystem,
        }
    }

    /// Create a memory-pressure warning.
    pub fn memory_pressure(resident: u64, ceiling: u64) -> Self {
        Self {
            path: PathBuf::new(),
            message: format!("Resident memory {resident} bytes exceeded ceiling {ceiling} bytes"),
            kind: WarningKind::MemoryPressure,
        }
    }
}
