//! Sequential, lazy directory traversal built on jwalk.

use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};

use jwalk::{DirEntry, Parallelism, WalkDirGeneric};
use tracing::{debug, warn};

use fileindex_core::{FileRecord, ScanWarning};

use crate::extract::{AttributeReader, Extraction, MetadataExtractor, PlatformAttributes};
use crate::volumes::{device_id, device_of};

/// Per-entry state: `true` marks a directory left unvisited because it lives
/// on another filesystem.
type WalkState = ((), bool);
type EntryIter = Box<dyn Iterator<Item = Result<DirEntry<WalkState>, jwalk::Error>>>;

/// Walks a root and yields a record for every reachable regular file.
#[derive(Debug, Clone, Default)]
pub struct TreeWalker<A = PlatformAttributes> {
    extractor: MetadataExtractor<A>,
    same_filesystem: bool,
}

impl TreeWalker {
    /// Create a walker using the platform attribute reader.
    pub fn new() -> Self {
        Self::with_extractor(MetadataExtractor::new())
    }
}

impl<A: AttributeReader> TreeWalker<A> {
    /// Create a walker with a custom extractor.
    pub fn with_extractor(extractor: MetadataExtractor<A>) -> Self {
        Self {
            extractor,
            same_filesystem: false,
        }
    }

    /// Stay on the root's filesystem: directories on another device are
    /// reported as warnings and not entered.
    pub fn same_filesystem(mut self, enabled: bool) -> Self {
        self.same_filesystem = enabled;
        self
    }

    /// Start a fresh traversal of `root`.
    ///
    /// Nothing is read until the returned iterator is advanced. Directories
    /// that cannot be listed and files that cannot be stated are skipped; a
    /// missing root yields an empty sequence.
    pub fn walk(&self, root: impl AsRef<Path>) -> Walk<'_, A> {
        let root = root.as_ref().to_path_buf();
        let mut warnings = Vec::new();

        let entries: Option<EntryIter> = if root.exists() {
            let mut walker = WalkDirGeneric::<WalkState>::new(&root)
                .parallelism(Parallelism::Serial)
                .sort(true)
                .skip_hidden(false)
                .follow_links(false);

            if let Some(root_device) = device_of(&root).filter(|_| self.same_filesystem) {
                walker = walker.process_read_dir(move |_, _, _, children| {
                    for child in children.iter_mut().flatten() {
                        if !child.file_type().is_dir() {
                            continue;
                        }
                        let device = child.metadata().ok().as_ref().and_then(device_id);
                        if device.is_some_and(|dev| dev != root_device) {
                            child.read_children_path = None;
                            child.client_state = true;
                        }
                    }
                });
            }
            Some(Box::new(walker.into_iter()))
        } else {
            warn!(root = %root.display(), "root does not exist, skipping");
            warnings.push(ScanWarning::root_not_found(&root));
            None
        };

        Walk {
            root,
            entries,
            extractor: &self.extractor,
            warnings,
            warned: HashSet::new(),
            skipped: 0,
        }
    }
}

/// Lazy record sequence for one traversal.
pub struct Walk<'a, A> {
    root: PathBuf,
    entries: Option<EntryIter>,
    extractor: &'a MetadataExtractor<A>,
    warnings: Vec<ScanWarning>,
    warned: HashSet<PathBuf>,
    skipped: u64,
}

impl<A> Walk<'_, A> {
    /// The root this traversal started from.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Warnings collected so far.
    pub fn warnings(&self) -> &[ScanWarning] {
        &self.warnings
    }

    /// Take the warnings collected so far.
    pub fn take_warnings(&mut self) -> Vec<ScanWarning> {
        std::mem::take(&mut self.warnings)
    }

    /// Number of files that produced no record.
    pub fn skipped(&self) -> u64 {
        self.skipped
    }

    fn record_unreadable(&mut self, path: &Path, error: impl fmt::Display) {
        debug!(path = %path.display(), %error, "skipping unreadable directory");
        if self.warned.insert(path.to_path_buf()) {
            self.warnings.push(ScanWarning::read_error(path, error));
        }
    }

    fn record_mount_point(&mut self, path: PathBuf) {
        debug!(path = %path.display(), "not crossing into another filesystem");
        if self.warned.insert(path.clone()) {
            self.warnings.push(ScanWarning::cross_filesystem(path));
        }
    }
}

impl<A: AttributeReader> Iterator for Walk<'_, A> {
    type Item = FileRecord;

    fn next(&mut self) -> Option<FileRecord> {
        loop {
            let entry = match self.entries.as_mut()?.next()? {
                Ok(entry) => entry,
                Err(err) => {
                    let path = err.path().map(Path::to_path_buf).unwrap_or_else(|| self.root.clone());
                    self.record_unreadable(&path, &err);
                    continue;
                }
            };

            if entry.client_state {
                self.record_mount_point(entry.path());
                continue;
            }

            if let Some(err) = entry.read_children_error.as_ref() {
                let path = entry.path();
                self.record_unreadable(&path, err);
            }

            let file_type = entry.file_type();
            if !(file_type.is_file() || file_type.is_symlink()) {
                continue;
            }

            match self.extractor.extract(&entry.path()) {
                Extraction::Record(record) => return Some(record),
                Extraction::Skipped { .. } => self.skipped += 1,
            }
        }
    }
}
