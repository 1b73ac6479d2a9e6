//! Duplicate-safe persistence of index reports.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

use fileindex_core::{IndexConfig, IndexError, IndexReport};

use crate::tree::render_tree_text;

const INDEX_SUFFIX: &str = ".json";
const STRUCTURE_SUFFIX: &str = "_structure.txt";

/// Paths of the two files produced by one write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrittenFiles {
    /// JSON report.
    pub index_file: PathBuf,
    /// Box-drawing directory tree.
    pub structure_file: PathBuf,
}

/// Writes a report and its structure text, never replacing existing files.
#[derive(Debug, Clone)]
pub struct ReportWriter {
    output_dir: PathBuf,
}

impl ReportWriter {
    /// Create a writer for an output directory.
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    /// Create a writer for the configured output directory.
    pub fn from_config(config: &IndexConfig) -> Self {
        Self::new(&config.output_dir)
    }

    /// Get the output directory.
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Compute the two target paths for a base name.
    ///
    /// The same base name always maps to the same paths.
    pub fn targets(&self, base_name: &str) -> Result<WrittenFiles, IndexError> {
        let base = normalize_base_name(base_name)?;
        Ok(WrittenFiles {
            index_file: self.output_dir.join(format!("{base}{INDEX_SUFFIX}")),
            structure_file: self.output_dir.join(format!("{base}{STRUCTURE_SUFFIX}")),
        })
    }

    /// Write `report` under `base_name`.
    ///
    /// Fails with [`IndexError::Collision`] before touching the disk if either
    /// target exists. Each file is written to a temporary file in the output
    /// directory and moved into place without replacing anything; if the
    /// second move fails the first file is removed again.
    pub fn write(&self, report: &IndexReport, base_name: &str) -> Result<WrittenFiles, IndexError> {
        let targets = self.targets(base_name)?;

        for target in [&targets.index_file, &targets.structure_file] {
            if target.exists() {
                return Err(IndexError::Collision {
                    path: target.clone(),
                });
            }
        }

        let json = serde_json::to_string_pretty(report)
            .map_err(|e| IndexError::Serialize(e.to_string()))?;
        let structure = render_tree_text(report);

        fs::create_dir_all(&self.output_dir).map_err(|e| IndexError::io(&self.output_dir, e))?;

        self.persist_new(&targets.index_file, &json)?;
        if let Err(err) = self.persist_new(&targets.structure_file, &structure) {
            if let Err(cleanup) = fs::remove_file(&targets.index_file) {
                warn!(
                    path = %targets.index_file.display(),
                    error = %cleanup,
                    "failed to roll back index file"
                );
            }
            return Err(err);
        }

        info!(
            index = %targets.index_file.display(),
            structure = %targets.structure_file.display(),
            files = report.total_files(),
            "report written"
        );
        Ok(targets)
    }

    fn persist_new(&self, target: &Path, contents: &str) -> Result<(), IndexError> {
        let mut tmp =
            NamedTempFile::new_in(&self.output_dir).map_err(|e| IndexError::io(&self.output_dir, e))?;
        tmp.write_all(contents.as_bytes())
            .map_err(|e| IndexError::io(tmp.path(), e))?;
        tmp.as_file()
            .sync_all()
            .map_err(|e| IndexError::io(tmp.path(), e))?;

        debug!(target = %target.display(), "moving temporary file into place");
        tmp.persist_noclobber(target)
            .map_err(|e| IndexError::io(target, e.error))?;
        Ok(())
    }
}

/// Write `report` to `output_dir` under `base_name`.
pub fn write_report(
    report: &IndexReport,
    base_name: &str,
    output_dir: impl Into<PathBuf>,
) -> Result<WrittenFiles, IndexError> {
    ReportWriter::new(output_dir).write(report, base_name)
}

/// Reduce an output name to its file stem: `reports/full.json` becomes `full`.
pub fn normalize_base_name(name: &str) -> Result<String, IndexError> {
    let stem = Path::new(name)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    if stem.is_empty() {
        return Err(IndexError::InvalidConfig {
            message: format!("Output name '{name}' has no file name"),
        });
    }
    Ok(stem)
}
