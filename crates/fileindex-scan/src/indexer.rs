//! The indexing pipeline: walk, filter, throttle, aggregate.

use tokio::sync::broadcast;
use tracing::{debug, info};

use fileindex_core::{FileRecord, IndexConfig, IndexReport, ScanWarning, SortKey, sort_records};

use crate::exclude::ExclusionFilter;
use crate::progress::{ProgressTracker, ScanPhase, ScanProgress};
use crate::throttle::{BatchThrottle, ThrottleStats};
use crate::volumes::{LocalVolumes, VolumeSource, distinct_volume_roots, is_all_volumes};
use crate::walker::TreeWalker;

/// Runs the indexing pipeline for one configuration.
///
/// The indexer keeps no state between runs apart from the progress channel.
pub struct Indexer<V = LocalVolumes> {
    config: IndexConfig,
    volumes: V,
    progress_tx: broadcast::Sender<ScanProgress>,
}

impl Indexer {
    /// Create an indexer that enumerates the local machine's volumes.
    pub fn new(config: IndexConfig) -> Self {
        Self::with_volumes(config, LocalVolumes)
    }
}

impl<V: VolumeSource> Indexer<V> {
    /// Create an indexer with a custom volume source.
    pub fn with_volumes(config: IndexConfig, volumes: V) -> Self {
        let (progress_tx, _) = broadcast::channel(100);
        Self {
            config,
            volumes,
            progress_tx,
        }
    }

    /// Subscribe to progress updates.
    pub fn subscribe(&self) -> broadcast::Receiver<ScanProgress> {
        self.progress_tx.subscribe()
    }

    /// Get the configuration of this indexer.
    pub fn config(&self) -> &IndexConfig {
        &self.config
    }

    /// Replace the all-volumes sentinel with the enumerated volume roots.
    ///
    /// Other roots are kept verbatim and in order. Volume roots nested in
    /// another volume root on the same device are dropped.
    pub fn expand_roots<S: AsRef<str>>(&self, roots: &[S]) -> Vec<String> {
        self.plan_roots(roots).into_iter().map(|r| r.path).collect()
    }

    fn plan_roots<S: AsRef<str>>(&self, roots: &[S]) -> Vec<PlannedRoot> {
        let mut planned = Vec::new();
        for root in roots {
            let root = root.as_ref();
            if is_all_volumes(root) {
                let listed = self.volumes.volume_roots();
                let volumes = distinct_volume_roots(listed.clone());
                debug!(listed = listed.len(), kept = volumes.len(), "expanded all-volumes root");
                planned.extend(volumes.iter().map(|v| PlannedRoot {
                    path: v.to_string_lossy().into_owned(),
                    volume: true,
                }));
            } else {
                planned.push(PlannedRoot {
                    path: root.to_string(),
                    volume: false,
                });
            }
        }
        planned
    }

    /// Index every root and return the committed, unsorted result.
    ///
    /// Per-path failures and missing roots end up in [`IndexRun::warnings`];
    /// this never fails as a whole. Volume roots are walked without crossing
    /// into other filesystems, since those are volume roots of their own.
    pub fn run<S: AsRef<str>>(&self, roots: &[S]) -> IndexRun {
        let planned = self.plan_roots(roots);
        let indexed_paths: Vec<String> = planned.iter().map(|r| r.path.clone()).collect();
        info!(roots = ?indexed_paths, "indexing started");

        let mut tracker = ProgressTracker::new();
        let mut warnings = Vec::new();
        let mut collected: Vec<FileRecord> = Vec::new();
        let interval = self.config.progress_interval.max(1);

        let walker = TreeWalker::new();
        let volume_walker = TreeWalker::new().same_filesystem(true);
        for PlannedRoot { path: root, volume } in &planned {
            let walker = if *volume { &volume_walker } else { &walker };
            let mut walk = walker.walk(root);
            for record in walk.by_ref() {
                collected.push(record);
                tracker.record_found();
                if tracker.files_found() % interval == 0 {
                    self.send(&tracker);
                }
            }
            debug!(root = %root, skipped = walk.skipped(), "root finished");
            warnings.extend(walk.take_warnings());
        }
        let files_found = tracker.files_found();

        let (kept, files_excluded) = ExclusionFilter::from_config(&self.config).filter(collected);
        tracker.set_excluded(files_excluded);
        tracker.set_phase(ScanPhase::Committing);
        self.send(&tracker);

        let throttle = BatchThrottle::from_config(&self.config);
        let (files, throttle_stats) = throttle.commit(kept, |committed| {
            tracker.set_committed(committed);
            self.send(&tracker);
        });

        if throttle_stats.reclaim_passes > 0 {
            let peak = throttle_stats.peak_resident.unwrap_or_default();
            warnings.push(ScanWarning::memory_pressure(peak, self.config.memory_ceiling));
        }

        tracker.set_phase(ScanPhase::Done);
        self.send(&tracker);

        info!(
            files_found,
            files_excluded,
            files_committed = files.len(),
            warnings = warnings.len(),
            "indexing finished"
        );

        IndexRun {
            files,
            indexed_paths,
            files_found,
            files_excluded,
            warnings,
            throttle: throttle_stats,
        }
    }

    fn send(&self, tracker: &ProgressTracker) {
        // No receivers is fine.
        let _ = self.progress_tx.send(tracker.snapshot());
    }
}

struct PlannedRoot {
    path: String,
    volume: bool,
}

/// Outcome of one pipeline run, before sorting and aggregation.
#[derive(Debug, Clone)]
pub struct IndexRun {
    /// Committed records in walk order.
    pub files: Vec<FileRecord>,
    /// Roots that were walked, after sentinel expansion.
    pub indexed_paths: Vec<String>,
    /// Files yielded by the walker before exclusion.
    pub files_found: u64,
    /// Files removed by the exclusion filter.
    pub files_excluded: u64,
    /// Non-fatal problems met during the run.
    pub warnings: Vec<ScanWarning>,
    /// What the throttle did while committing.
    pub throttle: ThrottleStats,
}

impl IndexRun {
    /// Sort the committed records and aggregate them into a report.
    pub fn into_report(self, sort_key: SortKey) -> IndexReport {
        let mut files = self.files;
        sort_records(&mut files, sort_key);
        IndexReport::aggregate(files, self.indexed_paths)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::PathBuf;
    use std::time::Duration;
    use tempfile::TempDir;

    struct FixedVolumes(Vec<PathBuf>);

    impl VolumeSource for FixedVolumes {
        fn volume_roots(&self) -> Vec<PathBuf> {
            self.0.clone()
        }
    }

    fn config(exclude_enabled: bool) -> IndexConfig {
        IndexConfig::builder()
            .batch_size(2usize)
            .batch_delay(Duration::ZERO)
            .memory_ceiling(0u64)
            .exclude_enabled(exclude_enabled)
            .excluded_names(vec!["skipme".to_string()])
            .progress_interval(1u64)
            .build()
            .unwrap()
    }

    fn create_tree() -> TempDir {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        fs::create_dir_all(root.join("keep/deep")).unwrap();
        fs::create_dir_all(root.join("skipme/inner")).unwrap();
        fs::write(root.join("top.txt"), "top").unwrap();
        fs::write(root.join("keep/a.txt"), "aaaa").unwrap();
        fs::write(root.join("keep/deep/b.txt"), "bb").unwrap();
        fs::write(root.join("skipme/c.txt"), "c").unwrap();
        fs::write(root.join("skipme/inner/d.txt"), "dddd").unwrap();
        temp
    }

    fn root_str(temp: &TempDir) -> String {
        temp.path().to_string_lossy().into_owned()
    }

    #[test]
    fn test_exclusion_does_not_change_files_found() {
        let temp = create_tree();
        let roots = [root_str(&temp)];

        let with = Indexer::new(config(true)).run(&roots);
        let without = Indexer::new(config(false)).run(&roots);

        assert_eq!(with.files_found, 5);
        assert_eq!(without.files_found, 5);
        assert_eq!(with.files_excluded, 2);
        assert_eq!(without.files_excluded, 0);
        assert_eq!(with.files.len(), 3);
        assert_eq!(without.files.len(), 5);
    }

    #[test]
    fn test_invalid_roots_give_empty_report() {
        let temp = TempDir::new().unwrap();
        let missing = temp.path().join("missing").to_string_lossy().into_owned();
        let run = Indexer::new(config(true)).run(&[missing.clone()]);

        assert_eq!(run.files_found, 0);
        assert_eq!(run.warnings.len(), 1);

        let report = run.into_report(SortKey::Path);
        assert_eq!(report.total_files(), 0);
        assert_eq!(report.total_size(), 0);
        assert_eq!(report.summary.indexed_paths, vec![missing]);
    }

    #[test]
    fn test_missing_root_does_not_block_others() {
        let temp = create_tree();
        let missing = temp.path().join("nope").to_string_lossy().into_owned();
        let run = Indexer::new(config(true)).run(&[missing, root_str(&temp)]);

        assert_eq!(run.files.len(), 3);
        assert_eq!(run.indexed_paths.len(), 2);
    }

    #[test]
    fn test_all_volumes_expands_through_source() {
        let first = create_tree();
        let second = TempDir::new().unwrap();
        fs::write(second.path().join("only.txt"), "1").unwrap();

        let volumes = FixedVolumes(vec![first.path().to_path_buf(), second.path().to_path_buf()]);
        let indexer = Indexer::with_volumes(config(false), volumes);
        let run = indexer.run(&["*"]);

        assert_eq!(run.indexed_paths, vec![root_str(&first), root_str(&second)]);
        assert_eq!(run.files.len(), 6);
    }

    #[test]
    fn test_nested_volume_roots_do_not_duplicate_files() {
        let temp = create_tree();
        let nested = temp.path().join("keep");
        let volumes = FixedVolumes(vec![nested, temp.path().to_path_buf(), temp.path().to_path_buf()]);
        let run = Indexer::with_volumes(config(false), volumes).run(&["all"]);

        let mut paths: Vec<&str> = run.files.iter().map(|f| f.path.as_str()).collect();
        paths.sort_unstable();
        let total = paths.len();
        paths.dedup();

        assert_eq!(paths.len(), total);
        assert_eq!(total, 5);
        assert_eq!(run.files_found, 5);
        assert_eq!(run.indexed_paths, vec![root_str(&temp)]);
    }

    #[test]
    fn test_explicit_roots_are_walked_as_given() {
        let temp = create_tree();
        let nested = temp.path().join("keep").to_string_lossy().into_owned();
        let run = Indexer::new(config(false)).run(&[root_str(&temp), nested.clone()]);

        assert_eq!(run.indexed_paths, vec![root_str(&temp), nested]);
        assert_eq!(run.files_found, 7);
    }

    #[test]
    fn test_no_volumes_is_not_an_error() {
        let indexer = Indexer::with_volumes(config(true), FixedVolumes(Vec::new()));
        let run = indexer.run(&["all"]);
        assert!(run.indexed_paths.is_empty());
        assert!(run.files.is_empty());
    }

    #[test]
    fn test_into_report_sorts_and_sums() {
        let temp = create_tree();
        let report = Indexer::new(config(true))
            .run(&[root_str(&temp)])
            .into_report(SortKey::Size);

        let sizes: Vec<u64> = report.files.iter().map(|f| f.size).collect();
        assert_eq!(sizes, vec![2, 3, 4]);
        assert_eq!(report.total_size(), 9);
        assert_eq!(report.total_files(), 3);
    }

    #[test]
    fn test_progress_is_monotonic_and_ends_with_done() {
        let temp = create_tree();
        let indexer = Indexer::new(config(true));
        let mut rx = indexer.subscribe();
        indexer.run(&[root_str(&temp)]);

        let mut updates = Vec::new();
        while let Ok(progress) = rx.try_recv() {
            updates.push(progress);
        }

        assert!(!updates.is_empty());
        assert!(updates.last().unwrap().is_done());
        for pair in updates.windows(2) {
            assert!(pair[0].files_found <= pair[1].files_found);
            assert!(pair[0].files_committed <= pair[1].files_committed);
        }
        let last = updates.last().unwrap();
        assert_eq!(last.files_found, 5);
        assert_eq!(last.files_committed, 3);
        assert_eq!(last.files_excluded, 2);
    }
}
