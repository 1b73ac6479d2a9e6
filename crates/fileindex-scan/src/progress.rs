//! Pipeline progress reporting.

use std::time::{Duration, Instant};

/// Stage of an indexing run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanPhase {
    /// Walking roots and extracting metadata.
    Scanning,
    /// Committing filtered records into the result buffer.
    Committing,
    /// The run has finished; no further updates follow.
    Done,
}

/// Progress information during a run.
///
/// Counters only ever grow within one run.
#[derive(Debug, Clone)]
pub struct ScanProgress {
    /// Current stage.
    pub phase: ScanPhase,
    /// Files found by the walker so far.
    pub files_found: u64,
    /// Files committed to the result buffer so far.
    pub files_committed: u64,
    /// Files dropped by the exclusion filter.
    pub files_excluded: u64,
    /// Time elapsed since the run started.
    pub elapsed: Duration,
}

impl ScanProgress {
    /// Create initial progress state.
    pub fn new() -> Self {
        Self {
            phase: ScanPhase::Scanning,
            files_found: 0,
            files_committed: 0,
            files_excluded: 0,
            elapsed: Duration::ZERO,
        }
    }

    /// Check if this is the terminal update.
    pub fn is_done(&self) -> bool {
        self.phase == ScanPhase::Done
    }

    /// Calculate scan rate in files per second.
    pub fn files_per_second(&self) -> f64 {
        if self.elapsed.as_secs_f64() > 0.0 {
            self.files_found as f64 / self.elapsed.as_secs_f64()
        } else {
            0.0
        }
    }

    /// Fraction of kept files committed so far (0.0 to 1.0).
    pub fn commit_ratio(&self) -> f64 {
        let kept = self.files_found.saturating_sub(self.files_excluded);
        if kept > 0 {
            self.files_committed as f64 / kept as f64
        } else {
            0.0
        }
    }
}

impl Default for ScanProgress {
    fn default() -> Self {
        Self::new()
    }
}

/// Internal progress tracker with timing.
#[derive(Debug)]
pub(crate) struct ProgressTracker {
    start_time: Instant,
    phase: ScanPhase,
    files_found: u64,
    files_committed: u64,
    files_excluded: u64,
}

impl ProgressTracker {
    pub fn new() -> Self {
        Self {
            start_time: Instant::now(),
            phase: ScanPhase::Scanning,
            files_found: 0,
            files_committed: 0,
            files_excluded: 0,
        }
    }

    pub fn record_found(&mut self) {
        self.files_found += 1;
    }

    pub fn files_found(&self) -> u64 {
        self.files_found
    }

    pub fn set_excluded(&mut self, count: u64) {
        self.files_excluded = count;
    }

    pub fn set_committed(&mut self, count: u64) {
        self.files_committed = self.files_committed.max(count);
    }

    pub fn set_phase(&mut self, phase: ScanPhase) {
        self.phase = phase;
    }

    pub fn snapshot(&self) -> ScanProgress {
        ScanProgress {
            phase: self.phase,
            files_found: self.files_found,
            files_committed: self.files_committed,
            files_excluded: self.files_excluded,
            elapsed: self.start_time.elapsed(),
        }
    }
}
