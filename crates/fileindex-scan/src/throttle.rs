//! Batch pacing and memory housekeeping for result commits.
//!
//! The throttle paces how fast collected records are committed to the result
//! buffer. It does not bound the memory of the scan that produced them: the
//! ceiling check is advisory and only triggers a reclamation pass, which
//! releases the storage of records already moved out of the scan result.

use std::collections::VecDeque;
use std::time::Duration;

use tracing::{debug, warn};

use fileindex_core::{FileRecord, IndexConfig};

/// Samples the resident memory of the current process.
pub trait MemorySampler {
    /// Resident set size in bytes, or `None` when it cannot be measured.
    fn resident_bytes(&self) -> Option<u64>;
}

/// Resident memory of this process as reported by the OS.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessMemory;

impl MemorySampler for ProcessMemory {
    #[cfg(target_os = "linux")]
    fn resident_bytes(&self) -> Option<u64> {
        let status = std::fs::read_to_string("/proc/self/status").ok()?;
        parse_vm_rss(&status)
    }

    #[cfg(not(target_os = "linux"))]
    fn resident_bytes(&self) -> Option<u64> {
        None
    }
}

/// Extract `VmRSS` from a `/proc/<pid>/status` document, in bytes.
#[cfg_attr(not(target_os = "linux"), allow(dead_code))]
fn parse_vm_rss(status: &str) -> Option<u64> {
    let line = status.lines().find(|l| l.starts_with("VmRSS:"))?;
    let kib: u64 = line
        .trim_start_matches("VmRSS:")
        .split_whitespace()
        .next()?
        .parse()
        .ok()?;
    Some(kib * 1024)
}

/// What a commit pass did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ThrottleStats {
    /// Records committed.
    pub committed: u64,
    /// Batches completed, including a trailing partial batch.
    pub batches: u64,
    /// Reclamation passes triggered by the memory ceiling.
    pub reclaim_passes: u64,
    /// Record slots released by reclamation passes.
    pub released_slots: u64,
    /// Highest resident memory sampled, if any sample succeeded.
    pub peak_resident: Option<u64>,
}

/// Commits records in fixed-size batches with a pause between batches.
#[derive(Debug, Clone)]
pub struct BatchThrottle<P = ProcessMemory> {
    batch_size: usize,
    delay: Duration,
    memory_ceiling: u64,
    sampler: P,
}

impl BatchThrottle {
    /// Create a throttle from a run configuration.
    pub fn from_config(config: &IndexConfig) -> Self {
        Self::with_sampler(config, ProcessMemory)
    }
}

impl<P: MemorySampler> BatchThrottle<P> {
    /// Create a throttle with a custom memory sampler.
    pub fn with_sampler(config: &IndexConfig, sampler: P) -> Self {
        Self {
            batch_size: config.batch_size.max(1),
            delay: config.batch_delay,
            memory_ceiling: config.memory_ceiling,
            sampler,
        }
    }

    /// Get the configured batch size.
    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Move `records` into a new result buffer, pacing every batch.
    ///
    /// The result buffer is sized once up front and never grows. `on_batch`
    /// is called with the running committed count after each batch. Record
    /// order is preserved.
    pub fn commit<F>(&self, records: Vec<FileRecord>, mut on_batch: F) -> (Vec<FileRecord>, ThrottleStats)
    where
        F: FnMut(u64),
    {
        let mut pending = VecDeque::from(records);
        let mut buffer = Vec::with_capacity(pending.len());
        let mut stats = ThrottleStats::default();

        while let Some(record) = pending.pop_front() {
            buffer.push(record);
            if buffer.len() % self.batch_size == 0 {
                stats.batches += 1;
                stats.committed = buffer.len() as u64;
                self.finish_batch(&mut pending, &mut stats);
                on_batch(stats.committed);
            }
        }

        if buffer.len() % self.batch_size != 0 {
            stats.batches += 1;
            stats.committed = buffer.len() as u64;
            on_batch(stats.committed);
        }

        (buffer, stats)
    }

    fn finish_batch(&self, pending: &mut VecDeque<FileRecord>, stats: &mut ThrottleStats) {
        if !self.delay.is_zero() {
            std::thread::sleep(self.delay);
        }

        let Some(resident) = self.sampler.resident_bytes() else {
            return;
        };
        stats.peak_resident = Some(stats.peak_resident.map_or(resident, |p| p.max(resident)));

        if self.memory_ceiling > 0 && resident > self.memory_ceiling {
            warn!(
                resident,
                ceiling = self.memory_ceiling,
                committed = stats.committed,
                "memory ceiling exceeded, reclaiming"
            );
            // Slots of records already committed are dead weight in the source.
            let before = pending.capacity();
            pending.shrink_to_fit();
            let released = before.saturating_sub(pending.capacity()) as u64;
            stats.reclaim_passes += 1;
            stats.released_slots += released;
            debug!(released, remaining = pending.len(), "released committed record slots");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Local;
    use std::cell::Cell;

    struct FixedSampler(Option<u64>);

    impl MemorySampler for FixedSampler {
        fn resident_bytes(&self) -> Option<u64> {
            self.0
        }
    }

    struct RisingSampler(Cell<u64>);

    impl MemorySampler for RisingSampler {
        fn resident_bytes(&self) -> Option<u64> {
            let next = self.0.get() + 100;
            self.0.set(next);
            Some(next)
        }
    }

    fn records(n: usize) -> Vec<FileRecord> {
        let now = Local::now();
        (0..n)
            .map(|i| FileRecord::new(format!("f{i}"), format!("d/f{i}"), i as u64, now, now))
            .collect()
    }

    fn config(batch_size: usize, ceiling: u64) -> IndexConfig {
        IndexConfig::builder()
            .batch_size(batch_size)
            .batch_delay(Duration::ZERO)
            .memory_ceiling(ceiling)
            .build()
            .unwrap()
    }

    #[test]
    fn test_commit_preserves_order_and_counts_batches() {
        let throttle = BatchThrottle::with_sampler(&config(3, 0), FixedSampler(None));
        let mut seen = Vec::new();
        let (out, stats) = throttle.commit(records(7), |n| seen.push(n));

        assert_eq!(out.len(), 7);
        assert_eq!(out[0].path, "d/f0");
        assert_eq!(out[6].path, "d/f6");
        assert_eq!(stats.batches, 3);
        assert_eq!(stats.committed, 7);
        assert_eq!(seen, vec![3, 6, 7]);
        assert_eq!(stats.peak_resident, None);
    }

    #[test]
    fn test_exact_multiple_has_no_trailing_batch() {
        let throttle = BatchThrottle::with_sampler(&config(2, 0), FixedSampler(None));
        let (_, stats) = throttle.commit(records(4), |_| {});
        assert_eq!(stats.batches, 2);
    }

    #[test]
    fn test_empty_input() {
        let throttle = BatchThrottle::with_sampler(&config(5, 0), FixedSampler(Some(1)));
        let mut calls = 0;
        let (out, stats) = throttle.commit(Vec::new(), |_| calls += 1);
        assert!(out.is_empty());
        assert_eq!(stats, ThrottleStats::default());
        assert_eq!(calls, 0);
    }

    #[test]
    fn test_ceiling_triggers_reclaim() {
        let throttle = BatchThrottle::with_sampler(&config(2, 250), RisingSampler(Cell::new(0)));
        let (out, stats) = throttle.commit(records(10), |_| {});

        // Samples are 100, 200, 300, 400, 500 for five full batches.
        assert_eq!(out.len(), 10);
        assert_eq!(stats.reclaim_passes, 3);
        assert_eq!(stats.peak_resident, Some(500));
        assert!(stats.released_slots > 0);
    }

    #[test]
    fn test_reclaim_releases_source_without_growing_result() {
        let baseline = BatchThrottle::with_sampler(&config(4, 0), FixedSampler(Some(u64::MAX)));
        let (plain, plain_stats) = baseline.commit(records(10), |_| {});

        let pressured = BatchThrottle::with_sampler(&config(4, 1), FixedSampler(Some(u64::MAX)));
        let (out, stats) = pressured.commit(records(10), |_| {});

        assert_eq!(plain_stats.released_slots, 0);
        assert_eq!(stats.reclaim_passes, 2);
        // After 4 commits 6 records remain, after 8 commits 2 remain.
        assert_eq!(stats.released_slots, 8);
        assert_eq!(out.capacity(), plain.capacity());
        assert_eq!(out.capacity(), out.len());

        let paths: Vec<_> = out.iter().map(|r| r.path.as_str()).collect();
        let expected: Vec<_> = plain.iter().map(|r| r.path.as_str()).collect();
        assert_eq!(paths, expected);
    }

    #[test]
    fn test_zero_ceiling_disables_reclaim() {
        let throttle = BatchThrottle::with_sampler(&config(1, 0), FixedSampler(Some(u64::MAX)));
        let (_, stats) = throttle.commit(records(3), |_| {});
        assert_eq!(stats.reclaim_passes, 0);
        assert_eq!(stats.peak_resident, Some(u64::MAX));
    }

    #[test]
    fn test_parse_vm_rss() {
        let status = "Name:\tfidx\nVmPeak:\t  20000 kB\nVmRSS:\t    1234 kB\nThreads:\t1\n";
        assert_eq!(parse_vm_rss(status), Some(1234 * 1024));
        assert_eq!(parse_vm_rss("Name:\tfidx\n"), None);
    }
}
