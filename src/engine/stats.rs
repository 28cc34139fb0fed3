//! Stats collector (SPEC_FULL.md §3, §4.3 "Ordering", §5): lock-free
//! per-worker counters reduced into an `AggregatedStats` snapshot.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// One worker's lock-free counters. `attempts` is the cumulative count
/// across the worker's entire lifetime in the pool (not per-job), so
/// `GenerationResult::attempts` can be read as a snapshot sum at match time.
#[derive(Default)]
pub struct WorkerStat {
    pub attempts: AtomicU64,
    pub last_batch_nanos: AtomicU64,
    pub active: AtomicBool,
}

pub type WorkerStats = Arc<[WorkerStat]>;

pub fn new_worker_stats(n: usize) -> WorkerStats {
    (0..n).map(|_| WorkerStat::default()).collect::<Vec<_>>().into()
}

pub fn total_attempts(stats: &[WorkerStat]) -> u64 {
    stats.iter().map(|w| w.attempts.load(Ordering::Relaxed)).sum()
}

#[derive(Debug, Clone, Copy)]
pub struct AggregatedStats {
    pub total_attempts: u64,
    pub total_speed: f64,
    pub peak_speed: f64,
    pub per_worker_balance_score: f64,
    pub efficiency_ratio: f64,
    pub worker_count: u32,
}

/// Samples `WorkerStat`s on a fixed cadence (§4.3: a 500ms sliding window)
/// and reduces them into an `AggregatedStats` snapshot. Not itself
/// thread-safe to share across samplers; the engine owns exactly one and
/// publishes snapshots through the progress broker.
pub struct StatsCollector {
    stats: WorkerStats,
    window: Duration,
    estimated_single_thread_speed: f64,
    last_sample_at: Instant,
    last_totals: Vec<u64>,
    peak_speed: f64,
}

impl StatsCollector {
    pub fn new(stats: WorkerStats, window: Duration, estimated_single_thread_speed: f64) -> Self {
        let last_totals = vec![0u64; stats.len()];
        Self {
            stats,
            window,
            estimated_single_thread_speed,
            last_sample_at: Instant::now(),
            last_totals,
            peak_speed: 0.0,
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Takes a fresh sample, returning the current `AggregatedStats`. Should
    /// be called roughly every `self.window`; the elapsed time actually
    /// observed is used for the speed calculation, so jitter in the
    /// sampler's own scheduling doesn't bias the result.
    pub fn sample(&mut self) -> AggregatedStats {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_sample_at).as_secs_f64().max(1e-9);

        let mut per_worker_speed = Vec::with_capacity(self.stats.len());
        let mut total_attempts_now = 0u64;
        for (worker, last) in self.stats.iter().zip(self.last_totals.iter_mut()) {
            let current = worker.attempts.load(Ordering::Relaxed);
            let delta = current.saturating_sub(*last);
            per_worker_speed.push(delta as f64 / elapsed);
            *last = current;
            total_attempts_now += current;
        }

        let total_speed: f64 = per_worker_speed.iter().sum();
        self.peak_speed = self.peak_speed.max(total_speed);
        self.last_sample_at = now;

        let balance_score = balance_score(&per_worker_speed);
        let worker_count = self.stats.len().max(1) as f64;
        let efficiency_ratio = if self.estimated_single_thread_speed > 0.0 {
            (total_speed / (worker_count * self.estimated_single_thread_speed)).clamp(0.0, 1.0)
        } else {
            0.0
        };

        AggregatedStats {
            total_attempts: total_attempts_now,
            total_speed,
            peak_speed: self.peak_speed,
            per_worker_balance_score: balance_score,
            efficiency_ratio,
            worker_count: self.stats.len() as u32,
        }
    }
}

/// `1 - stddev(perWorkerSpeed)/mean(perWorkerSpeed)`, clamped to `[0,1]`.
/// A single worker, or all-zero speeds, is defined as perfectly balanced.
fn balance_score(speeds: &[f64]) -> f64 {
    if speeds.len() <= 1 {
        return 1.0;
    }
    let mean = speeds.iter().sum::<f64>() / speeds.len() as f64;
    if mean <= 0.0 {
        return 1.0;
    }
    let variance = speeds.iter().map(|s| (s - mean).powi(2)).sum::<f64>() / speeds.len() as f64;
    let stddev = variance.sqrt();
    (1.0 - stddev / mean).clamp(0.0, 1.0)
}
