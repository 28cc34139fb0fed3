//! Parallel search engine (SPEC_FULL.md §4.3, §4.10, §5): a persistent pool
//! of OS threads that race a shared `Job` to completion, reporting progress
//! through a drop-newest broker and exposing blocking `generate_wallet` /
//! `generate_wallets` calls to the caller.

pub mod progress;
pub mod stats;
pub mod worker;

use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::mpsc::{sync_channel, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::error::{EngineError, EngineResult};
use crate::pattern::GenerationCriteria;
use crate::wallet::GenerationResult;

use progress::{channel as progress_channel, ProgressReceiver, ProgressSender, ProgressSnapshot};
use stats::{new_worker_stats, StatsCollector, WorkerStats};
use worker::{run_job, Job};

const COMPONENT: &str = "engine";

const STATE_IDLE: u8 = 0;
const STATE_RUNNING: u8 = 1;
const STATE_DRAINING: u8 = 2;
const STATE_STOPPED: u8 = 3;

/// §4.10 pool lifecycle: `Idle -> Running -> Draining -> Stopped`.
pub struct WorkerPool {
    state: AtomicU8,
    pool_cancelled: Arc<AtomicBool>,
    job_txs: Vec<Sender<Arc<Job>>>,
    done_rx: Option<std::sync::mpsc::Receiver<()>>,
    handles: Vec<JoinHandle<()>>,
    stats: WorkerStats,
    worker_count: u32,
    batch_size: u32,
    shutdown_timeout: Duration,
    estimated_single_thread_speed: f64,
}

impl WorkerPool {
    pub fn new(worker_count: u32, batch_size: u32, shutdown_timeout: Duration, estimated_single_thread_speed: f64) -> Self {
        let worker_count = worker_count.max(1);
        Self {
            state: AtomicU8::new(STATE_IDLE),
            pool_cancelled: Arc::new(AtomicBool::new(false)),
            job_txs: Vec::new(),
            done_rx: None,
            handles: Vec::new(),
            stats: new_worker_stats(worker_count as usize),
            worker_count,
            batch_size: batch_size.clamp(worker::MIN_BATCH_SIZE, worker::MAX_BATCH_SIZE),
            shutdown_timeout,
            estimated_single_thread_speed,
        }
    }

    fn state(&self) -> u8 {
        self.state.load(Ordering::SeqCst)
    }

    /// Spawns exactly `worker_count` OS threads, each parked on its own job
    /// channel until `generate_wallet`/`generate_wallets` broadcasts a job.
    pub fn start(&mut self) -> EngineResult<()> {
        if self.state() != STATE_IDLE {
            return Err(EngineError::worker(COMPONENT, "start", "pool is not idle"));
        }

        let (done_tx, done_rx) = std::sync::mpsc::channel();
        self.done_rx = Some(done_rx);

        for worker_id in 0..self.worker_count {
            let (job_tx, job_rx) = std::sync::mpsc::channel::<Arc<Job>>();
            self.job_txs.push(job_tx);

            let stats = Arc::clone(&self.stats);
            let pool_cancelled = Arc::clone(&self.pool_cancelled);
            let done_tx = done_tx.clone();

            let handle = thread::Builder::new()
                .name(format!("vanity-worker-{worker_id}"))
                .spawn(move || {
                    while let Ok(job) = job_rx.recv() {
                        run_job(&job, worker_id, &stats, &pool_cancelled);
                    }
                    let _ = done_tx.send(());
                })
                .map_err(|e| EngineError::worker(COMPONENT, "start", format!("failed to spawn worker {worker_id}: {e}")))?;
            self.handles.push(handle);
        }

        self.state.store(STATE_RUNNING, Ordering::SeqCst);
        Ok(())
    }

    /// Drains all workers back to idle-between-jobs and joins their threads,
    /// bounded by `shutdown_timeout`. Returns an error if any worker fails
    /// to report completion in time, but still transitions to `Stopped`.
    pub fn shutdown(&mut self) -> EngineResult<()> {
        if self.state() != STATE_RUNNING {
            return Ok(());
        }
        self.state.store(STATE_DRAINING, Ordering::SeqCst);
        self.pool_cancelled.store(true, Ordering::SeqCst);
        self.job_txs.clear(); // closes every worker's job channel

        let done_rx = self.done_rx.take().expect("set in start()");
        let deadline = std::time::Instant::now() + self.shutdown_timeout;
        let mut drained = 0u32;
        while drained < self.worker_count {
            let remaining = deadline.saturating_duration_since(std::time::Instant::now());
            if remaining.is_zero() || done_rx.recv_timeout(remaining).is_err() {
                break;
            }
            drained += 1;
        }

        for handle in self.handles.drain(..) {
            let _ = handle.join();
        }
        self.state.store(STATE_STOPPED, Ordering::SeqCst);

        if drained < self.worker_count {
            return Err(EngineError::worker(
                COMPONENT,
                "shutdown",
                format!("only {drained}/{} workers drained before timeout", self.worker_count),
            ));
        }
        Ok(())
    }

    /// Blocks until exactly one wallet matching `criteria` is found, polling
    /// `cancel` (an externally owned token) between batch windows so a
    /// caller-initiated cancellation is observed within one batch's latency.
    pub fn generate_wallet(&self, criteria: GenerationCriteria, cancel: &Arc<AtomicBool>) -> EngineResult<GenerationResult> {
        self.generate_wallets(criteria, 1, cancel).map(|mut v| v.remove(0))
    }

    /// Blocks until `count` distinct matching wallets are found. All workers
    /// keep searching the same job until the target is reached; duplicates
    /// are not deduplicated beyond the astronomically low collision chance
    /// of independently drawn keys.
    pub fn generate_wallets(
        &self,
        criteria: GenerationCriteria,
        count: u32,
        cancel: &Arc<AtomicBool>,
    ) -> EngineResult<Vec<GenerationResult>> {
        if self.state() != STATE_RUNNING {
            return Err(EngineError::worker(COMPONENT, "generate_wallets", "pool is not running"));
        }
        if count == 0 {
            return Err(EngineError::validation(COMPONENT, "generate_wallets", "count must be >= 1"));
        }

        let (result_tx, result_rx) = sync_channel(count as usize);
        let job = Arc::new(Job::new(criteria, self.batch_size, count, result_tx));

        for job_tx in &self.job_txs {
            job_tx
                .send(Arc::clone(&job))
                .map_err(|_| EngineError::worker(COMPONENT, "generate_wallets", "a worker thread has exited"))?;
        }

        let mut results = Vec::with_capacity(count as usize);
        while results.len() < count as usize {
            if cancel.load(Ordering::Relaxed) || self.pool_cancelled.load(Ordering::Relaxed) {
                job.cancelled.store(true, Ordering::SeqCst);
                return Err(EngineError::generation(COMPONENT, "generate_wallets", "cancelled before a match was found"));
            }
            match result_rx.recv_timeout(Duration::from_millis(50)) {
                Ok(result) => results.push(result),
                Err(std::sync::mpsc::RecvTimeoutError::Timeout) => continue,
                Err(std::sync::mpsc::RecvTimeoutError::Disconnected) => {
                    return Err(EngineError::worker(COMPONENT, "generate_wallets", "job channel disconnected unexpectedly"));
                }
            }
        }
        job.cancelled.store(true, Ordering::SeqCst);
        Ok(results)
    }

    /// Samples current throughput without requiring an active job; useful
    /// for the `bench` front-end command, which drives this same pool
    /// against an unreachable pattern and reads the steady-state speed off
    /// this struct rather than a separate synthetic benchmarking path.
    pub fn new_stats_collector(&self, window: Duration) -> StatsCollector {
        StatsCollector::new(Arc::clone(&self.stats), window, self.estimated_single_thread_speed)
    }

    pub fn worker_count(&self) -> u32 {
        self.worker_count
    }

    pub fn batch_size(&self) -> u32 {
        self.batch_size
    }
}

/// Spawns a background thread that samples `collector` every `window` and
/// publishes `ProgressSnapshot`s until `stop` is set, per §5's "progress
/// sampling is decoupled from the hot loop" requirement.
pub fn spawn_progress_sampler(
    mut collector: StatsCollector,
    difficulty: f64,
    target: u32,
    matched: Arc<std::sync::atomic::AtomicU32>,
    stop: Arc<AtomicBool>,
) -> (JoinHandle<()>, ProgressReceiver) {
    let (tx, rx): (ProgressSender, ProgressReceiver) = progress_channel();
    let window = collector.window();
    let handle = thread::spawn(move || {
        while !stop.load(Ordering::Relaxed) {
            thread::sleep(window);
            let snapshot = collector.sample();
            let matched_now = matched.load(Ordering::Relaxed);
            tx.publish(ProgressSnapshot::new(snapshot, difficulty, matched_now, target));
        }
    });
    (handle, rx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn finds_an_easy_pattern_end_to_end() {
        let mut pool = WorkerPool::new(2, worker::MIN_BATCH_SIZE, Duration::from_secs(2), 10_000.0);
        pool.start().unwrap();

        let criteria = GenerationCriteria::new("0", "", false, false).unwrap();
        let cancel = Arc::new(AtomicBool::new(false));
        let result = pool.generate_wallet(criteria, &cancel).unwrap();
        assert!(result.wallet.address_lower_hex().starts_with('0'));

        pool.shutdown().unwrap();
    }

    #[test]
    fn generate_wallets_collects_the_requested_count() {
        let mut pool = WorkerPool::new(2, worker::MIN_BATCH_SIZE, Duration::from_secs(2), 10_000.0);
        pool.start().unwrap();

        let criteria = GenerationCriteria::new("", "0", false, false).unwrap();
        let cancel = Arc::new(AtomicBool::new(false));
        let results = pool.generate_wallets(criteria, 3, &cancel).unwrap();
        assert_eq!(results.len(), 3);

        pool.shutdown().unwrap();
    }

    #[test]
    fn rejects_generate_before_start() {
        let pool = WorkerPool::new(1, worker::MIN_BATCH_SIZE, Duration::from_secs(1), 10_000.0);
        let criteria = GenerationCriteria::new("", "", false, false).unwrap();
        let cancel = Arc::new(AtomicBool::new(false));
        assert!(pool.generate_wallet(criteria, &cancel).is_err());
    }

    #[test]
    fn external_cancellation_stops_the_search() {
        let mut pool = WorkerPool::new(1, worker::MIN_BATCH_SIZE, Duration::from_secs(2), 10_000.0);
        pool.start().unwrap();

        let criteria = GenerationCriteria::new("ffffffffff", "", false, false).unwrap();
        let cancel = Arc::new(AtomicBool::new(false));
        let cancel_clone = Arc::clone(&cancel);
        thread::spawn(move || {
            thread::sleep(Duration::from_millis(30));
            cancel_clone.store(true, Ordering::SeqCst);
        });

        let result = pool.generate_wallet(criteria, &cancel);
        assert!(result.is_err());

        pool.shutdown().unwrap();
    }
}
