//! Hot-loop batch worker (SPEC_FULL.md §4.3, §5): each worker owns its own
//! RNG and secp256k1 context, runs a tight attempt loop for `batch_size`
//! iterations, then checks for cancellation — the only suspension point
//! between batches.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::mpsc::SyncSender;
use std::sync::Arc;
use std::time::Instant;

use bitcoin::secp256k1::Secp256k1;
use rand::thread_rng;

use crate::address::derive_address;
use crate::engine::stats::WorkerStats;
use crate::keygen::try_random_keypair;
use crate::mnemonic;
use crate::pattern::GenerationCriteria;
use crate::wallet::{zeroize_string, GenerationResult, Wallet};

pub const DEFAULT_BATCH_SIZE: u32 = 1000;
pub const MIN_BATCH_SIZE: u32 = 100;
pub const MAX_BATCH_SIZE: u32 = 10_000;

/// One unit of work handed to every worker at once: they all race against
/// the same criteria until `target_count` distinct matches are published.
pub struct Job {
    pub criteria: GenerationCriteria,
    pub batch_size: u32,
    pub target_count: u32,
    pub found_count: AtomicUsize,
    pub cancelled: AtomicBool,
    pub result_tx: SyncSender<GenerationResult>,
    pub started_at: Instant,
}

impl Job {
    pub fn new(criteria: GenerationCriteria, batch_size: u32, target_count: u32, result_tx: SyncSender<GenerationResult>) -> Self {
        Self {
            criteria,
            batch_size: batch_size.clamp(MIN_BATCH_SIZE, MAX_BATCH_SIZE),
            target_count,
            found_count: AtomicUsize::new(0),
            cancelled: AtomicBool::new(false),
            result_tx,
            started_at: Instant::now(),
        }
    }

    fn is_done(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed) || self.found_count.load(Ordering::Relaxed) >= self.target_count as usize
    }
}

/// Runs `job` to completion on `worker_id`'s behalf, stopping once the job
/// is cancelled, the target count is reached, or `pool_cancelled` is set by
/// a pool-wide shutdown. Returns control to the caller's outer dispatch loop
/// either way — the worker thread itself keeps running and waits for the
/// next job.
pub fn run_job(job: &Arc<Job>, worker_id: u32, stats: &WorkerStats, pool_cancelled: &AtomicBool) {
    let secp = Secp256k1::signing_only();
    let mut rng = thread_rng();
    let worker_stat = &stats[worker_id as usize];
    worker_stat.active.store(true, Ordering::Relaxed);

    // §4.4: the search's very first candidate comes from a freshly generated
    // mnemonic rather than raw entropy, so a match is also seed-recoverable.
    // Only worker 0 spends this one extra attempt; the other workers go
    // straight into the random hot loop.
    if worker_id == 0 && job.criteria.use_mnemonic() {
        if let Ok(seed) = mnemonic::generate(&secp, &mut rng) {
            worker_stat.attempts.fetch_add(1, Ordering::Relaxed);
            if job.criteria.matches(&seed.address) && !job.is_done() {
                let slot = job.found_count.fetch_add(1, Ordering::SeqCst);
                if slot < job.target_count as usize {
                    let total_attempts: u64 = stats.iter().map(|w| w.attempts.load(Ordering::Relaxed)).sum();
                    let wallet = Wallet::new(
                        seed.secret_key.secret_bytes(),
                        seed.public_key_xy,
                        seed.address,
                        Some(seed.phrase),
                    );
                    let result = GenerationResult {
                        wallet,
                        attempts: total_attempts,
                        duration: job.started_at.elapsed(),
                        worker_id,
                    };
                    let _ = job.result_tx.try_send(result);
                    if slot + 1 >= job.target_count as usize {
                        job.cancelled.store(true, Ordering::SeqCst);
                    }
                } else {
                    // Lost the race for a slot: the mnemonic never becomes a
                    // published wallet, so scrub it instead of letting it drop.
                    zeroize_string(seed.phrase);
                }
            } else {
                // No match on the seeded attempt: discard the phrase per §4.4.
                zeroize_string(seed.phrase);
            }
        }
    }

    while !job.is_done() && !pool_cancelled.load(Ordering::Relaxed) {
        let batch_start = Instant::now();
        let mut attempts_this_batch = 0u32;

        for _ in 0..job.batch_size {
            attempts_this_batch += 1;
            let Some(keypair) = try_random_keypair(&secp, &mut rng) else {
                continue;
            };
            let address = derive_address(&keypair.public_key_xy);
            if !job.criteria.matches(&address) {
                continue;
            }

            let slot = job.found_count.fetch_add(1, Ordering::SeqCst);
            if slot >= job.target_count as usize {
                continue;
            }

            worker_stat.attempts.fetch_add(attempts_this_batch as u64, Ordering::Relaxed);
            attempts_this_batch = 0;

            let total_attempts: u64 = stats.iter().map(|w| w.attempts.load(Ordering::Relaxed)).sum();
            let wallet = Wallet::new(keypair.secret_key.secret_bytes(), keypair.public_key_xy, address, None);
            let result = GenerationResult {
                wallet,
                attempts: total_attempts,
                duration: job.started_at.elapsed(),
                worker_id,
            };
            let _ = job.result_tx.try_send(result);

            if slot + 1 >= job.target_count as usize {
                job.cancelled.store(true, Ordering::SeqCst);
            }
        }

        worker_stat.attempts.fetch_add(attempts_this_batch as u64, Ordering::Relaxed);
        worker_stat.last_batch_nanos.store(batch_start.elapsed().as_nanos() as u64, Ordering::Relaxed);
    }

    worker_stat.active.store(false, Ordering::Relaxed);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::stats::new_worker_stats;
    use std::sync::mpsc::sync_channel;

    #[test]
    fn finds_a_trivially_easy_pattern_quickly() {
        let criteria = GenerationCriteria::new("", "", false, false).unwrap();
        let (tx, rx) = sync_channel(1);
        let job = Arc::new(Job::new(criteria, 10, 1, tx));
        let stats = new_worker_stats(1);
        let pool_cancelled = AtomicBool::new(false);

        run_job(&job, 0, &stats, &pool_cancelled);

        let result = rx.try_recv().expect("empty prefix matches the first candidate");
        assert_eq!(result.worker_id, 0);
        assert!(result.attempts >= 1);
    }

    #[test]
    fn stops_promptly_on_pool_cancellation() {
        let criteria = GenerationCriteria::new("ffffffffff", "", false, false).unwrap();
        let (tx, _rx) = sync_channel(1);
        let job = Arc::new(Job::new(criteria, MIN_BATCH_SIZE, 1, tx));
        let stats = new_worker_stats(1);
        let pool_cancelled = AtomicBool::new(true);

        run_job(&job, 0, &stats, &pool_cancelled);

        assert_eq!(stats[0].attempts.load(Ordering::Relaxed), 0);
    }
}
