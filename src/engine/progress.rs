//! Progress broker (SPEC_FULL.md §5, §6): a single-producer, single-consumer
//! channel of bounded capacity 1 that drops the newest snapshot when the
//! consumer is behind, so the collector thread never blocks on a slow UI.

use std::sync::mpsc::{sync_channel, Receiver, SyncSender, TrySendError};
use std::time::Duration;

use crate::engine::stats::AggregatedStats;

#[derive(Debug, Clone, Copy)]
pub struct ProgressSnapshot {
    pub attempts: u64,
    pub speed: f64,
    pub peak_speed: f64,
    pub difficulty: f64,
    pub probability_so_far: f64,
    pub eta_seconds: Option<f64>,
    pub matched: u32,
    pub target: u32,
    pub complete: bool,
}

impl ProgressSnapshot {
    pub fn new(stats: AggregatedStats, difficulty: f64, matched: u32, target: u32) -> Self {
        let remaining = (difficulty - stats.total_attempts as f64).max(0.0);
        let probability_so_far = 1.0 - (-(stats.total_attempts as f64) / difficulty).exp();
        Self {
            attempts: stats.total_attempts,
            speed: stats.total_speed,
            peak_speed: stats.peak_speed,
            difficulty,
            probability_so_far: probability_so_far.clamp(0.0, 1.0),
            eta_seconds: crate::pattern::eta_seconds(stats.total_speed, remaining),
            matched,
            target,
            complete: matched >= target,
        }
    }
}

pub struct ProgressSender(SyncSender<ProgressSnapshot>);

impl ProgressSender {
    /// Publishes `snapshot`, silently discarding it if the consumer hasn't
    /// drained the previous one yet. A stalled consumer must never stall the
    /// sampling thread.
    pub fn publish(&self, snapshot: ProgressSnapshot) {
        match self.0.try_send(snapshot) {
            Ok(()) | Err(TrySendError::Full(_)) => {}
            Err(TrySendError::Disconnected(_)) => {}
        }
    }
}

pub struct ProgressReceiver(Receiver<ProgressSnapshot>);

impl ProgressReceiver {
    pub fn try_recv(&self) -> Option<ProgressSnapshot> {
        self.0.try_recv().ok()
    }

    pub fn recv_timeout(&self, timeout: Duration) -> Option<ProgressSnapshot> {
        self.0.recv_timeout(timeout).ok()
    }
}

pub fn channel() -> (ProgressSender, ProgressReceiver) {
    let (tx, rx) = sync_channel(1);
    (ProgressSender(tx), ProgressReceiver(rx))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::stats::AggregatedStats;

    fn stats(attempts: u64, speed: f64) -> AggregatedStats {
        AggregatedStats {
            total_attempts: attempts,
            total_speed: speed,
            peak_speed: speed,
            per_worker_balance_score: 1.0,
            efficiency_ratio: 1.0,
            worker_count: 4,
        }
    }

    #[test]
    fn drops_newest_when_consumer_is_behind() {
        let (tx, rx) = channel();
        tx.publish(ProgressSnapshot::new(stats(1, 10.0), 1000.0, 0, 1));
        tx.publish(ProgressSnapshot::new(stats(2, 10.0), 1000.0, 0, 1));
        let received = rx.try_recv().unwrap();
        assert_eq!(received.attempts, 1);
        assert!(rx.try_recv().is_none());
    }

    #[test]
    fn complete_flag_tracks_target() {
        let snapshot = ProgressSnapshot::new(stats(100, 10.0), 1000.0, 1, 1);
        assert!(snapshot.complete);
        let snapshot = ProgressSnapshot::new(stats(100, 10.0), 1000.0, 0, 1);
        assert!(!snapshot.complete);
    }
}
