//! Retry wrapper above the envelope (SPEC_FULL.md §4.9): recoverable
//! filesystem errors are retried with fresh secret material each time;
//! fatal errors short-circuit.

use std::thread;
use std::time::Duration;

use crate::error::EngineError;

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub retry_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { max_retries: 3, retry_delay: Duration::from_millis(100) }
    }
}

/// Calls `attempt` up to `policy.max_retries + 1` times. `attempt` should
/// re-derive any fresh salt/IV/password itself on each call, so a partial
/// write never aliases an earlier secret (§4.9).
pub fn with_retry<T>(
    policy: RetryPolicy,
    mut attempt: impl FnMut(u32) -> Result<T, EngineError>,
) -> Result<T, EngineError> {
    let mut last_err = None;
    for try_index in 0..=policy.max_retries {
        match attempt(try_index) {
            Ok(value) => return Ok(value),
            Err(e) => {
                let recoverable = e.is_recoverable();
                last_err = Some(e);
                if !recoverable || try_index == policy.max_retries {
                    break;
                }
                thread::sleep(policy.retry_delay);
            }
        }
    }
    Err(last_err.expect("loop runs at least once"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn retries_recoverable_errors_until_success() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy { max_retries: 3, retry_delay: Duration::from_millis(1) };
        let result = with_retry(policy, |_| {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            if n < 2 {
                Err(EngineError::filesystem("test", "op", "transient", true))
            } else {
                Ok(42)
            }
        });
        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn short_circuits_on_fatal_error() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy::default();
        let result: Result<(), _> = with_retry(policy, |_| {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(EngineError::validation("test", "op", "fatal"))
        });
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn gives_up_after_max_retries() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy { max_retries: 2, retry_delay: Duration::from_millis(1) };
        let result: Result<(), _> = with_retry(policy, |_| {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(EngineError::filesystem("test", "op", "always transient", true))
        });
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }
}
