//! Bounded retry for reconciliations
//!
//! A grown map is retried straight away. A lost race with another writer
//! waits a random delay first so the competing write can land.

use std::time::Duration;

use rand::Rng;
use tracing::{debug, warn};

use crate::error::{SyncError, SyncResult};

/// Attempt budget and delay range for conflict retries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Attempts including the first; at least 1
    pub max_attempts: u32,
    /// Shortest delay after a conflict
    pub min_delay: Duration,
    /// Longest delay after a conflict
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 25,
            min_delay: Duration::from_millis(10),
            max_delay: Duration::from_millis(250),
        }
    }
}

impl RetryPolicy {
    /// Single attempt, no retries.
    pub fn never() -> Self {
        Self { max_attempts: 1, ..Self::default() }
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    pub fn with_delay(mut self, min_delay: Duration, max_delay: Duration) -> Self {
        self.min_delay = min_delay;
        self.max_delay = max_delay;
        self
    }

    pub fn validate(&self) -> SyncResult<()> {
        if self.max_attempts == 0 {
            return Err(SyncError::validation("retry policy", "max_attempts must be at least 1"));
        }
        if self.min_delay > self.max_delay {
            return Err(SyncError::validation(
                "retry policy",
                format!("min_delay {:?} exceeds max_delay {:?}", self.min_delay, self.max_delay),
            ));
        }
        Ok(())
    }

    /// Random delay within the configured range.
    pub fn jitter(&self) -> Duration {
        if self.min_delay >= self.max_delay {
            return self.min_delay;
        }
        rand::thread_rng().gen_range(self.min_delay..=self.max_delay)
    }
}

/// Run `op` until it succeeds, fails for good, or the budget runs out.
///
/// `sleep` receives each conflict delay; pass `std::thread::sleep` in
/// production and a no-op in tests.
pub fn retry<T, F, Op>(policy: &RetryPolicy, mut sleep: F, mut op: Op) -> SyncResult<T>
where
    F: FnMut(Duration),
    Op: FnMut() -> SyncResult<T>,
{
    policy.validate()?;

    let mut attempt = 1;
    loop {
        let err = match op() {
            Ok(value) => return Ok(value),
            Err(err) if err.is_retryable() => err,
            Err(err) => return Err(err),
        };

        if attempt >= policy.max_attempts {
            warn!(attempts = attempt, error = %err, "retry budget exhausted");
            return Err(SyncError::RetriesExhausted { attempts: attempt, last: Box::new(err) });
        }

        if err.is_capacity() {
            debug!(attempt, "map grown, retrying");
        } else {
            let delay = policy.jitter();
            debug!(attempt, ?delay, error = %err, "write conflict, retrying");
            sleep(delay);
        }
        attempt += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lnstore_core::StoreError;

    fn conflict() -> SyncError {
        StoreError::NotFound { table: "nodes".into() }.into()
    }

    #[test]
    fn test_default_policy() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts, 25);
        assert!(policy.validate().is_ok());
        for _ in 0..100 {
            let delay = policy.jitter();
            assert!(delay >= policy.min_delay && delay <= policy.max_delay);
        }
    }

    #[test]
    fn test_invalid_policy() {
        assert!(RetryPolicy::default().with_max_attempts(0).validate().is_err());
        let inverted = RetryPolicy::default().with_delay(Duration::from_millis(5), Duration::from_millis(1));
        assert_eq!(inverted.validate().unwrap_err().status(), 400);
    }

    #[test]
    fn test_success_after_conflicts() {
        let mut sleeps = Vec::new();
        let mut calls = 0;
        let value = retry(&RetryPolicy::default(), |d| sleeps.push(d), || {
            calls += 1;
            if calls < 3 {
                Err(conflict())
            } else {
                Ok(calls)
            }
        })
        .unwrap();

        assert_eq!(value, 3);
        assert_eq!(sleeps.len(), 2);
    }

    #[test]
    fn test_capacity_retries_without_sleep() {
        let mut sleeps = 0;
        let mut calls = 0;
        retry(&RetryPolicy::default(), |_| sleeps += 1, || {
            calls += 1;
            if calls == 1 {
                Err(StoreError::CapacityExhausted { operation: "put", map_size: 1 << 20 }.into())
            } else {
                Ok(())
            }
        })
        .unwrap();

        assert_eq!(calls, 2);
        assert_eq!(sleeps, 0);
    }

    #[test]
    fn test_non_retryable_surfaces_at_once() {
        let mut calls = 0;
        let err = retry(&RetryPolicy::default(), |_| {}, || -> SyncResult<()> {
            calls += 1;
            Err(SyncError::validation("node", "expected public key"))
        })
        .unwrap_err();

        assert_eq!(calls, 1);
        assert_eq!(err.status(), 400);
    }

    #[test]
    fn test_exhaustion() {
        let mut calls = 0;
        let policy = RetryPolicy::default().with_max_attempts(4);
        let err = retry(&policy, |_| {}, || -> SyncResult<()> {
            calls += 1;
            Err(conflict())
        })
        .unwrap_err();

        assert_eq!(calls, 4);
        assert_eq!(err.status(), 503);
        assert!(matches!(err, SyncError::RetriesExhausted { attempts: 4, .. }));
    }
}
