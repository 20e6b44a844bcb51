//! Bounded retry with exponential backoff for note-graph calls.

use super::GraphResult;
use log::warn;
use std::thread;
use std::time::Duration;

/// Retry schedule for transient (`Timeout`/`Unavailable`) failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first; at least 1.
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_secs(2),
        }
    }
}

impl RetryPolicy {
    /// Single attempt, no waiting.
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            initial_backoff: Duration::ZERO,
            max_backoff: Duration::ZERO,
        }
    }

    /// Backoff before retry number `retry` (0-based), doubled each time and capped.
    pub fn backoff_for(&self, retry: u32) -> Duration {
        let factor = 2u32.saturating_pow(retry);
        self.initial_backoff
            .saturating_mul(factor)
            .min(self.max_backoff)
    }

    /// Runs `call` until it succeeds, fails permanently or attempts run out.
    pub fn run<T>(
        &self,
        operation: &str,
        note_id: &str,
        mut call: impl FnMut() -> GraphResult<T>,
    ) -> GraphResult<T> {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            match call() {
                Ok(value) => return Ok(value),
                Err(err) if err.is_retryable() && attempt < max_attempts => {
                    let backoff = self.backoff_for(attempt - 1);
                    warn!(
                        "event=graph_retry module=graph status=retry operation={} note_id={} attempt={} backoff_ms={} error_code={}",
                        operation,
                        note_id,
                        attempt,
                        backoff.as_millis(),
                        err.code()
                    );
                    if !backoff.is_zero() {
                        thread::sleep(backoff);
                    }
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::RetryPolicy;
    use crate::graph::GraphError;
    use std::cell::Cell;
    use std::time::Duration;

    fn instant_policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            initial_backoff: Duration::ZERO,
            max_backoff: Duration::ZERO,
        }
    }

    #[test]
    fn backoff_doubles_and_caps() {
        let policy = RetryPolicy {
            max_attempts: 5,
            initial_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_millis(350),
        };
        assert_eq!(policy.backoff_for(0), Duration::from_millis(100));
        assert_eq!(policy.backoff_for(1), Duration::from_millis(200));
        assert_eq!(policy.backoff_for(2), Duration::from_millis(350));
        assert_eq!(policy.backoff_for(40), Duration::from_millis(350));
    }

    #[test]
    fn transient_failures_are_retried_until_success() {
        let calls = Cell::new(0);
        let result = instant_policy(3).run("update_note", "n", || {
            calls.set(calls.get() + 1);
            if calls.get() < 3 {
                Err(GraphError::Unavailable("offline".to_string()))
            } else {
                Ok(calls.get())
            }
        });
        assert_eq!(result, Ok(3));
    }

    #[test]
    fn attempts_are_bounded() {
        let calls = Cell::new(0);
        let result: Result<(), GraphError> = instant_policy(2).run("update_note", "n", || {
            calls.set(calls.get() + 1);
            Err(GraphError::Unavailable("offline".to_string()))
        });
        assert!(result.is_err());
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn permanent_failures_are_not_retried() {
        let calls = Cell::new(0);
        let result: Result<(), GraphError> = instant_policy(5).run("update_note", "n", || {
            calls.set(calls.get() + 1);
            Err(GraphError::NoteNotFound("n".to_string()))
        });
        assert_eq!(result, Err(GraphError::NoteNotFound("n".to_string())));
        assert_eq!(calls.get(), 1);
    }
}
