//! Retry-with-backoff combinator.
//!
//! The vectorization service is remote and flaky: 429s, 503s, empty
//! completions. [`retry_with_backoff`] runs an async operation up to
//! `max_attempts` times, sleeping `backoff(attempt)` between failures, and
//! reports what happened in a [`RetryState`] alongside the final result.
//! The backoff is an injected function so tests can use zero delays and a
//! stub that fails a fixed number of times.

use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use tracing::debug;

/// What the combinator did for one operation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryState {
    /// Attempts made, including the successful one.
    pub attempts: u32,
    /// Message of the most recent failure, if any attempt failed.
    pub last_error: Option<String>,
    /// Delay slept after each failed attempt except the last, in milliseconds.
    pub delays_ms: Vec<u64>,
}

impl RetryState {
    /// The most recent computed backoff, if any.
    pub fn last_delay_ms(&self) -> Option<u64> {
        self.delays_ms.last().copied()
    }
}

/// `base * 2^(attempt - 1)`: with a 2 s base the waits are 2 s, 4 s, 8 s, …
///
/// Saturates instead of overflowing for absurd attempt counts, so the
/// sequence is non-decreasing for every input.
pub fn exponential_backoff(base: Duration) -> impl Fn(u32) -> Duration + Send + Sync + Clone + 'static {
    move |attempt| {
        let exp = attempt.saturating_sub(1).min(31);
        base.saturating_mul(1u32 << exp)
    }
}

/// Run `op` until it succeeds or `max_attempts` attempts have failed.
///
/// `op` receives the 1-based attempt number. After a failed attempt that is
/// not the last, the combinator sleeps `backoff(attempt)`. A `max_attempts`
/// of zero is treated as one.
pub async fn retry_with_backoff<T, E, F, Fut, B>(
    max_attempts: u32,
    backoff: B,
    mut op: F,
) -> (Result<T, E>, RetryState)
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    B: Fn(u32) -> Duration,
    E: Display,
{
    let max_attempts = max_attempts.max(1);
    let mut state = RetryState::default();

    let mut attempt = 1;
    loop {
        state.attempts = attempt;
        match op(attempt).await {
            Ok(value) => return (Ok(value), state),
            Err(e) => {
                state.last_error = Some(e.to_string());
                if attempt >= max_attempts {
                    return (Err(e), state);
                }
                let delay = backoff(attempt);
                state.delays_ms.push(delay.as_millis() as u64);
                debug!(
                    "attempt {}/{} failed, sleeping {:?}",
                    attempt, max_attempts, delay
                );
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                attempt += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn no_delay(_: u32) -> Duration {
        Duration::ZERO
    }

    #[tokio::test]
    async fn succeeds_first_try() {
        let (res, state) =
            retry_with_backoff(3, no_delay, |_| async { Ok::<_, String>(7) }).await;
        assert_eq!(res, Ok(7));
        assert_eq!(state.attempts, 1);
        assert!(state.delays_ms.is_empty());
        assert!(state.last_error.is_none());
    }

    #[tokio::test]
    async fn fails_twice_then_succeeds() {
        let calls = AtomicU32::new(0);
        let (res, state) = retry_with_backoff(3, exponential_backoff(Duration::from_millis(1)), |attempt| {
            calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if attempt < 3 {
                    Err(format!("boom {attempt}"))
                } else {
                    Ok("svg")
                }
            }
        })
        .await;
        assert_eq!(res, Ok("svg"));
        assert_eq!(state.attempts, 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(state.delays_ms, vec![1, 2]);
        assert_eq!(state.last_error.as_deref(), Some("boom 2"));
    }

    #[tokio::test]
    async fn never_exceeds_max_attempts() {
        let calls = AtomicU32::new(0);
        let (res, state) = retry_with_backoff(4, no_delay, |_| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err::<(), _>("down") }
        })
        .await;
        assert_eq!(res, Err("down"));
        assert_eq!(state.attempts, 4);
        assert_eq!(calls.load(Ordering::SeqCst), 4);
        // No sleep after the final attempt.
        assert_eq!(state.delays_ms.len(), 3);
    }

    #[tokio::test]
    async fn zero_max_attempts_still_tries_once() {
        let (res, state) = retry_with_backoff(0, no_delay, |_| async { Err::<(), _>("x") }).await;
        assert!(res.is_err());
        assert_eq!(state.attempts, 1);
    }

    #[test]
    fn exponential_backoff_is_non_decreasing() {
        let b = exponential_backoff(Duration::from_secs(2));
        assert_eq!(b(1), Duration::from_secs(2));
        assert_eq!(b(2), Duration::from_secs(4));
        assert_eq!(b(3), Duration::from_secs(8));
        let mut prev = Duration::ZERO;
        for attempt in 1..200 {
            let d = b(attempt);
            assert!(d >= prev, "attempt {attempt}: {d:?} < {prev:?}");
            prev = d;
        }
    }

    #[test]
    fn blocking_caller_can_drive_combinator() {
        let (res, state) = tokio_test::block_on(retry_with_backoff(2, no_delay, |a| async move {
            if a == 1 {
                Err("first")
            } else {
                Ok(a)
            }
        }));
        assert_eq!(res, Ok(2));
        assert_eq!(state.attempts, 2);
    }
}
