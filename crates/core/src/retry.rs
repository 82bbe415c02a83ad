//! Bounded retry with a fixed delay between attempts.
//!
//! Both halves of an extract refresh are built on [`retry_with_backoff`]: the
//! trigger retries while another refresh holds the workbook, the poller
//! "retries" while the job is still running. They differ only in the policy
//! and in which errors count as retryable.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Ceiling and delay for one retry loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub max_attempts: u32,
    /// Fixed pause between attempts, in seconds.
    pub delay_secs: u64,
}

impl RetryPolicy {
    pub const fn new(max_attempts: u32, delay_secs: u64) -> Self {
        Self {
            max_attempts,
            delay_secs,
        }
    }

    pub fn delay(&self) -> Duration {
        Duration::from_secs(self.delay_secs)
    }
}

/// Outcome of a single attempt that did not fail outright.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step<T> {
    /// Finished; stop looping and hand back the value.
    Done(T),
    /// Not there yet; sleep and try again if budget remains.
    Again,
}

/// Why a retry loop ended without a value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryError<E> {
    /// The attempt budget ran out while still retrying.
    Exhausted { attempts: u32 },
    /// An attempt failed with an error the predicate rejected.
    Failed(E),
}

/// Seam over `std::thread::sleep` so loops can be driven without waiting.
pub trait Sleeper: Send + Sync {
    fn sleep(&self, duration: Duration);
}

/// Blocks the calling thread.
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Records requested sleeps instead of blocking. Clones share the same log.
#[derive(Debug, Default, Clone)]
pub struct RecordingSleeper {
    slept: Arc<Mutex<Vec<Duration>>>,
}

impl RecordingSleeper {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every duration passed to `sleep`, in call order.
    pub fn sleeps(&self) -> Vec<Duration> {
        self.slept
            .lock()
            .map(|v| v.clone())
            .unwrap_or_else(|poisoned| poisoned.into_inner().clone())
    }
}

impl Sleeper for RecordingSleeper {
    fn sleep(&self, duration: Duration) {
        match self.slept.lock() {
            Ok(mut v) => v.push(duration),
            Err(poisoned) => poisoned.into_inner().push(duration),
        }
    }
}

/// Run `attempt` up to `policy.max_attempts` times.
///
/// `attempt` receives the 1-based attempt number. A `Step::Again` or an error
/// accepted by `retryable` consumes one attempt and, when another attempt
/// remains, one sleep of `policy.delay()`. There is no sleep after the final
/// attempt. Any other error ends the loop immediately.
pub fn retry_with_backoff<T, E, F, P>(
    policy: &RetryPolicy,
    sleeper: &dyn Sleeper,
    mut attempt: F,
    retryable: P,
) -> Result<T, RetryError<E>>
where
    F: FnMut(u32) -> Result<Step<T>, E>,
    P: Fn(&E) -> bool,
{
    let max = policy.max_attempts;
    for n in 1..=max {
        match attempt(n) {
            Ok(Step::Done(value)) => return Ok(value),
            Ok(Step::Again) => {}
            Err(e) if retryable(&e) => {}
            Err(e) => return Err(RetryError::Failed(e)),
        }
        if n < max {
            tracing::trace!(attempt = n, max_attempts = max, delay_secs = policy.delay_secs, "retrying after delay");
            sleeper.sleep(policy.delay());
        }
    }
    Err(RetryError::Exhausted { attempts: max })
}
