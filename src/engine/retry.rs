//! Bounded retry with a fixed cooldown for rate limits and linear backoff otherwise.

use std::sync::Mutex;
use std::time::{Duration, Instant};

use crate::error::RemoteError;

/// Errors the harness can classify.
pub trait RetryClass {
    fn is_rate_limited(&self) -> bool;
}

impl RetryClass for RemoteError {
    fn is_rate_limited(&self) -> bool {
        RemoteError::is_rate_limited(self)
    }
}

#[derive(Clone, Debug)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub max_attempts: u32,
    /// Non-rate-limit failures wait `base_delay * attempt` before the next attempt.
    pub base_delay: Duration,
    /// Fixed wait after a rate-limited failure.
    pub rate_limit_cooldown: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
            rate_limit_cooldown: Duration::from_secs(60),
        }
    }
}

impl RetryPolicy {
    /// Delay after failed attempt number `attempt` (1-based).
    pub fn delay_for(&self, attempt: u32, rate_limited: bool) -> Duration {
        if rate_limited {
            self.rate_limit_cooldown
        } else {
            self.base_delay * attempt
        }
    }
}

/// Injected sleep so retries are testable without real delays.
pub trait Sleeper: Sync {
    fn sleep(&self, delay: Duration, rate_limited: bool);

    /// Total slept so far, for sleepers that keep count.
    fn slept(&self) -> Duration {
        Duration::ZERO
    }
}

/// Run `op` and return its wall time minus whatever `sleeper` slept meanwhile.
pub fn time_awake<T>(sleeper: &dyn Sleeper, op: impl FnOnce() -> T) -> (T, Duration) {
    let slept_before = sleeper.slept();
    let started = Instant::now();
    let out = op();
    let elapsed = started.elapsed();
    let slept = sleeper.slept().saturating_sub(slept_before);
    (out, elapsed.saturating_sub(slept))
}

/// Sleeps on the current thread.
#[derive(Clone, Copy, Debug, Default)]
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&self, delay: Duration, _rate_limited: bool) {
        std::thread::sleep(delay);
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SleepTally {
    pub total: Duration,
    pub rate_limit_waits: usize,
}

/// Wraps another sleeper and tallies what it slept, for the run summary.
pub struct TallyingSleeper<'a> {
    inner: &'a dyn Sleeper,
    tally: Mutex<SleepTally>,
}

impl<'a> TallyingSleeper<'a> {
    pub fn new(inner: &'a dyn Sleeper) -> Self {
        Self {
            inner,
            tally: Mutex::new(SleepTally::default()),
        }
    }

    pub fn tally(&self) -> SleepTally {
        self.tally.lock().map(|t| *t).unwrap_or_default()
    }
}

impl Sleeper for TallyingSleeper<'_> {
    fn sleep(&self, delay: Duration, rate_limited: bool) {
        self.inner.sleep(delay, rate_limited);
        if let Ok(mut t) = self.tally.lock() {
            t.total += delay;
            if rate_limited {
                t.rate_limit_waits += 1;
            }
        }
    }

    fn slept(&self) -> Duration {
        self.tally().total
    }
}

/// Run `op` until it succeeds or `policy.max_attempts` attempts have failed; returns the last error.
pub fn with_retry<T, E, F>(policy: &RetryPolicy, sleeper: &dyn Sleeper, mut op: F) -> Result<T, E>
where
    E: RetryClass + std::fmt::Display,
    F: FnMut() -> Result<T, E>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1;
    loop {
        match op() {
            Ok(v) => return Ok(v),
            Err(err) if attempt >= max_attempts => {
                log::warn!("retries exhausted after {} attempts: {}", attempt, err);
                return Err(err);
            }
            Err(err) => {
                let rate_limited = err.is_rate_limited();
                let delay = policy.delay_for(attempt, rate_limited);
                if rate_limited {
                    log::warn!("rate limit reached, waiting {:?}", delay);
                } else {
                    log::warn!("attempt {} failed ({}), retrying in {:?}", attempt, err, delay);
                }
                sleeper.sleep(delay, rate_limited);
                attempt += 1;
            }
        }
    }
}
