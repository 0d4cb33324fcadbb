//! Delays, backoff and bounded polling.
//!
//! Every wait in the pipeline goes through this module so that a zero-length
//! configuration turns the whole pipeline into a non-sleeping one.

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use tokio::time::Instant;
use tokio_retry::strategy::ExponentialBackoff;

/// An inclusive range of durations to sample a randomized wait from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DelayRange {
    pub min: Duration,
    pub max: Duration,
}

impl DelayRange {
    /// Creates a range; the bounds are swapped if given in the wrong order.
    pub fn new(min: Duration, max: Duration) -> Self {
        if min <= max {
            Self { min, max }
        } else {
            Self { min: max, max: min }
        }
    }

    /// A range that always yields `delay`.
    pub fn fixed(delay: Duration) -> Self {
        Self {
            min: delay,
            max: delay,
        }
    }

    /// Samples a duration uniformly from the range.
    pub fn sample(&self) -> Duration {
        if self.min == self.max {
            return self.min;
        }
        let min = self.min.as_millis() as u64;
        let max = self.max.as_millis() as u64;
        Duration::from_millis(rand::rng().random_range(min..=max))
    }

    /// Sleeps for a sampled duration and returns it.
    pub async fn wait(&self) -> Duration {
        let delay = self.sample();
        sleep_for(delay).await;
        delay
    }
}

/// Sleeps unless `delay` is zero.
pub async fn sleep_for(delay: Duration) {
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
}

/// Backoff schedule for the waits between extraction attempts.
///
/// Wait `n` (zero-based) is `min(base * 2^n, max)`, built on
/// `ExponentialBackoff`, plus a random amount of up to `jitter_max`. `base` is
/// taken in whole milliseconds and rounded down to an even count. The schedule
/// never ends; the caller takes one delay per failed attempt.
///
/// # Arguments
///
/// * `base` - Delay after the first failure
/// * `max` - Upper bound for the exponential part
/// * `jitter_max` - Upper bound of the random amount added on top
pub fn retry_backoff(
    base: Duration,
    max: Duration,
    jitter_max: Duration,
) -> impl Iterator<Item = Duration> + Send {
    let base_ms = u64::try_from(base.as_millis()).unwrap_or(u64::MAX);
    let jitter = DelayRange::new(Duration::ZERO, jitter_max);
    // 2^(n+1) * (base / 2) == base * 2^n
    ExponentialBackoff::from_millis(2)
        .factor(base_ms / 2)
        .max_delay(max)
        .map(move |delay| delay.saturating_add(jitter.sample()))
}

/// Repeatedly runs `probe` until it yields a value or `timeout` expires.
///
/// The probe always runs at least once, so a zero timeout means "check once".
/// Probe errors abort the wait immediately.
///
/// # Returns
///
/// `Ok(Some(value))` on the first hit, `Ok(None)` when the deadline passes.
pub async fn poll_until<T, E, F, Fut>(
    timeout: Duration,
    interval: Duration,
    mut probe: F,
) -> Result<Option<T>, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Option<T>, E>>,
{
    let deadline = Instant::now() + timeout;
    loop {
        if let Some(value) = probe().await? {
            return Ok(Some(value));
        }
        if Instant::now() >= deadline {
            return Ok(None);
        }
        let remaining = deadline.saturating_duration_since(Instant::now());
        if interval.is_zero() {
            tokio::task::yield_now().await;
        } else {
            sleep_for(interval.min(remaining)).await;
        }
    }
}
