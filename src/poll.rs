//! Bounded polling for remote state that cannot be awaited directly.
//!
//! Shopify processes theme imports and uploaded files asynchronously and
//! offers no callback for either, so every stage that waits on remote state
//! goes through [`poll_until`]. The primitive never decides whether running
//! out of budget is fatal: it reports [`PollOutcome::Exhausted`] and the
//! caller picks soft or hard handling.
//!
//! # Example
//!
//! ```rust
//! use std::time::Duration;
//! use shopify_provision::poll::{poll_until, PollOutcome, PollPolicy};
//!
//! # tokio_test::block_on(async {
//! let policy = PollPolicy::attempts(Duration::ZERO, 5);
//! let outcome = poll_until(&policy, |attempt| async move {
//!     Ok::<_, std::convert::Infallible>((attempt == 3).then_some("done"))
//! })
//! .await
//! .unwrap();
//!
//! assert_eq!(outcome, PollOutcome::Ready { value: "done", attempts: 3 });
//! # });
//! ```

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;

/// How long a poll may keep probing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PollBudget {
    /// Probe at most this many times.
    Attempts(u32),
    /// Keep probing until this much time has elapsed since the first probe.
    Timeout(Duration),
}

/// Interval and budget for [`poll_until`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PollPolicy {
    interval: Duration,
    budget: PollBudget,
}

impl PollPolicy {
    /// A policy that probes at most `max_attempts` times, `interval` apart.
    #[must_use]
    pub const fn attempts(interval: Duration, max_attempts: u32) -> Self {
        Self {
            interval,
            budget: PollBudget::Attempts(max_attempts),
        }
    }

    /// A policy that keeps probing, `interval` apart, until `timeout` elapses.
    #[must_use]
    pub const fn timeout(interval: Duration, timeout: Duration) -> Self {
        Self {
            interval,
            budget: PollBudget::Timeout(timeout),
        }
    }

    /// Delay between two probes.
    #[must_use]
    pub const fn interval(&self) -> Duration {
        self.interval
    }

    /// The budget of this policy.
    #[must_use]
    pub const fn budget(&self) -> PollBudget {
        self.budget
    }

    /// The attempt cap, if this policy is attempt-bounded.
    #[must_use]
    pub const fn max_attempts(&self) -> Option<u32> {
        match self.budget {
            PollBudget::Attempts(n) => Some(n),
            PollBudget::Timeout(_) => None,
        }
    }
}

/// Result of [`poll_until`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PollOutcome<T> {
    /// The probe produced a value.
    Ready {
        /// The value produced by the final probe.
        value: T,
        /// Number of probes issued, including the successful one.
        attempts: u32,
    },
    /// The budget ran out before the probe produced a value.
    Exhausted {
        /// Number of probes issued.
        attempts: u32,
        /// Time spent polling.
        elapsed: Duration,
    },
}

impl<T> PollOutcome<T> {
    /// Returns the ready value, discarding exhaustion details.
    pub fn ready(self) -> Option<T> {
        match self {
            Self::Ready { value, .. } => Some(value),
            Self::Exhausted { .. } => None,
        }
    }

    /// Number of probes issued.
    pub const fn attempts(&self) -> u32 {
        match self {
            Self::Ready { attempts, .. } | Self::Exhausted { attempts, .. } => *attempts,
        }
    }
}

/// Repeatedly runs `probe` until it yields `Some`, the budget is spent, or
/// it fails.
///
/// `probe` receives the 1-based attempt number. It returns `Ok(Some(value))`
/// when the awaited state is reached, `Ok(None)` to keep waiting and `Err`
/// to abort polling altogether. There is no sleep after the last probe, so
/// an attempt budget of `n` issues exactly `n` probes and `n - 1` sleeps.
///
/// A timeout budget always issues at least one probe and never sleeps past
/// the deadline.
///
/// # Errors
///
/// Returns the first error produced by `probe`.
pub async fn poll_until<T, E, F, Fut>(policy: &PollPolicy, mut probe: F) -> Result<PollOutcome<T>, E>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<Option<T>, E>>,
{
    let started = Instant::now();
    let mut attempts: u32 = 0;

    loop {
        attempts += 1;
        if let Some(value) = probe(attempts).await? {
            return Ok(PollOutcome::Ready { value, attempts });
        }

        let elapsed = started.elapsed();
        let delay = match policy.budget {
            PollBudget::Attempts(max) => {
                if attempts >= max {
                    return Ok(PollOutcome::Exhausted { attempts, elapsed });
                }
                policy.interval
            }
            PollBudget::Timeout(timeout) => {
                let Some(remaining) = timeout.checked_sub(elapsed).filter(|r| !r.is_zero())
                else {
                    return Ok(PollOutcome::Exhausted { attempts, elapsed });
                };
                policy.interval.min(remaining)
            }
        };

        tracing::debug!(attempt = attempts, delay_ms = delay.as_millis(), "poll not ready");
        tokio::time::sleep(delay).await;
    }
}
