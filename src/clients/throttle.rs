//! Client-side request throttling.
//!
//! Shopify enforces a leaky bucket per app and shop. The pipeline does not
//! read the rate-limit headers to adapt, it only spaces its own calls with a
//! `governor` rate limiter whose burst and period come from configuration.

use std::fmt;
use std::num::NonZeroU32;
use std::time::Duration;

use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};

use crate::error::ConfigError;

/// Rate limit parameters.
///
/// Up to `capacity` requests go out back to back, after which one request
/// is allowed per `refill_interval`. A zero interval disables throttling.
///
/// # Example
///
/// ```rust
/// use std::time::Duration;
/// use shopify_provision::clients::ThrottleSettings;
///
/// // Bursts of 4, then one call every 500 ms.
/// let settings = ThrottleSettings::new(4, Duration::from_millis(500));
/// assert_eq!(settings.capacity(), 4);
/// assert!(!settings.is_unlimited());
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ThrottleSettings {
    capacity: u32,
    refill_interval: Duration,
}

impl ThrottleSettings {
    /// Creates settings for a bucket of `capacity` tokens refilled one per
    /// `refill_interval`.
    #[must_use]
    pub const fn new(capacity: u32, refill_interval: Duration) -> Self {
        Self {
            capacity,
            refill_interval,
        }
    }

    /// Settings that never delay a request.
    #[must_use]
    pub const fn unlimited() -> Self {
        Self::new(1, Duration::ZERO)
    }

    /// Bucket size.
    #[must_use]
    pub const fn capacity(&self) -> u32 {
        self.capacity
    }

    /// Time to regain one token.
    #[must_use]
    pub const fn refill_interval(&self) -> Duration {
        self.refill_interval
    }

    /// Returns `true` if these settings never delay a request.
    #[must_use]
    pub const fn is_unlimited(&self) -> bool {
        self.refill_interval.is_zero()
    }

    pub(crate) fn validate(self) -> Result<(), ConfigError> {
        if self.capacity == 0 {
            return Err(ConfigError::InvalidSetting {
                field: "throttle.capacity",
                reason: "bucket must hold at least one token".to_string(),
            });
        }
        Ok(())
    }
}

impl Default for ThrottleSettings {
    fn default() -> Self {
        Self::new(1, Duration::from_millis(250))
    }
}

/// A request limiter shared by every Admin API client of a run.
///
/// Wraps a direct (unkeyed) `governor` rate limiter: a burst of
/// `capacity` requests, then one request per `refill_interval`. Unlimited
/// settings build no limiter at all.
pub struct Throttle {
    settings: ThrottleSettings,
    limiter: Option<DefaultDirectRateLimiter>,
}

impl fmt::Debug for Throttle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Throttle")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl Throttle {
    /// Creates a limiter with its full burst available.
    #[must_use]
    pub fn new(settings: ThrottleSettings) -> Self {
        let burst = NonZeroU32::new(settings.capacity).unwrap_or(NonZeroU32::MIN);
        let limiter = Quota::with_period(settings.refill_interval)
            .map(|quota| RateLimiter::direct(quota.allow_burst(burst)));

        Self { settings, limiter }
    }

    /// Returns the settings this limiter was created with.
    #[must_use]
    pub const fn settings(&self) -> ThrottleSettings {
        self.settings
    }

    /// Waits until a request may be sent.
    pub async fn until_ready(&self) {
        let Some(limiter) = &self.limiter else {
            return;
        };

        if limiter.check().is_err() {
            tracing::trace!("throttling admin api request");
            limiter.until_ready().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[test]
    fn test_default_is_one_call_per_quarter_second() {
        let settings = ThrottleSettings::default();
        assert_eq!(settings.capacity(), 1);
        assert_eq!(settings.refill_interval(), Duration::from_millis(250));
    }

    #[test]
    fn test_zero_capacity_is_rejected() {
        let result = ThrottleSettings::new(0, Duration::from_millis(10)).validate();
        assert!(matches!(
            result,
            Err(ConfigError::InvalidSetting {
                field: "throttle.capacity",
                ..
            })
        ));
    }

    #[tokio::test]
    async fn test_burst_then_spaced_calls() {
        let throttle = Throttle::new(ThrottleSettings::new(2, Duration::from_millis(100)));
        let start = Instant::now();

        throttle.until_ready().await;
        throttle.until_ready().await;
        assert!(start.elapsed() < Duration::from_millis(50));

        throttle.until_ready().await;
        throttle.until_ready().await;
        assert!(start.elapsed() >= Duration::from_millis(180));
    }

    #[tokio::test]
    async fn test_idle_time_restores_burst() {
        let throttle = Throttle::new(ThrottleSettings::new(1, Duration::from_millis(50)));
        throttle.until_ready().await;

        tokio::time::sleep(Duration::from_millis(80)).await;
        let before = Instant::now();
        throttle.until_ready().await;
        assert!(before.elapsed() < Duration::from_millis(30));
    }

    #[tokio::test]
    async fn test_unlimited_never_waits() {
        let throttle = Throttle::new(ThrottleSettings::unlimited());
        let start = Instant::now();
        for _ in 0..100 {
            throttle.until_ready().await;
        }
        assert!(start.elapsed() < Duration::from_millis(50));
    }

    #[test]
    fn test_zero_interval_builds_no_limiter() {
        assert!(Throttle::new(ThrottleSettings::unlimited()).limiter.is_none());
        assert!(Throttle::new(ThrottleSettings::default()).limiter.is_some());
    }
}
