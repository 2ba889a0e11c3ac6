//! Configuration types for storefront provisioning.
//!
//! # Overview
//!
//! - [`ProvisionConfig`]: all knobs for one provisioning run
//! - [`ProvisionConfigBuilder`]: builder with validated defaults
//! - [`ShopDomain`], [`AccessToken`], [`HostUrl`]: validated newtypes
//! - [`ApiVersion`]: the Admin API version to target
//!
//! # Example
//!
//! ```rust
//! use std::time::Duration;
//! use shopify_provision::{ApiVersion, PollPolicy, ProvisionConfig};
//!
//! let config = ProvisionConfig::builder()
//!     .api_version(ApiVersion::V2025_07)
//!     .cdn_poll(PollPolicy::attempts(Duration::from_secs(1), 5))
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(config.cdn_poll().max_attempts(), Some(5));
//! ```

mod newtypes;
mod version;

use std::time::Duration;

pub use newtypes::{AccessToken, HostUrl, ShopDomain};
pub use version::ApiVersion;

use crate::clients::ThrottleSettings;
use crate::error::ConfigError;
use crate::poll::{PollBudget, PollPolicy};

/// Default number of attempts for requests that hit 429 or 500.
pub const DEFAULT_REQUEST_TRIES: u32 = 3;

/// Configuration for a provisioning run.
///
/// `ProvisionConfig` is cheap to clone and holds no credentials; those travel
/// in the [`Session`](crate::Session) so one config can serve many shops.
#[derive(Clone, Debug)]
pub struct ProvisionConfig {
    api_version: ApiVersion,
    api_base_url: Option<HostUrl>,
    user_agent_prefix: Option<String>,
    request_tries: u32,
    throttle: ThrottleSettings,
    cdn_poll: PollPolicy,
    theme_ready: PollPolicy,
    publish_poll: PollPolicy,
}

impl ProvisionConfig {
    /// Creates a new builder.
    #[must_use]
    pub fn builder() -> ProvisionConfigBuilder {
        ProvisionConfigBuilder::new()
    }

    /// Returns the Admin API version.
    #[must_use]
    pub const fn api_version(&self) -> &ApiVersion {
        &self.api_version
    }

    /// Returns the origin override for Admin API requests, if configured.
    ///
    /// When unset, requests go to `https://{shop}.myshopify.com`.
    #[must_use]
    pub const fn api_base_url(&self) -> Option<&HostUrl> {
        self.api_base_url.as_ref()
    }

    /// Returns the user agent prefix, if configured.
    #[must_use]
    pub fn user_agent_prefix(&self) -> Option<&str> {
        self.user_agent_prefix.as_deref()
    }

    /// Number of attempts for a single Admin API request on 429/500.
    #[must_use]
    pub const fn request_tries(&self) -> u32 {
        self.request_tries
    }

    /// Token bucket settings shared by every Admin API call of a context.
    #[must_use]
    pub const fn throttle(&self) -> ThrottleSettings {
        self.throttle
    }

    /// Polling policy for CDN URL resolution.
    #[must_use]
    pub const fn cdn_poll(&self) -> PollPolicy {
        self.cdn_poll
    }

    /// Polling policy for theme readiness after install.
    #[must_use]
    pub const fn theme_ready(&self) -> PollPolicy {
        self.theme_ready
    }

    /// Polling policy for the pre-publish state check.
    #[must_use]
    pub const fn publish_poll(&self) -> PollPolicy {
        self.publish_poll
    }
}

impl Default for ProvisionConfig {
    fn default() -> Self {
        Self {
            api_version: ApiVersion::latest(),
            api_base_url: None,
            user_agent_prefix: None,
            request_tries: DEFAULT_REQUEST_TRIES,
            throttle: ThrottleSettings::default(),
            cdn_poll: PollPolicy::attempts(Duration::from_millis(2000), 10),
            theme_ready: PollPolicy::timeout(Duration::from_secs(3), Duration::from_secs(180)),
            publish_poll: PollPolicy::attempts(Duration::from_millis(2000), 20),
        }
    }
}

// Verify ProvisionConfig is Send + Sync at compile time
const _: fn() = || {
    const fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<ProvisionConfig>();
};

/// Builder for [`ProvisionConfig`].
///
/// # Defaults
///
/// - `api_version`: latest stable
/// - `request_tries`: [`DEFAULT_REQUEST_TRIES`]
/// - `throttle`: one request per 250 ms, no burst
/// - `cdn_poll`: 10 attempts, 2 s apart
/// - `theme_ready`: 180 s timeout, 3 s apart
/// - `publish_poll`: 20 attempts, 2 s apart
#[derive(Debug, Default)]
pub struct ProvisionConfigBuilder {
    api_version: Option<ApiVersion>,
    api_base_url: Option<HostUrl>,
    user_agent_prefix: Option<String>,
    request_tries: Option<u32>,
    throttle: Option<ThrottleSettings>,
    cdn_poll: Option<PollPolicy>,
    theme_ready: Option<PollPolicy>,
    publish_poll: Option<PollPolicy>,
}

impl ProvisionConfigBuilder {
    /// Creates a new builder with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the API version.
    #[must_use]
    pub fn api_version(mut self, version: ApiVersion) -> Self {
        self.api_version = Some(version);
        self
    }

    /// Routes Admin API requests to this origin instead of the shop domain.
    #[must_use]
    pub fn api_base_url(mut self, url: HostUrl) -> Self {
        self.api_base_url = Some(url);
        self
    }

    /// Sets the user agent prefix for HTTP requests.
    #[must_use]
    pub fn user_agent_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.user_agent_prefix = Some(prefix.into());
        self
    }

    /// Sets the number of attempts per request on 429/500 responses.
    #[must_use]
    pub const fn request_tries(mut self, tries: u32) -> Self {
        self.request_tries = Some(tries);
        self
    }

    /// Sets the request throttle.
    #[must_use]
    pub const fn throttle(mut self, throttle: ThrottleSettings) -> Self {
        self.throttle = Some(throttle);
        self
    }

    /// Sets the CDN resolution polling policy.
    #[must_use]
    pub const fn cdn_poll(mut self, policy: PollPolicy) -> Self {
        self.cdn_poll = Some(policy);
        self
    }

    /// Sets the theme readiness polling policy.
    #[must_use]
    pub const fn theme_ready(mut self, policy: PollPolicy) -> Self {
        self.theme_ready = Some(policy);
        self
    }

    /// Sets the pre-publish polling policy.
    #[must_use]
    pub const fn publish_poll(mut self, policy: PollPolicy) -> Self {
        self.publish_poll = Some(policy);
        self
    }

    /// Builds the [`ProvisionConfig`].
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidSetting`] if `request_tries` is zero, a
    /// throttle has no capacity, or an attempt-bounded polling policy allows
    /// zero attempts.
    pub fn build(self) -> Result<ProvisionConfig, ConfigError> {
        let defaults = ProvisionConfig::default();

        let request_tries = self.request_tries.unwrap_or(defaults.request_tries);
        if request_tries == 0 {
            return Err(ConfigError::InvalidSetting {
                field: "request_tries",
                reason: "must be at least 1".to_string(),
            });
        }

        let throttle = self.throttle.unwrap_or(defaults.throttle);
        throttle.validate()?;

        let cdn_poll = self.cdn_poll.unwrap_or(defaults.cdn_poll);
        let theme_ready = self.theme_ready.unwrap_or(defaults.theme_ready);
        let publish_poll = self.publish_poll.unwrap_or(defaults.publish_poll);
        for (field, policy) in [
            ("cdn_poll", &cdn_poll),
            ("theme_ready", &theme_ready),
            ("publish_poll", &publish_poll),
        ] {
            if matches!(policy.budget(), PollBudget::Attempts(0)) {
                return Err(ConfigError::InvalidSetting {
                    field,
                    reason: "max attempts must be at least 1".to_string(),
                });
            }
        }

        Ok(ProvisionConfig {
            api_version: self.api_version.unwrap_or(defaults.api_version),
            api_base_url: self.api_base_url,
            user_agent_prefix: self.user_agent_prefix,
            request_tries,
            throttle,
            cdn_poll,
            theme_ready,
            publish_poll,
        })
    }
}
