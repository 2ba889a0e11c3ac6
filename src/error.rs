//! Configuration and request-validation errors.
//!
//! Errors raised by the remote pipeline stages live next to the stage that
//! produces them (see [`crate::files`], [`crate::themes`] and
//! [`crate::products`]). This module only holds the errors that can occur
//! before any network call is made.
//!
//! # Example
//!
//! ```rust
//! use shopify_provision::{AccessToken, ConfigError};
//!
//! let result = AccessToken::new("  ");
//! assert!(matches!(result, Err(ConfigError::EmptyAccessToken)));
//! ```

use thiserror::Error;

/// Errors that can occur while building a [`ProvisionConfig`](crate::ProvisionConfig)
/// or one of its validated newtypes.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Access token cannot be empty.
    #[error("Access token cannot be empty. Complete the OAuth exchange before provisioning.")]
    EmptyAccessToken,

    /// Shop domain is invalid.
    #[error("Invalid shop domain '{domain}'. Expected format: 'shop-name' or 'shop-name.myshopify.com'.")]
    InvalidShopDomain {
        /// The invalid domain that was provided.
        domain: String,
    },

    /// API version is invalid.
    #[error("Invalid API version '{version}'. Expected format: 'YYYY-MM' (e.g., '2025-01') or 'unstable'.")]
    InvalidApiVersion {
        /// The invalid version string that was provided.
        version: String,
    },

    /// Host URL is invalid.
    #[error("Invalid base URL '{url}'. Please provide a URL with scheme (e.g., 'https://proxy.example.com').")]
    InvalidHostUrl {
        /// The invalid URL that was provided.
        url: String,
    },

    /// A polling or throttling setting is out of range.
    #[error("Invalid setting '{field}': {reason}")]
    InvalidSetting {
        /// The setting that was rejected.
        field: &'static str,
        /// Why it was rejected.
        reason: String,
    },
}

/// Fatal errors returned by [`Provisioner::run`](crate::Provisioner::run).
///
/// Everything that goes wrong after validation is recorded in the
/// [`ProvisionReport`](crate::ProvisionReport) instead, so partial success
/// stays visible.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProvisionError {
    /// A required request parameter is missing or empty.
    #[error("Missing required parameter: '{field}'")]
    MissingParameter {
        /// The parameter that was missing.
        field: &'static str,
    },

    /// A request parameter failed validation.
    #[error(transparent)]
    InvalidParameter(#[from] ConfigError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_shop_domain_error_message() {
        let error = ConfigError::InvalidShopDomain {
            domain: "bad domain!".to_string(),
        };
        let message = error.to_string();
        assert!(message.contains("bad domain!"));
        assert!(message.contains("Expected format"));
    }

    #[test]
    fn test_invalid_setting_names_the_field() {
        let error = ConfigError::InvalidSetting {
            field: "cdn_poll.max_attempts",
            reason: "must be at least 1".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Invalid setting 'cdn_poll.max_attempts': must be at least 1"
        );
    }

    #[test]
    fn test_missing_parameter_message() {
        let error = ProvisionError::MissingParameter { field: "shop" };
        assert_eq!(error.to_string(), "Missing required parameter: 'shop'");
    }

    #[test]
    fn test_config_error_converts_into_provision_error() {
        let error: ProvisionError = ConfigError::EmptyAccessToken.into();
        assert!(matches!(
            error,
            ProvisionError::InvalidParameter(ConfigError::EmptyAccessToken)
        ));
    }
}
