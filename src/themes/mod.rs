//! Theme installation, readiness and publishing.
//!
//! Shopify imports a theme zip asynchronously: the theme exists as soon as
//! `POST themes.json` returns, but stays `processing` until the archive is
//! unpacked. Only then can its role be switched to `main`.
//!
//! - [`install_theme`] creates an unpublished theme from a zip URL
//! - [`wait_until_ready`] polls until processing finishes or a deadline passes
//! - [`publish`] waits for an unpublished, idle theme and promotes it once

mod install;
mod publish;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::clients::{HttpResponse, RestError};
use crate::context::ShopContext;

pub use install::{install_theme, wait_until_ready};
pub use publish::{publish, PublishOutcome, NOT_READY_ERROR};

/// Publication state of a theme.
///
/// ```rust
/// use shopify_provision::themes::ThemeRole;
///
/// let role: ThemeRole = serde_json::from_str("\"main\"").unwrap();
/// assert_eq!(role, ThemeRole::Main);
/// let role: ThemeRole = serde_json::from_str("\"mobile\"").unwrap();
/// assert_eq!(role, ThemeRole::Unknown);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ThemeRole {
    /// The live theme.
    Main,
    /// Installed but not live.
    Unpublished,
    /// A theme store demo.
    Demo,
    /// A theme under development.
    Development,
    /// Any role this crate does not know about, or no role reported.
    #[default]
    #[serde(other)]
    Unknown,
}

/// A theme as reported by the Admin API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Theme {
    /// Theme id.
    pub id: u64,
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// Publication state.
    #[serde(default)]
    pub role: ThemeRole,
    /// `true` while Shopify is still unpacking the theme.
    #[serde(default)]
    pub processing: bool,
    /// Whether the theme can be previewed.
    #[serde(default)]
    pub previewable: Option<bool>,
    /// Creation time.
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    /// Last update time.
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Theme {
    /// Returns `true` once the theme is unpublished and done processing.
    #[must_use]
    pub fn is_publishable(&self) -> bool {
        self.role == ThemeRole::Unpublished && !self.processing
    }

    /// Parses the `theme` object of a REST response.
    pub(crate) fn from_response(response: &HttpResponse) -> Result<Self, ThemeError> {
        let theme = response
            .body
            .get("theme")
            .ok_or_else(|| ThemeError::Malformed("response has no theme".to_string()))?;
        serde_json::from_value(theme.clone())
            .map_err(|e| ThemeError::Malformed(format!("unreadable theme: {e}")))
    }
}

/// Errors from theme installation and readiness polling.
#[derive(Debug, Error)]
pub enum ThemeError {
    /// The zip source is not an absolute http(s) URL.
    #[error("Theme source must be an absolute http(s) URL, got '{0}'")]
    InvalidSource(String),

    /// The theme request failed.
    #[error(transparent)]
    Rest(#[from] RestError),

    /// The response did not contain a readable theme.
    #[error("Malformed theme response: {0}")]
    Malformed(String),

    /// The theme was still processing when the deadline passed.
    #[error("Theme {theme_id} still processing after {}s", .elapsed.as_secs())]
    ProcessingTimeout {
        /// The theme that did not become ready.
        theme_id: u64,
        /// Time spent waiting.
        elapsed: std::time::Duration,
    },
}

/// Fetches the current state of a theme.
///
/// # Errors
///
/// Returns [`ThemeError::Rest`] when the request fails and
/// [`ThemeError::Malformed`] when the body has no theme.
pub async fn fetch_theme(ctx: &ShopContext, theme_id: u64) -> Result<Theme, ThemeError> {
    let response = ctx.rest().get(&format!("themes/{theme_id}"), &[]).await?;
    Theme::from_response(&response)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashMap;

    #[test]
    fn test_theme_deserializes_rest_payload() {
        let theme: Theme = serde_json::from_value(json!({
            "id": 828_155_753,
            "name": "Dawn",
            "role": "unpublished",
            "previewable": true,
            "processing": false,
            "created_at": "2025-01-10T12:00:00-05:00",
            "updated_at": "2025-01-10T12:03:00-05:00",
            "theme_store_id": null,
            "admin_graphql_api_id": "gid://shopify/OnlineStoreTheme/828155753"
        }))
        .unwrap();

        assert_eq!(theme.id, 828_155_753);
        assert!(theme.is_publishable());
        assert!(theme.created_at.is_some());
    }

    #[test]
    fn test_processing_or_main_is_not_publishable() {
        let mut theme: Theme =
            serde_json::from_value(json!({"id": 1, "role": "unpublished", "processing": true}))
                .unwrap();
        assert!(!theme.is_publishable());

        theme.processing = false;
        theme.role = ThemeRole::Main;
        assert!(!theme.is_publishable());
    }

    #[test]
    fn test_missing_role_is_never_publishable() {
        let theme: Theme = serde_json::from_value(json!({"id": 4, "processing": false})).unwrap();
        assert_eq!(theme.role, ThemeRole::Unknown);
        assert!(!theme.is_publishable());
    }

    #[test]
    fn test_from_response_requires_theme_key() {
        let response = HttpResponse::new(200, HashMap::new(), json!({"themes": []}));
        assert!(matches!(
            Theme::from_response(&response),
            Err(ThemeError::Malformed(_))
        ));
    }

    #[test]
    fn test_processing_timeout_message() {
        let error = ThemeError::ProcessingTimeout {
            theme_id: 7,
            elapsed: std::time::Duration::from_secs(180),
        };
        assert_eq!(error.to_string(), "Theme 7 still processing after 180s");
    }
}
