//! Theme creation from a zip archive and readiness polling.

use std::time::Duration;

use serde_json::json;

use crate::context::ShopContext;
use crate::poll::{poll_until, PollOutcome, PollPolicy};
use crate::themes::{fetch_theme, Theme, ThemeError, ThemeRole};

/// Creates an unpublished theme from a publicly reachable zip archive.
///
/// The returned theme is usually still `processing`; follow up with
/// [`wait_until_ready`].
///
/// # Errors
///
/// Returns [`ThemeError::InvalidSource`] for a non-http(s) `zip_url`,
/// [`ThemeError::Rest`] when Shopify rejects the theme and
/// [`ThemeError::Malformed`] when the response has no theme.
pub async fn install_theme(
    ctx: &ShopContext,
    zip_url: &str,
    name: &str,
) -> Result<Theme, ThemeError> {
    let is_http = reqwest::Url::parse(zip_url)
        .is_ok_and(|url| matches!(url.scheme(), "http" | "https"));
    if !is_http {
        return Err(ThemeError::InvalidSource(zip_url.to_string()));
    }

    let body = json!({
        "theme": {
            "name": name,
            "src": zip_url,
            "role": ThemeRole::Unpublished,
        }
    });
    let response = ctx.rest().post("themes", body).await?;
    let theme = Theme::from_response(&response)?;

    tracing::info!(theme_id = theme.id, name = %theme.name, "theme created");
    Ok(theme)
}

/// Polls a theme until Shopify reports `processing == false`.
///
/// Polls every `interval` and gives up once `timeout` has elapsed.
///
/// # Errors
///
/// Returns [`ThemeError::ProcessingTimeout`] when the deadline passes, or
/// the first error of a status request.
pub async fn wait_until_ready(
    ctx: &ShopContext,
    theme_id: u64,
    timeout: Duration,
    interval: Duration,
) -> Result<Theme, ThemeError> {
    let policy = PollPolicy::timeout(interval, timeout);

    let outcome = poll_until(&policy, |attempt| async move {
        let theme = fetch_theme(ctx, theme_id).await?;
        tracing::debug!(theme_id, attempt, processing = theme.processing, "theme status");
        Ok::<_, ThemeError>((!theme.processing).then_some(theme))
    })
    .await?;

    match outcome {
        PollOutcome::Ready { value, attempts } => {
            tracing::info!(theme_id, attempts, "theme ready");
            Ok(value)
        }
        PollOutcome::Exhausted { elapsed, .. } => {
            Err(ThemeError::ProcessingTimeout { theme_id, elapsed })
        }
    }
}
