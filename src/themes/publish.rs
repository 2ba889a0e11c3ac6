//! Promoting an installed theme to the live role.

use std::convert::Infallible;
use std::sync::Mutex;

use serde_json::json;

use crate::context::ShopContext;
use crate::poll::{poll_until, PollOutcome};
use crate::themes::{fetch_theme, Theme, ThemeRole};

/// Error text of [`PublishOutcome::NotReady`].
pub const NOT_READY_ERROR: &str = "not ready or timeout";

/// Result of [`publish`].
///
/// Publishing never returns `Err`: callers get a structured outcome they can
/// report next to the rest of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublishOutcome {
    /// The theme is now `main`.
    Published(Theme),
    /// The theme never became unpublished and idle within the budget.
    NotReady {
        /// The theme that was polled.
        theme_id: u64,
        /// Status requests issued.
        attempts: u32,
        /// Last state observed, if any request succeeded.
        last_seen: Option<Theme>,
    },
    /// The role update was rejected.
    Failed {
        /// The theme that was being published.
        theme_id: u64,
        /// Why the update failed.
        error: String,
    },
}

impl PublishOutcome {
    /// Returns `true` for [`PublishOutcome::Published`].
    #[must_use]
    pub const fn is_published(&self) -> bool {
        matches!(self, Self::Published(_))
    }

    /// Error description for unsuccessful outcomes.
    #[must_use]
    pub fn error(&self) -> Option<&str> {
        match self {
            Self::Published(_) => None,
            Self::NotReady { .. } => Some(NOT_READY_ERROR),
            Self::Failed { error, .. } => Some(error),
        }
    }
}

/// Publishes a theme once it is unpublished and done processing.
///
/// Polls with the context's publish policy (20 attempts, 2 s apart by
/// default). Failed status requests count as "not ready". Once the theme is
/// publishable, exactly one role update to `main` is sent.
pub async fn publish(ctx: &ShopContext, theme_id: u64) -> PublishOutcome {
    let policy = ctx.config().publish_poll();
    let last_seen: Mutex<Option<Theme>> = Mutex::new(None);

    let outcome = poll_until(&policy, |attempt| {
        let last_seen = &last_seen;
        async move {
            match fetch_theme(ctx, theme_id).await {
                Ok(theme) => {
                    tracing::debug!(
                        theme_id,
                        attempt,
                        role = ?theme.role,
                        processing = theme.processing,
                        "waiting for publishable theme"
                    );
                    if let Ok(mut seen) = last_seen.lock() {
                        *seen = Some(theme.clone());
                    }
                    Ok::<_, Infallible>(theme.is_publishable().then_some(theme))
                }
                Err(e) => {
                    tracing::debug!(theme_id, attempt, error = %e, "theme status request failed");
                    Ok(None)
                }
            }
        }
    })
    .await;

    let ready = match outcome {
        Ok(PollOutcome::Ready { value, .. }) => value,
        Ok(PollOutcome::Exhausted { attempts, .. }) => {
            tracing::warn!(theme_id, attempts, "theme not publishable within budget");
            return PublishOutcome::NotReady {
                theme_id,
                attempts,
                last_seen: last_seen.into_inner().ok().flatten(),
            };
        }
        Err(never) => match never {},
    };

    let body = json!({ "theme": { "id": theme_id, "role": ThemeRole::Main } });
    match ctx.rest().put(&format!("themes/{theme_id}"), body).await {
        Ok(response) => {
            let theme = Theme::from_response(&response).unwrap_or(Theme {
                role: ThemeRole::Main,
                ..ready
            });
            tracing::info!(theme_id, "theme published");
            PublishOutcome::Published(theme)
        }
        Err(e) => {
            tracing::warn!(theme_id, error = %e, "theme role update failed");
            PublishOutcome::Failed {
                theme_id,
                error: e.to_string(),
            }
        }
    }
}
