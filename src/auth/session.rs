//! Authenticated shop sessions.

use chrono::{DateTime, Utc};

use crate::config::{AccessToken, ShopDomain};

/// An access token bound to the shop it was issued for.
///
/// # Example
///
/// ```rust
/// use chrono::{Duration, Utc};
/// use shopify_provision::{AccessToken, Session, ShopDomain};
///
/// let session = Session::new(
///     ShopDomain::new("my-store").unwrap(),
///     AccessToken::new("shpat_123").unwrap(),
///     Some(Utc::now() + Duration::hours(1)),
/// );
/// assert!(!session.expired());
/// ```
#[derive(Clone, Debug)]
pub struct Session {
    /// The shop this session is for.
    pub shop: ShopDomain,

    /// The Admin API access token.
    pub access_token: AccessToken,

    /// When the token stops being valid. Offline tokens have no expiry.
    pub expires: Option<DateTime<Utc>>,
}

impl Session {
    /// Creates a new session.
    #[must_use]
    pub const fn new(
        shop: ShopDomain,
        access_token: AccessToken,
        expires: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            shop,
            access_token,
            expires,
        }
    }

    /// Returns `true` if this session has expired.
    #[must_use]
    pub fn expired(&self) -> bool {
        self.expired_at(Utc::now())
    }

    /// Returns `true` if this session is expired at `now`.
    #[must_use]
    pub fn expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires.is_some_and(|expires| now >= expires)
    }
}

// Verify Session is Send + Sync at compile time
const _: fn() = || {
    const fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<Session>();
};

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn session(expires: Option<DateTime<Utc>>) -> Session {
        Session::new(
            ShopDomain::new("shop").unwrap(),
            AccessToken::new("token").unwrap(),
            expires,
        )
    }

    #[test]
    fn test_session_expiry() {
        assert!(session(Some(Utc::now() - Duration::hours(1))).expired());
        assert!(!session(Some(Utc::now() + Duration::hours(1))).expired());
        assert!(!session(None).expired());
    }

    #[test]
    fn test_expiry_boundary_is_inclusive() {
        let at = Utc::now();
        assert!(session(Some(at)).expired_at(at));
    }
}
