//! Injected storage for shop sessions.

use std::collections::HashMap;
use std::sync::RwLock;

use chrono::{DateTime, Utc};

use crate::auth::Session;
use crate::config::ShopDomain;

/// Storage for sessions keyed by shop.
///
/// Implementations must be cheap to call from async code; none of the
/// methods are expected to block on I/O.
pub trait TokenStore: Send + Sync {
    /// Returns the live session for `shop`, if any.
    ///
    /// Expired sessions must not be returned.
    fn get(&self, shop: &ShopDomain) -> Option<Session>;

    /// Stores `session`, replacing any previous session for the same shop.
    fn set(&self, session: Session);

    /// Removes and returns the session for `shop`.
    fn expire(&self, shop: &ShopDomain) -> Option<Session>;
}

/// A volatile, process-local [`TokenStore`].
///
/// Contents are lost on restart. Expired sessions are evicted lazily on
/// [`get`](TokenStore::get).
#[derive(Debug, Default)]
pub struct InMemoryTokenStore {
    sessions: RwLock<HashMap<ShopDomain, Session>>,
}

impl InMemoryTokenStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored sessions, including ones not yet evicted.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions.read().map_or(0, |sessions| sessions.len())
    }

    /// Returns `true` if the store holds no sessions.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Removes the session for `shop` if it is expired at `now`, returning
    /// it instead when a concurrent `set` already replaced it.
    fn evict_expired(&self, shop: &ShopDomain, now: DateTime<Utc>) -> Option<Session> {
        let mut sessions = self.sessions.write().ok()?;
        match sessions.get(shop) {
            Some(session) if !session.expired_at(now) => Some(session.clone()),
            Some(_) => {
                tracing::debug!(shop = %shop, "evicting expired session");
                sessions.remove(shop);
                None
            }
            None => None,
        }
    }
}

impl TokenStore for InMemoryTokenStore {
    fn get(&self, shop: &ShopDomain) -> Option<Session> {
        let now = Utc::now();
        {
            let sessions = self.sessions.read().ok()?;
            match sessions.get(shop) {
                None => return None,
                Some(session) if !session.expired_at(now) => return Some(session.clone()),
                Some(_) => {}
            }
        }

        self.evict_expired(shop, now)
    }

    fn set(&self, session: Session) {
        if let Ok(mut sessions) = self.sessions.write() {
            sessions.insert(session.shop.clone(), session);
        }
    }

    fn expire(&self, shop: &ShopDomain) -> Option<Session> {
        self.sessions.write().ok()?.remove(shop)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AccessToken;
    use chrono::Duration;

    fn session(shop: &str, token: &str) -> Session {
        Session::new(
            ShopDomain::new(shop).unwrap(),
            AccessToken::new(token).unwrap(),
            None,
        )
    }

    #[test]
    fn test_set_replaces_previous_session() {
        let store = InMemoryTokenStore::new();
        store.set(session("shop-a", "first"));
        store.set(session("shop-a", "second"));

        let shop = ShopDomain::new("shop-a").unwrap();
        assert_eq!(store.get(&shop).unwrap().access_token.as_ref(), "second");
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_sessions_are_isolated_per_shop() {
        let store = InMemoryTokenStore::new();
        store.set(session("shop-a", "a"));

        assert!(store.get(&ShopDomain::new("shop-b").unwrap()).is_none());
    }

    #[test]
    fn test_expired_session_is_evicted_on_get() {
        let store = InMemoryTokenStore::new();
        let mut expired = session("shop-a", "old");
        expired.expires = Some(Utc::now() - Duration::minutes(5));
        store.set(expired);

        let shop = ShopDomain::new("shop-a").unwrap();
        assert!(store.get(&shop).is_none());
        assert!(store.is_empty());
    }

    #[test]
    fn test_eviction_keeps_session_replaced_after_read() {
        let store = InMemoryTokenStore::new();
        let shop = ShopDomain::new("shop-a").unwrap();
        store.set(session("shop-a", "fresh"));

        let kept = store.evict_expired(&shop, Utc::now());

        assert_eq!(kept.unwrap().access_token.as_ref(), "fresh");
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_expire_removes_session() {
        let store = InMemoryTokenStore::new();
        store.set(session("shop-a", "a"));
        let shop = ShopDomain::new("shop-a").unwrap();

        assert!(store.expire(&shop).is_some());
        assert!(store.expire(&shop).is_none());
    }

    #[test]
    fn test_store_is_usable_as_trait_object() {
        let store: Box<dyn TokenStore> = Box::new(InMemoryTokenStore::new());
        store.set(session("shop-a", "a"));
        assert!(store.get(&ShopDomain::new("shop-a").unwrap()).is_some());
    }
}
