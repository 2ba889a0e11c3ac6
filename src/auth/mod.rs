//! Shop credentials for provisioning runs.
//!
//! The OAuth exchange itself happens outside this crate; what arrives here is
//! a shop and an access token, carried as a [`Session`]. Sessions that need
//! to outlive a single request go into a [`TokenStore`], which replaces a
//! process-wide token map with an injected, swappable store.
//!
//! # Example
//!
//! ```rust
//! use shopify_provision::{AccessToken, InMemoryTokenStore, Session, ShopDomain, TokenStore};
//!
//! let store = InMemoryTokenStore::new();
//! let shop = ShopDomain::new("my-store").unwrap();
//! store.set(Session::new(shop.clone(), AccessToken::new("shpat_1").unwrap(), None));
//!
//! assert!(store.get(&shop).is_some());
//! assert!(store.expire(&shop).is_some());
//! assert!(store.get(&shop).is_none());
//! ```

pub mod session;
mod token_store;

pub use session::Session;
pub use token_store::{InMemoryTokenStore, TokenStore};
