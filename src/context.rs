//! Per-shop execution context.

use std::sync::Arc;

use crate::auth::Session;
use crate::clients::{GraphqlClient, RestClient, Throttle};
use crate::config::ProvisionConfig;

/// Everything a pipeline stage needs to talk to one shop.
///
/// A context owns a REST client, a GraphQL client and a plain HTTP client
/// for traffic that must not carry the Admin API token (object storage
/// uploads, remote image downloads). The two Admin API clients share one
/// [`Throttle`].
///
/// # Example
///
/// ```rust
/// use shopify_provision::{AccessToken, ProvisionConfig, Session, ShopContext, ShopDomain};
///
/// let session = Session::new(
///     ShopDomain::new("my-store").unwrap(),
///     AccessToken::new("shpat_123").unwrap(),
///     None,
/// );
/// let ctx = ShopContext::new(session, ProvisionConfig::default());
/// assert_eq!(ctx.session().shop.as_ref(), "my-store.myshopify.com");
/// ```
#[derive(Debug)]
pub struct ShopContext {
    session: Session,
    config: ProvisionConfig,
    rest: RestClient,
    graphql: GraphqlClient,
    external: reqwest::Client,
}

// Verify ShopContext is Send + Sync at compile time
const _: fn() = || {
    const fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<ShopContext>();
};

impl ShopContext {
    /// Creates a context for `session`.
    ///
    /// # Panics
    ///
    /// Panics if the underlying reqwest client cannot be created (TLS
    /// initialization failure).
    #[must_use]
    pub fn new(session: Session, config: ProvisionConfig) -> Self {
        let throttle = Arc::new(Throttle::new(config.throttle()));
        let rest = RestClient::with_throttle(&session, Some(&config), Arc::clone(&throttle));
        let graphql = GraphqlClient::with_throttle(&session, Some(&config), throttle);
        let external = reqwest::Client::builder()
            .use_rustls_tls()
            .build()
            .expect("Failed to create HTTP client");

        Self {
            session,
            config,
            rest,
            graphql,
            external,
        }
    }

    /// The session this context acts for.
    #[must_use]
    pub const fn session(&self) -> &Session {
        &self.session
    }

    /// The run configuration.
    #[must_use]
    pub const fn config(&self) -> &ProvisionConfig {
        &self.config
    }

    /// REST client for themes, products and variants.
    #[must_use]
    pub const fn rest(&self) -> &RestClient {
        &self.rest
    }

    /// GraphQL client for uploads, files and media.
    #[must_use]
    pub const fn graphql(&self) -> &GraphqlClient {
        &self.graphql
    }

    /// Unauthenticated client for object storage and image sources.
    #[must_use]
    pub const fn external(&self) -> &reqwest::Client {
        &self.external
    }
}
