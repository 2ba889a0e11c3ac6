//! # Shopify storefront provisioning
//!
//! Sets up a freshly installed Shopify store: installs and publishes a
//! theme, imports products from CSV rows and pushes their images through
//! Shopify's staged upload pipeline.
//!
//! ## Overview
//!
//! This crate provides:
//! - Type-safe configuration via [`ProvisionConfig`] and [`ProvisionConfigBuilder`]
//! - Validated newtypes for shop domains, access tokens and base URLs
//! - Session handling through the [`TokenStore`] trait
//! - Admin API clients with retries and a shared request [`Throttle`](clients::Throttle)
//! - A bounded polling primitive in [`poll`]
//! - The image pipeline in [`files`]: staged upload, CDN resolution, attachment
//! - Theme install, readiness polling and publishing in [`themes`]
//! - CSV row mapping and idempotent product import in [`products`]
//! - The [`Provisioner`] that runs all of it and returns a [`ProvisionReport`]
//!
//! ## Quick Start
//!
//! ```rust
//! use std::time::Duration;
//! use shopify_provision::{ApiVersion, PollPolicy, ProvisionConfig};
//! use shopify_provision::clients::ThrottleSettings;
//!
//! let config = ProvisionConfig::builder()
//!     .api_version(ApiVersion::latest())
//!     .throttle(ThrottleSettings::new(2, Duration::from_millis(500)))
//!     .publish_poll(PollPolicy::attempts(Duration::from_secs(2), 30))
//!     .build()
//!     .unwrap();
//! ```
//!
//! ## Provisioning a shop
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use shopify_provision::{
//!     FlatRow, InMemoryTokenStore, ProvisionConfig, ProvisionRequest, Provisioner, ThemeSource,
//! };
//!
//! # tokio_test::block_on(async {
//! let provisioner = Provisioner::new(ProvisionConfig::default(), Arc::new(InMemoryTokenStore::new()));
//!
//! let request = ProvisionRequest {
//!     shop: Some("my-store".to_string()),
//!     access_token: Some("shpat_...".to_string()),
//!     rows: vec![FlatRow::from_pairs([("Handle", "tee"), ("Title", "Tee")])],
//!     theme: Some(ThemeSource {
//!         zip_url: "https://themes.example.com/dawn.zip".to_string(),
//!         name: "Dawn".to_string(),
//!         publish: true,
//!     }),
//! };
//!
//! let report = provisioner.run(request).await?;
//! print!("{report}");
//! # Ok::<(), shopify_provision::ProvisionError>(())
//! # }).unwrap();
//! ```
//!
//! ## Using the stages directly
//!
//! ```rust,no_run
//! use std::time::Duration;
//! use shopify_provision::files::{attach_to_product, resolve_cdn_url, stage_and_register, ImageSource};
//! use shopify_provision::{AccessToken, ProvisionConfig, Session, ShopContext, ShopDomain};
//!
//! # tokio_test::block_on(async {
//! let session = Session::new(ShopDomain::new("my-store")?, AccessToken::new("shpat_...")?, None);
//! let ctx = ShopContext::new(session, ProvisionConfig::default());
//!
//! let src = "https://images.example.com/shirt.jpg".to_string();
//! let asset = stage_and_register(&ctx, ImageSource::Url(src), "shirt.jpg", "image/jpeg").await?;
//! if let Some(url) = resolve_cdn_url(&ctx, &asset.filename, Duration::from_secs(2), 10).await {
//!     attach_to_product(&ctx, "632910392", &url, Some("Front")).await?;
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! # }).unwrap();
//! ```

pub mod auth;
pub mod clients;
pub mod config;
mod context;
pub mod error;
pub mod files;
pub mod poll;
pub mod products;
mod provision;
pub mod themes;

// Re-export public types at crate root for convenience
pub use auth::{InMemoryTokenStore, Session, TokenStore};
pub use config::{
    AccessToken, ApiVersion, HostUrl, ProvisionConfig, ProvisionConfigBuilder, ShopDomain,
};
pub use context::ShopContext;
pub use error::{ConfigError, ProvisionError};
pub use poll::{PollBudget, PollOutcome, PollPolicy};

// Re-export pipeline entry points
pub use products::{FlatRow, ProductDraft};
pub use provision::{
    ProvisionReport, ProvisionRequest, Provisioner, ReportLevel, ReportLine, ThemeSource,
};
