//! End-to-end storefront provisioning.
//!
//! A run validates its request, optionally installs and publishes a theme,
//! then imports every product from the CSV rows. Everything that goes wrong
//! after validation ends up as a line in the [`ProvisionReport`]; only an
//! invalid request makes [`Provisioner::run`] return `Err`.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::auth::{Session, TokenStore};
use crate::config::{AccessToken, ProvisionConfig, ShopDomain};
use crate::context::ShopContext;
use crate::error::ProvisionError;
use crate::files::CdnResolver;
use crate::poll::PollBudget;
use crate::products::{import_product, map_rows, FlatRow, ProductOutcome};
use crate::themes::{install_theme, publish, wait_until_ready, PublishOutcome, ThemeError};

/// A theme to install during a run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ThemeSource {
    /// Public URL of the theme zip.
    pub zip_url: String,
    /// Name given to the new theme.
    pub name: String,
    /// Whether to make the theme live once it is ready.
    pub publish: bool,
}

/// Input of one provisioning run.
///
/// `access_token` may be omitted when the [`TokenStore`] already holds a
/// live session for the shop.
#[derive(Clone, Debug, Default)]
pub struct ProvisionRequest {
    /// Shop name or `*.myshopify.com` domain.
    pub shop: Option<String>,
    /// Admin API access token.
    pub access_token: Option<String>,
    /// Product CSV rows.
    pub rows: Vec<FlatRow>,
    /// Optional theme to install.
    pub theme: Option<ThemeSource>,
}

/// Severity of a report line.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReportLevel {
    /// A step completed.
    Milestone,
    /// A step did not complete but the run went on as planned.
    Warning,
    /// A step failed.
    Failure,
}

/// One line of a [`ProvisionReport`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReportLine {
    /// Severity.
    pub level: ReportLevel,
    /// Human-readable description.
    pub message: String,
}

impl fmt::Display for ReportLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self.level {
            ReportLevel::Milestone => "ok",
            ReportLevel::Warning => "warn",
            ReportLevel::Failure => "fail",
        };
        write!(f, "[{tag}] {}", self.message)
    }
}

/// Outcome of a provisioning run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProvisionReport {
    /// The shop that was provisioned.
    pub shop: ShopDomain,
    /// One line per milestone or failure, in order.
    pub lines: Vec<ReportLine>,
    /// Installed theme id, if a theme was installed.
    pub theme_id: Option<u64>,
    /// Publish result, if publishing was requested and attempted.
    pub publish: Option<PublishOutcome>,
    /// Per-product results, in import order.
    pub products: Vec<ProductOutcome>,
}

impl ProvisionReport {
    fn new(shop: ShopDomain) -> Self {
        Self {
            shop,
            lines: Vec::new(),
            theme_id: None,
            publish: None,
            products: Vec::new(),
        }
    }

    fn milestone(&mut self, message: String) {
        tracing::info!(shop = %self.shop, "{message}");
        self.push(ReportLevel::Milestone, message);
    }

    fn warning(&mut self, message: String) {
        tracing::warn!(shop = %self.shop, "{message}");
        self.push(ReportLevel::Warning, message);
    }

    fn failure(&mut self, message: String) {
        tracing::warn!(shop = %self.shop, "{message}");
        self.push(ReportLevel::Failure, message);
    }

    fn push(&mut self, level: ReportLevel, message: String) {
        self.lines.push(ReportLine { level, message });
    }

    /// Number of failure lines.
    #[must_use]
    pub fn failure_count(&self) -> usize {
        self.lines
            .iter()
            .filter(|line| line.level == ReportLevel::Failure)
            .count()
    }

    /// Returns `true` if nothing failed.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.failure_count() == 0
    }
}

impl fmt::Display for ProvisionReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for line in &self.lines {
            writeln!(f, "{line}")?;
        }
        Ok(())
    }
}

/// Runs provisioning requests.
///
/// # Example
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use shopify_provision::{
///     FlatRow, InMemoryTokenStore, ProvisionConfig, ProvisionRequest, Provisioner,
/// };
///
/// # tokio_test::block_on(async {
/// let provisioner = Provisioner::new(ProvisionConfig::default(), Arc::new(InMemoryTokenStore::new()));
/// let request = ProvisionRequest {
///     shop: Some("my-store".to_string()),
///     access_token: Some("shpat_...".to_string()),
///     rows: vec![FlatRow::from_pairs([("Handle", "mug"), ("Title", "Mug")])],
///     ..ProvisionRequest::default()
/// };
/// let report = provisioner.run(request).await?;
/// println!("{report}");
/// # Ok::<(), shopify_provision::ProvisionError>(())
/// # }).unwrap();
/// ```
pub struct Provisioner {
    config: ProvisionConfig,
    store: Arc<dyn TokenStore>,
}

impl fmt::Debug for Provisioner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Provisioner")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Provisioner {
    /// Creates a provisioner.
    #[must_use]
    pub fn new(config: ProvisionConfig, store: Arc<dyn TokenStore>) -> Self {
        Self { config, store }
    }

    /// Returns the configuration used for every run.
    #[must_use]
    pub const fn config(&self) -> &ProvisionConfig {
        &self.config
    }

    /// Checks the request and resolves the session to act with.
    ///
    /// # Errors
    ///
    /// Returns [`ProvisionError::MissingParameter`] when the shop, the token
    /// (in the request or the store) or the rows are missing, and
    /// [`ProvisionError::InvalidParameter`] when the shop or token is
    /// malformed.
    pub fn validate(&self, request: &ProvisionRequest) -> Result<Session, ProvisionError> {
        let shop = request
            .shop
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or(ProvisionError::MissingParameter { field: "shop" })?;
        let shop = ShopDomain::new(shop)?;

        let supplied = request
            .access_token
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty());
        let session = match supplied {
            Some(token) => Session::new(shop, AccessToken::new(token)?, None),
            None => self
                .store
                .get(&shop)
                .ok_or(ProvisionError::MissingParameter {
                    field: "access_token",
                })?,
        };

        if request.rows.is_empty() {
            return Err(ProvisionError::MissingParameter { field: "rows" });
        }

        Ok(session)
    }

    /// Provisions one shop.
    ///
    /// # Errors
    ///
    /// Returns [`ProvisionError`] only when the request fails
    /// [`Provisioner::validate`]; every later failure is reported in the
    /// returned [`ProvisionReport`].
    pub async fn run(&self, request: ProvisionRequest) -> Result<ProvisionReport, ProvisionError> {
        let session = self.validate(&request)?;
        self.store.set(session.clone());

        let mut report = ProvisionReport::new(session.shop.clone());
        let ctx = ShopContext::new(session, self.config.clone());

        if let Some(theme) = &request.theme {
            self.provision_theme(&ctx, theme, &mut report).await;
        }

        let drafts = map_rows(&request.rows);
        let skipped: usize = drafts.iter().map(|d| d.skipped_rows).sum();
        report.milestone(format!(
            "mapped {} products from {} rows ({skipped} rows without a complete option set)",
            drafts.len(),
            request.rows.len()
        ));

        let resolver = CdnResolver::new();
        for draft in &drafts {
            match import_product(&ctx, draft, &resolver).await {
                Ok(outcome) => {
                    report.milestone(format!(
                        "product {}: {} #{} ({} variants created, {} updated, {} images, {} variant images)",
                        outcome.handle,
                        if outcome.created { "created" } else { "updated" },
                        outcome.product_id,
                        outcome.variants_created,
                        outcome.variants_updated,
                        outcome.images_attached,
                        outcome.variant_images_attached,
                    ));
                    for failure in &outcome.failures {
                        report.failure(format!("product {}: {failure}", outcome.handle));
                    }
                    report.products.push(outcome);
                }
                Err(e) => report.failure(format!("product {}: {e}", draft.handle)),
            }
        }

        report.milestone(format!(
            "provisioning finished with {} failures",
            report.failure_count()
        ));
        Ok(report)
    }

    async fn provision_theme(
        &self,
        ctx: &ShopContext,
        source: &ThemeSource,
        report: &mut ProvisionReport,
    ) {
        let theme = match install_theme(ctx, &source.zip_url, &source.name).await {
            Ok(theme) => theme,
            Err(e) => {
                report.failure(format!("theme '{}' not installed: {e}", source.name));
                return;
            }
        };
        report.theme_id = Some(theme.id);
        report.milestone(format!("theme '{}' installed as #{}", theme.name, theme.id));

        let timeout = theme_ready_timeout(&self.config);
        let interval = self.config.theme_ready().interval();
        match wait_until_ready(ctx, theme.id, timeout, interval).await {
            Ok(_) => report.milestone(format!("theme #{} ready", theme.id)),
            Err(e @ ThemeError::ProcessingTimeout { .. }) => report.warning(e.to_string()),
            Err(e) => report.failure(format!("theme #{} status unknown: {e}", theme.id)),
        }

        if !source.publish {
            return;
        }
        let outcome = publish(ctx, theme.id).await;
        match &outcome {
            PublishOutcome::Published(_) => {
                report.milestone(format!("theme #{} published", theme.id));
            }
            other => report.failure(format!(
                "theme #{} not published: {}",
                theme.id,
                other.error().unwrap_or_default()
            )),
        }
        report.publish = Some(outcome);
    }
}

fn theme_ready_timeout(config: &ProvisionConfig) -> Duration {
    let policy = config.theme_ready();
    match policy.budget() {
        PollBudget::Timeout(timeout) => timeout,
        PollBudget::Attempts(n) => policy.interval().saturating_mul(n),
    }
}
