//! Creating or updating one product from a draft.

use std::collections::HashMap;

use serde::Deserialize;
use serde_json::{json, Map, Value};
use thiserror::Error;

use crate::clients::RestError;
use crate::context::ShopContext;
use crate::files::{
    attach_to_product, attach_to_variant, filename_from_url, infer_mime_type,
    stage_and_register, CdnResolver, CdnUrl, ImageSource,
};
use crate::products::{ProductDraft, VariantDraft};

/// Errors that stop the import of a product.
///
/// Variant and image failures do not stop an import; they are listed in
/// [`ProductOutcome::failures`].
#[derive(Debug, Error)]
pub enum ImportError {
    /// A product-level request failed.
    #[error("{action} for product '{handle}' failed: {source}")]
    Request {
        /// Product handle.
        handle: String,
        /// What was attempted.
        action: &'static str,
        /// The underlying error.
        #[source]
        source: RestError,
    },

    /// Shopify answered without a readable product.
    #[error("Malformed product response for '{handle}': {reason}")]
    Malformed {
        /// Product handle.
        handle: String,
        /// What was wrong.
        reason: String,
    },
}

/// A product as returned by the REST API.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
pub struct RemoteProduct {
    /// Product id.
    pub id: u64,
    /// Handle.
    #[serde(default)]
    pub handle: String,
    /// Variants.
    #[serde(default)]
    pub variants: Vec<RemoteVariant>,
}

/// A variant as returned by the REST API.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
pub struct RemoteVariant {
    /// Variant id.
    pub id: u64,
    /// SKU.
    #[serde(default)]
    pub sku: Option<String>,
    /// First option value.
    #[serde(default)]
    pub option1: Option<String>,
    /// Second option value.
    #[serde(default)]
    pub option2: Option<String>,
    /// Third option value.
    #[serde(default)]
    pub option3: Option<String>,
}

impl RemoteVariant {
    fn option_values(&self) -> Vec<&str> {
        [&self.option1, &self.option2, &self.option3]
            .into_iter()
            .filter_map(|v| v.as_deref())
            .collect()
    }

    fn matches(&self, draft: &VariantDraft) -> bool {
        match (draft.sku.as_deref(), self.sku.as_deref()) {
            (Some(wanted), Some(have)) if !have.is_empty() => wanted == have,
            _ => self.option_values() == draft.option_values,
        }
    }
}

/// What happened to one product.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ProductOutcome {
    /// Product handle.
    pub handle: String,
    /// Remote product id.
    pub product_id: u64,
    /// `true` if the product was created, `false` if it already existed.
    pub created: bool,
    /// Variants inserted.
    pub variants_created: usize,
    /// Existing variants updated.
    pub variants_updated: usize,
    /// Images attached to the product.
    pub images_attached: usize,
    /// Images attached to variants.
    pub variant_images_attached: usize,
    /// One line per variant or image that failed.
    pub failures: Vec<String>,
}

fn variant_payload(options: &[String], draft: &VariantDraft) -> Value {
    let mut variant = Map::new();
    for (i, value) in draft.option_values.iter().enumerate().take(options.len()) {
        variant.insert(format!("option{}", i + 1), json!(value));
    }
    variant.insert("price".to_string(), json!(draft.price));
    if let Some(compare_at) = &draft.compare_at_price {
        variant.insert("compare_at_price".to_string(), json!(compare_at));
    }
    if let Some(sku) = &draft.sku {
        variant.insert("sku".to_string(), json!(sku));
    }
    if let Some(barcode) = &draft.barcode {
        variant.insert("barcode".to_string(), json!(barcode));
    }
    Value::Object(variant)
}

fn base_payload(draft: &ProductDraft) -> Map<String, Value> {
    let mut product = Map::new();
    product.insert("title".to_string(), json!(draft.title));
    if let Some(body_html) = &draft.body_html {
        product.insert("body_html".to_string(), json!(body_html));
    }
    if let Some(vendor) = &draft.vendor {
        product.insert("vendor".to_string(), json!(vendor));
    }
    if let Some(product_type) = &draft.product_type {
        product.insert("product_type".to_string(), json!(product_type));
    }
    if !draft.tags.is_empty() {
        product.insert("tags".to_string(), json!(draft.tags.join(", ")));
    }
    product
}

fn create_payload(draft: &ProductDraft) -> Value {
    let mut product = base_payload(draft);
    product.insert("handle".to_string(), json!(draft.handle));
    if !draft.options.is_empty() {
        let options: Vec<Value> = draft.options.iter().map(|name| json!({ "name": name })).collect();
        product.insert("options".to_string(), Value::Array(options));
    }
    let variants: Vec<Value> = draft
        .variants
        .iter()
        .map(|v| variant_payload(&draft.options, v))
        .collect();
    if !variants.is_empty() {
        product.insert("variants".to_string(), Value::Array(variants));
    }
    json!({ "product": product })
}

fn parse_product(handle: &str, body: &Value) -> Result<RemoteProduct, ImportError> {
    body.get("product")
        .cloned()
        .and_then(|p| serde_json::from_value(p).ok())
        .ok_or_else(|| ImportError::Malformed {
            handle: handle.to_string(),
            reason: "response has no product".to_string(),
        })
}

/// Looks up a product by handle.
///
/// # Errors
///
/// Returns [`ImportError::Request`] if the lookup fails.
pub async fn find_by_handle(
    ctx: &ShopContext,
    handle: &str,
) -> Result<Option<RemoteProduct>, ImportError> {
    let response = ctx
        .rest()
        .get("products", &[("handle", handle)])
        .await
        .map_err(|source| ImportError::Request {
            handle: handle.to_string(),
            action: "lookup",
            source,
        })?;

    let products: Vec<RemoteProduct> = response
        .body
        .get("products")
        .cloned()
        .and_then(|p| serde_json::from_value(p).ok())
        .unwrap_or_default();

    Ok(products.into_iter().find(|p| p.handle == handle))
}

/// Creates or updates the product for `draft`, then its images.
///
/// The handle decides between create and update, so importing the same
/// draft twice never creates a second product. On update, variants are
/// matched by SKU (or by option values when either side has no SKU) and
/// updated in place; unmatched variants are inserted. Images go through
/// staged upload, CDN resolution and attachment one at a time.
///
/// # Errors
///
/// Returns [`ImportError`] only when the product itself cannot be looked up,
/// created or updated.
pub async fn import_product(
    ctx: &ShopContext,
    draft: &ProductDraft,
    resolver: &CdnResolver,
) -> Result<ProductOutcome, ImportError> {
    let handle = draft.handle.as_str();
    let mut outcome = ProductOutcome {
        handle: handle.to_string(),
        ..ProductOutcome::default()
    };

    let (product_id, variant_ids) = match find_by_handle(ctx, handle).await? {
        None => {
            let product = create_product(ctx, draft).await?;
            outcome.created = true;
            outcome.variants_created = product.variants.len();
            let ids = match_variant_ids(draft, &product.variants);
            (product.id, ids)
        }
        Some(existing) => {
            update_product(ctx, draft, existing.id).await?;
            let ids = upsert_variants(ctx, draft, &existing, &mut outcome).await;
            (existing.id, ids)
        }
    };
    outcome.product_id = product_id;
    tracing::info!(
        handle,
        product_id,
        created = outcome.created,
        "product saved"
    );

    let mut uploaded: HashMap<String, CdnUrl> = HashMap::new();
    for (index, image) in draft.images.iter().enumerate() {
        let cdn_url = match upload_image(ctx, resolver, handle, index, &image.src).await {
            Ok(url) => url,
            Err(reason) => {
                outcome.failures.push(reason);
                continue;
            }
        };
        uploaded.insert(image.src.clone(), cdn_url.clone());

        match attach_to_product(ctx, &product_id.to_string(), &cdn_url, image.alt.as_deref()).await
        {
            Ok(_) => outcome.images_attached += 1,
            Err(e) => {
                tracing::warn!(handle, src = %image.src, error = %e, "product image not attached");
                outcome
                    .failures
                    .push(format!("image {}: {e}", image.src));
            }
        }
    }

    for (index, variant) in draft.variants.iter().enumerate() {
        let Some(src) = &variant.image_src else {
            continue;
        };
        let Some(variant_id) = variant_ids.get(index).copied().flatten() else {
            outcome
                .failures
                .push(format!("variant image {src}: variant not found"));
            continue;
        };

        let cdn_url = match uploaded.get(src) {
            Some(url) => url.clone(),
            None => {
                let position = draft.images.len() + index;
                match upload_image(ctx, resolver, handle, position, src).await {
                    Ok(url) => {
                        uploaded.insert(src.clone(), url.clone());
                        url
                    }
                    Err(reason) => {
                        outcome.failures.push(reason);
                        continue;
                    }
                }
            }
        };

        match attach_to_variant(
            ctx,
            &product_id.to_string(),
            &variant_id.to_string(),
            &cdn_url,
            None,
        )
        .await
        {
            Ok(_) => outcome.variant_images_attached += 1,
            Err(e) => {
                tracing::warn!(handle, variant_id, error = %e, "variant image not attached");
                outcome.failures.push(format!("variant image {src}: {e}"));
            }
        }
    }

    Ok(outcome)
}

async fn create_product(
    ctx: &ShopContext,
    draft: &ProductDraft,
) -> Result<RemoteProduct, ImportError> {
    let response = ctx
        .rest()
        .post("products", create_payload(draft))
        .await
        .map_err(|source| ImportError::Request {
            handle: draft.handle.clone(),
            action: "create",
            source,
        })?;
    parse_product(&draft.handle, &response.body)
}

async fn update_product(
    ctx: &ShopContext,
    draft: &ProductDraft,
    product_id: u64,
) -> Result<(), ImportError> {
    let mut product = base_payload(draft);
    product.insert("id".to_string(), json!(product_id));

    ctx.rest()
        .put(
            &format!("products/{product_id}"),
            json!({ "product": product }),
        )
        .await
        .map_err(|source| ImportError::Request {
            handle: draft.handle.clone(),
            action: "update",
            source,
        })?;
    Ok(())
}

/// Remote variant id for each draft variant, by position.
fn match_variant_ids(draft: &ProductDraft, remote: &[RemoteVariant]) -> Vec<Option<u64>> {
    draft
        .variants
        .iter()
        .map(|v| remote.iter().find(|r| r.matches(v)).map(|r| r.id))
        .collect()
}

async fn upsert_variants(
    ctx: &ShopContext,
    draft: &ProductDraft,
    existing: &RemoteProduct,
    outcome: &mut ProductOutcome,
) -> Vec<Option<u64>> {
    let mut ids = Vec::with_capacity(draft.variants.len());

    for variant in &draft.variants {
        let payload = variant_payload(&draft.options, variant);
        let label = variant
            .sku
            .clone()
            .unwrap_or_else(|| variant.option_values.join(" / "));

        let result = match existing.variants.iter().find(|r| r.matches(variant)) {
            Some(remote) => {
                let mut payload = payload;
                if let Value::Object(fields) = &mut payload {
                    fields.insert("id".to_string(), json!(remote.id));
                }
                ctx.rest()
                    .put(
                        &format!("variants/{}", remote.id),
                        json!({ "variant": payload }),
                    )
                    .await
                    .map(|_| {
                        outcome.variants_updated += 1;
                        Some(remote.id)
                    })
            }
            None => ctx
                .rest()
                .post(
                    &format!("products/{}/variants", existing.id),
                    json!({ "variant": payload }),
                )
                .await
                .map(|response| {
                    outcome.variants_created += 1;
                    response.body.pointer("/variant/id").and_then(Value::as_u64)
                }),
        };

        match result {
            Ok(id) => ids.push(id),
            Err(e) => {
                tracing::warn!(handle = %draft.handle, variant = %label, error = %e, "variant not saved");
                outcome.failures.push(format!("variant {label}: {e}"));
                ids.push(None);
            }
        }
    }

    ids
}

async fn upload_image(
    ctx: &ShopContext,
    resolver: &CdnResolver,
    handle: &str,
    position: usize,
    src: &str,
) -> Result<CdnUrl, String> {
    let filename = filename_from_url(src).unwrap_or_else(|| format!("{handle}-{}.jpg", position + 1));

    if let Some(url) = resolver.cached(&filename) {
        return Ok(url);
    }

    let mime_type = infer_mime_type(&filename);
    let mut asset = stage_and_register(ctx, ImageSource::Url(src.to_string()), &filename, mime_type)
        .await
        .map_err(|e| {
            tracing::warn!(handle, src, error = %e, "image upload failed");
            format!("image {src}: {e}")
        })?;

    resolver
        .resolve_asset(ctx, &mut asset)
        .await
        .ok_or_else(|| format!("image {src}: no CDN url for {filename}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn variant(values: &[&str], sku: Option<&str>) -> VariantDraft {
        VariantDraft {
            option_values: values.iter().map(|v| (*v).to_string()).collect(),
            sku: sku.map(str::to_string),
            price: "10.00".to_string(),
            compare_at_price: None,
            barcode: None,
            image_src: None,
        }
    }

    fn remote(id: u64, sku: Option<&str>, option1: Option<&str>) -> RemoteVariant {
        RemoteVariant {
            id,
            sku: sku.map(str::to_string),
            option1: option1.map(str::to_string),
            option2: None,
            option3: None,
        }
    }

    #[test]
    fn test_sku_takes_precedence_over_options() {
        let draft = variant(&["Red"], Some("SKU-1"));
        assert!(remote(1, Some("SKU-1"), Some("Blue")).matches(&draft));
        assert!(!remote(2, Some("SKU-2"), Some("Red")).matches(&draft));
    }

    #[test]
    fn test_options_match_when_sku_missing() {
        let draft = variant(&["Red"], None);
        assert!(remote(1, Some("SKU-9"), Some("Red")).matches(&draft));
        assert!(!remote(2, None, Some("Blue")).matches(&draft));
    }

    #[test]
    fn test_blank_remote_sku_falls_back_to_options() {
        let draft = variant(&["Red"], Some("NEW"));
        assert!(remote(1, Some(""), Some("Red")).matches(&draft));
    }

    #[test]
    fn test_variant_payload_fields() {
        let mut draft = variant(&["Red", "S"], Some("TEE-R-S"));
        draft.compare_at_price = Some("12.00".to_string());
        let payload = variant_payload(&["Color".to_string(), "Size".to_string()], &draft);

        assert_eq!(
            payload,
            json!({
                "option1": "Red",
                "option2": "S",
                "price": "10.00",
                "compare_at_price": "12.00",
                "sku": "TEE-R-S"
            })
        );
    }

    #[test]
    fn test_create_payload_carries_handle_options_and_variants() {
        let draft = ProductDraft {
            handle: "tee".to_string(),
            title: "Tee".to_string(),
            body_html: None,
            vendor: Some("Acme".to_string()),
            product_type: None,
            tags: vec!["summer".to_string(), "cotton".to_string()],
            options: vec!["Color".to_string()],
            variants: vec![variant(&["Red"], None)],
            images: vec![],
            skipped_rows: 0,
        };

        let payload = create_payload(&draft);
        assert_eq!(payload["product"]["handle"], "tee");
        assert_eq!(payload["product"]["tags"], "summer, cotton");
        assert_eq!(payload["product"]["options"], json!([{"name": "Color"}]));
        assert_eq!(payload["product"]["variants"][0]["option1"], "Red");
    }
}
