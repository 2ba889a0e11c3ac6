//! Binding resolved CDN URLs to products and variants.

use serde::Deserialize;
use serde_json::{json, Value};
use thiserror::Error;

use crate::clients::{format_user_errors, to_gid, GraphqlError, UserError};
use crate::context::ShopContext;
use crate::files::CdnUrl;

const PRODUCT_CREATE_MEDIA: &str = r"
mutation productCreateMedia($productId: ID!, $media: [CreateMediaInput!]!) {
  productCreateMedia(productId: $productId, media: $media) {
    media { id alt mediaContentType status }
    mediaUserErrors { field message }
  }
}";

const PRODUCT_VARIANTS_BULK_UPDATE: &str = r"
mutation productVariantsBulkUpdate(
  $productId: ID!
  $variants: [ProductVariantsBulkInput!]!
  $media: [CreateMediaInput!]
) {
  productVariantsBulkUpdate(productId: $productId, variants: $variants, media: $media) {
    productVariants {
      id
      media(first: 1) { nodes { id } }
    }
    userErrors { field message }
  }
}";

/// Errors from [`attach_to_product`] and [`attach_to_variant`].
#[derive(Debug, Error)]
pub enum AttachError {
    /// The value is not an absolute http(s) URL.
    #[error("Not an absolute http(s) URL: '{url}'")]
    InvalidUrl {
        /// The rejected value.
        url: String,
    },

    /// The mutation failed or reported user errors.
    #[error(transparent)]
    Graphql(#[from] GraphqlError),

    /// The mutation succeeded but returned nothing to reference.
    #[error("No {0} returned by the attach mutation")]
    MissingResult(&'static str),
}

/// Media created on a product.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MediaRef {
    /// Media GID.
    pub media_id: String,
    /// Owning product GID.
    pub product_id: String,
    /// Alt text, if the media has one.
    pub alt: Option<String>,
}

/// A variant whose image was set.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VariantRef {
    /// Variant GID.
    pub variant_id: String,
    /// GID of the media now bound to the variant, if reported.
    pub media_id: Option<String>,
}

#[derive(Deserialize)]
struct MediaPayload {
    id: String,
    alt: Option<String>,
}

fn media_input(cdn_url: &CdnUrl, alt: Option<&str>) -> Value {
    json!({
        "originalSource": cdn_url.as_str(),
        "alt": alt.unwrap_or_default(),
        "mediaContentType": "IMAGE",
    })
}

/// Adds an image to a product's media.
///
/// `product_id` may be a REST id or a GID.
///
/// # Errors
///
/// Returns [`AttachError::Graphql`] on failure or media user errors, and
/// [`AttachError::MissingResult`] when no media comes back.
pub async fn attach_to_product(
    ctx: &ShopContext,
    product_id: &str,
    cdn_url: &CdnUrl,
    alt: Option<&str>,
) -> Result<MediaRef, AttachError> {
    let product_gid = to_gid("Product", product_id);
    let variables = json!({
        "productId": product_gid,
        "media": [media_input(cdn_url, alt)],
    });

    let payload = ctx
        .graphql()
        .mutate(PRODUCT_CREATE_MEDIA, variables, "productCreateMedia")
        .await?;

    let media_errors: Vec<UserError> = payload
        .get("mediaUserErrors")
        .cloned()
        .and_then(|errors| serde_json::from_value(errors).ok())
        .unwrap_or_default();
    if !media_errors.is_empty() {
        return Err(GraphqlError::UserErrors(format_user_errors(&media_errors)).into());
    }

    let media: MediaPayload = payload
        .pointer("/media/0")
        .cloned()
        .and_then(|media| serde_json::from_value(media).ok())
        .ok_or(AttachError::MissingResult("media"))?;

    tracing::debug!(product = %product_gid, media = %media.id, "image attached to product");
    Ok(MediaRef {
        media_id: media.id,
        product_id: product_gid,
        alt: media.alt.filter(|a| !a.is_empty()),
    })
}

/// Sets a variant's image.
///
/// The remote mutation is scoped to the owning product, so `product_id` is
/// required alongside `variant_id`. Both accept REST ids or GIDs.
///
/// # Errors
///
/// Returns [`AttachError::Graphql`] on failure or user errors, and
/// [`AttachError::MissingResult`] when no variant comes back.
pub async fn attach_to_variant(
    ctx: &ShopContext,
    product_id: &str,
    variant_id: &str,
    cdn_url: &CdnUrl,
    alt: Option<&str>,
) -> Result<VariantRef, AttachError> {
    let variables = json!({
        "productId": to_gid("Product", product_id),
        "variants": [{
            "id": to_gid("ProductVariant", variant_id),
            "mediaSrc": [cdn_url.as_str()],
        }],
        "media": [media_input(cdn_url, alt)],
    });

    let payload = ctx
        .graphql()
        .mutate(
            PRODUCT_VARIANTS_BULK_UPDATE,
            variables,
            "productVariantsBulkUpdate",
        )
        .await?;

    let variant = payload
        .pointer("/productVariants/0")
        .ok_or(AttachError::MissingResult("variant"))?;
    let variant_id = variant
        .get("id")
        .and_then(Value::as_str)
        .ok_or(AttachError::MissingResult("variant"))?
        .to_string();
    let media_id = variant
        .pointer("/media/nodes/0/id")
        .and_then(Value::as_str)
        .map(str::to_string);

    tracing::debug!(variant = %variant_id, "image attached to variant");
    Ok(VariantRef {
        variant_id,
        media_id,
    })
}
