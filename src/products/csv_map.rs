//! Grouping flat CSV rows into product drafts.
//!
//! Two export dialects are accepted. Header names are compared after
//! lowercasing and dropping whitespace, so `Variant SKU`, `variant sku` and
//! `VariantSKU` are the same column. Values are trimmed, and the
//! placeholders `""`, `nan`, `null` and `undefined` read as absent.

use std::collections::HashSet;

/// Maximum number of product options Shopify accepts.
pub const MAX_OPTIONS: u8 = 3;

const SENTINELS: [&str; 4] = ["", "nan", "null", "undefined"];

/// A logical column, matched against several header spellings.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Column {
    /// Product handle; rows without one are ignored.
    Handle,
    /// Product title.
    Title,
    /// Product description HTML.
    BodyHtml,
    /// Vendor.
    Vendor,
    /// Product type.
    ProductType,
    /// Comma separated tags.
    Tags,
    /// Name of option 1, 2 or 3.
    OptionName(u8),
    /// Value of option 1, 2 or 3.
    OptionValue(u8),
    /// Variant SKU.
    Sku,
    /// Variant price.
    Price,
    /// Variant compare-at price.
    CompareAtPrice,
    /// Variant barcode.
    Barcode,
    /// Product image URL.
    ImageSrc,
    /// Product image alt text.
    ImageAlt,
    /// Variant image URL.
    VariantImage,
}

impl Column {
    fn aliases(self) -> &'static [&'static str] {
        match self {
            Self::Handle => &["handle"],
            Self::Title => &["title"],
            Self::BodyHtml => &["body(html)", "bodyhtml", "body", "description"],
            Self::Vendor => &["vendor"],
            Self::ProductType => &["type", "producttype"],
            Self::Tags => &["tags"],
            Self::OptionName(1) => &["option1name"],
            Self::OptionName(2) => &["option2name"],
            Self::OptionName(3) => &["option3name"],
            Self::OptionValue(1) => &["option1value"],
            Self::OptionValue(2) => &["option2value"],
            Self::OptionValue(3) => &["option3value"],
            Self::OptionName(_) | Self::OptionValue(_) => &[],
            Self::Sku => &["variantsku", "sku"],
            Self::Price => &["variantprice", "price"],
            Self::CompareAtPrice => &["variantcompareatprice", "compareatprice"],
            Self::Barcode => &["variantbarcode", "barcode"],
            Self::ImageSrc => &["imagesrc", "imageurl", "image"],
            Self::ImageAlt => &["imagealttext", "imagealt"],
            Self::VariantImage => &["variantimage", "variantimageurl"],
        }
    }
}

fn normalize_header(header: &str) -> String {
    header
        .chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}

/// Returns `true` for values that read as absent.
#[must_use]
pub fn is_blank(value: &str) -> bool {
    let value = value.trim();
    SENTINELS.iter().any(|s| value.eq_ignore_ascii_case(s))
}

/// One CSV row as header/value pairs.
///
/// # Example
///
/// ```rust
/// use shopify_provision::products::{Column, FlatRow};
///
/// let row = FlatRow::from_pairs([("Handle", "tee"), ("Variant SKU", " TEE-S "), ("Tags", "nan")]);
/// assert_eq!(row.get(Column::Handle), Some("tee"));
/// assert_eq!(row.get(Column::Sku), Some("TEE-S"));
/// assert_eq!(row.get(Column::Tags), None);
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FlatRow {
    fields: Vec<(String, String)>,
}

impl FlatRow {
    /// Builds a row from header/value pairs.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        Self {
            fields: pairs
                .into_iter()
                .map(|(k, v)| (normalize_header(k.as_ref()), v.into()))
                .collect(),
        }
    }

    /// Builds a row by zipping a header record with a value record.
    ///
    /// Extra values without a header are dropped.
    pub fn from_record<H, V>(headers: &[H], values: &[V]) -> Self
    where
        H: AsRef<str>,
        V: AsRef<str>,
    {
        Self::from_pairs(
            headers
                .iter()
                .zip(values)
                .map(|(h, v)| (h.as_ref(), v.as_ref().to_string())),
        )
    }

    /// Returns the trimmed value of `column`, or `None` when it is missing
    /// or a placeholder.
    #[must_use]
    pub fn get(&self, column: Column) -> Option<&str> {
        column.aliases().iter().find_map(|alias| {
            self.fields
                .iter()
                .find(|(header, _)| header == alias)
                .map(|(_, value)| value.trim())
                .filter(|value| !is_blank(value))
        })
    }
}

/// Normalizes a price: comma decimals become periods and the result must be
/// a finite number.
///
/// ```rust
/// use shopify_provision::products::normalize_price;
///
/// assert_eq!(normalize_price("19,90").as_deref(), Some("19.90"));
/// assert_eq!(normalize_price("abc"), None);
/// ```
#[must_use]
pub fn normalize_price(raw: &str) -> Option<String> {
    if is_blank(raw) {
        return None;
    }
    let candidate = raw.trim().replace(',', ".");
    candidate
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
        .map(|_| candidate)
}

/// A product image from the CSV.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImageDraft {
    /// Source URL.
    pub src: String,
    /// Alt text.
    pub alt: Option<String>,
}

/// A variant built from one CSV row.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VariantDraft {
    /// Option values, one per declared option, in option order.
    pub option_values: Vec<String>,
    /// SKU, used to match existing variants.
    pub sku: Option<String>,
    /// Normalized price.
    pub price: String,
    /// Normalized compare-at price.
    pub compare_at_price: Option<String>,
    /// Barcode.
    pub barcode: Option<String>,
    /// Variant-specific image URL.
    pub image_src: Option<String>,
}

/// A product assembled from all rows sharing a handle.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProductDraft {
    /// Handle, the product's idempotency key.
    pub handle: String,
    /// Title.
    pub title: String,
    /// Description HTML.
    pub body_html: Option<String>,
    /// Vendor.
    pub vendor: Option<String>,
    /// Product type.
    pub product_type: Option<String>,
    /// Tags.
    pub tags: Vec<String>,
    /// Option names in declared order.
    pub options: Vec<String>,
    /// Variants, unique by option values.
    pub variants: Vec<VariantDraft>,
    /// Product images, unique by source.
    pub images: Vec<ImageDraft>,
    /// Rows whose option values did not match the declared options.
    pub skipped_rows: usize,
}

/// Values of the declared option columns, in option order.
///
/// `None` unless every declared column has a value and no other option
/// column does.
fn option_values(row: &FlatRow, declared: &[(u8, &str)]) -> Option<Vec<String>> {
    let mut values = Vec::with_capacity(declared.len());
    for n in 1..=MAX_OPTIONS {
        let value = row.get(Column::OptionValue(n));
        let is_declared = declared.iter().any(|(slot, _)| *slot == n);
        match (is_declared, value) {
            (true, Some(value)) => values.push(value.to_string()),
            (false, None) => {}
            (true, None) | (false, Some(_)) => return None,
        }
    }
    Some(values)
}

/// Groups rows by handle into product drafts.
///
/// - drafts come out in first-seen handle order
/// - base fields come from the first row with a title
/// - a row yields a variant only if every declared option column has a
///   value and no undeclared one does; other rows are counted in
///   `skipped_rows`
/// - the first row wins when several share the same option values
/// - images are collected across the group, first occurrence kept
#[must_use]
pub fn map_rows(rows: &[FlatRow]) -> Vec<ProductDraft> {
    let mut order: Vec<&str> = Vec::new();
    let mut groups: Vec<Vec<&FlatRow>> = Vec::new();

    for row in rows {
        let Some(handle) = row.get(Column::Handle) else {
            continue;
        };
        match order.iter().position(|h| *h == handle) {
            Some(index) => groups[index].push(row),
            None => {
                order.push(handle);
                groups.push(vec![row]);
            }
        }
    }

    order
        .into_iter()
        .zip(groups)
        .map(|(handle, group)| build_draft(handle, &group))
        .collect()
}

fn build_draft(handle: &str, group: &[&FlatRow]) -> ProductDraft {
    let base = group
        .iter()
        .copied()
        .find(|row| row.get(Column::Title).is_some())
        .unwrap_or(group[0]);

    // Option columns declared by the base row, with their names.
    let declared: Vec<(u8, &str)> = (1..=MAX_OPTIONS)
        .filter_map(|n| base.get(Column::OptionName(n)).map(|name| (n, name)))
        .collect();
    let options: Vec<String> = declared.iter().map(|(_, name)| (*name).to_string()).collect();

    let base_price = base.get(Column::Price).and_then(normalize_price);
    let base_compare_at = base.get(Column::CompareAtPrice).and_then(normalize_price);

    let mut variants: Vec<VariantDraft> = Vec::new();
    let mut seen_tuples: HashSet<Vec<String>> = HashSet::new();
    let mut skipped_rows = 0;

    let mut images: Vec<ImageDraft> = Vec::new();
    let mut seen_images: HashSet<&str> = HashSet::new();

    for row in group {
        if let Some(src) = row.get(Column::ImageSrc) {
            if seen_images.insert(src) {
                images.push(ImageDraft {
                    src: src.to_string(),
                    alt: row.get(Column::ImageAlt).map(str::to_string),
                });
            }
        }

        let Some(values) = option_values(row, &declared) else {
            skipped_rows += 1;
            continue;
        };
        if !seen_tuples.insert(values.clone()) {
            continue;
        }

        variants.push(VariantDraft {
            option_values: values,
            sku: row.get(Column::Sku).map(str::to_string),
            price: row
                .get(Column::Price)
                .and_then(normalize_price)
                .or_else(|| base_price.clone())
                .unwrap_or_else(|| "0".to_string()),
            compare_at_price: row
                .get(Column::CompareAtPrice)
                .and_then(normalize_price)
                .or_else(|| base_compare_at.clone()),
            barcode: row.get(Column::Barcode).map(str::to_string),
            image_src: row.get(Column::VariantImage).map(str::to_string),
        });
    }

    if skipped_rows > 0 {
        tracing::debug!(handle, skipped_rows, "rows without a complete option set");
    }

    ProductDraft {
        handle: handle.to_string(),
        title: base
            .get(Column::Title)
            .map_or_else(|| handle.to_string(), str::to_string),
        body_html: base.get(Column::BodyHtml).map(str::to_string),
        vendor: base.get(Column::Vendor).map(str::to_string),
        product_type: base.get(Column::ProductType).map(str::to_string),
        tags: base
            .get(Column::Tags)
            .map(|tags| {
                tags.split(',')
                    .map(str::trim)
                    .filter(|t| !t.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default(),
        options,
        variants,
        images,
        skipped_rows,
    }
}
