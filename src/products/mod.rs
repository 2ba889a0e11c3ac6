//! Product import from flat CSV rows.
//!
//! [`map_rows`] turns rows into [`ProductDraft`]s without touching the
//! network; [`import_product`] pushes one draft to a shop.

mod csv_map;
mod import;

pub use csv_map::{
    is_blank, map_rows, normalize_price, Column, FlatRow, ImageDraft, ProductDraft, VariantDraft,
    MAX_OPTIONS,
};
pub use import::{
    find_by_handle, import_product, ImportError, ProductOutcome, RemoteProduct, RemoteVariant,
};
