//! REST access to the Admin API.
//!
//! Themes, products and variants are managed through the REST resources
//! under `/admin/api/{version}/`. The [`RestClient`] normalizes paths and
//! applies the configured retry budget to every call.

mod client;
mod errors;

pub use client::RestClient;
pub use errors::RestError;
