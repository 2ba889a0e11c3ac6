//! GraphQL access to the Admin API.
//!
//! Staged uploads, file lookups and media attachment only exist in the
//! GraphQL Admin API. [`GraphqlClient::mutate`] folds the three ways a
//! mutation can fail (transport, top-level `errors`, payload `userErrors`)
//! into one [`GraphqlError`].

mod client;
mod errors;

pub use client::{format_user_errors, to_gid, GraphqlClient, UserError};
pub use errors::GraphqlError;
