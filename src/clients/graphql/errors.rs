//! GraphQL-specific error types.

use crate::clients::HttpError;
use thiserror::Error;

/// Error type for GraphQL Admin API operations.
///
/// # Example
///
/// ```rust
/// use shopify_provision::clients::GraphqlError;
///
/// let error = GraphqlError::UserErrors("filename: is invalid".to_string());
/// assert_eq!(error.to_string(), "User errors: filename: is invalid");
/// ```
#[derive(Debug, Error)]
pub enum GraphqlError {
    /// An HTTP-level error occurred.
    #[error(transparent)]
    Http(#[from] HttpError),

    /// The response carried top-level `errors`.
    #[error("GraphQL errors: {}", .0.join("; "))]
    Query(Vec<String>),

    /// The mutation payload reported `userErrors`.
    #[error("User errors: {0}")]
    UserErrors(String),

    /// The expected payload was absent from `data`.
    #[error("Missing GraphQL payload `{0}`")]
    MissingPayload(String),
}
