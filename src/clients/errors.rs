//! Transport-level error types.
//!
//! - [`HttpResponseError`]: a non-2xx response from the Admin API
//! - [`MaxHttpRetriesExceededError`]: 429/500 responses outlasted the try budget
//! - [`InvalidHttpRequestError`]: a request failed validation before sending
//! - [`HttpError`]: the union of the above plus network failures

use thiserror::Error;

/// A non-successful response from the Admin API.
///
/// `message` holds the serialized `errors`/`error` fields of the body, which
/// is what Shopify puts its human-readable reasons in.
///
/// # Example
///
/// ```rust
/// use shopify_provision::clients::HttpResponseError;
///
/// let error = HttpResponseError {
///     code: 422,
///     message: r#"{"errors":{"src":["is invalid"]}}"#.to_string(),
///     error_reference: None,
/// };
/// assert!(error.to_string().contains("422"));
/// ```
#[derive(Debug, Error)]
#[error("Admin API responded {code}: {message}")]
pub struct HttpResponseError {
    /// The HTTP status code of the response.
    pub code: u16,
    /// Serialized error fields from the response body.
    pub message: String,
    /// The `X-Request-Id` of the failing request, if present.
    pub error_reference: Option<String>,
}

/// Retries for a throttled or failing request were exhausted.
#[derive(Debug, Error)]
#[error("Exceeded maximum retry count of {tries}. Last response {code}: {message}")]
pub struct MaxHttpRetriesExceededError {
    /// The HTTP status code of the last response.
    pub code: u16,
    /// The number of tries that were attempted.
    pub tries: u32,
    /// Serialized error message from the last response.
    pub message: String,
    /// The `X-Request-Id` of the last response, if present.
    pub error_reference: Option<String>,
}

/// A request that failed validation before it was sent.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum InvalidHttpRequestError {
    /// A request body was provided without specifying the body type.
    #[error("Cannot set a body without also setting body_type.")]
    MissingBodyType,

    /// A POST or PUT request was made without a body.
    #[error("Cannot use {method} without specifying data.")]
    MissingBody {
        /// The HTTP method that requires a body.
        method: String,
    },

    /// A request was built with a zero try budget.
    #[error("A request must be attempted at least once.")]
    ZeroTries,
}

/// Unified error type for Admin API transport failures.
#[derive(Debug, Error)]
pub enum HttpError {
    /// A non-2xx response.
    #[error(transparent)]
    Response(#[from] HttpResponseError),

    /// Retry budget exhausted on 429/500 responses.
    #[error(transparent)]
    MaxRetries(#[from] MaxHttpRetriesExceededError),

    /// Request validation failed.
    #[error(transparent)]
    InvalidRequest(#[from] InvalidHttpRequestError),

    /// Network or connection error.
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
}

impl HttpError {
    /// Returns the HTTP status behind this error, if a response was received.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Response(e) => Some(e.code),
            Self::MaxRetries(e) => Some(e.code),
            Self::InvalidRequest(_) | Self::Network(_) => None,
        }
    }
}
