//! REST-specific error types.

use crate::clients::HttpError;
use thiserror::Error;

/// Error type for REST Admin API calls.
///
/// # Example
///
/// ```rust
/// use shopify_provision::clients::RestError;
///
/// let error = RestError::InvalidPath { path: String::new() };
/// assert_eq!(error.to_string(), "Invalid REST API path: ");
/// ```
#[derive(Debug, Error)]
pub enum RestError {
    /// The resource path was empty after normalization.
    #[error("Invalid REST API path: {path}")]
    InvalidPath {
        /// The rejected path.
        path: String,
    },

    /// An HTTP-level error occurred.
    #[error(transparent)]
    Http(#[from] HttpError),
}

impl RestError {
    /// Returns the HTTP status behind this error, if a response was received.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::InvalidPath { .. } => None,
            Self::Http(e) => e.status(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::HttpResponseError;

    #[test]
    fn test_http_variant_is_transparent() {
        let error: RestError = HttpError::Response(HttpResponseError {
            code: 404,
            message: r#"{"errors":"Not Found"}"#.to_string(),
            error_reference: None,
        })
        .into();

        assert_eq!(error.status(), Some(404));
        assert!(error.to_string().contains("Not Found"));
    }

    #[test]
    fn test_invalid_path_has_no_status() {
        let error = RestError::InvalidPath {
            path: "/".to_string(),
        };
        assert_eq!(error.status(), None);
    }
}
