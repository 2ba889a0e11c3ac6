//! Image pipeline: staged upload, CDN resolution and media attachment.
//!
//! An image travels through three remote steps before it is visible on a
//! product:
//!
//! 1. [`stage_and_register`] pushes the bytes to object storage and
//!    registers them as a Shopify file
//! 2. [`resolve_cdn_url`] (or a run-scoped [`CdnResolver`]) waits for the file
//!    to be served from the CDN
//! 3. [`attach_to_product`] / [`attach_to_variant`] bind the CDN URL
//!
//! The [`CdnUrl`] newtype is the hand-off between steps 2 and 3: attachment
//! cannot be called with an URL that was never resolved or parsed.

mod attach;
mod cdn;
mod staged_upload;

use std::fmt;
use std::path::Path;

pub use attach::{attach_to_product, attach_to_variant, AttachError, MediaRef, VariantRef};
pub use cdn::{resolve_cdn_url, CdnResolver};
pub use staged_upload::{stage_and_register, UploadError, UploadTarget};

/// Where an image's bytes come from.
#[derive(Clone, PartialEq, Eq)]
pub enum ImageSource {
    /// Bytes already in memory.
    Bytes(Vec<u8>),
    /// A remote URL that is downloaded before staging.
    Url(String),
}

impl ImageSource {
    /// The remote URL, for [`ImageSource::Url`].
    #[must_use]
    pub fn url(&self) -> Option<&str> {
        match self {
            Self::Bytes(_) => None,
            Self::Url(url) => Some(url),
        }
    }
}

impl fmt::Debug for ImageSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bytes(bytes) => write!(f, "Bytes({} bytes)", bytes.len()),
            Self::Url(url) => f.debug_tuple("Url").field(url).finish(),
        }
    }
}

/// Infers an image MIME type from a filename extension.
///
/// Unknown extensions fall back to `image/jpeg`, which is what storefront
/// exports overwhelmingly contain.
///
/// # Example
///
/// ```rust
/// use shopify_provision::files::infer_mime_type;
///
/// assert_eq!(infer_mime_type("hero.PNG"), "image/png");
/// assert_eq!(infer_mime_type("photo"), "image/jpeg");
/// ```
#[must_use]
pub fn infer_mime_type(filename: &str) -> &'static str {
    let extension = Path::new(filename)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);

    match extension.as_deref() {
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("svg") => "image/svg+xml",
        Some("avif") => "image/avif",
        Some("heic") => "image/heic",
        _ => "image/jpeg",
    }
}

/// Derives a filename from the last path segment of an image URL.
///
/// Query strings and fragments are dropped. Returns `None` when the URL has
/// no usable final segment.
///
/// ```rust
/// use shopify_provision::files::filename_from_url;
///
/// assert_eq!(
///     filename_from_url("https://cdn.example.com/a/b/shirt.jpg?v=3").as_deref(),
///     Some("shirt.jpg")
/// );
/// ```
#[must_use]
pub fn filename_from_url(url: &str) -> Option<String> {
    let parsed = reqwest::Url::parse(url).ok()?;
    let segment = parsed.path_segments()?.last()?.trim();
    (!segment.is_empty()).then(|| segment.to_string())
}

/// Lifecycle of a [`FileAsset`].
///
/// Transitions only move forward. `Failed` is terminal and can be reached
/// from any non-terminal state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FileStatus {
    /// Queued, nothing sent yet.
    Pending,
    /// Registered with Shopify through `fileCreate`.
    Registered,
    /// A public CDN URL was observed.
    CdnResolved,
    /// Gave up on this asset for the rest of the run.
    Failed,
}

impl FileStatus {
    const fn rank(self) -> u8 {
        match self {
            Self::Pending => 0,
            Self::Registered => 1,
            Self::CdnResolved => 2,
            Self::Failed => 3,
        }
    }

    /// Returns `true` if no further transition is possible.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Failed)
    }
}

/// A public CDN URL for an uploaded file.
///
/// Only produced by CDN resolution or by [`CdnUrl::parse`] of an absolute
/// http(s) URL.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct CdnUrl(String);

impl CdnUrl {
    /// Parses an absolute `http` or `https` URL.
    ///
    /// # Errors
    ///
    /// Returns [`AttachError::InvalidUrl`] if the value is not an absolute
    /// http(s) URL with a host.
    ///
    /// ```rust
    /// use shopify_provision::files::CdnUrl;
    ///
    /// assert!(CdnUrl::parse("https://cdn.shopify.com/s/files/1/a.jpg").is_ok());
    /// assert!(CdnUrl::parse("/relative/a.jpg").is_err());
    /// ```
    pub fn parse(url: impl Into<String>) -> Result<Self, AttachError> {
        let url = url.into();
        let trimmed = url.trim();
        let valid = reqwest::Url::parse(trimmed).is_ok_and(|parsed| {
            matches!(parsed.scheme(), "http" | "https") && parsed.host_str().is_some()
        });
        if valid {
            Ok(Self(trimmed.to_string()))
        } else {
            Err(AttachError::InvalidUrl { url })
        }
    }

    /// Returns the URL string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for CdnUrl {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CdnUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// An image being pushed through the pipeline.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FileAsset {
    /// Remote source URL, `None` for in-memory bytes.
    pub source_url: Option<String>,
    /// Filename registered with Shopify, also the CDN lookup key.
    pub filename: String,
    /// MIME type sent with the staged upload.
    pub mime_type: String,
    /// File GID returned by `fileCreate`.
    pub file_id: Option<String>,
    /// Object storage URL the file was registered from.
    pub resource_url: Option<String>,
    /// Public URL, once resolved.
    pub cdn_url: Option<CdnUrl>,
    status: FileStatus,
}

impl FileAsset {
    /// Creates a pending asset.
    #[must_use]
    pub fn new(
        source_url: Option<String>,
        filename: impl Into<String>,
        mime_type: impl Into<String>,
    ) -> Self {
        Self {
            source_url,
            filename: filename.into(),
            mime_type: mime_type.into(),
            file_id: None,
            resource_url: None,
            cdn_url: None,
            status: FileStatus::Pending,
        }
    }

    /// Current status.
    #[must_use]
    pub const fn status(&self) -> FileStatus {
        self.status
    }

    /// Moves to `next` if that is a forward transition.
    ///
    /// Returns `false` and leaves the status unchanged for backward moves,
    /// repeats, and any move out of [`FileStatus::Failed`].
    pub fn advance(&mut self, next: FileStatus) -> bool {
        if self.status.is_terminal() || next.rank() <= self.status.rank() {
            return false;
        }
        self.status = next;
        true
    }

    /// Marks the asset as failed.
    pub fn fail(&mut self) {
        self.advance(FileStatus::Failed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_never_moves_backward() {
        let mut asset = FileAsset::new(None, "a.jpg", "image/jpeg");
        assert!(asset.advance(FileStatus::Registered));
        assert!(asset.advance(FileStatus::CdnResolved));
        assert!(!asset.advance(FileStatus::Registered));
        assert!(!asset.advance(FileStatus::CdnResolved));
        assert_eq!(asset.status(), FileStatus::CdnResolved);
    }

    #[test]
    fn test_failed_is_terminal() {
        let mut asset = FileAsset::new(None, "a.jpg", "image/jpeg");
        asset.fail();
        assert_eq!(asset.status(), FileStatus::Failed);
        assert!(!asset.advance(FileStatus::Registered));
        assert!(!asset.advance(FileStatus::CdnResolved));
        assert_eq!(asset.status(), FileStatus::Failed);
    }

    #[test]
    fn test_states_can_be_skipped_forward() {
        let mut asset = FileAsset::new(None, "a.jpg", "image/jpeg");
        assert!(asset.advance(FileStatus::CdnResolved));
    }

    #[test]
    fn test_infer_mime_type() {
        assert_eq!(infer_mime_type("a.jpeg"), "image/jpeg");
        assert_eq!(infer_mime_type("a.webp"), "image/webp");
        assert_eq!(infer_mime_type("logo.Svg"), "image/svg+xml");
        assert_eq!(infer_mime_type("archive.tar.gif"), "image/gif");
    }

    #[test]
    fn test_filename_from_url() {
        assert_eq!(filename_from_url("https://x.test/").as_deref(), None);
        assert_eq!(filename_from_url("not a url"), None);
        assert_eq!(
            filename_from_url("https://x.test/img/cap.png#zoom").as_deref(),
            Some("cap.png")
        );
    }

    #[test]
    fn test_cdn_url_rejects_non_http_schemes() {
        assert!(CdnUrl::parse("ftp://files.test/a.jpg").is_err());
        assert!(CdnUrl::parse("").is_err());
        let url = CdnUrl::parse(" https://cdn.shopify.com/a.jpg ").unwrap();
        assert_eq!(url.as_str(), "https://cdn.shopify.com/a.jpg");
    }

    #[test]
    fn test_image_source_debug_hides_bytes() {
        let source = ImageSource::Bytes(vec![0; 2048]);
        assert_eq!(format!("{source:?}"), "Bytes(2048 bytes)");
    }
}
