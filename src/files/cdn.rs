//! CDN URL resolution for registered files.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use serde::Deserialize;
use serde_json::json;

use crate::clients::GraphqlError;
use crate::context::ShopContext;
use crate::files::{CdnUrl, FileAsset, FileStatus};
use crate::poll::{poll_until, PollOutcome, PollPolicy};

const FILES_BY_NAME: &str = r"
query filesByName($query: String!) {
  files(first: 10, query: $query) {
    nodes {
      id
      fileStatus
      ... on MediaImage { image { url } }
      ... on GenericFile { url }
    }
  }
}";

#[derive(Debug, Deserialize)]
struct FileNode {
    #[serde(default)]
    image: Option<ImagePayload>,
    #[serde(default)]
    url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ImagePayload {
    url: Option<String>,
}

impl FileNode {
    fn public_url(&self) -> Option<&str> {
        self.image
            .as_ref()
            .and_then(|image| image.url.as_deref())
            .or(self.url.as_deref())
            .filter(|url| !url.is_empty())
    }
}

/// One lookup. Only the first node counts when several files share a name.
async fn lookup(ctx: &ShopContext, filename: &str) -> Result<Option<CdnUrl>, GraphqlError> {
    let data = ctx
        .graphql()
        .data(
            FILES_BY_NAME,
            Some(json!({ "query": format!("filename:{filename}") })),
        )
        .await?;

    let nodes: Vec<FileNode> = data
        .pointer("/files/nodes")
        .cloned()
        .and_then(|nodes| serde_json::from_value(nodes).ok())
        .unwrap_or_default();

    if nodes.len() > 1 {
        tracing::debug!(filename, matches = nodes.len(), "several files share this name");
    }

    Ok(nodes
        .first()
        .and_then(FileNode::public_url)
        .and_then(|url| CdnUrl::parse(url).ok()))
}

/// Polls Shopify's file index until `filename` has a public URL.
///
/// Performs exactly `max_attempts` lookups, `interval` apart, unless a URL
/// shows up earlier. Lookup failures count as "not yet". Running out of
/// attempts is not an error: it is logged and `None` is returned.
pub async fn resolve_cdn_url(
    ctx: &ShopContext,
    filename: &str,
    interval: Duration,
    max_attempts: u32,
) -> Option<CdnUrl> {
    if max_attempts == 0 {
        return None;
    }

    let policy = PollPolicy::attempts(interval, max_attempts);
    let outcome = poll_until(&policy, |attempt| async move {
        match lookup(ctx, filename).await {
            Ok(found) => Ok::<_, std::convert::Infallible>(found),
            Err(e) => {
                tracing::debug!(filename, attempt, error = %e, "file lookup failed");
                Ok(None)
            }
        }
    })
    .await;

    match outcome {
        Ok(PollOutcome::Ready { value, attempts }) => {
            tracing::debug!(filename, attempts, url = %value, "cdn url resolved");
            Some(value)
        }
        Ok(PollOutcome::Exhausted { attempts, elapsed }) => {
            tracing::warn!(
                filename,
                attempts,
                elapsed_ms = elapsed.as_millis(),
                "CdnResolutionTimeout: no public url for file"
            );
            None
        }
        Err(never) => match never {},
    }
}

/// Run-scoped CDN resolution with a per-filename cache.
///
/// The first URL resolved for a filename is reused for the rest of the run,
/// so images sharing a name always attach the same file.
#[derive(Debug, Default)]
pub struct CdnResolver {
    resolved: Mutex<HashMap<String, CdnUrl>>,
}

impl CdnResolver {
    /// Creates an empty resolver.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached URL for `filename`, if any.
    #[must_use]
    pub fn cached(&self, filename: &str) -> Option<CdnUrl> {
        self.resolved
            .lock()
            .ok()
            .and_then(|cache| cache.get(filename).cloned())
    }

    /// Resolves `filename` with the context's CDN polling policy.
    pub async fn resolve(&self, ctx: &ShopContext, filename: &str) -> Option<CdnUrl> {
        if let Some(url) = self.cached(filename) {
            return Some(url);
        }

        let policy = ctx.config().cdn_poll();
        let attempts = policy.max_attempts().unwrap_or(1);
        let url = resolve_cdn_url(ctx, filename, policy.interval(), attempts).await?;

        match self.resolved.lock() {
            Ok(mut cache) => Some(cache.entry(filename.to_string()).or_insert(url).clone()),
            Err(_) => Some(url),
        }
    }

    /// Resolves an asset and records the result on it.
    ///
    /// The asset moves to [`FileStatus::CdnResolved`] on success and to
    /// [`FileStatus::Failed`] otherwise.
    pub async fn resolve_asset(&self, ctx: &ShopContext, asset: &mut FileAsset) -> Option<CdnUrl> {
        if asset.status().is_terminal() {
            return None;
        }
        match self.resolve(ctx, &asset.filename).await {
            Some(url) => {
                asset.cdn_url = Some(url.clone());
                asset.advance(FileStatus::CdnResolved);
                Some(url)
            }
            None => {
                asset.fail();
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_public_url_prefers_image_url() {
        let node: FileNode = serde_json::from_value(json!({
            "id": "gid://shopify/MediaImage/1",
            "fileStatus": "READY",
            "image": {"url": "https://cdn.shopify.com/a.jpg"}
        }))
        .unwrap();
        assert_eq!(node.public_url(), Some("https://cdn.shopify.com/a.jpg"));
    }

    #[test]
    fn test_processing_image_has_no_url() {
        let node: FileNode = serde_json::from_value(json!({
            "id": "gid://shopify/MediaImage/1",
            "fileStatus": "UPLOADED",
            "image": null
        }))
        .unwrap();
        assert_eq!(node.public_url(), None);
    }

    #[test]
    fn test_generic_file_url() {
        let node: FileNode = serde_json::from_value(json!({
            "id": "gid://shopify/GenericFile/1",
            "url": "https://cdn.shopify.com/doc.pdf"
        }))
        .unwrap();
        assert_eq!(node.public_url(), Some("https://cdn.shopify.com/doc.pdf"));
    }

    #[test]
    fn test_empty_resolver_has_no_cache() {
        assert_eq!(CdnResolver::new().cached("a.jpg"), None);
    }
}
