//! Staged upload: reserve a storage slot, push the bytes, register the file.

use serde::Deserialize;
use serde_json::json;
use thiserror::Error;

use crate::clients::GraphqlError;
use crate::context::ShopContext;
use crate::files::{FileAsset, FileStatus, ImageSource};

const STAGED_UPLOADS_CREATE: &str = r"
mutation stagedUploadsCreate($input: [StagedUploadInput!]!) {
  stagedUploadsCreate(input: $input) {
    stagedTargets {
      url
      resourceUrl
      parameters { name value }
    }
    userErrors { field message }
  }
}";

const FILE_CREATE: &str = r"
mutation fileCreate($files: [FileCreateInput!]!) {
  fileCreate(files: $files) {
    files { id fileStatus }
    userErrors { field message }
  }
}";

/// Errors from [`stage_and_register`].
#[derive(Debug, Error)]
pub enum UploadError {
    /// No upload target was granted.
    #[error("Staged upload request failed: {0}")]
    Staging(String),

    /// Object storage rejected the bytes.
    #[error("Upload to object storage failed{}: {body}", status_suffix(.status))]
    Transfer {
        /// HTTP status from object storage, `None` if no response arrived.
        status: Option<u16>,
        /// Response body or transport error text.
        body: String,
    },

    /// `fileCreate` did not register the file.
    #[error("File registration failed: {0}")]
    Registration(String),

    /// A remote image source could not be downloaded.
    #[error("Image source unavailable: {0}")]
    Source(String),
}

#[allow(clippy::ref_option)]
fn status_suffix(status: &Option<u16>) -> String {
    status.map_or_else(String::new, |code| format!(" with status {code}"))
}

/// A pre-signed object storage slot.
///
/// Not `Clone`: [`UploadTarget::transfer`] consumes it, so a slot is pushed
/// to at most once.
#[derive(Debug, PartialEq, Eq)]
pub struct UploadTarget {
    url: String,
    resource_url: String,
    parameters: Vec<(String, String)>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct StagedTargetPayload {
    url: Option<String>,
    resource_url: Option<String>,
    #[serde(default)]
    parameters: Vec<ParameterPayload>,
}

#[derive(Deserialize)]
struct ParameterPayload {
    name: String,
    value: String,
}

impl UploadTarget {
    /// Where the multipart form is posted.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// The URL to register with `fileCreate`.
    #[must_use]
    pub fn resource_url(&self) -> &str {
        &self.resource_url
    }

    /// Form fields to forward, in the order they were granted.
    #[must_use]
    pub fn parameters(&self) -> &[(String, String)] {
        &self.parameters
    }

    fn from_payload(payload: StagedTargetPayload) -> Option<Self> {
        Some(Self {
            url: payload.url.filter(|u| !u.is_empty())?,
            resource_url: payload.resource_url.filter(|u| !u.is_empty())?,
            parameters: payload
                .parameters
                .into_iter()
                .map(|p| (p.name, p.value))
                .collect(),
        })
    }

    /// Builds the multipart form: every granted parameter verbatim and in
    /// order, then the file part last.
    fn into_form(
        self,
        bytes: Vec<u8>,
        filename: &str,
        mime_type: &str,
    ) -> Result<(String, String, reqwest::multipart::Form), UploadError> {
        let file_part = reqwest::multipart::Part::bytes(bytes)
            .file_name(filename.to_string())
            .mime_str(mime_type)
            .map_err(|e| UploadError::Transfer {
                status: None,
                body: e.to_string(),
            })?;

        let form = self
            .parameters
            .into_iter()
            .fold(reqwest::multipart::Form::new(), |form, (name, value)| {
                form.text(name, value)
            })
            .part("file", file_part);

        Ok((self.url, self.resource_url, form))
    }

    /// Pushes `bytes` to object storage and returns the resource URL.
    ///
    /// # Errors
    ///
    /// Returns [`UploadError::Transfer`] on a non-2xx response or a
    /// transport failure, with the response body when there is one.
    pub async fn transfer(
        self,
        client: &reqwest::Client,
        bytes: Vec<u8>,
        filename: &str,
        mime_type: &str,
    ) -> Result<String, UploadError> {
        let (url, resource_url, form) = self.into_form(bytes, filename, mime_type)?;

        let response = client
            .post(&url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| UploadError::Transfer {
                status: None,
                body: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(UploadError::Transfer {
                status: Some(status.as_u16()),
                body,
            });
        }

        Ok(resource_url)
    }
}

/// Requests a staged upload slot for one image.
///
/// # Errors
///
/// Returns [`UploadError::Staging`] on GraphQL failure, user errors, or when
/// no usable target comes back.
pub async fn create_upload_target(
    ctx: &ShopContext,
    filename: &str,
    mime_type: &str,
) -> Result<UploadTarget, UploadError> {
    let variables = json!({
        "input": [{
            "filename": filename,
            "mimeType": mime_type,
            "resource": "IMAGE",
            "httpMethod": "POST",
        }]
    });

    let payload = ctx
        .graphql()
        .mutate(STAGED_UPLOADS_CREATE, variables, "stagedUploadsCreate")
        .await
        .map_err(|e| UploadError::Staging(e.to_string()))?;

    let targets: Vec<StagedTargetPayload> = payload
        .get("stagedTargets")
        .cloned()
        .map(serde_json::from_value)
        .transpose()
        .map_err(|e| UploadError::Staging(format!("malformed staged target: {e}")))?
        .unwrap_or_default();

    targets
        .into_iter()
        .next()
        .and_then(UploadTarget::from_payload)
        .ok_or_else(|| UploadError::Staging("no staged upload target returned".to_string()))
}

/// Registers an uploaded object as a Shopify file and returns its GID.
///
/// # Errors
///
/// Returns [`UploadError::Registration`] on GraphQL failure, user errors, or
/// an empty file list.
pub async fn register_file(
    ctx: &ShopContext,
    resource_url: &str,
    filename: &str,
) -> Result<String, UploadError> {
    let variables = json!({
        "files": [{
            "originalSource": resource_url,
            "contentType": "IMAGE",
            "filename": filename,
        }]
    });

    let payload = ctx
        .graphql()
        .mutate(FILE_CREATE, variables, "fileCreate")
        .await
        .map_err(|e| match e {
            GraphqlError::UserErrors(message) => UploadError::Registration(message),
            other => UploadError::Registration(other.to_string()),
        })?;

    payload
        .pointer("/files/0/id")
        .and_then(|id| id.as_str())
        .map(str::to_string)
        .ok_or_else(|| UploadError::Registration("no file returned".to_string()))
}

async fn fetch_source(client: &reqwest::Client, url: &str) -> Result<Vec<u8>, UploadError> {
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| UploadError::Source(format!("{url}: {e}")))?;

    let status = response.status();
    if !status.is_success() {
        return Err(UploadError::Source(format!("{url}: responded {status}")));
    }

    let bytes = response
        .bytes()
        .await
        .map_err(|e| UploadError::Source(format!("{url}: {e}")))?;
    Ok(bytes.to_vec())
}

/// Uploads one image and registers it with Shopify.
///
/// Runs staging, transfer and registration once each, in that order. The
/// file is registered from the storage resource URL, never from the
/// original source. Nothing is retried here; a failed image is reported to
/// the caller, which decides whether to skip it.
///
/// # Errors
///
/// Returns the [`UploadError`] of the first step that failed.
pub async fn stage_and_register(
    ctx: &ShopContext,
    source: ImageSource,
    filename: &str,
    mime_type: &str,
) -> Result<FileAsset, UploadError> {
    let mut asset = FileAsset::new(source.url().map(str::to_string), filename, mime_type);

    let bytes = match source {
        ImageSource::Bytes(bytes) => bytes,
        ImageSource::Url(url) => fetch_source(ctx.external(), &url).await?,
    };

    let target = create_upload_target(ctx, filename, mime_type).await?;
    tracing::debug!(filename, target = target.url(), "staged upload target granted");

    let resource_url = target
        .transfer(ctx.external(), bytes, filename, mime_type)
        .await?;

    let file_id = register_file(ctx, &resource_url, filename).await?;
    tracing::info!(filename, file_id = %file_id, "file registered");

    asset.resource_url = Some(resource_url);
    asset.file_id = Some(file_id);
    asset.advance(FileStatus::Registered);
    Ok(asset)
}
