//! REST client for the Admin API.

use std::sync::Arc;

use crate::auth::Session;
use crate::clients::rest::RestError;
use crate::clients::{DataType, HttpClient, HttpMethod, HttpRequest, HttpResponse, Throttle};
use crate::config::{ApiVersion, ProvisionConfig};

/// REST client bound to one shop and API version.
///
/// Paths are given relative to `/admin/api/{version}/` with or without the
/// `.json` suffix: `"themes"`, `"themes.json"` and `"/themes.json"` are the
/// same resource.
///
/// # Example
///
/// ```rust,ignore
/// let client = RestClient::new(&session, Some(&config));
/// let response = client.get("products", &[("handle", "linen-shirt")]).await?;
/// ```
#[derive(Debug)]
pub struct RestClient {
    http_client: HttpClient,
    api_version: ApiVersion,
    tries: u32,
}

// Verify RestClient is Send + Sync at compile time
const _: fn() = || {
    const fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<RestClient>();
};

impl RestClient {
    /// Creates a client with its own throttle.
    #[must_use]
    pub fn new(session: &Session, config: Option<&ProvisionConfig>) -> Self {
        let settings = config.map(ProvisionConfig::throttle).unwrap_or_default();
        Self::with_throttle(session, config, Arc::new(Throttle::new(settings)))
    }

    /// Creates a client sharing `throttle` with the other clients of a run.
    #[must_use]
    pub fn with_throttle(
        session: &Session,
        config: Option<&ProvisionConfig>,
        throttle: Arc<Throttle>,
    ) -> Self {
        let defaults = ProvisionConfig::default();
        let config_ref = config.unwrap_or(&defaults);
        let api_version = config_ref.api_version().clone();
        let base_path = format!("/admin/api/{api_version}");

        Self {
            http_client: HttpClient::with_throttle(base_path, session, config, throttle),
            api_version,
            tries: config_ref.request_tries(),
        }
    }

    /// Returns the API version used by this client.
    #[must_use]
    pub const fn api_version(&self) -> &ApiVersion {
        &self.api_version
    }

    /// Sends a GET request.
    ///
    /// # Errors
    ///
    /// Returns [`RestError::InvalidPath`] for an empty path, or
    /// [`RestError::Http`] for transport failures and non-2xx responses.
    pub async fn get(&self, path: &str, query: &[(&str, &str)]) -> Result<HttpResponse, RestError> {
        self.make_request(HttpMethod::Get, path, None, query).await
    }

    /// Sends a POST request with a JSON body.
    ///
    /// # Errors
    ///
    /// See [`RestClient::get`].
    pub async fn post(
        &self,
        path: &str,
        body: serde_json::Value,
    ) -> Result<HttpResponse, RestError> {
        self.make_request(HttpMethod::Post, path, Some(body), &[])
            .await
    }

    /// Sends a PUT request with a JSON body.
    ///
    /// # Errors
    ///
    /// See [`RestClient::get`].
    pub async fn put(&self, path: &str, body: serde_json::Value) -> Result<HttpResponse, RestError> {
        self.make_request(HttpMethod::Put, path, Some(body), &[])
            .await
    }

    async fn make_request(
        &self,
        method: HttpMethod,
        path: &str,
        body: Option<serde_json::Value>,
        query: &[(&str, &str)],
    ) -> Result<HttpResponse, RestError> {
        let normalized_path = normalize_path(path)?;

        let mut builder = HttpRequest::builder(method, normalized_path).tries(self.tries);
        if let Some(body) = body {
            builder = builder.body(body).body_type(DataType::Json);
        }
        for (key, value) in query {
            builder = builder.query_param(*key, *value);
        }

        let request = builder.build().map_err(crate::clients::HttpError::from)?;
        Ok(self.http_client.request(request).await?)
    }
}

fn normalize_path(path: &str) -> Result<String, RestError> {
    let path = path.trim_start_matches('/');
    let path = path.strip_suffix(".json").unwrap_or(path);

    if path.is_empty() {
        return Err(RestError::InvalidPath {
            path: String::new(),
        });
    }

    Ok(format!("{path}.json"))
}
