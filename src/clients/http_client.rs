//! Authenticated HTTP client for the Admin API.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use crate::auth::Session;
use crate::clients::errors::{HttpError, HttpResponseError, MaxHttpRetriesExceededError};
use crate::clients::http_request::{HttpMethod, HttpRequest};
use crate::clients::http_response::{ApiCallLimit, HttpResponse};
use crate::clients::throttle::Throttle;
use crate::config::ProvisionConfig;

/// Fixed retry wait time in seconds when no `Retry-After` is given.
pub const RETRY_WAIT_TIME: u64 = 1;

/// Crate version from Cargo.toml.
pub const SDK_VERSION: &str = env!("CARGO_PKG_VERSION");

/// HTTP client bound to one shop session.
///
/// The client handles:
/// - base URI construction from the session shop or the configured override
/// - the access token and user agent headers
/// - throttling every attempt through a shared [`Throttle`]
/// - retries for 429 and 500 responses
///
/// # Example
///
/// ```rust,ignore
/// use shopify_provision::clients::{HttpClient, HttpMethod, HttpRequest};
///
/// let client = HttpClient::new("/admin/api/2025-10", &session, None);
/// let request = HttpRequest::builder(HttpMethod::Get, "themes.json").build()?;
/// let response = client.request(request).await?;
/// ```
#[derive(Debug)]
pub struct HttpClient {
    client: reqwest::Client,
    base_uri: String,
    base_path: String,
    default_headers: HashMap<String, String>,
    throttle: Arc<Throttle>,
}

// Verify HttpClient is Send + Sync at compile time
const _: fn() = || {
    const fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<HttpClient>();
};

impl HttpClient {
    /// Creates a client with its own throttle built from `config`.
    ///
    /// # Panics
    ///
    /// Panics if the underlying reqwest client cannot be created (TLS
    /// initialization failure).
    #[must_use]
    pub fn new(
        base_path: impl Into<String>,
        session: &Session,
        config: Option<&ProvisionConfig>,
    ) -> Self {
        let settings = config.map(ProvisionConfig::throttle).unwrap_or_default();
        Self::with_throttle(base_path, session, config, Arc::new(Throttle::new(settings)))
    }

    /// Creates a client that shares `throttle` with other clients.
    ///
    /// # Panics
    ///
    /// Panics if the underlying reqwest client cannot be created (TLS
    /// initialization failure).
    #[must_use]
    pub fn with_throttle(
        base_path: impl Into<String>,
        session: &Session,
        config: Option<&ProvisionConfig>,
        throttle: Arc<Throttle>,
    ) -> Self {
        let base_uri = config
            .and_then(ProvisionConfig::api_base_url)
            .map_or_else(
                || format!("https://{}", session.shop),
                |url| url.origin().to_string(),
            );

        let user_agent_prefix = config
            .and_then(ProvisionConfig::user_agent_prefix)
            .map_or(String::new(), |prefix| format!("{prefix} | "));
        let user_agent = format!("{user_agent_prefix}Shopify Provision v{SDK_VERSION}");

        let mut default_headers = HashMap::new();
        default_headers.insert("User-Agent".to_string(), user_agent);
        default_headers.insert("Accept".to_string(), "application/json".to_string());
        default_headers.insert(
            "X-Shopify-Access-Token".to_string(),
            session.access_token.as_ref().to_string(),
        );

        let client = reqwest::Client::builder()
            .use_rustls_tls()
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            base_uri,
            base_path: base_path.into(),
            default_headers,
            throttle,
        }
    }

    /// Returns the base URI for this client.
    #[must_use]
    pub fn base_uri(&self) -> &str {
        &self.base_uri
    }

    /// Returns the base path for this client.
    #[must_use]
    pub fn base_path(&self) -> &str {
        &self.base_path
    }

    /// Returns the default headers for this client.
    #[must_use]
    pub const fn default_headers(&self) -> &HashMap<String, String> {
        &self.default_headers
    }

    /// Sends a request, retrying 429 and 500 responses up to `request.tries`.
    ///
    /// # Errors
    ///
    /// Returns [`HttpError`] if validation fails, the network fails, a
    /// non-2xx response is received or the retry budget is exhausted.
    pub async fn request(&self, request: HttpRequest) -> Result<HttpResponse, HttpError> {
        request.verify()?;

        let url = format!("{}{}/{}", self.base_uri, self.base_path, request.path);

        let mut tries: u32 = 0;
        loop {
            tries += 1;
            self.throttle.until_ready().await;

            let mut req_builder = match request.http_method {
                HttpMethod::Get => self.client.get(&url),
                HttpMethod::Post => self.client.post(&url),
                HttpMethod::Put => self.client.put(&url),
            };
            for (key, value) in &self.default_headers {
                req_builder = req_builder.header(key, value);
            }
            if let Some(body_type) = &request.body_type {
                req_builder = req_builder.header("Content-Type", body_type.as_content_type());
            }
            if let Some(query) = &request.query {
                req_builder = req_builder.query(query);
            }
            if let Some(body) = &request.body {
                req_builder = req_builder.body(body.to_string());
            }

            tracing::debug!(method = %request.http_method, path = %request.path, attempt = tries, "admin api request");
            let res = req_builder.send().await?;

            let code = res.status().as_u16();
            let res_headers = Self::parse_response_headers(res.headers());
            let body_text = res.text().await.unwrap_or_default();
            let body = if body_text.is_empty() {
                serde_json::json!({})
            } else {
                serde_json::from_str(&body_text).unwrap_or_else(|_| {
                    if code >= 400 {
                        serde_json::json!({ "raw_body": body_text })
                    } else {
                        serde_json::json!({})
                    }
                })
            };

            let response = HttpResponse::new(code, res_headers, body);

            if let Some(reason) = response.deprecation_reason() {
                tracing::warn!(
                    "Deprecated request to Shopify API at {}, received reason: {}",
                    request.path,
                    reason
                );
            }

            if let Some(limit) = response.api_call_limit.filter(ApiCallLimit::is_near_capacity) {
                tracing::debug!(
                    used = limit.request_count,
                    size = limit.bucket_size,
                    "admin api bucket nearly full"
                );
            }

            if response.is_ok() {
                return Ok(response);
            }

            let error_message = Self::serialize_error(&response);
            let error_reference = response.request_id().map(String::from);

            if code != 429 && code != 500 {
                return Err(HttpError::Response(HttpResponseError {
                    code,
                    message: error_message,
                    error_reference,
                }));
            }

            if tries >= request.tries {
                if request.tries == 1 {
                    return Err(HttpError::Response(HttpResponseError {
                        code,
                        message: error_message,
                        error_reference,
                    }));
                }
                return Err(HttpError::MaxRetries(MaxHttpRetriesExceededError {
                    code,
                    tries: request.tries,
                    message: error_message,
                    error_reference,
                }));
            }

            let delay = Self::calculate_retry_delay(&response, code);
            tracing::warn!(
                status = code,
                attempt = tries,
                delay_ms = delay.as_millis(),
                path = %request.path,
                "retrying admin api request"
            );
            tokio::time::sleep(delay).await;
        }
    }

    fn parse_response_headers(
        headers: &reqwest::header::HeaderMap,
    ) -> HashMap<String, Vec<String>> {
        let mut result: HashMap<String, Vec<String>> = HashMap::new();
        for (name, value) in headers {
            let key = name.as_str().to_lowercase();
            let value = value.to_str().unwrap_or_default().to_string();
            result.entry(key).or_default().push(value);
        }
        result
    }

    // 429 honours Retry-After; 500 always uses the fixed delay.
    fn calculate_retry_delay(response: &HttpResponse, status: u16) -> Duration {
        if status == 429 {
            if let Some(retry_after) = response.retry_request_after {
                return Duration::from_secs_f64(retry_after.max(0.0));
            }
        }
        Duration::from_secs(RETRY_WAIT_TIME)
    }

    fn serialize_error(response: &HttpResponse) -> String {
        let mut error_body = serde_json::Map::new();

        for key in ["errors", "error", "error_description", "raw_body"] {
            if let Some(value) = response.body.get(key) {
                error_body.insert(key.to_string(), value.clone());
            }
        }

        if let Some(request_id) = response.request_id() {
            error_body.insert(
                "error_reference".to_string(),
                serde_json::json!(format!(
                    "If you report this error, please include this id: {request_id}."
                )),
            );
        }

        serde_json::to_string(&error_body).unwrap_or_else(|_| "{}".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::{DataType, ThrottleSettings};
    use crate::config::{AccessToken, HostUrl, ShopDomain};
    use serde_json::json;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn create_test_session() -> Session {
        Session::new(
            ShopDomain::new("test-shop").unwrap(),
            AccessToken::new("test-access-token").unwrap(),
            None,
        )
    }

    fn mock_config(server: &MockServer) -> ProvisionConfig {
        ProvisionConfig::builder()
            .api_base_url(HostUrl::new(server.uri()).unwrap())
            .throttle(ThrottleSettings::unlimited())
            .build()
            .unwrap()
    }

    #[test]
    fn test_base_uri_defaults_to_shop_domain() {
        let client = HttpClient::new("/admin/api/2025-10", &create_test_session(), None);
        assert_eq!(client.base_uri(), "https://test-shop.myshopify.com");
        assert_eq!(client.base_path(), "/admin/api/2025-10");
    }

    #[test]
    fn test_access_token_and_user_agent_headers() {
        let config = ProvisionConfig::builder()
            .user_agent_prefix("Installer/1.0")
            .build()
            .unwrap();
        let client = HttpClient::new("/admin/api/2025-10", &create_test_session(), Some(&config));

        let headers = client.default_headers();
        assert_eq!(
            headers.get("X-Shopify-Access-Token").map(String::as_str),
            Some("test-access-token")
        );
        let user_agent = headers.get("User-Agent").unwrap();
        assert!(user_agent.starts_with("Installer/1.0 | Shopify Provision v"));
    }

    #[tokio::test]
    async fn test_non_retryable_error_returns_immediately() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/admin/api/2025-10/themes/1.json"))
            .respond_with(
                ResponseTemplate::new(422)
                    .insert_header("x-request-id", "req-9")
                    .set_body_json(json!({"errors": {"role": ["cannot be changed"]}})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let config = mock_config(&server);
        let client = HttpClient::new("/admin/api/2025-10", &create_test_session(), Some(&config));
        let request = HttpRequest::builder(HttpMethod::Put, "themes/1.json")
            .body(json!({"theme": {"role": "main"}}))
            .body_type(DataType::Json)
            .tries(3)
            .build()
            .unwrap();

        match client.request(request).await {
            Err(HttpError::Response(e)) => {
                assert_eq!(e.code, 422);
                assert!(e.message.contains("cannot be changed"));
                assert_eq!(e.error_reference.as_deref(), Some("req-9"));
            }
            other => panic!("expected response error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_throttled_request_is_retried_with_retry_after() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/admin/api/2025-10/themes/1.json"))
            .and(header("X-Shopify-Access-Token", "test-access-token"))
            .respond_with(ResponseTemplate::new(429).insert_header("retry-after", "0.01"))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/admin/api/2025-10/themes/1.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"theme": {"id": 1}})))
            .mount(&server)
            .await;

        let config = mock_config(&server);
        let client = HttpClient::new("/admin/api/2025-10", &create_test_session(), Some(&config));
        let request = HttpRequest::builder(HttpMethod::Get, "themes/1.json")
            .tries(2)
            .build()
            .unwrap();

        let response = client.request(request).await.unwrap();
        assert_eq!(response.body["theme"]["id"], 1);
        assert_eq!(server.received_requests().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_retry_budget_exhaustion_reports_max_retries() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(429).insert_header("retry-after", "0"))
            .expect(2)
            .mount(&server)
            .await;

        let config = mock_config(&server);
        let client = HttpClient::new("/admin/api/2025-10", &create_test_session(), Some(&config));
        let request = HttpRequest::builder(HttpMethod::Get, "themes.json")
            .tries(2)
            .build()
            .unwrap();

        let result = client.request(request).await;
        assert!(matches!(
            result,
            Err(HttpError::MaxRetries(MaxHttpRetriesExceededError { tries: 2, .. }))
        ));
    }
}
