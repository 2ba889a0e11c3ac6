//! GraphQL client for the Admin API.

use std::sync::Arc;

use serde::Deserialize;
use serde_json::{json, Value};

use crate::auth::Session;
use crate::clients::graphql::GraphqlError;
use crate::clients::{DataType, HttpClient, HttpMethod, HttpRequest, HttpResponse, Throttle};
use crate::config::{ApiVersion, ProvisionConfig};

/// A `userErrors` entry from a mutation payload.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
pub struct UserError {
    /// Path to the offending input field.
    #[serde(default)]
    pub field: Option<Vec<String>>,
    /// Human-readable reason.
    pub message: String,
}

/// Formats user errors as `field.path: message`, joined by `"; "`.
///
/// # Example
///
/// ```rust
/// use shopify_provision::clients::{format_user_errors, UserError};
///
/// let errors = vec![UserError {
///     field: Some(vec!["media".to_string(), "0".to_string()]),
///     message: "Image URL is invalid".to_string(),
/// }];
/// assert_eq!(format_user_errors(&errors), "media.0: Image URL is invalid");
/// ```
#[must_use]
pub fn format_user_errors(errors: &[UserError]) -> String {
    errors
        .iter()
        .map(|e| {
            let field = e.field.as_ref().map_or_else(String::new, |f| f.join("."));
            format!("{}: {}", field, e.message)
        })
        .collect::<Vec<_>>()
        .join("; ")
}

/// Converts a REST numeric id into a GraphQL global id.
///
/// Values that already are global ids are returned unchanged.
///
/// ```rust
/// use shopify_provision::clients::to_gid;
///
/// assert_eq!(to_gid("Product", "42"), "gid://shopify/Product/42");
/// assert_eq!(to_gid("Product", "gid://shopify/Product/42"), "gid://shopify/Product/42");
/// ```
#[must_use]
pub fn to_gid(resource: &str, id: &str) -> String {
    if id.starts_with("gid://") {
        id.to_string()
    } else {
        format!("gid://shopify/{resource}/{id}")
    }
}

#[derive(Deserialize)]
struct TopLevelError {
    message: String,
}

/// GraphQL client bound to one shop and API version.
///
/// Requests go to `/admin/api/{version}/graphql.json` as
/// `{"query": ..., "variables": ...}`.
#[derive(Debug)]
pub struct GraphqlClient {
    http_client: HttpClient,
    api_version: ApiVersion,
    tries: u32,
}

// Verify GraphqlClient is Send + Sync at compile time
const _: fn() = || {
    const fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<GraphqlClient>();
};

impl GraphqlClient {
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

    /// Executes a query and returns the raw response.
    ///
    /// GraphQL-level errors arrive with HTTP 200 and are left in the body.
    ///
    /// # Errors
    ///
    /// Returns [`GraphqlError::Http`] for transport failures and non-2xx
    /// responses.
    pub async fn query(
        &self,
        query: &str,
        variables: Option<Value>,
    ) -> Result<HttpResponse, GraphqlError> {
        let body = json!({
            "query": query,
            "variables": variables.unwrap_or(Value::Null),
        });

        let request = HttpRequest::builder(HttpMethod::Post, "graphql.json")
            .body(body)
            .body_type(DataType::Json)
            .tries(self.tries)
            .build()
            .map_err(crate::clients::HttpError::from)?;

        Ok(self.http_client.request(request).await?)
    }

    /// Executes a query and returns `data`.
    ///
    /// # Errors
    ///
    /// Returns [`GraphqlError::Query`] if the response carries top-level
    /// `errors`, or [`GraphqlError::Http`] for transport failures.
    pub async fn data(&self, query: &str, variables: Option<Value>) -> Result<Value, GraphqlError> {
        let response = self.query(query, variables).await?;
        check_top_level_errors(&response.body)?;
        Ok(response.body.get("data").cloned().unwrap_or(Value::Null))
    }

    /// Executes a mutation and returns the payload under `data.{payload_key}`.
    ///
    /// # Errors
    ///
    /// Returns [`GraphqlError::UserErrors`] when the payload lists
    /// `userErrors`, [`GraphqlError::MissingPayload`] when the payload is
    /// null, and the errors of [`GraphqlClient::data`].
    pub async fn mutate(
        &self,
        mutation: &str,
        variables: Value,
        payload_key: &str,
    ) -> Result<Value, GraphqlError> {
        let data = self.data(mutation, Some(variables)).await?;
        let payload = data
            .get(payload_key)
            .filter(|p| !p.is_null())
            .cloned()
            .ok_or_else(|| GraphqlError::MissingPayload(payload_key.to_string()))?;

        let user_errors: Vec<UserError> = payload
            .get("userErrors")
            .cloned()
            .map(serde_json::from_value)
            .transpose()
            .ok()
            .flatten()
            .unwrap_or_default();
        if !user_errors.is_empty() {
            return Err(GraphqlError::UserErrors(format_user_errors(&user_errors)));
        }

        Ok(payload)
    }
}

fn check_top_level_errors(body: &Value) -> Result<(), GraphqlError> {
    let Some(errors) = body.get("errors") else {
        return Ok(());
    };
    let messages: Vec<String> = serde_json::from_value::<Vec<TopLevelError>>(errors.clone())
        .map(|errors| errors.into_iter().map(|e| e.message).collect())
        .unwrap_or_else(|_| vec![errors.to_string()]);
    if messages.is_empty() {
        Ok(())
    } else {
        Err(GraphqlError::Query(messages))
    }
}
