//! HTTP clients for the Shopify Admin API.
//!
//! - [`HttpClient`]: authenticated transport with retries and throttling
//! - [`RestClient`]: REST resources (themes, products, variants)
//! - [`GraphqlClient`]: GraphQL operations (staged uploads, files, media)
//! - [`Throttle`]: the rate limiter shared by every client of a run
//!
//! All clients built from the same [`ShopContext`](crate::ShopContext) share
//! one [`Throttle`], so REST and GraphQL calls are spaced together.

mod errors;
pub mod graphql;
mod http_client;
mod http_request;
mod http_response;
pub mod rest;
mod throttle;

pub use errors::{
    HttpError, HttpResponseError, InvalidHttpRequestError, MaxHttpRetriesExceededError,
};
pub use http_client::{HttpClient, SDK_VERSION};
pub use http_request::{DataType, HttpMethod, HttpRequest, HttpRequestBuilder};
pub use http_response::{ApiCallLimit, HttpResponse};
pub use throttle::{Throttle, ThrottleSettings};

pub use rest::{RestClient, RestError};

pub use graphql::{format_user_errors, to_gid, GraphqlClient, GraphqlError, UserError};
