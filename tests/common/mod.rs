//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use std::time::Duration;

use serde_json::{json, Value};
use shopify_provision::clients::ThrottleSettings;
use shopify_provision::{
    AccessToken, HostUrl, PollPolicy, ProvisionConfig, Session, ShopContext, ShopDomain,
};
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockBuilder, MockServer, ResponseTemplate};

pub const API: &str = "/admin/api/2025-10";

pub fn session() -> Session {
    Session::new(
        ShopDomain::new("test-shop").unwrap(),
        AccessToken::new("shpat_test").unwrap(),
        None,
    )
}

/// Config pointed at the mock server, with short polling and no throttle.
pub fn config(server: &MockServer) -> ProvisionConfig {
    ProvisionConfig::builder()
        .api_base_url(HostUrl::new(server.uri()).unwrap())
        .throttle(ThrottleSettings::unlimited())
        .cdn_poll(PollPolicy::attempts(Duration::from_millis(10), 3))
        .theme_ready(PollPolicy::timeout(
            Duration::from_millis(20),
            Duration::from_millis(500),
        ))
        .publish_poll(PollPolicy::attempts(Duration::from_millis(10), 20))
        .build()
        .unwrap()
}

pub fn context(server: &MockServer) -> ShopContext {
    ShopContext::new(session(), config(server))
}

/// Matches a GraphQL request whose body mentions `operation`.
pub fn graphql(operation: &str) -> MockBuilder {
    Mock::given(method("POST"))
        .and(path(format!("{API}/graphql.json")))
        .and(body_string_contains(operation))
}

pub fn rest(http_method: &str, resource: &str) -> MockBuilder {
    Mock::given(method(http_method)).and(path(format!("{API}/{resource}")))
}

pub fn json_response(body: Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(body)
}

pub fn theme_json(id: u64, role: &str, processing: bool) -> Value {
    json!({
        "theme": {
            "id": id,
            "name": "Dawn",
            "role": role,
            "processing": processing,
            "previewable": !processing
        }
    })
}

/// Mounts the three remote calls of a successful staged upload for
/// `filename`, with storage living under `/storage/upload`.
pub async fn mount_staged_upload(server: &MockServer, filename: &str, file_id: &str) {
    graphql("stagedUploadsCreate")
        .and(body_string_contains(filename))
        .respond_with(json_response(json!({
            "data": {"stagedUploadsCreate": {
                "stagedTargets": [{
                    "url": format!("{}/storage/upload", server.uri()),
                    "resourceUrl": format!("https://storage.test/tmp/{filename}"),
                    "parameters": [
                        {"name": "key", "value": format!("tmp/{filename}")},
                        {"name": "Content-Type", "value": "image/jpeg"},
                        {"name": "policy", "value": "cG9saWN5"}
                    ]
                }],
                "userErrors": []
            }}
        })))
        .mount(server)
        .await;

    Mock::given(method("POST"))
        .and(path("/storage/upload"))
        .and(body_string_contains(filename))
        .respond_with(ResponseTemplate::new(201))
        .mount(server)
        .await;

    graphql("fileCreate")
        .and(body_string_contains(format!(
            "\"originalSource\":\"https://storage.test/tmp/{filename}\""
        )))
        .respond_with(json_response(json!({
            "data": {"fileCreate": {
                "files": [{"id": file_id, "fileStatus": "UPLOADED"}],
                "userErrors": []
            }}
        })))
        .mount(server)
        .await;
}

/// Mounts a file lookup that immediately finds `filename` at `cdn_url`.
pub async fn mount_cdn_ready(server: &MockServer, filename: &str, cdn_url: &str) {
    graphql("filesByName")
        .and(body_string_contains(format!("filename:{filename}")))
        .respond_with(json_response(json!({
            "data": {"files": {"nodes": [
                {"id": "gid://shopify/MediaImage/1", "fileStatus": "READY", "image": {"url": cdn_url}}
            ]}}
        })))
        .mount(server)
        .await;
}

/// Mounts a source image download at `/images/{filename}`.
pub async fn mount_source_image(server: &MockServer, filename: &str) -> String {
    Mock::given(method("GET"))
        .and(path(format!("/images/{filename}")))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"fake-jpeg-bytes".to_vec()))
        .mount(server)
        .await;
    format!("{}/images/{filename}", server.uri())
}
