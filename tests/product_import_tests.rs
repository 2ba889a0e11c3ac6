//! Integration tests for mapping rows into products and importing them.

mod common;

use common::{
    context, graphql, json_response, mount_cdn_ready, mount_source_image, mount_staged_upload,
    rest,
};
use serde_json::json;
use shopify_provision::files::CdnResolver;
use shopify_provision::products::{import_product, map_rows, ImportError};
use shopify_provision::{FlatRow, ProductDraft};
use wiremock::matchers::{body_json, body_string_contains};
use wiremock::{MockServer, ResponseTemplate};

fn tee_rows(image: Option<&str>) -> Vec<FlatRow> {
    let image = image.unwrap_or("");
    vec![
        FlatRow::from_pairs([
            ("Handle", "tee"),
            ("Title", "Classic Tee"),
            ("Option1 Name", "Size"),
            ("Option1 Value", "S"),
            ("Variant SKU", "TEE-S"),
            ("Variant Price", "19.90"),
            ("Image Src", image),
        ]),
        FlatRow::from_pairs([
            ("Handle", "tee"),
            ("Title", ""),
            ("Option1 Name", ""),
            ("Option1 Value", "M"),
            ("Variant SKU", "TEE-M"),
            ("Variant Price", ""),
            ("Image Src", ""),
        ]),
    ]
}

fn single_draft(rows: &[FlatRow]) -> ProductDraft {
    let mut drafts = map_rows(rows);
    assert_eq!(drafts.len(), 1);
    drafts.remove(0)
}

fn created_tee() -> serde_json::Value {
    json!({
        "product": {
            "id": 10,
            "handle": "tee",
            "variants": [
                {"id": 100, "sku": "TEE-S", "option1": "S"},
                {"id": 101, "sku": "TEE-M", "option1": "M"}
            ]
        }
    })
}

#[tokio::test]
async fn test_new_handle_creates_product_with_variants() {
    let server = MockServer::start().await;
    rest("GET", "products.json")
        .respond_with(json_response(json!({"products": []})))
        .mount(&server)
        .await;
    rest("POST", "products.json")
        .and(body_string_contains("\"handle\":\"tee\""))
        .and(body_string_contains("\"sku\":\"TEE-M\""))
        .respond_with(ResponseTemplate::new(201).set_body_json(created_tee()))
        .expect(1)
        .mount(&server)
        .await;

    let ctx = context(&server);
    let draft = single_draft(&tee_rows(None));
    let outcome = import_product(&ctx, &draft, &CdnResolver::new())
        .await
        .unwrap();

    assert!(outcome.created);
    assert_eq!(outcome.product_id, 10);
    assert_eq!(outcome.variants_created, 2);
    assert!(outcome.failures.is_empty());
}

#[tokio::test]
async fn test_existing_handle_updates_and_upserts_variants() {
    let server = MockServer::start().await;
    rest("GET", "products.json")
        .respond_with(json_response(json!({
            "products": [{
                "id": 10,
                "handle": "tee",
                "variants": [{"id": 100, "sku": "TEE-S", "option1": "S"}]
            }]
        })))
        .mount(&server)
        .await;
    rest("POST", "products.json")
        .respond_with(ResponseTemplate::new(201).set_body_json(created_tee()))
        .expect(0)
        .mount(&server)
        .await;
    rest("PUT", "products/10.json")
        .and(body_string_contains("\"title\":\"Classic Tee\""))
        .respond_with(json_response(created_tee()))
        .expect(1)
        .mount(&server)
        .await;
    rest("PUT", "variants/100.json")
        .and(body_string_contains("\"id\":100"))
        .respond_with(json_response(json!({"variant": {"id": 100}})))
        .expect(1)
        .mount(&server)
        .await;
    rest("POST", "products/10/variants.json")
        .and(body_string_contains("\"sku\":\"TEE-M\""))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"variant": {"id": 101}})))
        .expect(1)
        .mount(&server)
        .await;

    let ctx = context(&server);
    let draft = single_draft(&tee_rows(None));
    let outcome = import_product(&ctx, &draft, &CdnResolver::new())
        .await
        .unwrap();

    assert!(!outcome.created);
    assert_eq!(outcome.product_id, 10);
    assert_eq!(outcome.variants_updated, 1);
    assert_eq!(outcome.variants_created, 1);
    assert!(outcome.failures.is_empty());
}

#[tokio::test]
async fn test_importing_twice_creates_one_product() {
    let server = MockServer::start().await;
    rest("GET", "products.json")
        .respond_with(json_response(json!({"products": []})))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    rest("GET", "products.json")
        .respond_with(json_response(json!({"products": [created_tee()["product"]]})))
        .mount(&server)
        .await;
    rest("POST", "products.json")
        .respond_with(ResponseTemplate::new(201).set_body_json(created_tee()))
        .expect(1)
        .mount(&server)
        .await;
    rest("PUT", "products/10.json")
        .respond_with(json_response(created_tee()))
        .expect(1)
        .mount(&server)
        .await;
    rest("PUT", "variants/100.json")
        .respond_with(json_response(json!({"variant": {"id": 100}})))
        .expect(1)
        .mount(&server)
        .await;
    rest("PUT", "variants/101.json")
        .respond_with(json_response(json!({"variant": {"id": 101}})))
        .expect(1)
        .mount(&server)
        .await;

    let ctx = context(&server);
    let resolver = CdnResolver::new();
    let draft = single_draft(&tee_rows(None));

    let first = import_product(&ctx, &draft, &resolver).await.unwrap();
    let second = import_product(&ctx, &draft, &resolver).await.unwrap();

    assert!(first.created);
    assert!(!second.created);
    assert_eq!(first.product_id, second.product_id);
    assert_eq!(second.variants_updated, 2);
    assert_eq!(second.variants_created, 0);
}

#[tokio::test]
async fn test_broken_image_does_not_abort_import() {
    let server = MockServer::start().await;
    rest("GET", "products.json")
        .respond_with(json_response(json!({"products": []})))
        .mount(&server)
        .await;
    rest("POST", "products.json")
        .respond_with(ResponseTemplate::new(201).set_body_json(created_tee()))
        .mount(&server)
        .await;

    let front = mount_source_image(&server, "front.jpg").await;
    mount_staged_upload(&server, "front.jpg", "gid://shopify/MediaImage/1").await;
    mount_cdn_ready(&server, "front.jpg", "https://cdn.shopify.com/s/files/front.jpg").await;
    graphql("productCreateMedia")
        .and(body_string_contains("https://cdn.shopify.com/s/files/front.jpg"))
        .respond_with(json_response(json!({
            "data": {"productCreateMedia": {
                "media": [{"id": "gid://shopify/MediaImage/9", "alt": "", "mediaContentType": "IMAGE", "status": "UPLOADED"}],
                "mediaUserErrors": []
            }}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let missing = format!("{}/images/missing.jpg", server.uri());
    let mut rows = tee_rows(Some(&front));
    rows.push(FlatRow::from_pairs([
        ("Handle", "tee"),
        ("Image Src", missing.as_str()),
    ]));

    let ctx = context(&server);
    let draft = single_draft(&rows);
    assert_eq!(draft.images.len(), 2);

    let outcome = import_product(&ctx, &draft, &CdnResolver::new())
        .await
        .unwrap();

    assert!(outcome.created);
    assert_eq!(outcome.images_attached, 1);
    assert_eq!(outcome.failures.len(), 1);
    assert!(outcome.failures[0].contains("missing.jpg"));
}

#[tokio::test]
async fn test_variant_image_is_attached_to_matching_variant() {
    let server = MockServer::start().await;
    rest("GET", "products.json")
        .respond_with(json_response(json!({"products": []})))
        .mount(&server)
        .await;
    rest("POST", "products.json")
        .respond_with(ResponseTemplate::new(201).set_body_json(created_tee()))
        .mount(&server)
        .await;

    let red = mount_source_image(&server, "red.jpg").await;
    mount_staged_upload(&server, "red.jpg", "gid://shopify/MediaImage/2").await;
    mount_cdn_ready(&server, "red.jpg", "https://cdn.shopify.com/s/files/red.jpg").await;
    graphql("productVariantsBulkUpdate")
        .and(body_string_contains("gid://shopify/ProductVariant/101"))
        .and(body_string_contains("gid://shopify/Product/10\""))
        .respond_with(json_response(json!({
            "data": {"productVariantsBulkUpdate": {
                "productVariants": [{"id": "gid://shopify/ProductVariant/101", "media": {"nodes": []}}],
                "userErrors": []
            }}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let mut rows = tee_rows(None);
    rows[1] = FlatRow::from_pairs([
        ("Handle", "tee"),
        ("Option1 Value", "M"),
        ("Variant SKU", "TEE-M"),
        ("Variant Image", red.as_str()),
    ]);

    let ctx = context(&server);
    let draft = single_draft(&rows);
    let outcome = import_product(&ctx, &draft, &CdnResolver::new())
        .await
        .unwrap();

    assert_eq!(outcome.variant_images_attached, 1);
    assert_eq!(outcome.images_attached, 0);
    assert!(outcome.failures.is_empty(), "{:?}", outcome.failures);
}

#[tokio::test]
async fn test_rejected_create_is_an_error() {
    let server = MockServer::start().await;
    rest("GET", "products.json")
        .respond_with(json_response(json!({"products": []})))
        .mount(&server)
        .await;
    rest("POST", "products.json")
        .and(body_json(json!({
            "product": {
                "title": "Classic Tee",
                "handle": "tee",
                "options": [{"name": "Size"}],
                "variants": [
                    {"option1": "S", "price": "19.90", "sku": "TEE-S"},
                    {"option1": "M", "price": "19.90", "sku": "TEE-M"}
                ]
            }
        })))
        .respond_with(
            ResponseTemplate::new(422).set_body_json(json!({"errors": {"title": ["can't be blank"]}})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let ctx = context(&server);
    let draft = single_draft(&tee_rows(None));
    let error = import_product(&ctx, &draft, &CdnResolver::new())
        .await
        .unwrap_err();

    match error {
        ImportError::Request { handle, action, .. } => {
            assert_eq!(handle, "tee");
            assert_eq!(action, "create");
        }
        other => panic!("expected request error, got {other:?}"),
    }
}
