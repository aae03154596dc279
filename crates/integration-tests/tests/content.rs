//! Integration tests for pages, translations, shipping options and payment
//! gateways.
//!
//! Require a running API server and an admin account in
//! `TEST_ADMIN_EMAIL` / `TEST_ADMIN_PASSWORD`.

use olfong_integration_tests::{TestClient, admin, expect_status, unique};
use reqwest::StatusCode;
use serde_json::json;

#[tokio::test]
#[ignore = "Requires running API server and database"]
async fn test_page_visibility() {
    let admin = admin().await;
    let slug = unique("um-okkur");

    let body = expect_status(
        admin
            .post(
                "/api/pages",
                &json!({
                    "title": "About us",
                    "titleIs": "Um okkur",
                    "slug": slug,
                    "content": "<p>Hello</p>",
                    "contentIs": "<p>Halló</p>",
                    "status": "PUBLISHED"
                }),
            )
            .await,
        StatusCode::CREATED,
    )
    .await;
    let id = body["data"]["id"].as_i64().unwrap();

    let public = TestClient::anonymous();
    expect_status(public.get(&format!("/api/pages/slug/{slug}")).await, StatusCode::OK).await;

    expect_status(
        admin
            .patch(&format!("/api/pages/{id}/toggle-visibility"))
            .await,
        StatusCode::OK,
    )
    .await;
    expect_status(
        public.get(&format!("/api/pages/slug/{slug}")).await,
        StatusCode::NOT_FOUND,
    )
    .await;

    expect_status(admin.delete(&format!("/api/pages/{id}")).await, StatusCode::OK).await;
}

#[tokio::test]
#[ignore = "Requires running API server and database"]
async fn test_page_requires_fields() {
    let admin = admin().await;
    let body = expect_status(
        admin
            .post(
                "/api/pages",
                &json!({"title": "x", "titleIs": "", "slug": "", "content": "", "contentIs": ""}),
            )
            .await,
        StatusCode::BAD_REQUEST,
    )
    .await;
    assert!(
        body["message"]
            .as_str()
            .unwrap()
            .starts_with("Missing required fields")
    );
}

#[tokio::test]
#[ignore = "Requires running API server and database"]
async fn test_translation_map_format() {
    let admin = admin().await;
    let key = unique("test.greeting");

    let body = expect_status(
        admin
            .post(
                "/api/translations",
                &json!({"key": key, "value": "Góðan dag", "locale": "is"}),
            )
            .await,
        StatusCode::CREATED,
    )
    .await;
    let id = body["data"]["id"].as_i64().unwrap();

    let public = TestClient::anonymous();
    let body = expect_status(
        public.get("/api/translations?locale=is&format=map").await,
        StatusCode::OK,
    )
    .await;
    assert_eq!(body["data"][&key], "Góðan dag");

    let body = expect_status(
        public.get(&format!("/api/translations/key/{key}")).await,
        StatusCode::OK,
    )
    .await;
    assert_eq!(body["data"]["locale"], "is");

    expect_status(
        admin.delete(&format!("/api/translations/{id}")).await,
        StatusCode::OK,
    )
    .await;
}

#[tokio::test]
#[ignore = "Requires running API server and database"]
async fn test_shipping_option_toggle() {
    let admin = admin().await;
    let body = expect_status(
        admin
            .post(
                "/api/shipping",
                &json!({
                    "name": unique("Express"),
                    "nameIs": "Hraðsending",
                    "type": "DELIVERY",
                    "fee": "2990",
                    "cutoffTime": "14:00"
                }),
            )
            .await,
        StatusCode::CREATED,
    )
    .await;
    let id = body["data"]["id"].as_i64().unwrap();
    let enabled = body["data"]["isEnabled"].as_bool().unwrap();

    let body = expect_status(
        admin.patch(&format!("/api/shipping/{id}/toggle")).await,
        StatusCode::OK,
    )
    .await;
    assert_eq!(body["data"]["isEnabled"], !enabled);

    expect_status(
        admin
            .post(
                "/api/shipping",
                &json!({"name": "Bad", "nameIs": "Vont", "fee": "-1"}),
            )
            .await,
        StatusCode::BAD_REQUEST,
    )
    .await;

    expect_status(admin.delete(&format!("/api/shipping/{id}")).await, StatusCode::OK).await;
}

#[tokio::test]
#[ignore = "Requires running API server and database"]
async fn test_gateway_secrets_are_masked() {
    let admin = admin().await;
    let name = unique("gw");

    let body = expect_status(
        admin
            .post(
                "/api/payment-gateways",
                &json!({
                    "name": name,
                    "displayName": "Test gateway",
                    "provider": "stripe",
                    "merchantId": "acct_123",
                    "secretKey": "sk_test_abcdef1234"
                }),
            )
            .await,
        StatusCode::CREATED,
    )
    .await;
    let gateway = &body["data"];
    let id = gateway["id"].as_i64().unwrap();
    assert_eq!(gateway["secretKey"], "***1234");

    // a masked value sent back keeps the stored secret
    let body = expect_status(
        admin
            .put(
                &format!("/api/payment-gateways/{id}"),
                &json!({"secretKey": "***1234", "displayName": "Renamed"}),
            )
            .await,
        StatusCode::OK,
    )
    .await;
    assert_eq!(body["data"]["secretKey"], "***1234");
    assert_eq!(body["data"]["displayName"], "Renamed");

    let public = expect_status(
        TestClient::anonymous().get("/api/payment-gateways/active").await,
        StatusCode::OK,
    )
    .await;
    assert!(
        public["data"]
            .as_array()
            .unwrap()
            .iter()
            .all(|g| g.get("secretKey").is_none())
    );

    expect_status(
        admin.delete(&format!("/api/payment-gateways/{id}")).await,
        StatusCode::OK,
    )
    .await;
}
