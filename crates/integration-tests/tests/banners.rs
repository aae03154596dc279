//! Integration tests for storefront banners.
//!
//! Require a running API server and an admin account in
//! `TEST_ADMIN_EMAIL` / `TEST_ADMIN_PASSWORD`.

use olfong_integration_tests::{TestClient, admin, customer, expect_status, unique};
use reqwest::StatusCode;
use reqwest::multipart::{Form, Part};
use serde_json::json;

/// A valid 1x1 PNG made unique by a random trailing chunk.
fn png() -> Vec<u8> {
    let mut bytes = vec![
        0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x48, 0x44,
        0x52, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, 0x08, 0x06, 0x00, 0x00, 0x00, 0x1F,
        0x15, 0xC4, 0x89, 0x00, 0x00, 0x00, 0x0A, 0x49, 0x44, 0x41, 0x54, 0x78, 0x9C, 0x63, 0x00,
        0x01, 0x00, 0x00, 0x05, 0x00, 0x01, 0x0D, 0x0A, 0x2D, 0xB4, 0x00, 0x00, 0x00, 0x00, 0x49,
        0x45, 0x4E, 0x44, 0xAE, 0x42, 0x60, 0x82,
    ];
    bytes.extend_from_slice(uuid::Uuid::new_v4().as_bytes());
    bytes
}

async fn upload(admin: &TestClient, collection: &str) -> String {
    let form = Form::new().text("collection", collection.to_string()).part(
        "file",
        Part::bytes(png())
            .file_name("banner.png")
            .mime_str("image/png")
            .unwrap(),
    );
    let body = expect_status(
        admin.multipart("/api/media/upload", form).await,
        StatusCode::CREATED,
    )
    .await;
    body["data"]["id"].as_str().unwrap().to_string()
}

fn listed(body: &serde_json::Value, id: i64) -> bool {
    body["data"].as_array().unwrap().iter().any(|b| b["id"] == id)
}

#[tokio::test]
#[ignore = "Requires running API server and database"]
async fn test_banner_lifecycle() {
    let admin = admin().await;
    let anonymous = TestClient::anonymous();

    let body = expect_status(
        admin
            .post(
                "/api/banners",
                &json!({
                    "title": unique("Summer"),
                    "titleIs": "Sumar",
                    "imageUrl": "https://cdn.olfong.is/banners/summer.jpg",
                    "link": "/products?category=BEER",
                    "sortOrder": 3
                }),
            )
            .await,
        StatusCode::CREATED,
    )
    .await;
    let id = body["data"]["id"].as_i64().unwrap();
    assert_eq!(body["data"]["isActive"], true);
    let path = format!("/api/banners/{id}");

    let body = expect_status(anonymous.get("/api/banners").await, StatusCode::OK).await;
    assert!(listed(&body, id));

    let body = expect_status(admin.patch(&format!("{path}/toggle")).await, StatusCode::OK).await;
    assert_eq!(body["data"]["isActive"], false);
    let body = expect_status(anonymous.get("/api/banners").await, StatusCode::OK).await;
    assert!(!listed(&body, id));
    let body = expect_status(
        anonymous.get("/api/banners?includeInactive=true").await,
        StatusCode::OK,
    )
    .await;
    assert!(listed(&body, id));

    let body = expect_status(
        admin.put(&path, &json!({"descriptionIs": "Kaldur bjór"})).await,
        StatusCode::OK,
    )
    .await;
    assert_eq!(body["data"]["descriptionIs"], "Kaldur bjór");

    expect_status(admin.delete(&path).await, StatusCode::OK).await;
    expect_status(anonymous.get(&path).await, StatusCode::NOT_FOUND).await;
}

#[tokio::test]
#[ignore = "Requires running API server and database"]
async fn test_banner_validation_and_access() {
    let admin = admin().await;
    let (client, _) = customer().await;

    expect_status(
        client
            .post("/api/banners", &json!({"imageUrl": "https://cdn.olfong.is/a.jpg"}))
            .await,
        StatusCode::FORBIDDEN,
    )
    .await;

    let body = expect_status(
        admin.post("/api/banners", &json!({"title": "No image"})).await,
        StatusCode::BAD_REQUEST,
    )
    .await;
    assert!(body["message"].as_str().unwrap().contains("Image URL is required"));

    let products_media = upload(&admin, "PRODUCTS").await;
    let body = expect_status(
        admin
            .post("/api/banners", &json!({"mediaId": products_media}))
            .await,
        StatusCode::BAD_REQUEST,
    )
    .await;
    assert_eq!(
        body["message"],
        "Banner images must come from the BANNERS collection"
    );
}

#[tokio::test]
#[ignore = "Requires running API server and database"]
async fn test_banner_media_cannot_be_deleted_while_used() {
    let admin = admin().await;
    let media_id = upload(&admin, "BANNERS").await;

    let body = expect_status(
        admin
            .post("/api/banners", &json!({"mediaId": media_id, "alt": "Jól"}))
            .await,
        StatusCode::CREATED,
    )
    .await;
    let id = body["data"]["id"].as_i64().unwrap();
    assert!(body["data"]["imageUrl"].as_str().unwrap().contains("banners"));

    let body = expect_status(
        admin.delete(&format!("/api/media/{media_id}")).await,
        StatusCode::BAD_REQUEST,
    )
    .await;
    assert_eq!(body["message"], "Cannot delete media that is currently in use");

    expect_status(admin.delete(&format!("/api/banners/{id}")).await, StatusCode::OK).await;
    expect_status(
        admin.delete(&format!("/api/media/{media_id}")).await,
        StatusCode::OK,
    )
    .await;
}
