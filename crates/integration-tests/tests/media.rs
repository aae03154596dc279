//! Integration tests for the media library.
//!
//! Require a running API server and an admin account in
//! `TEST_ADMIN_EMAIL` / `TEST_ADMIN_PASSWORD`.

use olfong_integration_tests::{admin, expect_status};
use reqwest::StatusCode;
use reqwest::multipart::{Form, Part};
use serde_json::json;

/// A valid 1x1 PNG with a random trailing chunk so each run is unique.
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

fn form(bytes: Vec<u8>, collection: &str) -> Form {
    Form::new()
        .text("collection", collection.to_string())
        .text("alt", "Test bottle")
        .part(
            "file",
            Part::bytes(bytes)
                .file_name("bottle.png")
                .mime_str("image/png")
                .unwrap(),
        )
}

#[tokio::test]
#[ignore = "Requires running API server and database"]
async fn test_upload_deduplicates_and_deletes() {
    let admin = admin().await;
    let bytes = png();

    let body = expect_status(
        admin.multipart("/api/media/upload", form(bytes.clone(), "PRODUCTS")).await,
        StatusCode::CREATED,
    )
    .await;
    let media = &body["data"];
    let id = media["id"].as_str().unwrap().to_string();
    assert_eq!(media["collection"], "PRODUCTS");
    assert_eq!(media["alt"], "Test bottle");
    assert!(media.get("path").is_none());

    let body = expect_status(
        admin.multipart("/api/media/upload", form(bytes, "products")).await,
        StatusCode::OK,
    )
    .await;
    assert_eq!(body["data"]["id"], id.as_str());
    assert_eq!(body["message"], "File already exists, using existing media");

    let body = expect_status(
        admin
            .post("/api/media/bulk-delete", &json!({"ids": [id]}))
            .await,
        StatusCode::OK,
    )
    .await;
    assert_eq!(body["data"]["deleted"], 1);

    expect_status(
        admin.get(&format!("/api/media/{id}")).await,
        StatusCode::NOT_FOUND,
    )
    .await;
}

#[tokio::test]
#[ignore = "Requires running API server and database"]
async fn test_upload_rejects_wrong_type_and_collection() {
    let admin = admin().await;

    let text = Form::new().part(
        "file",
        Part::bytes(b"plain text".to_vec())
            .file_name("notes.txt")
            .mime_str("text/plain")
            .unwrap(),
    );
    expect_status(
        admin.multipart("/api/media/upload", text).await,
        StatusCode::BAD_REQUEST,
    )
    .await;

    expect_status(
        admin.multipart("/api/media/upload", form(png(), "VIDEOS")).await,
        StatusCode::BAD_REQUEST,
    )
    .await;

    let empty = Form::new().text("collection", "PRODUCTS");
    let body = expect_status(
        admin.multipart("/api/media/upload", empty).await,
        StatusCode::BAD_REQUEST,
    )
    .await;
    assert_eq!(body["message"], "No file uploaded");
}

#[tokio::test]
#[ignore = "Requires running API server and database"]
async fn test_concurrent_identical_uploads_share_one_entry() {
    let admin = admin().await;
    let bytes = png();

    let (first, second) = tokio::join!(
        admin.multipart("/api/media/upload", form(bytes.clone(), "PRODUCTS")),
        admin.multipart("/api/media/upload", form(bytes, "PRODUCTS")),
    );
    assert!(first.status().is_success(), "first: {}", first.status());
    assert!(second.status().is_success(), "second: {}", second.status());
    let first: serde_json::Value = first.json().await.unwrap();
    let second: serde_json::Value = second.json().await.unwrap();
    let id = first["data"]["id"].as_str().unwrap().to_string();
    assert_eq!(second["data"]["id"], id.as_str());

    expect_status(
        admin.delete(&format!("/api/media/{id}")).await,
        StatusCode::OK,
    )
    .await;
}
