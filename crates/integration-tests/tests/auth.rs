//! Integration tests for registration, login and profile.
//!
//! Require a running API server and database. Run with:
//! `cargo test -p olfong-integration-tests -- --ignored`

use olfong_integration_tests::{TestClient, customer, expect_status, unique};
use reqwest::StatusCode;
use serde_json::json;

#[tokio::test]
#[ignore = "Requires running API server and database"]
async fn test_health_endpoints() {
    let client = TestClient::anonymous();
    assert_eq!(client.get("/health").await.status(), StatusCode::OK);
    assert_eq!(client.get("/health/ready").await.status(), StatusCode::OK);
}

#[tokio::test]
#[ignore = "Requires running API server and database"]
async fn test_register_returns_token_and_profile() {
    let (client, user) = customer().await;
    assert_eq!(user["role"], "CUSTOMER");

    let body = expect_status(client.get("/api/auth/profile").await, StatusCode::OK).await;
    assert_eq!(body["data"]["id"], user["id"]);
    assert_eq!(body["data"]["dateOfBirth"], "1990-01-01");
    assert!(body["data"].get("passwordHash").is_none());
}

#[tokio::test]
#[ignore = "Requires running API server and database"]
async fn test_duplicate_registration_conflicts() {
    let client = TestClient::anonymous();
    let email = format!("{}@test.olfong.is", unique("dup"));
    let body = json!({"email": email, "password": "long-enough-pw"});

    expect_status(client.post("/api/auth/register", &body).await, StatusCode::CREATED).await;
    expect_status(client.post("/api/auth/register", &body).await, StatusCode::CONFLICT).await;
}

#[tokio::test]
#[ignore = "Requires running API server and database"]
async fn test_short_password_rejected() {
    let client = TestClient::anonymous();
    let response = client
        .post(
            "/api/auth/register",
            &json!({"email": format!("{}@test.olfong.is", unique("short")), "password": "short"}),
        )
        .await;
    expect_status(response, StatusCode::BAD_REQUEST).await;
}

#[tokio::test]
#[ignore = "Requires running API server and database"]
async fn test_bad_credentials() {
    let client = TestClient::anonymous();
    let body = expect_status(
        client
            .post(
                "/api/auth/login",
                &json!({"email": "nobody@test.olfong.is", "password": "whatever-it-is"}),
            )
            .await,
        StatusCode::UNAUTHORIZED,
    )
    .await;
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "Invalid credentials");
}

#[tokio::test]
#[ignore = "Requires running API server and database"]
async fn test_token_required() {
    let client = TestClient::anonymous();
    let body = expect_status(client.get("/api/auth/profile").await, StatusCode::UNAUTHORIZED).await;
    assert_eq!(body["message"], "Access denied. No token provided.");

    let forged = client.with_token("not.a.jwt");
    let body = expect_status(forged.get("/api/auth/profile").await, StatusCode::UNAUTHORIZED).await;
    assert_eq!(body["message"], "Invalid token.");
}

#[tokio::test]
#[ignore = "Requires running API server and database"]
async fn test_update_profile() {
    let (client, _) = customer().await;
    let body = expect_status(
        client
            .put(
                "/api/auth/profile",
                &json!({"fullName": "  Guðrún Test ", "phone": "5551234"}),
            )
            .await,
        StatusCode::OK,
    )
    .await;
    assert_eq!(body["data"]["fullName"], "Guðrún Test");
    assert_eq!(body["data"]["phone"], "5551234");
    assert_eq!(body["data"]["dateOfBirth"], "1990-01-01");
}

#[tokio::test]
#[ignore = "Requires running API server and database"]
async fn test_customer_cannot_use_admin_routes() {
    let (client, _) = customer().await;
    let body = expect_status(client.get("/api/orders").await, StatusCode::FORBIDDEN).await;
    assert_eq!(body["message"], "Insufficient permissions");
}
