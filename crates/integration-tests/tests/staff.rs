//! Integration tests for staff accounts and the customer list.
//!
//! Require a running API server, a seeded database (`olfong seed shipping`)
//! and an admin account in `TEST_ADMIN_EMAIL` / `TEST_ADMIN_PASSWORD`.

use olfong_integration_tests::{
    TestClient, admin, customer, decimal, expect_status, login, product, unique,
};
use reqwest::StatusCode;
use rust_decimal::Decimal;
use serde_json::json;

async fn pickup_option() -> i64 {
    let body = expect_status(
        TestClient::anonymous().get("/api/shipping/active").await,
        StatusCode::OK,
    )
    .await;
    body["data"]
        .as_array()
        .unwrap()
        .iter()
        .find(|o| o["type"] == "PICKUP")
        .and_then(|o| o["id"].as_i64())
        .expect("no enabled pickup option; run `olfong seed shipping`")
}

#[tokio::test]
#[ignore = "Requires running API server and database"]
async fn test_delivery_account_can_work_assigned_orders() {
    let admin = admin().await;
    let email = format!("{}@test.olfong.is", unique("courier"));

    let body = expect_status(
        admin
            .post(
                "/api/staff",
                &json!({
                    "email": email,
                    "fullName": "Test Courier",
                    "role": "DELIVERY",
                    "password": "courier-password"
                }),
            )
            .await,
        StatusCode::CREATED,
    )
    .await;
    let courier_id = body["data"]["staff"]["id"].as_i64().unwrap();
    assert_eq!(body["data"]["staff"]["role"], "DELIVERY");
    assert!(body["data"].get("temporaryPassword").is_none());

    let body = expect_status(admin.get("/api/orders/delivery-persons").await, StatusCode::OK).await;
    assert!(
        body["data"]
            .as_array()
            .unwrap()
            .iter()
            .any(|u| u["id"] == courier_id)
    );

    let (owner, _) = customer().await;
    let item = product(&admin, 700, 3).await;
    let body = expect_status(
        owner
            .post(
                "/api/orders",
                &json!({
                    "items": [{"productId": item["id"], "quantity": 1}],
                    "shippingOptionId": pickup_option().await,
                    "pickupTime": "16:00"
                }),
            )
            .await,
        StatusCode::CREATED,
    )
    .await;
    let order_id = body["data"]["id"].as_i64().unwrap();

    expect_status(
        admin
            .put(
                &format!("/api/orders/{order_id}/assign-delivery"),
                &json!({"deliveryPersonId": courier_id}),
            )
            .await,
        StatusCode::OK,
    )
    .await;

    let courier = login(&email, "courier-password").await;
    let body = expect_status(
        courier
            .put(
                &format!("/api/orders/{order_id}/status"),
                &json!({"status": "PREPARING"}),
            )
            .await,
        StatusCode::OK,
    )
    .await;
    assert_eq!(body["data"]["status"], "PREPARING");

    // couriers are not admins
    expect_status(courier.get("/api/staff").await, StatusCode::FORBIDDEN).await;

    expect_status(
        admin.delete(&format!("/api/staff/{courier_id}")).await,
        StatusCode::OK,
    )
    .await;
    expect_status(
        admin.get(&format!("/api/staff/{courier_id}")).await,
        StatusCode::NOT_FOUND,
    )
    .await;
}

#[tokio::test]
#[ignore = "Requires running API server and database"]
async fn test_staff_rules() {
    let admin = admin().await;
    let (_, user) = customer().await;
    let customer_id = user["id"].as_i64().unwrap();

    // customers are not staff
    expect_status(
        admin.get(&format!("/api/staff/{customer_id}")).await,
        StatusCode::NOT_FOUND,
    )
    .await;
    let body = expect_status(
        admin
            .post(
                "/api/staff",
                &json!({
                    "email": format!("{}@test.olfong.is", unique("staff")),
                    "fullName": "Not Staff",
                    "role": "CUSTOMER"
                }),
            )
            .await,
        StatusCode::BAD_REQUEST,
    )
    .await;
    assert_eq!(body["message"], "Invalid role. Must be ADMIN or DELIVERY");

    // a generated password is handed back once and works
    let email = format!("{}@test.olfong.is", unique("staff"));
    let body = expect_status(
        admin
            .post(
                "/api/staff",
                &json!({"email": email, "fullName": "Second Admin", "role": "ADMIN"}),
            )
            .await,
        StatusCode::CREATED,
    )
    .await;
    let id = body["data"]["staff"]["id"].as_i64().unwrap();
    let password = body["data"]["temporaryPassword"].as_str().unwrap().to_string();
    let second = login(&email, &password).await;

    // nobody deletes themselves
    let body = expect_status(
        second.delete(&format!("/api/staff/{id}")).await,
        StatusCode::BAD_REQUEST,
    )
    .await;
    assert_eq!(body["message"], "You cannot delete your own account");

    let body = expect_status(
        admin
            .put(
                &format!("/api/staff/{id}"),
                &json!({"role": "DELIVERY", "phone": "5551234"}),
            )
            .await,
        StatusCode::OK,
    )
    .await;
    assert_eq!(body["data"]["role"], "DELIVERY");
    assert_eq!(body["data"]["phone"], "5551234");

    let body = expect_status(
        admin.get("/api/staff?role=DELIVERY&limit=100").await,
        StatusCode::OK,
    )
    .await;
    assert!(body["data"]["staff"].as_array().unwrap().iter().any(|u| u["id"] == id));
    assert!(body["data"]["pagination"]["total"].as_i64().unwrap() >= 1);

    expect_status(
        admin.delete(&format!("/api/staff/{id}")).await,
        StatusCode::OK,
    )
    .await;
}

#[tokio::test]
#[ignore = "Requires running API server and database"]
async fn test_customer_list_and_detail() {
    let admin = admin().await;
    let (owner, user) = customer().await;
    let id = user["id"].as_i64().unwrap();
    let email = user["email"].as_str().unwrap().to_string();

    let body = expect_status(
        admin.get(&format!("/api/customers/{id}")).await,
        StatusCode::OK,
    )
    .await;
    assert_eq!(body["data"]["status"], "new");
    assert_eq!(body["data"]["totalOrders"], 0);

    let item = product(&admin, 1000, 5).await;
    expect_status(
        owner
            .post(
                "/api/orders",
                &json!({
                    "items": [{"productId": item["id"], "quantity": 2}],
                    "shippingOptionId": pickup_option().await,
                    "pickupTime": "14:00"
                }),
            )
            .await,
        StatusCode::CREATED,
    )
    .await;

    let body = expect_status(
        admin.get(&format!("/api/customers/{id}")).await,
        StatusCode::OK,
    )
    .await;
    let detail = &body["data"];
    assert_eq!(detail["status"], "active");
    assert_eq!(detail["totalOrders"], 1);
    assert!(decimal(&detail["totalSpent"]) > Decimal::ZERO);
    assert!(detail["joinDate"].is_string());
    assert_eq!(detail["orders"].as_array().unwrap().len(), 1);

    let body = expect_status(
        admin
            .get(&format!("/api/customers?search={email}&status=active"))
            .await,
        StatusCode::OK,
    )
    .await;
    assert_eq!(body["data"]["customers"][0]["id"], id);
    assert_eq!(body["data"]["pagination"]["total"], 1);

    expect_status(owner.get("/api/customers").await, StatusCode::FORBIDDEN).await;
}
