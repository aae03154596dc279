//! Integration tests for categories, products and VAT profiles.
//!
//! Require a running API server, a seeded database (`olfong seed defaults`)
//! and an admin account in `TEST_ADMIN_EMAIL` / `TEST_ADMIN_PASSWORD`.

use olfong_integration_tests::{TestClient, admin, decimal, expect_status, product, unique};
use reqwest::StatusCode;
use rust_decimal::Decimal;
use serde_json::{Value, json};

#[tokio::test]
#[ignore = "Requires running API server and database"]
async fn test_category_lifecycle() {
    let admin = admin().await;
    let name = unique("rauðvín");

    let body = expect_status(
        admin
            .post("/api/categories", &json!({"name": name, "nameIs": "Rauðvín"}))
            .await,
        StatusCode::CREATED,
    )
    .await;
    let category = &body["data"];
    assert_eq!(category["name"], name.to_uppercase());
    let slug = category["slug"].as_str().unwrap();
    assert!(slug.starts_with("raudvin-"), "slug was {slug}");
    let id = category["id"].as_i64().unwrap();

    let body = expect_status(
        TestClient::anonymous()
            .get(&format!("/api/categories/slug/{slug}"))
            .await,
        StatusCode::OK,
    )
    .await;
    assert_eq!(body["data"]["id"], id);

    let sub = expect_status(
        admin
            .post(
                &format!("/api/categories/{id}/subcategories"),
                &json!({"name": "Pinot noir", "nameIs": "Pinot noir"}),
            )
            .await,
        StatusCode::CREATED,
    )
    .await;
    let sub_id = sub["data"]["id"].as_i64().unwrap();
    expect_status(
        admin.delete(&format!("/api/subcategories/{sub_id}")).await,
        StatusCode::OK,
    )
    .await;

    expect_status(admin.delete(&format!("/api/categories/{id}")).await, StatusCode::OK).await;
    expect_status(
        admin.delete(&format!("/api/categories/{id}")).await,
        StatusCode::NOT_FOUND,
    )
    .await;
}

#[tokio::test]
#[ignore = "Requires running API server and database"]
async fn test_offers_category_is_protected() {
    let admin = admin().await;
    let body = expect_status(
        TestClient::anonymous().get("/api/categories/slug/tilbodin").await,
        StatusCode::OK,
    )
    .await;
    let id = body["data"]["id"].as_i64().unwrap();
    let body = expect_status(
        admin.delete(&format!("/api/categories/{id}")).await,
        StatusCode::BAD_REQUEST,
    )
    .await;
    assert_eq!(body["message"], "The offers category cannot be deleted");
}

#[tokio::test]
#[ignore = "Requires running API server and database"]
async fn test_product_crud_and_filters() {
    let admin = admin().await;
    let created = product(&admin, 2490, 12).await;
    let id = created["id"].as_i64().unwrap();
    assert_eq!(created["stock"], 12);

    let public = TestClient::anonymous();
    let body = expect_status(public.get(&format!("/api/products/{id}")).await, StatusCode::OK).await;
    assert_eq!(body["data"]["nameIs"], "Prufubjór");

    let name = created["name"].as_str().unwrap();
    let body = expect_status(
        public
            .get(&format!("/api/products?search={name}&limit=5"))
            .await,
        StatusCode::OK,
    )
    .await;
    assert_eq!(body["data"]["products"][0]["id"], id);
    assert_eq!(body["data"]["pagination"]["limit"], 5);

    let body = expect_status(
        admin
            .put(&format!("/api/products/{id}"), &json!({"stock": 3}))
            .await,
        StatusCode::OK,
    )
    .await;
    assert_eq!(body["data"]["stock"], 3);

    expect_status(admin.delete(&format!("/api/products/{id}")).await, StatusCode::OK).await;
    expect_status(
        public.get(&format!("/api/products/{id}")).await,
        StatusCode::NOT_FOUND,
    )
    .await;
}

#[tokio::test]
#[ignore = "Requires running API server and database"]
async fn test_product_discount() {
    let admin = admin().await;
    let created = product(&admin, 2000, 5).await;
    let id = created["id"].as_i64().unwrap();

    let body = expect_status(
        admin
            .post(
                &format!("/api/products/{id}/discount"),
                &json!({"discountPercentage": "25"}),
            )
            .await,
        StatusCode::OK,
    )
    .await;
    assert_eq!(body["data"]["hasDiscount"], true);
    assert_eq!(decimal(&body["data"]["price"]), Decimal::from(1500));
    assert_eq!(decimal(&body["data"]["originalPrice"]), Decimal::from(2000));

    expect_status(
        admin
            .post(
                &format!("/api/products/{id}/discount"),
                &json!({"discountPercentage": "150"}),
            )
            .await,
        StatusCode::BAD_REQUEST,
    )
    .await;

    let body = expect_status(
        admin.delete(&format!("/api/products/{id}/discount")).await,
        StatusCode::OK,
    )
    .await;
    assert_eq!(body["data"]["hasDiscount"], false);
    assert_eq!(decimal(&body["data"]["price"]), Decimal::from(2000));
}

#[tokio::test]
#[ignore = "Requires running API server and database"]
async fn test_vat_breakdown() {
    let body = expect_status(
        TestClient::anonymous()
            .get("/api/vat-profiles/breakdown?amount=1240")
            .await,
        StatusCode::OK,
    )
    .await;
    assert_eq!(decimal(&body["data"]["vatAmount"]), Decimal::from(240));
    assert_eq!(decimal(&body["data"]["amountBeforeVat"]), Decimal::from(1000));
}

#[tokio::test]
#[ignore = "Requires running API server and database"]
async fn test_single_default_vat_profile() {
    let admin = admin().await;
    let defaults = |body: &Value| -> Vec<Value> {
        body["data"]
            .as_array()
            .unwrap()
            .iter()
            .filter(|p| p["isDefault"] == true)
            .cloned()
            .collect()
    };
    let before = expect_status(admin.get("/api/vat-profiles").await, StatusCode::OK).await;
    let previous = defaults(&before).first().map(|p| p["id"].clone());

    let body = expect_status(
        admin
            .post(
                "/api/vat-profiles",
                &json!({
                    "name": unique("Standard"),
                    "nameIs": "Almennt",
                    "vatRate": "24",
                    "isDefault": true
                }),
            )
            .await,
        StatusCode::CREATED,
    )
    .await;
    let id = body["data"]["id"].as_i64().unwrap();

    let body = expect_status(admin.get("/api/vat-profiles").await, StatusCode::OK).await;
    let current = defaults(&body);
    assert_eq!(current.len(), 1);
    assert_eq!(current[0]["id"], id);

    // hand the flag back and drop the test profile
    if let Some(previous) = previous {
        expect_status(
            admin
                .put(
                    &format!("/api/vat-profiles/{previous}"),
                    &json!({"isDefault": true}),
                )
                .await,
            StatusCode::OK,
        )
        .await;
    }
    expect_status(
        admin.delete(&format!("/api/vat-profiles/{id}")).await,
        StatusCode::OK,
    )
    .await;

    expect_status(
        admin
            .post(
                "/api/vat-profiles",
                &json!({"name": unique("Bad"), "nameIs": "Vont", "vatRate": "120"}),
            )
            .await,
        StatusCode::BAD_REQUEST,
    )
    .await;
}
