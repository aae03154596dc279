//! Integration tests for the Ölföng API.
//!
//! # Running Tests
//!
//! ```bash
//! # Migrate and seed a database, then start the server
//! cargo run -p olfong-cli -- migrate
//! cargo run -p olfong-cli -- seed defaults
//! cargo run -p olfong-cli -- seed shipping
//! cargo run -p olfong-cli -- admin create -e "$TEST_ADMIN_EMAIL" -n Admin -p "$TEST_ADMIN_PASSWORD"
//! cargo run -p olfong-api
//!
//! # Run the ignored HTTP tests against it
//! cargo test -p olfong-integration-tests -- --ignored
//! ```
//!
//! # Environment Variables
//!
//! - `API_BASE_URL` (default `http://localhost:5000`)
//! - `TEST_ADMIN_EMAIL` / `TEST_ADMIN_PASSWORD` - an existing admin account

#![allow(clippy::missing_panics_doc, clippy::unwrap_used)]

use std::time::Duration;

use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde_json::{Value, json};
use uuid::Uuid;

/// Attempts made when the auth rate limiter answers 429.
const RATE_LIMIT_ATTEMPTS: usize = 10;

/// Base URL of the API under test.
#[must_use]
pub fn base_url() -> String {
    std::env::var("API_BASE_URL")
        .unwrap_or_else(|_| "http://localhost:5000".to_string())
        .trim_end_matches('/')
        .to_string()
}

/// A short random suffix for names that must be unique per run.
#[must_use]
pub fn unique(prefix: &str) -> String {
    format!("{prefix}-{}", &Uuid::new_v4().simple().to_string()[..8])
}

/// An HTTP client bound to the API, optionally carrying a bearer token.
#[derive(Clone)]
pub struct TestClient {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl Default for TestClient {
    fn default() -> Self {
        Self::anonymous()
    }
}

impl TestClient {
    #[must_use]
    pub fn anonymous() -> Self {
        Self {
            client: Client::new(),
            base_url: base_url(),
            token: None,
        }
    }

    #[must_use]
    pub fn with_token(&self, token: &str) -> Self {
        Self {
            token: Some(token.to_string()),
            ..self.clone()
        }
    }

    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    pub async fn get(&self, path: &str) -> Response {
        self.authorize(self.client.get(self.url(path)))
            .send()
            .await
            .expect("GET failed")
    }

    pub async fn delete(&self, path: &str) -> Response {
        self.authorize(self.client.delete(self.url(path)))
            .send()
            .await
            .expect("DELETE failed")
    }

    /// POST JSON. Requests rejected by the login/register rate limiter are
    /// retried after the advertised delay.
    pub async fn post(&self, path: &str, body: &Value) -> Response {
        let request = self.authorize(self.client.post(self.url(path)).json(body));
        for _ in 1..RATE_LIMIT_ATTEMPTS {
            let response = request
                .try_clone()
                .expect("JSON requests are cloneable")
                .send()
                .await
                .expect("POST failed");
            if response.status() != StatusCode::TOO_MANY_REQUESTS {
                return response;
            }
            tokio::time::sleep(retry_after(&response)).await;
        }
        request.send().await.expect("POST failed")
    }

    pub async fn put(&self, path: &str, body: &Value) -> Response {
        self.authorize(self.client.put(self.url(path)).json(body))
            .send()
            .await
            .expect("PUT failed")
    }

    pub async fn patch(&self, path: &str) -> Response {
        self.authorize(self.client.patch(self.url(path)))
            .send()
            .await
            .expect("PATCH failed")
    }

    pub async fn multipart(&self, path: &str, form: reqwest::multipart::Form) -> Response {
        self.authorize(self.client.post(self.url(path)).multipart(form))
            .send()
            .await
            .expect("multipart POST failed")
    }
}

fn retry_after(response: &Response) -> Duration {
    let seconds = response
        .headers()
        .get("retry-after")
        .or_else(|| response.headers().get("x-ratelimit-after"))
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse().ok())
        .unwrap_or(6);
    Duration::from_secs(seconds)
}

/// Assert the status and return the parsed envelope.
pub async fn expect_status(response: Response, status: StatusCode) -> Value {
    let actual = response.status();
    let body: Value = response.json().await.unwrap_or(Value::Null);
    assert_eq!(actual, status, "unexpected status, body: {body}");
    body
}

/// Register a fresh adult customer and return a client carrying their token.
pub async fn customer() -> (TestClient, Value) {
    let anonymous = TestClient::anonymous();
    let email = format!("{}@test.olfong.is", unique("customer"));
    let body = expect_status(
        anonymous
            .post(
                "/api/auth/register",
                &json!({
                    "email": email,
                    "password": "correct-horse-battery",
                    "fullName": "Test Customer",
                    "dateOfBirth": "1990-01-01"
                }),
            )
            .await,
        StatusCode::CREATED,
    )
    .await;
    let token = body["data"]["token"].as_str().unwrap().to_string();
    (anonymous.with_token(&token), body["data"]["user"].clone())
}

/// Log in as the configured admin account.
pub async fn admin() -> TestClient {
    let email = std::env::var("TEST_ADMIN_EMAIL").expect("TEST_ADMIN_EMAIL must be set");
    let password = std::env::var("TEST_ADMIN_PASSWORD").expect("TEST_ADMIN_PASSWORD must be set");
    login(&email, &password).await
}

/// Log in and return a client carrying the token.
pub async fn login(email: &str, password: &str) -> TestClient {
    let anonymous = TestClient::anonymous();
    let body = expect_status(
        anonymous
            .post(
                "/api/auth/login",
                &json!({"email": email, "password": password}),
            )
            .await,
        StatusCode::OK,
    )
    .await;
    anonymous.with_token(body["data"]["token"].as_str().unwrap())
}

/// Create an active product in a fresh category and return its JSON.
pub async fn product(admin: &TestClient, price: u32, stock: i32) -> Value {
    let body = expect_status(
        admin
            .post(
                "/api/products",
                &json!({
                    "name": unique("Test Lager"),
                    "nameIs": "Prufubjór",
                    "category": unique("TESTCAT"),
                    "price": price.to_string(),
                    "stock": stock,
                    "alcoholVolume": "5.0",
                    "volume": "500 ml",
                    "isActive": true
                }),
            )
            .await,
        StatusCode::CREATED,
    )
    .await;
    body["data"].clone()
}

/// Read a decimal field serialized as a string (or number).
#[must_use]
pub fn decimal(value: &Value) -> rust_decimal::Decimal {
    match value {
        Value::String(s) => s.parse().unwrap(),
        other => other.to_string().parse().unwrap(),
    }
}
