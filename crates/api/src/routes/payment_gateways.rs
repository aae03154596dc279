//! Payment gateway route handlers.

#![allow(clippy::used_underscore_binding)]

use axum::{
    Router,
    extract::State,
    routing::{get, patch, post},
};
use serde::Serialize;
use tracing::instrument;

use olfong_core::{GatewayEnvironment, GatewayProvider, PaymentGatewayId};

use crate::db::PaymentGatewayRepository;
use crate::db::payment_gateways::SealedSecrets;
use crate::error::AppError;
use crate::middleware::RequireAdmin;
use crate::models::{
    PaymentGateway, PaymentGatewayInput, PaymentGatewayUpdate, PaymentGatewayView,
    PublicPaymentGateway,
};
use crate::response::{ApiJson, ApiPath, ApiResponse, ApiResult};
use crate::services::crypto::{SecretCipher, seal_submitted};
use crate::state::AppState;

use super::not_found;

const NOT_FOUND: &str = "Payment gateway not found";

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(index).post(create))
        .route("/active", get(active))
        .route("/{id}", get(show).put(update).delete(destroy))
        .route("/{id}/toggle", patch(toggle))
        .route("/{id}/test", post(test))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TestResult {
    pub gateway_id: PaymentGatewayId,
    pub provider: GatewayProvider,
    pub environment: GatewayEnvironment,
}

fn seal(
    cipher: &SecretCipher,
    api_key: Option<&str>,
    secret_key: Option<&str>,
    webhook_secret: Option<&str>,
) -> Result<SealedSecrets, AppError> {
    Ok(SealedSecrets {
        api_key: seal_submitted(cipher, api_key)?,
        secret_key: seal_submitted(cipher, secret_key)?,
        webhook_secret: seal_submitted(cipher, webhook_secret)?,
    })
}

/// Check that a gateway has credentials and that every stored secret
/// decrypts with the current key.
fn check_configuration(gateway: &PaymentGateway, cipher: &SecretCipher) -> Result<(), String> {
    let missing = gateway.missing_credentials();
    if !missing.is_empty() {
        return Err(format!(
            "Missing required configuration: {}",
            missing.join(", ")
        ));
    }
    let unreadable: Vec<&str> = gateway
        .secrets()
        .filter(|(_, value)| cipher.decrypt(value).is_err())
        .map(|(name, _)| name)
        .collect();
    if !unreadable.is_empty() {
        return Err(format!(
            "Stored secrets cannot be decrypted: {}",
            unreadable.join(", ")
        ));
    }
    Ok(())
}

/// Enabled gateways offered at checkout, without secrets.
#[instrument(skip(state))]
async fn active(State(state): State<AppState>) -> ApiResult<Vec<PublicPaymentGateway>> {
    let gateways = PaymentGatewayRepository::new(state.pool())
        .list_active()
        .await?;
    Ok(ApiResponse::ok(
        gateways.into_iter().map(PublicPaymentGateway::from).collect(),
    ))
}

#[instrument(skip(state, _admin))]
async fn index(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
) -> ApiResult<Vec<PaymentGatewayView>> {
    let gateways = PaymentGatewayRepository::new(state.pool()).list().await?;
    let views = gateways
        .into_iter()
        .map(|g| PaymentGatewayView::new(g, state.cipher()))
        .collect();
    Ok(ApiResponse::ok(views))
}

#[instrument(skip(state, _admin))]
async fn show(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<PaymentGatewayId>,
) -> ApiResult<PaymentGatewayView> {
    let gateway = PaymentGatewayRepository::new(state.pool())
        .get(id)
        .await?
        .ok_or_else(|| AppError::NotFound(NOT_FOUND.to_string()))?;
    Ok(ApiResponse::ok(PaymentGatewayView::new(gateway, state.cipher())))
}

#[instrument(skip(state, _admin, input), fields(name = %input.name, provider = ?input.provider))]
async fn create(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    ApiJson(input): ApiJson<PaymentGatewayInput>,
) -> ApiResult<PaymentGatewayView> {
    input.validate()?;
    let secrets = seal(
        state.cipher(),
        input.api_key.as_deref(),
        input.secret_key.as_deref(),
        input.webhook_secret.as_deref(),
    )?;
    let gateway = PaymentGatewayRepository::new(state.pool())
        .create(&input, &secrets)
        .await?;
    tracing::info!(gateway_id = %gateway.id, "Payment gateway created");
    Ok(ApiResponse::created(
        "Payment gateway created successfully",
        PaymentGatewayView::new(gateway, state.cipher()),
    ))
}

/// Update a gateway. Masked secrets echoed back from a view keep the stored
/// value.
#[instrument(skip(state, _admin, update))]
async fn update(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<PaymentGatewayId>,
    ApiJson(update): ApiJson<PaymentGatewayUpdate>,
) -> ApiResult<PaymentGatewayView> {
    update.validate()?;
    let secrets = seal(
        state.cipher(),
        update.api_key.as_deref(),
        update.secret_key.as_deref(),
        update.webhook_secret.as_deref(),
    )?;
    let gateway = PaymentGatewayRepository::new(state.pool())
        .update(id, &update, &secrets)
        .await
        .map_err(|e| not_found(e, NOT_FOUND))?;
    Ok(ApiResponse::with_message(
        "Payment gateway updated successfully",
        PaymentGatewayView::new(gateway, state.cipher()),
    ))
}

#[instrument(skip(state, _admin))]
async fn destroy(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<PaymentGatewayId>,
) -> ApiResult<()> {
    PaymentGatewayRepository::new(state.pool())
        .delete(id)
        .await
        .map_err(|e| not_found(e, NOT_FOUND))?;
    tracing::info!(gateway_id = %id, "Payment gateway deleted");
    Ok(ApiResponse::message("Payment gateway deleted successfully"))
}

#[instrument(skip(state, _admin))]
async fn toggle(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<PaymentGatewayId>,
) -> ApiResult<PaymentGatewayView> {
    let gateway = PaymentGatewayRepository::new(state.pool())
        .toggle(id)
        .await
        .map_err(|e| not_found(e, NOT_FOUND))?;
    let message = if gateway.is_enabled {
        "Payment gateway enabled"
    } else {
        "Payment gateway disabled"
    };
    Ok(ApiResponse::with_message(
        message,
        PaymentGatewayView::new(gateway, state.cipher()),
    ))
}

/// Check the stored configuration without contacting the provider.
#[instrument(skip(state, _admin))]
async fn test(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<PaymentGatewayId>,
) -> ApiResult<TestResult> {
    let gateway = PaymentGatewayRepository::new(state.pool())
        .get(id)
        .await?
        .ok_or_else(|| AppError::NotFound(NOT_FOUND.to_string()))?;

    check_configuration(&gateway, state.cipher()).map_err(AppError::BadRequest)?;

    Ok(ApiResponse::with_message(
        "Payment gateway configuration is valid",
        TestResult {
            gateway_id: gateway.id,
            provider: gateway.provider,
            environment: gateway.environment,
        },
    ))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Utc;

    use super::*;

    fn cipher() -> SecretCipher {
        SecretCipher::new("route-test-encryption-key-with-length")
    }

    fn gateway(cipher: &SecretCipher) -> PaymentGateway {
        PaymentGateway {
            id: PaymentGatewayId::new(7),
            name: "netgiro".to_string(),
            display_name: "Netgíró".to_string(),
            provider: GatewayProvider::Netgiro,
            is_enabled: true,
            is_active: true,
            sort_order: 4,
            config: serde_json::json!({}),
            merchant_id: Some("NG-100".to_string()),
            api_key: Some(cipher.encrypt("ng_key_9876").unwrap()),
            secret_key: Some(cipher.encrypt("ng_secret").unwrap()),
            webhook_secret: None,
            environment: GatewayEnvironment::Sandbox,
            supported_currencies: vec!["ISK".to_string()],
            supported_countries: vec!["IS".to_string()],
            supported_methods: vec![],
            description: None,
            logo_url: None,
            website: None,
            documentation: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_complete_configuration_passes() {
        let cipher = cipher();
        assert!(check_configuration(&gateway(&cipher), &cipher).is_ok());
    }

    #[test]
    fn test_missing_credentials_are_listed() {
        let cipher = cipher();
        let mut gateway = gateway(&cipher);
        gateway.merchant_id = None;
        gateway.secret_key = None;
        assert_eq!(
            check_configuration(&gateway, &cipher).unwrap_err(),
            "Missing required configuration: merchantId, secretKey"
        );
    }

    #[test]
    fn test_undecryptable_secret_fails() {
        let cipher = cipher();
        let gateway = gateway(&cipher);
        let rotated = SecretCipher::new("a-rotated-encryption-key-of-some-length");
        let err = check_configuration(&gateway, &rotated).unwrap_err();
        assert!(err.contains("apiKey"));
        assert!(err.contains("secretKey"));
    }

    #[test]
    fn test_masked_secrets_are_not_resealed() {
        let cipher = cipher();
        let sealed = seal(&cipher, Some("***9876"), Some("new-secret"), Some("")).unwrap();
        assert!(sealed.api_key.is_none());
        assert_eq!(
            cipher.decrypt(sealed.secret_key.as_deref().unwrap()).unwrap(),
            "new-secret"
        );
        assert!(sealed.webhook_secret.is_none());
    }
}
