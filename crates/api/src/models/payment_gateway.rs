//! Payment gateway configuration.
//!
//! Secret fields (`apiKey`, `secretKey`, `webhookSecret`) are encrypted at
//! rest. [`PaymentGateway`] carries the ciphertext and is never serialized;
//! admin responses use [`PaymentGatewayView`] with masked secrets and the
//! checkout uses [`PublicPaymentGateway`], which has no secrets at all.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use olfong_core::{GatewayEnvironment, GatewayProvider, PaymentGatewayId};

use crate::services::crypto::{SecretCipher, mask_secret};
use crate::validation::{ValidationError, max_length, optional_url, require_length};

const MAX_KEY_LENGTH: usize = 500;

/// A stored gateway, secrets still encrypted.
#[derive(Debug, Clone)]
pub struct PaymentGateway {
    pub id: PaymentGatewayId,
    pub name: String,
    pub display_name: String,
    pub provider: GatewayProvider,
    pub is_enabled: bool,
    pub is_active: bool,
    pub sort_order: i32,
    pub config: serde_json::Value,
    pub merchant_id: Option<String>,
    pub api_key: Option<String>,
    pub secret_key: Option<String>,
    pub webhook_secret: Option<String>,
    pub environment: GatewayEnvironment,
    pub supported_currencies: Vec<String>,
    pub supported_countries: Vec<String>,
    pub supported_methods: Vec<String>,
    pub description: Option<String>,
    pub logo_url: Option<String>,
    pub website: Option<String>,
    pub documentation: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PaymentGateway {
    /// Credential fields a gateway needs before it can take payments.
    #[must_use]
    pub fn missing_credentials(&self) -> Vec<&'static str> {
        [
            ("merchantId", &self.merchant_id),
            ("apiKey", &self.api_key),
            ("secretKey", &self.secret_key),
        ]
        .into_iter()
        .filter(|(_, v)| v.as_deref().is_none_or(str::is_empty))
        .map(|(name, _)| name)
        .collect()
    }

    /// Stored secrets by field name, skipping unset ones.
    pub fn secrets(&self) -> impl Iterator<Item = (&'static str, &str)> {
        [
            ("apiKey", self.api_key.as_deref()),
            ("secretKey", self.secret_key.as_deref()),
            ("webhookSecret", self.webhook_secret.as_deref()),
        ]
        .into_iter()
        .filter_map(|(name, v)| v.map(|v| (name, v)))
    }
}

/// Admin representation with masked secrets.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentGatewayView {
    pub id: PaymentGatewayId,
    pub name: String,
    pub display_name: String,
    pub provider: GatewayProvider,
    pub is_enabled: bool,
    pub is_active: bool,
    pub sort_order: i32,
    pub config: serde_json::Value,
    pub merchant_id: Option<String>,
    pub api_key: Option<String>,
    pub secret_key: Option<String>,
    pub webhook_secret: Option<String>,
    pub environment: GatewayEnvironment,
    pub supported_currencies: Vec<String>,
    pub supported_countries: Vec<String>,
    pub supported_methods: Vec<String>,
    pub description: Option<String>,
    pub logo_url: Option<String>,
    pub website: Option<String>,
    pub documentation: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PaymentGatewayView {
    /// Mask each stored secret. Values that fail to decrypt show as `***`.
    #[must_use]
    pub fn new(gateway: PaymentGateway, cipher: &SecretCipher) -> Self {
        let mask = |value: Option<String>| {
            value.map(|v| {
                cipher
                    .decrypt(&v)
                    .map_or_else(|_| "***".to_string(), |plain| mask_secret(&plain))
            })
        };
        Self {
            id: gateway.id,
            name: gateway.name,
            display_name: gateway.display_name,
            provider: gateway.provider,
            is_enabled: gateway.is_enabled,
            is_active: gateway.is_active,
            sort_order: gateway.sort_order,
            config: gateway.config,
            merchant_id: gateway.merchant_id,
            api_key: mask(gateway.api_key),
            secret_key: mask(gateway.secret_key),
            webhook_secret: mask(gateway.webhook_secret),
            environment: gateway.environment,
            supported_currencies: gateway.supported_currencies,
            supported_countries: gateway.supported_countries,
            supported_methods: gateway.supported_methods,
            description: gateway.description,
            logo_url: gateway.logo_url,
            website: gateway.website,
            documentation: gateway.documentation,
            created_at: gateway.created_at,
            updated_at: gateway.updated_at,
        }
    }
}

/// Checkout representation.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicPaymentGateway {
    pub id: PaymentGatewayId,
    pub name: String,
    pub display_name: String,
    pub provider: GatewayProvider,
    pub sort_order: i32,
    pub environment: GatewayEnvironment,
    pub supported_currencies: Vec<String>,
    pub supported_countries: Vec<String>,
    pub supported_methods: Vec<String>,
    pub description: Option<String>,
    pub logo_url: Option<String>,
}

impl From<PaymentGateway> for PublicPaymentGateway {
    fn from(gateway: PaymentGateway) -> Self {
        Self {
            id: gateway.id,
            name: gateway.name,
            display_name: gateway.display_name,
            provider: gateway.provider,
            sort_order: gateway.sort_order,
            environment: gateway.environment,
            supported_currencies: gateway.supported_currencies,
            supported_countries: gateway.supported_countries,
            supported_methods: gateway.supported_methods,
            description: gateway.description,
            logo_url: gateway.logo_url,
        }
    }
}

/// Body of `POST /api/payment-gateways`. Secrets are plaintext here.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentGatewayInput {
    pub name: String,
    pub display_name: String,
    pub provider: GatewayProvider,
    pub is_enabled: Option<bool>,
    pub is_active: Option<bool>,
    pub sort_order: Option<i32>,
    pub config: Option<serde_json::Value>,
    pub merchant_id: Option<String>,
    pub api_key: Option<String>,
    pub secret_key: Option<String>,
    pub webhook_secret: Option<String>,
    pub environment: Option<GatewayEnvironment>,
    pub supported_currencies: Option<Vec<String>>,
    pub supported_countries: Option<Vec<String>>,
    pub supported_methods: Option<Vec<String>>,
    pub description: Option<String>,
    pub logo_url: Option<String>,
    pub website: Option<String>,
    pub documentation: Option<String>,
}

impl PaymentGatewayInput {
    /// # Errors
    ///
    /// Returns the first rejected field.
    pub fn validate(&self) -> Result<(), ValidationError> {
        require_length("name", &self.name, 2, 50)?;
        require_length("displayName", &self.display_name, 2, 100)?;
        validate_common(
            self.sort_order,
            [
                ("merchantId", self.merchant_id.as_deref()),
                ("apiKey", self.api_key.as_deref()),
                ("secretKey", self.secret_key.as_deref()),
                ("webhookSecret", self.webhook_secret.as_deref()),
                ("description", self.description.as_deref()),
            ],
            [
                ("logoUrl", self.logo_url.as_deref()),
                ("website", self.website.as_deref()),
                ("documentation", self.documentation.as_deref()),
            ],
        )
    }
}

/// Body of `PUT /api/payment-gateways/{id}`.
///
/// A secret that still carries the `***` mask from a previous response is
/// ignored and the stored value is kept.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentGatewayUpdate {
    pub name: Option<String>,
    pub display_name: Option<String>,
    pub provider: Option<GatewayProvider>,
    pub is_enabled: Option<bool>,
    pub is_active: Option<bool>,
    pub sort_order: Option<i32>,
    pub config: Option<serde_json::Value>,
    pub merchant_id: Option<String>,
    pub api_key: Option<String>,
    pub secret_key: Option<String>,
    pub webhook_secret: Option<String>,
    pub environment: Option<GatewayEnvironment>,
    pub supported_currencies: Option<Vec<String>>,
    pub supported_countries: Option<Vec<String>>,
    pub supported_methods: Option<Vec<String>>,
    pub description: Option<String>,
    pub logo_url: Option<String>,
    pub website: Option<String>,
    pub documentation: Option<String>,
}

impl PaymentGatewayUpdate {
    /// # Errors
    ///
    /// Returns the first rejected field.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if let Some(name) = &self.name {
            require_length("name", name, 2, 50)?;
        }
        if let Some(display_name) = &self.display_name {
            require_length("displayName", display_name, 2, 100)?;
        }
        validate_common(
            self.sort_order,
            [
                ("merchantId", self.merchant_id.as_deref()),
                ("apiKey", self.api_key.as_deref()),
                ("secretKey", self.secret_key.as_deref()),
                ("webhookSecret", self.webhook_secret.as_deref()),
                ("description", self.description.as_deref()),
            ],
            [
                ("logoUrl", self.logo_url.as_deref()),
                ("website", self.website.as_deref()),
                ("documentation", self.documentation.as_deref()),
            ],
        )
    }
}

fn validate_common(
    sort_order: Option<i32>,
    bounded: [(&str, Option<&str>); 5],
    urls: [(&str, Option<&str>); 3],
) -> Result<(), ValidationError> {
    if sort_order.is_some_and(|s| s < 0) {
        return Err(ValidationError::new("sortOrder must be a non-negative integer"));
    }
    for (field, value) in bounded {
        max_length(field, value, MAX_KEY_LENGTH)?;
    }
    for (field, value) in urls {
        optional_url(field, value)?;
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn input() -> PaymentGatewayInput {
        serde_json::from_value(serde_json::json!({
            "name": "valitor",
            "displayName": "Valitor",
            "provider": "valitor",
            "website": "https://www.valitor.is"
        }))
        .unwrap()
    }

    #[test]
    fn test_valid_input() {
        let input = input();
        assert!(input.validate().is_ok());
        assert_eq!(input.provider, GatewayProvider::Valitor);
        assert!(input.environment.is_none());
    }

    #[test]
    fn test_rejects_unknown_provider() {
        let result: Result<PaymentGatewayInput, _> = serde_json::from_value(serde_json::json!({
            "name": "x",
            "displayName": "X",
            "provider": "bitcoin"
        }));
        assert!(result.is_err());
    }

    #[test]
    fn test_validation_rules() {
        let mut short = input();
        short.name = "v".to_string();
        assert_eq!(
            short.validate().unwrap_err().to_string(),
            "name must be between 2 and 50 characters"
        );

        let mut bad_url = input();
        bad_url.logo_url = Some("not a url".to_string());
        assert_eq!(
            bad_url.validate().unwrap_err().to_string(),
            "logoUrl must be a valid URL"
        );

        let mut long_key = input();
        long_key.api_key = Some("k".repeat(MAX_KEY_LENGTH + 1));
        assert!(long_key.validate().is_err());

        let update = PaymentGatewayUpdate {
            sort_order: Some(-1),
            ..PaymentGatewayUpdate::default()
        };
        assert!(update.validate().is_err());
        assert!(PaymentGatewayUpdate::default().validate().is_ok());
    }

    #[test]
    fn test_view_masks_and_public_hides_secrets() {
        let cipher = SecretCipher::new("a-test-encryption-key-of-reasonable-length");
        let gateway = PaymentGateway {
            id: PaymentGatewayId::new(1),
            name: "rapyd".to_string(),
            display_name: "Rapyd".to_string(),
            provider: GatewayProvider::Rapyd,
            is_enabled: true,
            is_active: true,
            sort_order: 0,
            config: serde_json::json!({}),
            merchant_id: Some("M-1".to_string()),
            api_key: Some(cipher.encrypt("sk_live_abcd1234").unwrap()),
            secret_key: Some("garbage".to_string()),
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
        };
        assert!(gateway.missing_credentials().is_empty());
        assert_eq!(gateway.secrets().count(), 2);

        let view = PaymentGatewayView::new(gateway.clone(), &cipher);
        assert_eq!(view.api_key.as_deref(), Some("***1234"));
        assert_eq!(view.secret_key.as_deref(), Some("***"));
        assert!(view.webhook_secret.is_none());

        let public = serde_json::to_value(PublicPaymentGateway::from(gateway)).unwrap();
        assert!(public.get("apiKey").is_none());
        assert!(public.get("merchantId").is_none());
        assert_eq!(public["displayName"], "Rapyd");
    }
}
