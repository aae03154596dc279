//! Seed reference data: payment gateways, shipping options, VAT profiles
//! and base categories.
//!
//! Every seed is idempotent and can be re-run after a deploy.

use std::path::Path;

use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::{info, warn};

use olfong_api::db::payment_gateways::SealedSecrets;
use olfong_api::db::{
    CategoryRepository, PaymentGatewayRepository, ShippingRepository, VatProfileRepository,
};
use olfong_api::models::category::{OFFERS_NAME, OFFERS_SLUG};
use olfong_api::models::{
    CategoryInput, PaymentGatewayInput, PaymentGatewayUpdate, ShippingOptionInput,
    VatProfileInput,
};
use olfong_api::services::crypto::{SecretCipher, seal_submitted};
use olfong_api::validation::slugify;
use olfong_core::ShippingType;

use super::connect;

/// Catalog used when no `--file` is given.
const BUNDLED_GATEWAYS: &str = include_str!("../../seed/payment_gateways.yaml");

#[derive(Debug, Deserialize)]
struct GatewayCatalog {
    gateways: Vec<PaymentGatewayInput>,
}

fn parse_catalog(yaml: &str) -> Result<Vec<PaymentGatewayInput>, Box<dyn std::error::Error>> {
    let catalog: GatewayCatalog = serde_yaml::from_str(yaml)?;
    for gateway in &catalog.gateways {
        gateway
            .validate()
            .map_err(|e| format!("gateway {}: {e}", gateway.name))?;
    }
    Ok(catalog.gateways)
}

fn has_secrets(gateway: &PaymentGatewayInput) -> bool {
    [&gateway.api_key, &gateway.secret_key, &gateway.webhook_secret]
        .into_iter()
        .any(|s| s.as_deref().is_some_and(|v| !v.trim().is_empty()))
}

/// Create or refresh the gateway catalog.
///
/// Gateways are matched by name. Descriptive fields are refreshed, while
/// `isEnabled` and stored credentials are kept unless the file sets them.
///
/// # Errors
///
/// Returns an error if the file is unreadable or invalid, if secrets are
/// present without `ENCRYPTION_KEY`, or on database failure.
pub async fn payment_gateways(file: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let yaml = match file {
        Some(path) => {
            info!(path = %path.display(), "Loading payment gateways from file");
            std::fs::read_to_string(path)
                .map_err(|e| format!("Cannot read {}: {e}", path.display()))?
        }
        None => BUNDLED_GATEWAYS.to_owned(),
    };
    let gateways = parse_catalog(&yaml)?;

    let pool = connect().await?;
    let repo = PaymentGatewayRepository::new(&pool);

    let cipher = if gateways.iter().any(has_secrets) {
        let key = std::env::var("ENCRYPTION_KEY")
            .map_err(|_| "ENCRYPTION_KEY must be set to seed gateway secrets")?;
        Some(SecretCipher::new(&key))
    } else {
        None
    };

    for gateway in &gateways {
        let stored = repo.upsert_by_name(gateway).await?;

        if let Some(cipher) = &cipher
            && (has_secrets(gateway) || gateway.merchant_id.is_some())
        {
            let secrets = SealedSecrets {
                api_key: seal_submitted(cipher, gateway.api_key.as_deref())?,
                secret_key: seal_submitted(cipher, gateway.secret_key.as_deref())?,
                webhook_secret: seal_submitted(cipher, gateway.webhook_secret.as_deref())?,
            };
            let update = PaymentGatewayUpdate {
                merchant_id: gateway.merchant_id.clone(),
                ..PaymentGatewayUpdate::default()
            };
            repo.update(stored.id, &update, &secrets).await?;
            info!(gateway = %stored.name, "Stored gateway credentials");
        }

        info!(
            gateway = %stored.name,
            enabled = stored.is_enabled,
            "Seeded payment gateway"
        );
    }

    info!(count = gateways.len(), "Payment gateways seeded");
    Ok(())
}

fn default_shipping_options() -> [ShippingOptionInput; 2] {
    [
        ShippingOptionInput {
            name: "Home delivery".to_owned(),
            name_is: "Heimsending".to_owned(),
            description: Some("Delivered to your door in the capital area".to_owned()),
            description_is: Some("Sent heim að dyrum á höfuðborgarsvæðinu".to_owned()),
            kind: ShippingType::Delivery,
            fee: Decimal::from(1500),
            is_enabled: Some(true),
            estimated_days: Some(1),
            cutoff_time: Some("16:00".to_owned()),
            sort_order: Some(1),
        },
        ShippingOptionInput {
            name: "Store pickup".to_owned(),
            name_is: "Sækja í verslun".to_owned(),
            description: Some("Collect your order in store".to_owned()),
            description_is: Some("Sæktu pöntunina í verslunina".to_owned()),
            kind: ShippingType::Pickup,
            fee: Decimal::ZERO,
            is_enabled: Some(true),
            estimated_days: Some(0),
            cutoff_time: None,
            sort_order: Some(2),
        },
    ]
}

/// Create the default delivery and pickup options if missing.
///
/// # Errors
///
/// Returns an error on database failure.
pub async fn shipping() -> Result<(), Box<dyn std::error::Error>> {
    let pool = connect().await?;
    let repo = ShippingRepository::new(&pool);

    for option in default_shipping_options() {
        match repo.create_if_missing(&option).await? {
            Some(created) => info!(option = %created.name, "Created shipping option"),
            None => info!(option = %option.name, "Shipping option exists, skipped"),
        }
    }
    Ok(())
}

fn default_vat_profiles() -> [VatProfileInput; 2] {
    [
        VatProfileInput {
            name: "Standard".to_owned(),
            name_is: "Almennt þrep".to_owned(),
            description: Some("Standard Icelandic VAT rate".to_owned()),
            description_is: Some("Almennt virðisaukaskattsþrep".to_owned()),
            vat_rate: Decimal::from(24),
            is_default: true,
            sort_order: Some(1),
            category_ids: None,
        },
        VatProfileInput {
            name: "Reduced".to_owned(),
            name_is: "Lægra þrep".to_owned(),
            description: Some("Reduced Icelandic VAT rate".to_owned()),
            description_is: Some("Lægra virðisaukaskattsþrep".to_owned()),
            vat_rate: Decimal::from(11),
            is_default: false,
            sort_order: Some(2),
            category_ids: None,
        },
    ]
}

/// `(name, Icelandic name)` of the base categories.
const BASE_CATEGORIES: [(&str, &str); 6] = [
    ("WINE", "Vín"),
    ("BEERS", "Bjór"),
    ("SPIRITS", "Sterkt áfengi"),
    ("CIDER_RTD", "Síder og blandaðir drykkir"),
    ("NICOTINE", "Nikótínvörur"),
    (OFFERS_NAME, "Tilboðin"),
];

fn category_slug(name: &str) -> String {
    if name == OFFERS_NAME {
        OFFERS_SLUG.to_owned()
    } else {
        slugify(name)
    }
}

/// Create the default VAT profiles and base categories if missing.
///
/// # Errors
///
/// Returns an error on database failure.
pub async fn defaults() -> Result<(), Box<dyn std::error::Error>> {
    let pool = connect().await?;

    let vat = VatProfileRepository::new(&pool);
    let existing = vat.list().await?;
    for profile in default_vat_profiles() {
        if existing.iter().any(|p| p.name == profile.name) {
            info!(profile = %profile.name, "VAT profile exists, skipped");
            continue;
        }
        if profile.is_default && existing.iter().any(|p| p.is_default) {
            warn!(profile = %profile.name, "Another VAT profile is already the default");
        }
        let created = vat
            .create(&VatProfileInput {
                is_default: profile.is_default && !existing.iter().any(|p| p.is_default),
                ..profile
            })
            .await?;
        info!(profile = %created.name, rate = %created.vat_rate, "Created VAT profile");
    }

    let categories = CategoryRepository::new(&pool);
    for (name, name_is) in BASE_CATEGORIES {
        if categories.find_id_by_name(name).await?.is_some() {
            info!(category = name, "Category exists, skipped");
            continue;
        }
        let input = CategoryInput {
            name: name.to_owned(),
            name_is: name_is.to_owned(),
            ..CategoryInput::default()
        };
        let created = categories.create(&input, &category_slug(name)).await?;
        info!(category = %created.name, slug = %created.slug, "Created category");
    }

    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use olfong_core::{GatewayEnvironment, GatewayProvider};

    use super::*;

    #[test]
    fn test_bundled_catalog() {
        let gateways = parse_catalog(BUNDLED_GATEWAYS).unwrap();
        let providers: Vec<_> = gateways.iter().map(|g| g.provider).collect();
        assert_eq!(
            providers,
            vec![
                GatewayProvider::Valitor,
                GatewayProvider::Rapyd,
                GatewayProvider::Stripe,
                GatewayProvider::Paypal,
                GatewayProvider::Netgiro,
            ]
        );
        assert!(gateways.iter().all(|g| g.is_enabled != Some(true)));
        assert!(
            gateways
                .iter()
                .all(|g| g.environment == Some(GatewayEnvironment::Sandbox))
        );
        assert!(!gateways.iter().any(has_secrets));
    }

    #[test]
    fn test_catalog_rejects_invalid_gateway() {
        let yaml = "gateways:\n  - name: x\n    displayName: X\n    provider: stripe\n";
        assert!(parse_catalog(yaml).is_err());
        assert!(parse_catalog("gateways:\n  - name: stripe\n").is_err());
    }

    #[test]
    fn test_secrets_detected() {
        let yaml = "gateways:\n  - name: stripe\n    displayName: Stripe\n    provider: stripe\n    secretKey: sk_test_123\n";
        let gateways = parse_catalog(yaml).unwrap();
        assert!(has_secrets(&gateways[0]));
    }

    #[test]
    fn test_default_data_is_valid() {
        for option in default_shipping_options() {
            option.validate().unwrap();
        }
        let [standard, reduced] = default_vat_profiles();
        assert!(standard.is_default);
        assert_eq!(standard.vat_rate, Decimal::from(24));
        assert_eq!(reduced.vat_rate, Decimal::from(11));
        assert_eq!(category_slug(OFFERS_NAME), OFFERS_SLUG);
        assert_eq!(category_slug("WINE"), "wine");
    }
}
