//! VAT profiles: named tax rates assigned to categories and products.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use olfong_core::{CategoryId, VatProfileId};

/// A named VAT rate.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VatProfile {
    pub id: VatProfileId,
    pub name: String,
    pub name_is: String,
    pub description: Option<String>,
    pub description_is: Option<String>,
    /// Percent, `0..=100`.
    pub vat_rate: Decimal,
    pub is_default: bool,
    pub sort_order: i32,
    /// Categories currently using this profile.
    pub category_ids: Vec<CategoryId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Body of `POST /api/vat-profiles`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VatProfileInput {
    pub name: String,
    pub name_is: String,
    pub description: Option<String>,
    pub description_is: Option<String>,
    pub vat_rate: Decimal,
    #[serde(default)]
    pub is_default: bool,
    pub sort_order: Option<i32>,
    pub category_ids: Option<Vec<CategoryId>>,
}

/// Body of `PUT /api/vat-profiles/{id}`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VatProfileUpdate {
    pub name: Option<String>,
    pub name_is: Option<String>,
    pub description: Option<String>,
    pub description_is: Option<String>,
    pub vat_rate: Option<Decimal>,
    pub is_default: Option<bool>,
    pub sort_order: Option<i32>,
    pub category_ids: Option<Vec<CategoryId>>,
}

/// Whether `rate` is a usable percentage.
#[must_use]
pub fn is_valid_rate(rate: Decimal) -> bool {
    !rate.is_sign_negative() && rate <= Decimal::ONE_HUNDRED
}
