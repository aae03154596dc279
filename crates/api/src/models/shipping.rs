//! Shipping options offered at checkout.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use olfong_core::{ShippingOptionId, ShippingType};

use crate::validation::is_hhmm;

/// A delivery or pickup option.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ShippingOption {
    pub id: ShippingOptionId,
    pub name: String,
    pub name_is: String,
    pub description: Option<String>,
    pub description_is: Option<String>,
    #[sqlx(rename = "type")]
    #[serde(rename = "type")]
    pub kind: ShippingType,
    pub fee: Decimal,
    pub is_enabled: bool,
    pub estimated_days: Option<i32>,
    /// Last order time for same-day handling, `HH:MM`.
    pub cutoff_time: Option<String>,
    pub sort_order: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Body of `POST /api/shipping`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShippingOptionInput {
    pub name: String,
    pub name_is: String,
    pub description: Option<String>,
    pub description_is: Option<String>,
    #[serde(rename = "type", default)]
    pub kind: ShippingType,
    #[serde(default)]
    pub fee: Decimal,
    pub is_enabled: Option<bool>,
    pub estimated_days: Option<i32>,
    pub cutoff_time: Option<String>,
    pub sort_order: Option<i32>,
}

impl ShippingOptionInput {
    /// # Errors
    ///
    /// Returns the first violated rule as a message.
    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() || self.name_is.trim().is_empty() {
            return Err("Name and Icelandic name are required".to_string());
        }
        check_fields(Some(self.fee), self.cutoff_time.as_deref())
    }
}

/// Body of `PUT /api/shipping/{id}`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShippingOptionUpdate {
    pub name: Option<String>,
    pub name_is: Option<String>,
    pub description: Option<String>,
    pub description_is: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<ShippingType>,
    pub fee: Option<Decimal>,
    pub is_enabled: Option<bool>,
    pub estimated_days: Option<i32>,
    pub cutoff_time: Option<String>,
    pub sort_order: Option<i32>,
}

impl ShippingOptionUpdate {
    /// # Errors
    ///
    /// Returns the first violated rule as a message.
    pub fn validate(&self) -> Result<(), String> {
        check_fields(self.fee, self.cutoff_time.as_deref())
    }
}

fn check_fields(fee: Option<Decimal>, cutoff_time: Option<&str>) -> Result<(), String> {
    if fee.is_some_and(|f| f.is_sign_negative()) {
        return Err("Fee cannot be negative".to_string());
    }
    if cutoff_time.is_some_and(|t| !t.is_empty() && !is_hhmm(t)) {
        return Err("Cutoff time must be in HH:MM format".to_string());
    }
    Ok(())
}
