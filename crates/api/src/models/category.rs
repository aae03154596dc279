//! Product categories and their subcategories.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use olfong_core::{CategoryId, MediaId, SubcategoryId, VatProfileId};

/// Slug of the storefront's offers category, which cannot be deleted.
pub const OFFERS_SLUG: &str = "tilbodin";
/// Name of the offers category.
pub const OFFERS_NAME: &str = "TILBOÐIN";

/// A top-level product category.
///
/// Names are stored upper-case (`WINE`, `BEERS`) and matched
/// case-insensitively by the storefront filters.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    pub name_is: String,
    pub slug: String,
    pub description: Option<String>,
    pub description_is: Option<String>,
    pub icon: Option<String>,
    pub image_url: Option<String>,
    pub media_id: Option<MediaId>,
    pub sort_order: i32,
    pub is_active: bool,
    pub meta_title: Option<String>,
    pub meta_title_is: Option<String>,
    pub meta_description: Option<String>,
    pub meta_description_is: Option<String>,
    pub has_discount: bool,
    pub discount_percentage: Option<Decimal>,
    pub discount_start_date: Option<DateTime<Utc>>,
    pub discount_end_date: Option<DateTime<Utc>>,
    pub vat_profile_id: Option<VatProfileId>,
    /// Number of products in this category.
    pub product_count: i64,
    #[sqlx(skip)]
    pub subcategories: Vec<Subcategory>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Category {
    /// The offers category is referenced by the storefront navigation.
    #[must_use]
    pub fn is_protected(&self) -> bool {
        self.slug == OFFERS_SLUG || self.name == OFFERS_NAME
    }
}

/// A subcategory within a category.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Subcategory {
    pub id: SubcategoryId,
    pub category_id: CategoryId,
    pub name: String,
    pub name_is: String,
    pub slug: String,
    pub description: Option<String>,
    pub description_is: Option<String>,
    pub sort_order: i32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Body of `POST /api/categories`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryInput {
    pub name: String,
    pub name_is: String,
    pub slug: Option<String>,
    pub description: Option<String>,
    pub description_is: Option<String>,
    pub icon: Option<String>,
    pub image_url: Option<String>,
    pub media_id: Option<MediaId>,
    pub sort_order: Option<i32>,
    pub is_active: Option<bool>,
    pub meta_title: Option<String>,
    pub meta_title_is: Option<String>,
    pub meta_description: Option<String>,
    pub meta_description_is: Option<String>,
    pub has_discount: Option<bool>,
    pub discount_percentage: Option<Decimal>,
    pub discount_start_date: Option<DateTime<Utc>>,
    pub discount_end_date: Option<DateTime<Utc>>,
    pub vat_profile_id: Option<VatProfileId>,
}

/// Body of `PUT /api/categories/{id}`. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryUpdate {
    pub name: Option<String>,
    pub name_is: Option<String>,
    pub slug: Option<String>,
    pub description: Option<String>,
    pub description_is: Option<String>,
    pub icon: Option<String>,
    pub image_url: Option<String>,
    pub media_id: Option<MediaId>,
    pub sort_order: Option<i32>,
    pub is_active: Option<bool>,
    pub meta_title: Option<String>,
    pub meta_title_is: Option<String>,
    pub meta_description: Option<String>,
    pub meta_description_is: Option<String>,
    pub has_discount: Option<bool>,
    pub discount_percentage: Option<Decimal>,
    pub discount_start_date: Option<DateTime<Utc>>,
    pub discount_end_date: Option<DateTime<Utc>>,
    pub vat_profile_id: Option<VatProfileId>,
}

/// Body of the subcategory create and update endpoints.
///
/// `name` and `nameIs` are required on create; on update every absent field
/// keeps its current value.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubcategoryInput {
    pub name: Option<String>,
    pub name_is: Option<String>,
    pub slug: Option<String>,
    pub description: Option<String>,
    pub description_is: Option<String>,
    pub sort_order: Option<i32>,
    pub is_active: Option<bool>,
}
