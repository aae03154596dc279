//! Products in the catalog.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use olfong_core::{
    CategoryId, MediaId, PageRequest, ProductId, SubcategoryId, VatBreakdown, VatInfo,
    VatProfileId,
};

use super::SortDirection;

/// Legal drinking age, the default age restriction for new products.
pub const DEFAULT_AGE_RESTRICTION: i32 = 20;
/// Lowest age restriction a product may carry.
pub const MIN_AGE_RESTRICTION: i32 = 18;

/// A sellable product. Prices are VAT-inclusive ISK.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub name_is: String,
    pub description: Option<String>,
    pub description_is: Option<String>,
    pub category_id: CategoryId,
    pub subcategory_id: Option<SubcategoryId>,
    pub price: Decimal,
    pub original_price: Option<Decimal>,
    pub has_discount: bool,
    pub discount_percentage: Option<Decimal>,
    pub discount_start_date: Option<DateTime<Utc>>,
    pub discount_end_date: Option<DateTime<Utc>>,
    pub stock: i32,
    pub alcohol_volume: Option<Decimal>,
    pub volume: Option<String>,
    pub country: Option<String>,
    pub country_is: Option<String>,
    pub producer: Option<String>,
    pub producer_is: Option<String>,
    pub distributor: Option<String>,
    pub distributor_is: Option<String>,
    pub packaging: Option<String>,
    pub packaging_is: Option<String>,
    pub availability: Option<String>,
    pub availability_is: Option<String>,
    pub food_pairings: Vec<String>,
    pub food_pairings_is: Vec<String>,
    pub special_attributes: Vec<String>,
    pub special_attributes_is: Vec<String>,
    pub certifications: Vec<String>,
    pub certifications_is: Vec<String>,
    pub image_url: Option<String>,
    pub media_id: Option<MediaId>,
    pub atvr_product_id: Option<String>,
    pub atvr_url: Option<String>,
    pub atvr_image_url: Option<String>,
    pub age_restriction: i32,
    pub is_active: bool,
    pub is_featured: bool,
    pub vat_profile_id: Option<VatProfileId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A product with its category names and VAT split, for the detail page.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductDetail {
    #[serde(flatten)]
    pub product: Product,
    pub category_name: String,
    pub category_name_is: String,
    pub subcategory_name: Option<String>,
    pub subcategory_name_is: Option<String>,
    pub vat: VatBreakdown,
    pub vat_info: VatInfo,
}

/// Columns the product list can be sorted by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ProductSort {
    Name,
    Price,
    AlcoholVolume,
    #[default]
    CreatedAt,
}

impl ProductSort {
    #[must_use]
    pub const fn column(self) -> &'static str {
        match self {
            Self::Name => "p.name",
            Self::Price => "p.price",
            Self::AlcoholVolume => "p.alcohol_volume",
            Self::CreatedAt => "p.created_at",
        }
    }
}

/// Storefront list filters.
#[derive(Debug, Clone, Default)]
pub struct ProductFilter {
    pub category: Option<String>,
    pub subcategory: Option<String>,
    pub search: Option<String>,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
    pub min_alcohol: Option<Decimal>,
    pub max_alcohol: Option<Decimal>,
    pub sort_by: ProductSort,
    pub sort_order: SortDirection,
    pub page: PageRequest,
}

/// Body of `POST /api/products`.
///
/// The category is given either by id or by an ATVR category name, which is
/// mapped onto the internal categories.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductInput {
    pub name: String,
    pub name_is: String,
    pub description: Option<String>,
    pub description_is: Option<String>,
    pub category_id: Option<CategoryId>,
    pub category: Option<String>,
    pub subcategory_id: Option<SubcategoryId>,
    pub price: Decimal,
    pub original_price: Option<Decimal>,
    pub stock: Option<i32>,
    pub alcohol_volume: Option<Decimal>,
    pub volume: Option<String>,
    pub country: Option<String>,
    pub country_is: Option<String>,
    pub producer: Option<String>,
    pub producer_is: Option<String>,
    pub distributor: Option<String>,
    pub distributor_is: Option<String>,
    pub packaging: Option<String>,
    pub packaging_is: Option<String>,
    pub availability: Option<String>,
    pub availability_is: Option<String>,
    #[serde(default)]
    pub food_pairings: Vec<String>,
    #[serde(default)]
    pub food_pairings_is: Vec<String>,
    #[serde(default)]
    pub special_attributes: Vec<String>,
    #[serde(default)]
    pub special_attributes_is: Vec<String>,
    #[serde(default)]
    pub certifications: Vec<String>,
    #[serde(default)]
    pub certifications_is: Vec<String>,
    pub image_url: Option<String>,
    pub media_id: Option<MediaId>,
    pub atvr_product_id: Option<String>,
    pub atvr_url: Option<String>,
    pub atvr_image_url: Option<String>,
    pub age_restriction: Option<i32>,
    pub is_active: Option<bool>,
    pub is_featured: Option<bool>,
    pub vat_profile_id: Option<VatProfileId>,
}

impl ProductInput {
    /// Check the numeric bounds shared with updates.
    ///
    /// # Errors
    ///
    /// Returns the first violated rule as a message.
    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() || self.name_is.trim().is_empty() {
            return Err("Name and Icelandic name are required".to_string());
        }
        if self.category_id.is_none() && self.category.as_deref().is_none_or(str::is_empty) {
            return Err("Category is required".to_string());
        }
        check_bounds(Some(self.price), self.stock, self.age_restriction)
    }
}

/// Body of `PUT /api/products/{id}`. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductUpdate {
    pub name: Option<String>,
    pub name_is: Option<String>,
    pub description: Option<String>,
    pub description_is: Option<String>,
    pub category_id: Option<CategoryId>,
    pub subcategory_id: Option<SubcategoryId>,
    pub price: Option<Decimal>,
    pub original_price: Option<Decimal>,
    pub stock: Option<i32>,
    pub alcohol_volume: Option<Decimal>,
    pub volume: Option<String>,
    pub country: Option<String>,
    pub country_is: Option<String>,
    pub producer: Option<String>,
    pub producer_is: Option<String>,
    pub distributor: Option<String>,
    pub distributor_is: Option<String>,
    pub packaging: Option<String>,
    pub packaging_is: Option<String>,
    pub availability: Option<String>,
    pub availability_is: Option<String>,
    pub food_pairings: Option<Vec<String>>,
    pub food_pairings_is: Option<Vec<String>>,
    pub special_attributes: Option<Vec<String>>,
    pub special_attributes_is: Option<Vec<String>>,
    pub certifications: Option<Vec<String>>,
    pub certifications_is: Option<Vec<String>>,
    pub image_url: Option<String>,
    pub media_id: Option<MediaId>,
    pub age_restriction: Option<i32>,
    pub is_active: Option<bool>,
    pub is_featured: Option<bool>,
    pub vat_profile_id: Option<VatProfileId>,
}

impl ProductUpdate {
    /// # Errors
    ///
    /// Returns the first violated rule as a message.
    pub fn validate(&self) -> Result<(), String> {
        if self.name.as_deref().is_some_and(|n| n.trim().is_empty())
            || self.name_is.as_deref().is_some_and(|n| n.trim().is_empty())
        {
            return Err("Name cannot be empty".to_string());
        }
        check_bounds(self.price, self.stock, self.age_restriction)
    }
}

fn check_bounds(
    price: Option<Decimal>,
    stock: Option<i32>,
    age_restriction: Option<i32>,
) -> Result<(), String> {
    if price.is_some_and(|p| p.is_sign_negative()) {
        return Err("Price cannot be negative".to_string());
    }
    if stock.is_some_and(|s| s < 0) {
        return Err("Stock cannot be negative".to_string());
    }
    if age_restriction.is_some_and(|a| a < MIN_AGE_RESTRICTION) {
        return Err(format!(
            "Age restriction must be at least {MIN_AGE_RESTRICTION}"
        ));
    }
    Ok(())
}

/// Body of `POST /api/products/{id}/discount`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscountInput {
    pub original_price: Decimal,
    pub discount_percentage: Decimal,
    pub discount_start_date: Option<DateTime<Utc>>,
    pub discount_end_date: Option<DateTime<Utc>>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn input() -> ProductInput {
        ProductInput {
            name: "Egils Gull".to_string(),
            name_is: "Egils Gull".to_string(),
            category_id: Some(CategoryId::new(2)),
            price: Decimal::from(399),
            ..ProductInput::default()
        }
    }

    #[test]
    fn test_create_validation() {
        assert!(input().validate().is_ok());

        let mut no_category = input();
        no_category.category_id = None;
        assert_eq!(no_category.validate().unwrap_err(), "Category is required");
        no_category.category = Some("Bjór".to_string());
        assert!(no_category.validate().is_ok());

        let mut negative = input();
        negative.price = Decimal::from(-1);
        assert_eq!(negative.validate().unwrap_err(), "Price cannot be negative");

        let mut too_young = input();
        too_young.age_restriction = Some(16);
        assert!(too_young.validate().is_err());
    }

    #[test]
    fn test_update_validation() {
        assert!(ProductUpdate::default().validate().is_ok());
        let update = ProductUpdate {
            stock: Some(-5),
            ..ProductUpdate::default()
        };
        assert_eq!(update.validate().unwrap_err(), "Stock cannot be negative");
        let update = ProductUpdate {
            name: Some("  ".to_string()),
            ..ProductUpdate::default()
        };
        assert!(update.validate().is_err());
    }

    #[test]
    fn test_sort_parses_camel_case() {
        let sort: ProductSort = serde_json::from_str("\"alcoholVolume\"").unwrap();
        assert_eq!(sort.column(), "p.alcohol_volume");
        assert_eq!(ProductSort::default(), ProductSort::CreatedAt);
    }
}
