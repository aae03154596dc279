//! ATVR (Vínbúðin) catalog search and product import.
//!
//! The public catalog is available in Icelandic and English. Searches and
//! detail lookups hit both sites and fold the two renderings of a product
//! into one bilingual [`AtvrProduct`].
//!
//! - [`catalog`] - Static code tables and the category mapping
//! - [`parser`] - Regex extraction from catalog markup
//! - [`client`] - Cached HTTP client for both language sites
//! - [`import`] - Conversion of selected results into products

pub mod catalog;
pub mod client;
pub mod import;
pub mod parser;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use olfong_core::Locale;

pub use catalog::internal_category_for;
pub use client::{AtvrClient, AtvrError};
pub use import::{ImportFailure, ImportSummary, import_products};

/// A product as scraped from the catalog.
///
/// Language-specific fields carry the value from the matching site; the
/// remaining fields are whichever site supplied them first.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AtvrProduct {
    pub atvr_product_id: String,
    pub atvr_url: Option<String>,
    pub atvr_image_url: Option<String>,
    pub name: Option<String>,
    pub name_is: Option<String>,
    pub description: Option<String>,
    pub description_is: Option<String>,
    pub category: Option<String>,
    #[serde(default)]
    pub subcategories: Vec<String>,
    pub price: Option<Decimal>,
    pub volume: Option<String>,
    pub alcohol_content: Option<Decimal>,
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
}

fn fill<T>(slot: &mut Option<T>, value: Option<T>) {
    if slot.is_none() {
        *slot = value;
    }
}

fn fill_text(slot: &mut Option<String>, value: Option<String>) {
    if slot.as_deref().is_none_or(|s| s.trim().is_empty())
        && let Some(value) = value.filter(|v| !v.trim().is_empty())
    {
        *slot = Some(value);
    }
}

fn union(target: &mut Vec<String>, values: Vec<String>) {
    for value in values {
        if !target.contains(&value) {
            target.push(value);
        }
    }
}

impl AtvrProduct {
    /// Fill empty fields from `other` and union the list fields.
    pub fn absorb(&mut self, other: Self) {
        fill_text(&mut self.atvr_url, other.atvr_url);
        fill_text(&mut self.atvr_image_url, other.atvr_image_url);
        fill_text(&mut self.name, other.name);
        fill_text(&mut self.name_is, other.name_is);
        fill_text(&mut self.description, other.description);
        fill_text(&mut self.description_is, other.description_is);
        fill_text(&mut self.category, other.category);
        fill(&mut self.price, other.price);
        fill_text(&mut self.volume, other.volume);
        fill(&mut self.alcohol_content, other.alcohol_content);
        fill_text(&mut self.country, other.country);
        fill_text(&mut self.country_is, other.country_is);
        fill_text(&mut self.producer, other.producer);
        fill_text(&mut self.producer_is, other.producer_is);
        fill_text(&mut self.distributor, other.distributor);
        fill_text(&mut self.distributor_is, other.distributor_is);
        fill_text(&mut self.packaging, other.packaging);
        fill_text(&mut self.packaging_is, other.packaging_is);
        fill_text(&mut self.availability, other.availability);
        fill_text(&mut self.availability_is, other.availability_is);
        union(&mut self.subcategories, other.subcategories);
        union(&mut self.food_pairings, other.food_pairings);
        union(&mut self.food_pairings_is, other.food_pairings_is);
        union(&mut self.special_attributes, other.special_attributes);
        union(&mut self.special_attributes_is, other.special_attributes_is);
        union(&mut self.certifications, other.certifications);
        union(&mut self.certifications_is, other.certifications_is);
    }

    /// Copy name and description across languages where one side is missing.
    pub fn backfill(&mut self) {
        fill_text(&mut self.name, self.name_is.clone());
        fill_text(&mut self.name_is, self.name.clone());
        fill_text(&mut self.description, self.description_is.clone());
        fill_text(&mut self.description_is, self.description.clone());
    }

    /// Best available display name.
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.name_is
            .as_deref()
            .or(self.name.as_deref())
            .unwrap_or(&self.atvr_product_id)
    }
}

/// Merge search results from both sites by product ID, Icelandic first.
#[must_use]
pub fn merge_search_results(is: Vec<AtvrProduct>, en: Vec<AtvrProduct>) -> Vec<AtvrProduct> {
    let mut merged: Vec<AtvrProduct> = Vec::with_capacity(is.len().max(en.len()));
    for product in is.into_iter().chain(en) {
        match merged
            .iter_mut()
            .find(|p| p.atvr_product_id == product.atvr_product_id)
        {
            Some(existing) => existing.absorb(product),
            None => merged.push(product),
        }
    }
    for product in &mut merged {
        product.backfill();
    }
    merged
}

/// Merge the two detail pages of one product, preferring `language` for the
/// fields both sites provide.
#[must_use]
pub fn merge_detail(
    is: Option<AtvrProduct>,
    en: Option<AtvrProduct>,
    language: Locale,
) -> Option<AtvrProduct> {
    let (preferred, other) = match language {
        Locale::Is => (is, en),
        Locale::En => (en, is),
    };
    let mut product = match (preferred, other) {
        (Some(mut preferred), Some(other)) => {
            preferred.absorb(other);
            preferred
        }
        (Some(only), None) | (None, Some(only)) => only,
        (None, None) => return None,
    };
    product.backfill();
    Some(product)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn product(id: &str) -> AtvrProduct {
        AtvrProduct {
            atvr_product_id: id.to_string(),
            ..AtvrProduct::default()
        }
    }

    #[test]
    fn test_merge_search_results_by_id() {
        let mut is_beer = product("1");
        is_beer.name_is = Some("Gull".to_string());
        is_beer.category = Some("Bjór".to_string());
        is_beer.food_pairings = vec!["Fish".to_string()];
        is_beer.price = Some(Decimal::from(429));

        let mut en_beer = product("1");
        en_beer.name = Some("Gold".to_string());
        en_beer.category = Some("Beer".to_string());
        en_beer.food_pairings = vec!["Fish".to_string(), "Beef".to_string()];
        en_beer.price = Some(Decimal::from(500));

        let mut en_only = product("2");
        en_only.name = Some("Cider".to_string());
        en_only.description = Some("Apple cider".to_string());

        let merged = merge_search_results(vec![is_beer], vec![en_beer, en_only]);
        assert_eq!(merged.len(), 2);

        let beer = &merged[0];
        assert_eq!(beer.name.as_deref(), Some("Gold"));
        assert_eq!(beer.name_is.as_deref(), Some("Gull"));
        assert_eq!(beer.category.as_deref(), Some("Bjór"));
        assert_eq!(beer.price, Some(Decimal::from(429)));
        assert_eq!(beer.food_pairings, vec!["Fish", "Beef"]);

        let cider = &merged[1];
        assert_eq!(cider.name_is.as_deref(), Some("Cider"));
        assert_eq!(cider.description_is.as_deref(), Some("Apple cider"));
    }

    #[test]
    fn test_absorb_replaces_blank_text() {
        let mut target = product("1");
        target.producer = Some("  ".to_string());
        let mut other = product("1");
        other.producer = Some("Ölgerðin".to_string());
        target.absorb(other);
        assert_eq!(target.producer.as_deref(), Some("Ölgerðin"));
    }

    #[test]
    fn test_merge_detail_prefers_language() {
        let mut is = product("7");
        is.name_is = Some("Rauðvín X".to_string());
        is.description_is = Some("Íslensk lýsing".to_string());
        is.category = Some("Rauðvín".to_string());

        let mut en = product("7");
        en.name = Some("Red X".to_string());
        en.description = Some("English description".to_string());
        en.category = Some("Red wine".to_string());

        let merged = merge_detail(Some(is.clone()), Some(en.clone()), Locale::En).unwrap();
        assert_eq!(merged.category.as_deref(), Some("Red wine"));
        assert_eq!(merged.name.as_deref(), Some("Red X"));
        assert_eq!(merged.name_is.as_deref(), Some("Rauðvín X"));
        assert_eq!(merged.description_is.as_deref(), Some("Íslensk lýsing"));

        let merged = merge_detail(Some(is), Some(en), Locale::Is).unwrap();
        assert_eq!(merged.category.as_deref(), Some("Rauðvín"));
        assert_eq!(merged.description.as_deref(), Some("English description"));
    }

    #[test]
    fn test_merge_detail_single_language() {
        let mut is = product("7");
        is.name_is = Some("Bjór".to_string());
        let merged = merge_detail(Some(is), None, Locale::En).unwrap();
        assert_eq!(merged.name.as_deref(), Some("Bjór"));
        assert!(merge_detail(None, None, Locale::Is).is_none());
    }

    #[test]
    fn test_deserialize_import_payload() {
        let json = r#"{"atvrProductId":"01448","nameIs":"Egils Gull","price":"429","category":"Bjór"}"#;
        let product: AtvrProduct = serde_json::from_str(json).unwrap();
        assert_eq!(product.atvr_product_id, "01448");
        assert_eq!(product.price, Some(Decimal::from(429)));
        assert!(product.food_pairings.is_empty());
    }
}
