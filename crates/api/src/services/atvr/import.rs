//! Turn selected catalog results into (inactive) products.

use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::PgPool;
use tracing::instrument;

use olfong_core::VatProfileId;

use super::{AtvrProduct, internal_category_for};
use crate::db::{CategoryRepository, ProductRepository, RepositoryError, VatProfileRepository};
use crate::models::Product;
use crate::models::ProductInput;
use crate::models::product::DEFAULT_AGE_RESTRICTION;

#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportSummary {
    pub imported: usize,
    pub skipped: usize,
    pub errors: Vec<ImportFailure>,
    pub products: Vec<Product>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportFailure {
    pub atvr_product_id: String,
    pub name: String,
    pub error: String,
}

impl AtvrProduct {
    /// Build a product draft: no stock, inactive until reviewed.
    ///
    /// # Errors
    ///
    /// Returns a message when the result has no name in either language.
    pub fn to_product_input(
        &self,
        vat_profile_id: Option<VatProfileId>,
    ) -> Result<ProductInput, String> {
        let name = self.name.clone().or_else(|| self.name_is.clone());
        let name_is = self.name_is.clone().or_else(|| self.name.clone());
        let (Some(name), Some(name_is)) = (name, name_is) else {
            return Err("Product name is missing".to_string());
        };

        Ok(ProductInput {
            name,
            name_is,
            description: self.description.clone(),
            description_is: self.description_is.clone(),
            category: self.category.clone(),
            price: self.price.unwrap_or(Decimal::ZERO),
            stock: Some(0),
            alcohol_volume: self.alcohol_content,
            volume: self.volume.clone(),
            country: self.country.clone(),
            country_is: self.country_is.clone(),
            producer: self.producer.clone(),
            producer_is: self.producer_is.clone(),
            distributor: self.distributor.clone(),
            distributor_is: self.distributor_is.clone(),
            packaging: self.packaging.clone(),
            packaging_is: self.packaging_is.clone(),
            availability: self.availability.clone(),
            availability_is: self.availability_is.clone(),
            food_pairings: self.food_pairings.clone(),
            food_pairings_is: self.food_pairings_is.clone(),
            special_attributes: self.special_attributes.clone(),
            special_attributes_is: self.special_attributes_is.clone(),
            certifications: self.certifications.clone(),
            certifications_is: self.certifications_is.clone(),
            image_url: self.atvr_image_url.clone(),
            atvr_product_id: Some(self.atvr_product_id.clone()),
            atvr_url: self.atvr_url.clone(),
            atvr_image_url: self.atvr_image_url.clone(),
            age_restriction: Some(DEFAULT_AGE_RESTRICTION),
            is_active: Some(false),
            is_featured: Some(false),
            vat_profile_id,
            ..ProductInput::default()
        })
    }
}

enum Outcome {
    Imported(Box<Product>),
    Skipped,
}

/// Insert each result in turn. Results whose ATVR ID already exists are
/// skipped; per-product failures are collected, not propagated.
///
/// # Errors
///
/// Returns `RepositoryError` only if the default VAT profile lookup fails.
#[instrument(skip(pool, products), fields(count = products.len()))]
pub async fn import_products(
    pool: &PgPool,
    products: Vec<AtvrProduct>,
) -> Result<ImportSummary, RepositoryError> {
    let default_vat = VatProfileRepository::new(pool).default_id().await?;
    let mut summary = ImportSummary::default();

    for atvr in products {
        match import_one(pool, &atvr, default_vat).await {
            Ok(Outcome::Imported(product)) => {
                summary.imported += 1;
                summary.products.push(*product);
            }
            Ok(Outcome::Skipped) => summary.skipped += 1,
            Err(error) => {
                tracing::warn!(atvr_product_id = %atvr.atvr_product_id, %error, "ATVR import failed");
                summary.errors.push(ImportFailure {
                    atvr_product_id: atvr.atvr_product_id.clone(),
                    name: atvr.display_name().to_string(),
                    error,
                });
            }
        }
    }

    tracing::info!(
        imported = summary.imported,
        skipped = summary.skipped,
        failed = summary.errors.len(),
        "ATVR import finished"
    );
    Ok(summary)
}

async fn import_one(
    pool: &PgPool,
    atvr: &AtvrProduct,
    default_vat: Option<VatProfileId>,
) -> Result<Outcome, String> {
    if atvr.atvr_product_id.trim().is_empty() {
        return Err("ATVR product ID is missing".to_string());
    }

    let products = ProductRepository::new(pool);
    if products
        .exists_by_atvr_id(&atvr.atvr_product_id)
        .await
        .map_err(|e| e.to_string())?
    {
        return Ok(Outcome::Skipped);
    }

    let input = atvr.to_product_input(default_vat)?;
    let category_name = internal_category_for(atvr.category.as_deref().unwrap_or_default());
    let category_id = CategoryRepository::new(pool)
        .ensure(&category_name)
        .await
        .map_err(|e| e.to_string())?;

    match products.create(&input, category_id).await {
        Ok(product) => Ok(Outcome::Imported(Box::new(product))),
        Err(RepositoryError::Conflict(_)) => Ok(Outcome::Skipped),
        Err(e) => Err(e.to_string()),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_to_product_input_defaults() {
        let atvr = AtvrProduct {
            atvr_product_id: "01448".to_string(),
            name_is: Some("Egils Gull".to_string()),
            category: Some("Bjór".to_string()),
            price: Some(Decimal::from(429)),
            alcohol_content: Some(Decimal::from(5)),
            atvr_image_url: Some("https://www.vinbudin.is/x.jpg".to_string()),
            ..AtvrProduct::default()
        };
        let input = atvr.to_product_input(Some(VatProfileId::new(1))).unwrap();
        assert_eq!(input.name, "Egils Gull");
        assert_eq!(input.name_is, "Egils Gull");
        assert_eq!(input.price, Decimal::from(429));
        assert_eq!(input.stock, Some(0));
        assert_eq!(input.is_active, Some(false));
        assert_eq!(input.age_restriction, Some(20));
        assert_eq!(input.vat_profile_id, Some(VatProfileId::new(1)));
        assert_eq!(input.atvr_product_id.as_deref(), Some("01448"));
        assert_eq!(input.image_url, input.atvr_image_url);
        assert!(input.validate().is_ok());
    }

    #[test]
    fn test_to_product_input_requires_name() {
        let atvr = AtvrProduct {
            atvr_product_id: "1".to_string(),
            ..AtvrProduct::default()
        };
        assert_eq!(
            atvr.to_product_input(None).unwrap_err(),
            "Product name is missing"
        );
    }
}
