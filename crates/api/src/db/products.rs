//! Product repository.
//!
//! String lists (food pairings, attributes, certifications) are stored as
//! JSONB arrays. The effective VAT rate of a product is resolved in SQL:
//! product profile, then category profile, then the default profile, then
//! the standard 24% rate.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::types::Json;
use sqlx::{PgPool, Postgres, QueryBuilder};

use olfong_core::{
    CategoryId, MediaId, ProductId, SubcategoryId, VatInfo, VatProfileId, vat_breakdown,
};

use super::{RepositoryError, conflict_on_unique};
use crate::models::{Product, ProductDetail, ProductFilter, ProductInput, ProductUpdate};

const ATVR_CONFLICT: &str = "A product with this ATVR product ID already exists";

/// Joins needed by [`EFFECTIVE_VAT_RATE`].
const VAT_JOINS: &str = r"
    JOIN categories c ON c.id = p.category_id
    LEFT JOIN subcategories s ON s.id = p.subcategory_id
    LEFT JOIN vat_profiles pv ON pv.id = p.vat_profile_id
    LEFT JOIN vat_profiles cv ON cv.id = c.vat_profile_id
    LEFT JOIN vat_profiles dv ON dv.is_default
";

const EFFECTIVE_VAT_RATE: &str =
    "COALESCE(pv.vat_rate, cv.vat_rate, dv.vat_rate, 24) AS effective_vat_rate";

// =============================================================================
// Internal Row Types
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
struct ProductRow {
    id: ProductId,
    name: String,
    name_is: String,
    description: Option<String>,
    description_is: Option<String>,
    category_id: CategoryId,
    subcategory_id: Option<SubcategoryId>,
    price: Decimal,
    original_price: Option<Decimal>,
    has_discount: bool,
    discount_percentage: Option<Decimal>,
    discount_start_date: Option<DateTime<Utc>>,
    discount_end_date: Option<DateTime<Utc>>,
    stock: i32,
    alcohol_volume: Option<Decimal>,
    volume: Option<String>,
    country: Option<String>,
    country_is: Option<String>,
    producer: Option<String>,
    producer_is: Option<String>,
    distributor: Option<String>,
    distributor_is: Option<String>,
    packaging: Option<String>,
    packaging_is: Option<String>,
    availability: Option<String>,
    availability_is: Option<String>,
    food_pairings: Json<Vec<String>>,
    food_pairings_is: Json<Vec<String>>,
    special_attributes: Json<Vec<String>>,
    special_attributes_is: Json<Vec<String>>,
    certifications: Json<Vec<String>>,
    certifications_is: Json<Vec<String>>,
    image_url: Option<String>,
    media_id: Option<MediaId>,
    atvr_product_id: Option<String>,
    atvr_url: Option<String>,
    atvr_image_url: Option<String>,
    age_restriction: i32,
    is_active: bool,
    is_featured: bool,
    vat_profile_id: Option<VatProfileId>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            name_is: row.name_is,
            description: row.description,
            description_is: row.description_is,
            category_id: row.category_id,
            subcategory_id: row.subcategory_id,
            price: row.price,
            original_price: row.original_price,
            has_discount: row.has_discount,
            discount_percentage: row.discount_percentage,
            discount_start_date: row.discount_start_date,
            discount_end_date: row.discount_end_date,
            stock: row.stock,
            alcohol_volume: row.alcohol_volume,
            volume: row.volume,
            country: row.country,
            country_is: row.country_is,
            producer: row.producer,
            producer_is: row.producer_is,
            distributor: row.distributor,
            distributor_is: row.distributor_is,
            packaging: row.packaging,
            packaging_is: row.packaging_is,
            availability: row.availability,
            availability_is: row.availability_is,
            food_pairings: row.food_pairings.0,
            food_pairings_is: row.food_pairings_is.0,
            special_attributes: row.special_attributes.0,
            special_attributes_is: row.special_attributes_is.0,
            certifications: row.certifications.0,
            certifications_is: row.certifications_is.0,
            image_url: row.image_url,
            media_id: row.media_id,
            atvr_product_id: row.atvr_product_id,
            atvr_url: row.atvr_url,
            atvr_image_url: row.atvr_image_url,
            age_restriction: row.age_restriction,
            is_active: row.is_active,
            is_featured: row.is_featured,
            vat_profile_id: row.vat_profile_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct ProductDetailRow {
    #[sqlx(flatten)]
    product: ProductRow,
    category_name: String,
    category_name_is: String,
    subcategory_name: Option<String>,
    subcategory_name_is: Option<String>,
    effective_vat_rate: Decimal,
}

impl From<ProductDetailRow> for ProductDetail {
    fn from(row: ProductDetailRow) -> Self {
        let vat = vat_breakdown(row.product.price, row.effective_vat_rate);
        Self {
            product: row.product.into(),
            category_name: row.category_name,
            category_name_is: row.category_name_is,
            subcategory_name: row.subcategory_name,
            subcategory_name_is: row.subcategory_name_is,
            vat,
            vat_info: VatInfo::new(row.effective_vat_rate),
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct ProductRateRow {
    #[sqlx(flatten)]
    product: ProductRow,
    effective_vat_rate: Decimal,
}

fn push_filters(qb: &mut QueryBuilder<'_, Postgres>, filter: &ProductFilter) {
    if let Some(category) = filter.category.as_deref().filter(|c| !c.is_empty()) {
        qb.push(" AND UPPER(c.name) = UPPER(")
            .push_bind(category.to_string())
            .push(")");
    }
    if let Some(subcategory) = filter.subcategory.as_deref().filter(|s| !s.is_empty()) {
        qb.push(" AND UPPER(s.name) = UPPER(")
            .push_bind(subcategory.to_string())
            .push(")");
    }
    if let Some(search) = filter.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        let pattern = format!("%{search}%");
        qb.push(" AND (p.name ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR p.name_is ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR p.description ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR p.description_is ILIKE ")
            .push_bind(pattern)
            .push(")");
    }
    if let Some(min) = filter.min_price {
        qb.push(" AND p.price >= ").push_bind(min);
    }
    if let Some(max) = filter.max_price {
        qb.push(" AND p.price <= ").push_bind(max);
    }
    if let Some(min) = filter.min_alcohol {
        qb.push(" AND p.alcohol_volume >= ").push_bind(min);
    }
    if let Some(max) = filter.max_alcohol {
        qb.push(" AND p.alcohol_volume <= ").push_bind(max);
    }
}

// =============================================================================
// Repository
// =============================================================================

pub struct ProductRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ProductRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Active products matching `filter`, with the total match count.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self, filter: &ProductFilter) -> Result<(Vec<Product>, i64), RepositoryError> {
        let base = r"
            FROM products p
            JOIN categories c ON c.id = p.category_id
            LEFT JOIN subcategories s ON s.id = p.subcategory_id
            WHERE p.is_active
        ";

        let mut count = QueryBuilder::<Postgres>::new(format!("SELECT COUNT(*) {base}"));
        push_filters(&mut count, filter);
        let total: i64 = count.build_query_scalar().fetch_one(self.pool).await?;

        let mut query = QueryBuilder::<Postgres>::new(format!("SELECT p.* {base}"));
        push_filters(&mut query, filter);
        query
            .push(format!(
                " ORDER BY {} {} NULLS LAST, p.id",
                filter.sort_by.column(),
                filter.sort_order.as_sql()
            ))
            .push(" LIMIT ")
            .push_bind(filter.page.limit())
            .push(" OFFSET ")
            .push_bind(filter.page.offset());

        let rows: Vec<ProductRow> = query.build_query_as().fetch_all(self.pool).await?;
        Ok((rows.into_iter().map(Into::into).collect(), total))
    }

    /// Active products with a discount whose window contains `now`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn discounted(&self, now: DateTime<Utc>) -> Result<Vec<Product>, RepositoryError> {
        let rows = sqlx::query_as::<_, ProductRow>(
            r"
            SELECT * FROM products
            WHERE is_active AND has_discount
              AND (discount_start_date IS NULL OR discount_start_date <= $1)
              AND (discount_end_date IS NULL OR discount_end_date >= $1)
            ORDER BY discount_percentage DESC NULLS LAST, id
            ",
        )
        .bind(now)
        .fetch_all(self.pool)
        .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        let row = sqlx::query_as::<_, ProductRow>("SELECT * FROM products WHERE id = $1")
            .bind(id)
            .fetch_optional(self.pool)
            .await?;
        Ok(row.map(Into::into))
    }

    /// Product with category names and the VAT split of its price.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn detail(&self, id: ProductId) -> Result<Option<ProductDetail>, RepositoryError> {
        let sql = format!(
            r"
            SELECT p.*, c.name AS category_name, c.name_is AS category_name_is,
                   s.name AS subcategory_name, s.name_is AS subcategory_name_is,
                   {EFFECTIVE_VAT_RATE}
            FROM products p
            {VAT_JOINS}
            WHERE p.id = $1
            "
        );
        let row = sqlx::query_as::<_, ProductDetailRow>(&sql)
            .bind(id)
            .fetch_optional(self.pool)
            .await?;
        Ok(row.map(Into::into))
    }

    /// Products with their effective VAT rate, for pricing an order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_with_vat_rates(
        &self,
        ids: &[ProductId],
    ) -> Result<Vec<(Product, Decimal)>, RepositoryError> {
        let sql = format!(
            r"
            SELECT p.*, {EFFECTIVE_VAT_RATE}
            FROM products p
            {VAT_JOINS}
            WHERE p.id = ANY($1)
            "
        );
        let rows = sqlx::query_as::<_, ProductRateRow>(&sql)
            .bind(ids)
            .fetch_all(self.pool)
            .await?;
        Ok(rows
            .into_iter()
            .map(|row| (row.product.into(), row.effective_vat_rate))
            .collect())
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn exists_by_atvr_id(&self, atvr_product_id: &str) -> Result<bool, RepositoryError> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM products WHERE atvr_product_id = $1)",
        )
        .bind(atvr_product_id)
        .fetch_one(self.pool)
        .await?;
        Ok(exists)
    }

    /// Insert a product into `category_id`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the ATVR product ID is taken.
    pub async fn create(
        &self,
        input: &ProductInput,
        category_id: CategoryId,
    ) -> Result<Product, RepositoryError> {
        let row = sqlx::query_as::<_, ProductRow>(
            r"
            INSERT INTO products (
                name, name_is, description, description_is, category_id, subcategory_id,
                price, original_price, stock, alcohol_volume, volume,
                country, country_is, producer, producer_is, distributor, distributor_is,
                packaging, packaging_is, availability, availability_is,
                food_pairings, food_pairings_is, special_attributes, special_attributes_is,
                certifications, certifications_is, image_url, media_id,
                atvr_product_id, atvr_url, atvr_image_url, age_restriction,
                is_active, is_featured, vat_profile_id
            )
            VALUES (
                $1, $2, $3, $4, $5, $6, $7, $8, COALESCE($9, 0), $10, $11,
                $12, $13, $14, $15, $16, $17, $18, $19, $20, $21,
                $22, $23, $24, $25, $26, $27, $28, $29,
                $30, $31, $32, COALESCE($33, 20), COALESCE($34, TRUE), COALESCE($35, FALSE), $36
            )
            RETURNING *
            ",
        )
        .bind(input.name.trim())
        .bind(input.name_is.trim())
        .bind(&input.description)
        .bind(&input.description_is)
        .bind(category_id)
        .bind(input.subcategory_id)
        .bind(input.price)
        .bind(input.original_price)
        .bind(input.stock)
        .bind(input.alcohol_volume)
        .bind(&input.volume)
        .bind(&input.country)
        .bind(&input.country_is)
        .bind(&input.producer)
        .bind(&input.producer_is)
        .bind(&input.distributor)
        .bind(&input.distributor_is)
        .bind(&input.packaging)
        .bind(&input.packaging_is)
        .bind(&input.availability)
        .bind(&input.availability_is)
        .bind(Json(&input.food_pairings))
        .bind(Json(&input.food_pairings_is))
        .bind(Json(&input.special_attributes))
        .bind(Json(&input.special_attributes_is))
        .bind(Json(&input.certifications))
        .bind(Json(&input.certifications_is))
        .bind(&input.image_url)
        .bind(input.media_id)
        .bind(&input.atvr_product_id)
        .bind(&input.atvr_url)
        .bind(&input.atvr_image_url)
        .bind(input.age_restriction)
        .bind(input.is_active)
        .bind(input.is_featured)
        .bind(input.vat_profile_id)
        .fetch_one(self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, ATVR_CONFLICT))?;

        tracing::info!(product_id = %row.id, name = %row.name, "Created product");
        Ok(row.into())
    }

    /// Apply a partial update.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product doesn't exist.
    pub async fn update(
        &self,
        id: ProductId,
        update: &ProductUpdate,
    ) -> Result<Product, RepositoryError> {
        sqlx::query_as::<_, ProductRow>(
            r"
            UPDATE products SET
                name = COALESCE($2, name),
                name_is = COALESCE($3, name_is),
                description = COALESCE($4, description),
                description_is = COALESCE($5, description_is),
                category_id = COALESCE($6, category_id),
                subcategory_id = COALESCE($7, subcategory_id),
                price = COALESCE($8, price),
                original_price = COALESCE($9, original_price),
                stock = COALESCE($10, stock),
                alcohol_volume = COALESCE($11, alcohol_volume),
                volume = COALESCE($12, volume),
                country = COALESCE($13, country),
                country_is = COALESCE($14, country_is),
                producer = COALESCE($15, producer),
                producer_is = COALESCE($16, producer_is),
                distributor = COALESCE($17, distributor),
                distributor_is = COALESCE($18, distributor_is),
                packaging = COALESCE($19, packaging),
                packaging_is = COALESCE($20, packaging_is),
                availability = COALESCE($21, availability),
                availability_is = COALESCE($22, availability_is),
                food_pairings = COALESCE($23, food_pairings),
                food_pairings_is = COALESCE($24, food_pairings_is),
                special_attributes = COALESCE($25, special_attributes),
                special_attributes_is = COALESCE($26, special_attributes_is),
                certifications = COALESCE($27, certifications),
                certifications_is = COALESCE($28, certifications_is),
                image_url = COALESCE($29, image_url),
                media_id = COALESCE($30, media_id),
                age_restriction = COALESCE($31, age_restriction),
                is_active = COALESCE($32, is_active),
                is_featured = COALESCE($33, is_featured),
                vat_profile_id = COALESCE($34, vat_profile_id),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            ",
        )
        .bind(id)
        .bind(update.name.as_deref().map(str::trim))
        .bind(update.name_is.as_deref().map(str::trim))
        .bind(&update.description)
        .bind(&update.description_is)
        .bind(update.category_id)
        .bind(update.subcategory_id)
        .bind(update.price)
        .bind(update.original_price)
        .bind(update.stock)
        .bind(update.alcohol_volume)
        .bind(&update.volume)
        .bind(&update.country)
        .bind(&update.country_is)
        .bind(&update.producer)
        .bind(&update.producer_is)
        .bind(&update.distributor)
        .bind(&update.distributor_is)
        .bind(&update.packaging)
        .bind(&update.packaging_is)
        .bind(&update.availability)
        .bind(&update.availability_is)
        .bind(update.food_pairings.as_ref().map(Json))
        .bind(update.food_pairings_is.as_ref().map(Json))
        .bind(update.special_attributes.as_ref().map(Json))
        .bind(update.special_attributes_is.as_ref().map(Json))
        .bind(update.certifications.as_ref().map(Json))
        .bind(update.certifications_is.as_ref().map(Json))
        .bind(&update.image_url)
        .bind(update.media_id)
        .bind(update.age_restriction)
        .bind(update.is_active)
        .bind(update.is_featured)
        .bind(update.vat_profile_id)
        .fetch_optional(self.pool)
        .await?
        .map(Into::into)
        .ok_or(RepositoryError::NotFound)
    }

    /// Number of order lines referencing a product.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn order_item_count(&self, id: ProductId) -> Result<i64, RepositoryError> {
        let count =
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM order_items WHERE product_id = $1")
                .bind(id)
                .fetch_one(self.pool)
                .await?;
        Ok(count)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product doesn't exist.
    pub async fn delete(&self, id: ProductId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Put a product on discount at an already computed `price`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product doesn't exist.
    pub async fn set_discount(
        &self,
        id: ProductId,
        original_price: Decimal,
        percentage: Decimal,
        price: Decimal,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> Result<Product, RepositoryError> {
        sqlx::query_as::<_, ProductRow>(
            r"
            UPDATE products SET
                original_price = $2,
                discount_percentage = $3,
                price = $4,
                discount_start_date = $5,
                discount_end_date = $6,
                has_discount = TRUE,
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            ",
        )
        .bind(id)
        .bind(original_price)
        .bind(percentage)
        .bind(price)
        .bind(start)
        .bind(end)
        .fetch_optional(self.pool)
        .await?
        .map(Into::into)
        .ok_or(RepositoryError::NotFound)
    }

    /// Restore the original price and clear the discount fields.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product doesn't exist.
    pub async fn clear_discount(&self, id: ProductId) -> Result<Product, RepositoryError> {
        sqlx::query_as::<_, ProductRow>(
            r"
            UPDATE products SET
                price = COALESCE(original_price, price),
                original_price = NULL,
                discount_percentage = NULL,
                discount_start_date = NULL,
                discount_end_date = NULL,
                has_discount = FALSE,
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            ",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?
        .map(Into::into)
        .ok_or(RepositoryError::NotFound)
    }

    /// Point the image of every product using `media_id` at `url`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn set_image_for_media(
        &self,
        media_id: MediaId,
        url: &str,
    ) -> Result<u64, RepositoryError> {
        let result = sqlx::query(
            "UPDATE products SET image_url = $2, updated_at = NOW() WHERE media_id = $1",
        )
        .bind(media_id)
        .bind(url)
        .execute(self.pool)
        .await?;
        Ok(result.rows_affected())
    }
}
