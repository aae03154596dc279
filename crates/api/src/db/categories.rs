//! Category and subcategory repository.

use std::collections::HashMap;

use sqlx::PgPool;

use olfong_core::{CategoryId, SubcategoryId};

use super::{RepositoryError, conflict_on_unique};
use crate::models::{Category, CategoryInput, CategoryUpdate, Subcategory, SubcategoryInput};
use crate::validation::slugify;

const CATEGORY_CONFLICT: &str = "Category with this name or slug already exists";
const SUBCATEGORY_CONFLICT: &str = "Subcategory with this slug already exists in this category";

const SELECT_CATEGORY: &str = r"
    SELECT c.*,
           (SELECT COUNT(*) FROM products p WHERE p.category_id = c.id) AS product_count
    FROM categories c
";

/// Repository for category database operations.
pub struct CategoryRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CategoryRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// List categories by sort order then name, with their subcategories.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self, include_inactive: bool) -> Result<Vec<Category>, RepositoryError> {
        let sql = format!(
            "{SELECT_CATEGORY} WHERE ($1 OR c.is_active) ORDER BY c.sort_order, c.name"
        );
        let categories = sqlx::query_as::<_, Category>(&sql)
            .bind(include_inactive)
            .fetch_all(self.pool)
            .await?;
        self.attach_subcategories(categories, include_inactive).await
    }

    /// Active categories that contain at least one active product.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_with_products(&self) -> Result<Vec<Category>, RepositoryError> {
        let sql = format!(
            "{SELECT_CATEGORY} WHERE c.is_active AND EXISTS (
                SELECT 1 FROM products p WHERE p.category_id = c.id AND p.is_active
            ) ORDER BY c.sort_order, c.name"
        );
        let categories = sqlx::query_as::<_, Category>(&sql)
            .fetch_all(self.pool)
            .await?;
        self.attach_subcategories(categories, false).await
    }

    async fn attach_subcategories(
        &self,
        mut categories: Vec<Category>,
        include_inactive: bool,
    ) -> Result<Vec<Category>, RepositoryError> {
        let ids: Vec<i32> = categories.iter().map(|c| c.id.as_i32()).collect();
        let subcategories = sqlx::query_as::<_, Subcategory>(
            r"
            SELECT * FROM subcategories
            WHERE category_id = ANY($1) AND ($2 OR is_active)
            ORDER BY sort_order, name
            ",
        )
        .bind(&ids)
        .bind(include_inactive)
        .fetch_all(self.pool)
        .await?;

        let mut by_category: HashMap<CategoryId, Vec<Subcategory>> = HashMap::new();
        for sub in subcategories {
            by_category.entry(sub.category_id).or_default().push(sub);
        }
        for category in &mut categories {
            category.subcategories = by_category.remove(&category.id).unwrap_or_default();
        }
        Ok(categories)
    }

    async fn with_subcategories(
        &self,
        category: Option<Category>,
    ) -> Result<Option<Category>, RepositoryError> {
        match category {
            Some(category) => Ok(self
                .attach_subcategories(vec![category], true)
                .await?
                .pop()),
            None => Ok(None),
        }
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: CategoryId) -> Result<Option<Category>, RepositoryError> {
        let sql = format!("{SELECT_CATEGORY} WHERE c.id = $1");
        let category = sqlx::query_as::<_, Category>(&sql)
            .bind(id)
            .fetch_optional(self.pool)
            .await?;
        self.with_subcategories(category).await
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_slug(&self, slug: &str) -> Result<Option<Category>, RepositoryError> {
        let sql = format!("{SELECT_CATEGORY} WHERE c.slug = $1");
        let category = sqlx::query_as::<_, Category>(&sql)
            .bind(slug)
            .fetch_optional(self.pool)
            .await?;
        self.with_subcategories(category).await
    }

    /// Find a category by name, ignoring case.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn find_id_by_name(&self, name: &str) -> Result<Option<CategoryId>, RepositoryError> {
        let id = sqlx::query_scalar::<_, CategoryId>(
            "SELECT id FROM categories WHERE UPPER(name) = UPPER($1)",
        )
        .bind(name.trim())
        .fetch_optional(self.pool)
        .await?;
        Ok(id)
    }

    /// Find a category by name, creating a bare one if missing.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn ensure(&self, name: &str) -> Result<CategoryId, RepositoryError> {
        if let Some(id) = self.find_id_by_name(name).await? {
            return Ok(id);
        }
        let name = name.trim().to_uppercase();
        let id = sqlx::query_scalar::<_, CategoryId>(
            r"
            INSERT INTO categories (name, name_is, slug)
            VALUES ($1, $1, $2)
            ON CONFLICT (name) DO UPDATE SET name = EXCLUDED.name
            RETURNING id
            ",
        )
        .bind(&name)
        .bind(slugify(&name))
        .fetch_one(self.pool)
        .await?;
        tracing::info!(category = %name, "Created category");
        Ok(id)
    }

    /// Insert a category. `input.name` is expected upper-cased and `slug`
    /// validated by the caller.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the name or slug is taken.
    pub async fn create(
        &self,
        input: &CategoryInput,
        slug: &str,
    ) -> Result<Category, RepositoryError> {
        let id = sqlx::query_scalar::<_, CategoryId>(
            r"
            INSERT INTO categories (
                name, name_is, slug, description, description_is, icon, image_url, media_id,
                sort_order, is_active, meta_title, meta_title_is, meta_description,
                meta_description_is, has_discount, discount_percentage, discount_start_date,
                discount_end_date, vat_profile_id
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, COALESCE($9, 0), COALESCE($10, TRUE),
                    $11, $12, $13, $14, COALESCE($15, FALSE), $16, $17, $18, $19)
            RETURNING id
            ",
        )
        .bind(&input.name)
        .bind(&input.name_is)
        .bind(slug)
        .bind(&input.description)
        .bind(&input.description_is)
        .bind(&input.icon)
        .bind(&input.image_url)
        .bind(input.media_id)
        .bind(input.sort_order)
        .bind(input.is_active)
        .bind(&input.meta_title)
        .bind(&input.meta_title_is)
        .bind(&input.meta_description)
        .bind(&input.meta_description_is)
        .bind(input.has_discount)
        .bind(input.discount_percentage)
        .bind(input.discount_start_date)
        .bind(input.discount_end_date)
        .bind(input.vat_profile_id)
        .fetch_one(self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, CATEGORY_CONFLICT))?;

        self.get(id).await?.ok_or(RepositoryError::NotFound)
    }

    /// Apply a partial update.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the category doesn't exist.
    /// Returns `RepositoryError::Conflict` if the name or slug is taken.
    pub async fn update(
        &self,
        id: CategoryId,
        update: &CategoryUpdate,
    ) -> Result<Category, RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE categories SET
                name = COALESCE($2, name),
                name_is = COALESCE($3, name_is),
                slug = COALESCE($4, slug),
                description = COALESCE($5, description),
                description_is = COALESCE($6, description_is),
                icon = COALESCE($7, icon),
                image_url = COALESCE($8, image_url),
                media_id = COALESCE($9, media_id),
                sort_order = COALESCE($10, sort_order),
                is_active = COALESCE($11, is_active),
                meta_title = COALESCE($12, meta_title),
                meta_title_is = COALESCE($13, meta_title_is),
                meta_description = COALESCE($14, meta_description),
                meta_description_is = COALESCE($15, meta_description_is),
                has_discount = COALESCE($16, has_discount),
                discount_percentage = COALESCE($17, discount_percentage),
                discount_start_date = COALESCE($18, discount_start_date),
                discount_end_date = COALESCE($19, discount_end_date),
                vat_profile_id = COALESCE($20, vat_profile_id),
                updated_at = NOW()
            WHERE id = $1
            ",
        )
        .bind(id)
        .bind(&update.name)
        .bind(&update.name_is)
        .bind(&update.slug)
        .bind(&update.description)
        .bind(&update.description_is)
        .bind(&update.icon)
        .bind(&update.image_url)
        .bind(update.media_id)
        .bind(update.sort_order)
        .bind(update.is_active)
        .bind(&update.meta_title)
        .bind(&update.meta_title_is)
        .bind(&update.meta_description)
        .bind(&update.meta_description_is)
        .bind(update.has_discount)
        .bind(update.discount_percentage)
        .bind(update.discount_start_date)
        .bind(update.discount_end_date)
        .bind(update.vat_profile_id)
        .execute(self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, CATEGORY_CONFLICT))?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        self.get(id).await?.ok_or(RepositoryError::NotFound)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the category doesn't exist.
    pub async fn delete(&self, id: CategoryId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM categories WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Subcategories
    // -------------------------------------------------------------------------

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn subcategories(
        &self,
        category_id: CategoryId,
    ) -> Result<Vec<Subcategory>, RepositoryError> {
        let rows = sqlx::query_as::<_, Subcategory>(
            "SELECT * FROM subcategories WHERE category_id = $1 ORDER BY sort_order, name",
        )
        .bind(category_id)
        .fetch_all(self.pool)
        .await?;
        Ok(rows)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_subcategory(
        &self,
        id: SubcategoryId,
    ) -> Result<Option<Subcategory>, RepositoryError> {
        let row = sqlx::query_as::<_, Subcategory>("SELECT * FROM subcategories WHERE id = $1")
            .bind(id)
            .fetch_optional(self.pool)
            .await?;
        Ok(row)
    }

    /// Insert a subcategory with already validated name and slug.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the slug is taken in the category.
    pub async fn create_subcategory(
        &self,
        category_id: CategoryId,
        name: &str,
        name_is: &str,
        slug: &str,
        input: &SubcategoryInput,
    ) -> Result<Subcategory, RepositoryError> {
        let row = sqlx::query_as::<_, Subcategory>(
            r"
            INSERT INTO subcategories (
                category_id, name, name_is, slug, description, description_is, sort_order,
                is_active
            )
            VALUES ($1, $2, $3, $4, $5, $6, COALESCE($7, 0), COALESCE($8, TRUE))
            RETURNING *
            ",
        )
        .bind(category_id)
        .bind(name)
        .bind(name_is)
        .bind(slug)
        .bind(&input.description)
        .bind(&input.description_is)
        .bind(input.sort_order)
        .bind(input.is_active)
        .fetch_one(self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, SUBCATEGORY_CONFLICT))?;
        Ok(row)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the subcategory doesn't exist.
    pub async fn update_subcategory(
        &self,
        id: SubcategoryId,
        input: &SubcategoryInput,
    ) -> Result<Subcategory, RepositoryError> {
        sqlx::query_as::<_, Subcategory>(
            r"
            UPDATE subcategories SET
                name = COALESCE($2, name),
                name_is = COALESCE($3, name_is),
                slug = COALESCE($4, slug),
                description = COALESCE($5, description),
                description_is = COALESCE($6, description_is),
                sort_order = COALESCE($7, sort_order),
                is_active = COALESCE($8, is_active),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            ",
        )
        .bind(id)
        .bind(&input.name)
        .bind(&input.name_is)
        .bind(&input.slug)
        .bind(&input.description)
        .bind(&input.description_is)
        .bind(input.sort_order)
        .bind(input.is_active)
        .fetch_optional(self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, SUBCATEGORY_CONFLICT))?
        .ok_or(RepositoryError::NotFound)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the subcategory doesn't exist.
    pub async fn delete_subcategory(&self, id: SubcategoryId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM subcategories WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Number of products filed under a subcategory.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn subcategory_product_count(
        &self,
        id: SubcategoryId,
    ) -> Result<i64, RepositoryError> {
        let count =
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM products WHERE subcategory_id = $1")
                .bind(id)
                .fetch_one(self.pool)
                .await?;
        Ok(count)
    }
}
