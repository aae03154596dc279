//! Shipping option repository.

use sqlx::PgPool;

use olfong_core::ShippingOptionId;

use super::RepositoryError;
use crate::models::{ShippingOption, ShippingOptionInput, ShippingOptionUpdate};

pub struct ShippingRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ShippingRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Enabled options for checkout.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_active(&self) -> Result<Vec<ShippingOption>, RepositoryError> {
        let options = sqlx::query_as::<_, ShippingOption>(
            "SELECT * FROM shipping_options WHERE is_enabled ORDER BY sort_order, name",
        )
        .fetch_all(self.pool)
        .await?;
        Ok(options)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self) -> Result<Vec<ShippingOption>, RepositoryError> {
        let options = sqlx::query_as::<_, ShippingOption>(
            "SELECT * FROM shipping_options ORDER BY sort_order, name",
        )
        .fetch_all(self.pool)
        .await?;
        Ok(options)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: ShippingOptionId) -> Result<Option<ShippingOption>, RepositoryError> {
        let option =
            sqlx::query_as::<_, ShippingOption>("SELECT * FROM shipping_options WHERE id = $1")
                .bind(id)
                .fetch_optional(self.pool)
                .await?;
        Ok(option)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn create(&self, input: &ShippingOptionInput) -> Result<ShippingOption, RepositoryError> {
        let option = sqlx::query_as::<_, ShippingOption>(
            r"
            INSERT INTO shipping_options (
                name, name_is, description, description_is, type, fee, is_enabled,
                estimated_days, cutoff_time, sort_order
            )
            VALUES ($1, $2, $3, $4, $5, $6, COALESCE($7, TRUE), $8, $9, COALESCE($10, 0))
            RETURNING *
            ",
        )
        .bind(input.name.trim())
        .bind(input.name_is.trim())
        .bind(&input.description)
        .bind(&input.description_is)
        .bind(input.kind)
        .bind(input.fee)
        .bind(input.is_enabled)
        .bind(input.estimated_days)
        .bind(input.cutoff_time.as_deref().filter(|t| !t.is_empty()))
        .bind(input.sort_order)
        .fetch_one(self.pool)
        .await?;

        tracing::info!(shipping_option_id = %option.id, name = %option.name, "Created shipping option");
        Ok(option)
    }

    /// Seed helper: insert unless an option with this name exists.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn create_if_missing(
        &self,
        input: &ShippingOptionInput,
    ) -> Result<Option<ShippingOption>, RepositoryError> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM shipping_options WHERE name = $1)",
        )
        .bind(input.name.trim())
        .fetch_one(self.pool)
        .await?;
        if exists {
            return Ok(None);
        }
        self.create(input).await.map(Some)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the option doesn't exist.
    pub async fn update(
        &self,
        id: ShippingOptionId,
        update: &ShippingOptionUpdate,
    ) -> Result<ShippingOption, RepositoryError> {
        sqlx::query_as::<_, ShippingOption>(
            r"
            UPDATE shipping_options SET
                name = COALESCE($2, name),
                name_is = COALESCE($3, name_is),
                description = COALESCE($4, description),
                description_is = COALESCE($5, description_is),
                type = COALESCE($6, type),
                fee = COALESCE($7, fee),
                is_enabled = COALESCE($8, is_enabled),
                estimated_days = COALESCE($9, estimated_days),
                cutoff_time = COALESCE($10, cutoff_time),
                sort_order = COALESCE($11, sort_order),
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
        .bind(update.kind)
        .bind(update.fee)
        .bind(update.is_enabled)
        .bind(update.estimated_days)
        .bind(&update.cutoff_time)
        .bind(update.sort_order)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)
    }

    /// Number of orders placed with this option.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn order_count(&self, id: ShippingOptionId) -> Result<i64, RepositoryError> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM orders WHERE shipping_option_id = $1",
        )
        .bind(id)
        .fetch_one(self.pool)
        .await?;
        Ok(count)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the option doesn't exist.
    pub async fn delete(&self, id: ShippingOptionId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM shipping_options WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Flip `is_enabled`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the option doesn't exist.
    pub async fn toggle(&self, id: ShippingOptionId) -> Result<ShippingOption, RepositoryError> {
        sqlx::query_as::<_, ShippingOption>(
            r"
            UPDATE shipping_options SET is_enabled = NOT is_enabled, updated_at = NOW()
            WHERE id = $1
            RETURNING *
            ",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)
    }
}
