//! Banner repository.

use sqlx::PgPool;

use olfong_core::BannerId;

use super::RepositoryError;
use crate::models::{Banner, BannerInput, BannerUpdate};

pub struct BannerRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> BannerRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Banners by `sort_order`; only active ones unless `include_inactive`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self, include_inactive: bool) -> Result<Vec<Banner>, RepositoryError> {
        let banners = sqlx::query_as::<_, Banner>(
            "SELECT * FROM banners WHERE $1 OR is_active ORDER BY sort_order, id",
        )
        .bind(include_inactive)
        .fetch_all(self.pool)
        .await?;
        Ok(banners)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: BannerId) -> Result<Option<Banner>, RepositoryError> {
        let banner = sqlx::query_as::<_, Banner>("SELECT * FROM banners WHERE id = $1")
            .bind(id)
            .fetch_optional(self.pool)
            .await?;
        Ok(banner)
    }

    /// Insert a banner whose image URL has already been resolved.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn create(
        &self,
        input: &BannerInput,
        image_url: &str,
    ) -> Result<Banner, RepositoryError> {
        let banner = sqlx::query_as::<_, Banner>(
            r"
            INSERT INTO banners (
                title, title_is, description, description_is, image_url, media_id,
                alt, link, is_active, sort_order
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, COALESCE($9, TRUE), COALESCE($10, 0))
            RETURNING *
            ",
        )
        .bind(&input.title)
        .bind(&input.title_is)
        .bind(&input.description)
        .bind(&input.description_is)
        .bind(image_url.trim())
        .bind(input.media_id)
        .bind(&input.alt)
        .bind(input.link.as_deref().map(str::trim))
        .bind(input.is_active)
        .bind(input.sort_order)
        .fetch_one(self.pool)
        .await?;

        tracing::info!(banner_id = %banner.id, "Created banner");
        Ok(banner)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the banner doesn't exist.
    pub async fn update(
        &self,
        id: BannerId,
        update: &BannerUpdate,
    ) -> Result<Banner, RepositoryError> {
        sqlx::query_as::<_, Banner>(
            r"
            UPDATE banners SET
                title = COALESCE($2, title),
                title_is = COALESCE($3, title_is),
                description = COALESCE($4, description),
                description_is = COALESCE($5, description_is),
                image_url = COALESCE($6, image_url),
                media_id = COALESCE($7, media_id),
                alt = COALESCE($8, alt),
                link = COALESCE($9, link),
                is_active = COALESCE($10, is_active),
                sort_order = COALESCE($11, sort_order),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            ",
        )
        .bind(id)
        .bind(&update.title)
        .bind(&update.title_is)
        .bind(&update.description)
        .bind(&update.description_is)
        .bind(update.image_url.as_deref().map(str::trim))
        .bind(update.media_id)
        .bind(&update.alt)
        .bind(update.link.as_deref().map(str::trim))
        .bind(update.is_active)
        .bind(update.sort_order)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the banner doesn't exist.
    pub async fn delete(&self, id: BannerId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM banners WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Flip `is_active`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the banner doesn't exist.
    pub async fn toggle(&self, id: BannerId) -> Result<Banner, RepositoryError> {
        sqlx::query_as::<_, Banner>(
            "UPDATE banners SET is_active = NOT is_active, updated_at = NOW() WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)
    }
}
