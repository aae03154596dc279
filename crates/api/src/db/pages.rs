//! CMS page repository.

use sqlx::PgPool;

use olfong_core::PageId;

use super::{RepositoryError, conflict_on_unique};
use crate::models::{Page, PageInput, PageOrder, PageUpdate};

const SLUG_CONFLICT: &str = "A page with this slug already exists";

pub struct PageRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> PageRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Published, visible pages for the storefront menu.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_public(&self) -> Result<Vec<Page>, RepositoryError> {
        let pages = sqlx::query_as::<_, Page>(
            r"
            SELECT * FROM pages
            WHERE status = 'published' AND is_visible
            ORDER BY sort_order, title
            ",
        )
        .fetch_all(self.pool)
        .await?;
        Ok(pages)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_all(&self) -> Result<Vec<Page>, RepositoryError> {
        let pages = sqlx::query_as::<_, Page>("SELECT * FROM pages ORDER BY sort_order, title")
            .fetch_all(self.pool)
            .await?;
        Ok(pages)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: PageId) -> Result<Option<Page>, RepositoryError> {
        let page = sqlx::query_as::<_, Page>("SELECT * FROM pages WHERE id = $1")
            .bind(id)
            .fetch_optional(self.pool)
            .await?;
        Ok(page)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_slug(&self, slug: &str) -> Result<Option<Page>, RepositoryError> {
        let page = sqlx::query_as::<_, Page>("SELECT * FROM pages WHERE slug = $1")
            .bind(slug)
            .fetch_optional(self.pool)
            .await?;
        Ok(page)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the slug is taken.
    pub async fn create(&self, input: &PageInput) -> Result<Page, RepositoryError> {
        let page = sqlx::query_as::<_, Page>(
            r"
            INSERT INTO pages (
                title, title_is, slug, content, content_is, status, is_visible, sort_order,
                featured_image_id, meta_title, meta_title_is, meta_description,
                meta_description_is, canonical_url
            )
            VALUES (
                $1, $2, $3, $4, $5, COALESCE($6, 'draft'), COALESCE($7, TRUE), COALESCE($8, 0),
                $9, $10, $11, $12, $13, $14
            )
            RETURNING *
            ",
        )
        .bind(input.title.trim())
        .bind(input.title_is.trim())
        .bind(input.slug.trim())
        .bind(&input.content)
        .bind(&input.content_is)
        .bind(input.status)
        .bind(input.is_visible)
        .bind(input.sort_order)
        .bind(input.featured_image_id)
        .bind(&input.meta_title)
        .bind(&input.meta_title_is)
        .bind(&input.meta_description)
        .bind(&input.meta_description_is)
        .bind(&input.canonical_url)
        .fetch_one(self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, SLUG_CONFLICT))?;

        tracing::info!(page_id = %page.id, slug = %page.slug, "Created page");
        Ok(page)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the page doesn't exist.
    /// Returns `RepositoryError::Conflict` if the new slug is taken.
    pub async fn update(&self, id: PageId, update: &PageUpdate) -> Result<Page, RepositoryError> {
        sqlx::query_as::<_, Page>(
            r"
            UPDATE pages SET
                title = COALESCE($2, title),
                title_is = COALESCE($3, title_is),
                slug = COALESCE($4, slug),
                content = COALESCE($5, content),
                content_is = COALESCE($6, content_is),
                status = COALESCE($7, status),
                is_visible = COALESCE($8, is_visible),
                sort_order = COALESCE($9, sort_order),
                featured_image_id = COALESCE($10, featured_image_id),
                meta_title = COALESCE($11, meta_title),
                meta_title_is = COALESCE($12, meta_title_is),
                meta_description = COALESCE($13, meta_description),
                meta_description_is = COALESCE($14, meta_description_is),
                canonical_url = COALESCE($15, canonical_url),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            ",
        )
        .bind(id)
        .bind(update.title.as_deref().map(str::trim))
        .bind(update.title_is.as_deref().map(str::trim))
        .bind(update.slug.as_deref().map(str::trim))
        .bind(&update.content)
        .bind(&update.content_is)
        .bind(update.status)
        .bind(update.is_visible)
        .bind(update.sort_order)
        .bind(update.featured_image_id)
        .bind(&update.meta_title)
        .bind(&update.meta_title_is)
        .bind(&update.meta_description)
        .bind(&update.meta_description_is)
        .bind(&update.canonical_url)
        .fetch_optional(self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, SLUG_CONFLICT))?
        .ok_or(RepositoryError::NotFound)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the page doesn't exist.
    pub async fn delete(&self, id: PageId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM pages WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Apply a new ordering to several pages at once.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if any page doesn't exist; no
    /// order is changed in that case.
    pub async fn reorder(&self, orders: &[PageOrder]) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;
        for order in orders {
            let result =
                sqlx::query("UPDATE pages SET sort_order = $2, updated_at = NOW() WHERE id = $1")
                    .bind(order.id)
                    .bind(order.sort_order)
                    .execute(&mut *tx)
                    .await?;
            if result.rows_affected() == 0 {
                return Err(RepositoryError::NotFound);
            }
        }
        tx.commit().await?;
        Ok(())
    }

    /// Flip `is_visible`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the page doesn't exist.
    pub async fn toggle_visibility(&self, id: PageId) -> Result<Page, RepositoryError> {
        sqlx::query_as::<_, Page>(
            "UPDATE pages SET is_visible = NOT is_visible, updated_at = NOW() WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)
    }
}
