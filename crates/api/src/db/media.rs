//! Media library repository.

use sqlx::{PgPool, Postgres, QueryBuilder};

use olfong_core::{MediaCollection, MediaId};

use super::RepositoryError;
use crate::models::{Media, MediaFilter, MediaUpdate, NewMedia};

fn push_filters(qb: &mut QueryBuilder<'_, Postgres>, filter: &MediaFilter) {
    qb.push(" WHERE TRUE");
    if let Some(collection) = filter.collection {
        qb.push(" AND collection = ").push_bind(collection);
    }
    if let Some(search) = filter.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        let pattern = format!("%{search}%");
        qb.push(" AND (original_name ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR alt ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR caption ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR description ILIKE ")
            .push_bind(pattern)
            .push(")");
    }
}

pub struct MediaRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> MediaRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Media with the given content hash in `collection`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn find_by_hash(
        &self,
        hash: &str,
        collection: MediaCollection,
    ) -> Result<Option<Media>, RepositoryError> {
        let media = sqlx::query_as::<_, Media>(
            "SELECT * FROM media WHERE hash = $1 AND collection = $2",
        )
        .bind(hash)
        .bind(collection)
        .fetch_optional(self.pool)
        .await?;
        Ok(media)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn create(&self, new: &NewMedia) -> Result<Media, RepositoryError> {
        let media = sqlx::query_as::<_, Media>(
            r"
            INSERT INTO media (
                id, collection, filename, original_name, mime_type, size, hash, url, path,
                alt, caption, description, uploaded_by
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            RETURNING *
            ",
        )
        .bind(new.id)
        .bind(new.collection)
        .bind(&new.filename)
        .bind(&new.original_name)
        .bind(&new.mime_type)
        .bind(new.size)
        .bind(&new.hash)
        .bind(&new.url)
        .bind(&new.path)
        .bind(&new.alt)
        .bind(&new.caption)
        .bind(&new.description)
        .bind(new.uploaded_by)
        .fetch_one(self.pool)
        .await?;

        tracing::info!(media_id = %media.id, collection = %media.collection, "Stored media");
        Ok(media)
    }

    /// Media matching `filter`, with the total match count.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self, filter: &MediaFilter) -> Result<(Vec<Media>, i64), RepositoryError> {
        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM media");
        push_filters(&mut count, filter);
        let total: i64 = count.build_query_scalar().fetch_one(self.pool).await?;

        let mut query = QueryBuilder::<Postgres>::new("SELECT * FROM media");
        push_filters(&mut query, filter);
        query
            .push(format!(
                " ORDER BY {} {}, id",
                filter.sort_by.column(),
                filter.sort_order.as_sql()
            ))
            .push(" LIMIT ")
            .push_bind(filter.page.limit())
            .push(" OFFSET ")
            .push_bind(filter.page.offset());

        let media = query.build_query_as::<Media>().fetch_all(self.pool).await?;
        Ok((media, total))
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: MediaId) -> Result<Option<Media>, RepositoryError> {
        let media = sqlx::query_as::<_, Media>("SELECT * FROM media WHERE id = $1")
            .bind(id)
            .fetch_optional(self.pool)
            .await?;
        Ok(media)
    }

    /// Update the descriptive fields.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the media doesn't exist.
    pub async fn update(&self, id: MediaId, update: &MediaUpdate) -> Result<Media, RepositoryError> {
        sqlx::query_as::<_, Media>(
            r"
            UPDATE media SET
                alt = COALESCE($2, alt),
                caption = COALESCE($3, caption),
                description = COALESCE($4, description),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            ",
        )
        .bind(id)
        .bind(&update.alt)
        .bind(&update.caption)
        .bind(&update.description)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)
    }

    /// Point a media row at a new file.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the media doesn't exist.
    pub async fn replace_file(
        &self,
        id: MediaId,
        url: &str,
        path: &str,
        size: i64,
        hash: &str,
    ) -> Result<Media, RepositoryError> {
        sqlx::query_as::<_, Media>(
            r"
            UPDATE media SET
                url = $2, path = $3, size = $4, hash = $5,
                mime_type = 'image/png', updated_at = NOW()
            WHERE id = $1
            RETURNING *
            ",
        )
        .bind(id)
        .bind(url)
        .bind(path)
        .bind(size)
        .bind(hash)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)
    }

    /// Number of products, categories or banners referencing this media,
    /// depending on its collection.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn usage_count(&self, media: &Media) -> Result<i64, RepositoryError> {
        let sql = match media.collection {
            MediaCollection::Products => "SELECT COUNT(*) FROM products WHERE media_id = $1",
            MediaCollection::Categories => "SELECT COUNT(*) FROM categories WHERE media_id = $1",
            MediaCollection::Banners => "SELECT COUNT(*) FROM banners WHERE media_id = $1",
            _ => return Ok(0),
        };
        let count = sqlx::query_scalar::<_, i64>(sql)
            .bind(media.id)
            .fetch_one(self.pool)
            .await?;
        Ok(count)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the media doesn't exist.
    pub async fn delete(&self, id: MediaId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM media WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}
