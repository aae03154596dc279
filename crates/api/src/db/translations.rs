//! Translation repository.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use olfong_core::{Locale, TranslationId};

use super::{RepositoryError, conflict_on_unique};
use crate::models::Translation;

#[derive(Debug, sqlx::FromRow)]
struct TranslationRow {
    id: TranslationId,
    key: String,
    locale: String,
    value: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<TranslationRow> for Translation {
    type Error = RepositoryError;

    fn try_from(row: TranslationRow) -> Result<Self, Self::Error> {
        let locale = row.locale.parse().map_err(RepositoryError::DataCorruption)?;
        Ok(Self {
            id: row.id,
            key: row.key,
            locale,
            value: row.value,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

fn convert(rows: Vec<TranslationRow>) -> Result<Vec<Translation>, RepositoryError> {
    rows.into_iter().map(TryInto::try_into).collect()
}

pub struct TranslationRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> TranslationRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// All strings for `locale`, ordered by key.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self, locale: Locale) -> Result<Vec<Translation>, RepositoryError> {
        let rows = sqlx::query_as::<_, TranslationRow>(
            "SELECT * FROM translations WHERE locale = $1 ORDER BY key",
        )
        .bind(locale.code())
        .fetch_all(self.pool)
        .await?;
        convert(rows)
    }

    /// Case-insensitive match on key or value.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn search(
        &self,
        query: &str,
        locale: Locale,
    ) -> Result<Vec<Translation>, RepositoryError> {
        let rows = sqlx::query_as::<_, TranslationRow>(
            r"
            SELECT * FROM translations
            WHERE locale = $1 AND (key ILIKE $2 OR value ILIKE $2)
            ORDER BY key
            ",
        )
        .bind(locale.code())
        .bind(format!("%{}%", query.trim()))
        .fetch_all(self.pool)
        .await?;
        convert(rows)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_key(
        &self,
        key: &str,
        locale: Locale,
    ) -> Result<Option<Translation>, RepositoryError> {
        let row = sqlx::query_as::<_, TranslationRow>(
            "SELECT * FROM translations WHERE key = $1 AND locale = $2",
        )
        .bind(key)
        .bind(locale.code())
        .fetch_optional(self.pool)
        .await?;
        row.map(TryInto::try_into).transpose()
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the key exists for `locale`.
    pub async fn create(
        &self,
        key: &str,
        value: &str,
        locale: Locale,
    ) -> Result<Translation, RepositoryError> {
        let row = sqlx::query_as::<_, TranslationRow>(
            "INSERT INTO translations (key, locale, value) VALUES ($1, $2, $3) RETURNING *",
        )
        .bind(key.trim())
        .bind(locale.code())
        .bind(value)
        .fetch_one(self.pool)
        .await
        .map_err(|e| {
            conflict_on_unique(e, "Translation key already exists for this locale")
        })?;
        row.try_into()
    }

    /// Seed helper: insert unless the key exists for `locale`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn insert_missing(
        &self,
        key: &str,
        value: &str,
        locale: Locale,
    ) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            r"
            INSERT INTO translations (key, locale, value) VALUES ($1, $2, $3)
            ON CONFLICT (key, locale) DO NOTHING
            ",
        )
        .bind(key)
        .bind(locale.code())
        .bind(value)
        .execute(self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the translation doesn't exist.
    pub async fn update(&self, id: TranslationId, value: &str) -> Result<Translation, RepositoryError> {
        sqlx::query_as::<_, TranslationRow>(
            "UPDATE translations SET value = $2, updated_at = NOW() WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(value)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)?
        .try_into()
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the translation doesn't exist.
    pub async fn delete(&self, id: TranslationId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM translations WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}
