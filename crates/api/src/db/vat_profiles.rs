//! VAT profile repository.
//!
//! At most one profile is the default (enforced by a partial unique index);
//! switching the default and assigning categories happen in one transaction.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};

use olfong_core::{CategoryId, VatProfileId};

use super::RepositoryError;
use crate::models::{VatProfile, VatProfileInput, VatProfileUpdate};

const SELECT_PROFILE: &str = r"
    SELECT v.*,
           COALESCE(
               (SELECT array_agg(c.id ORDER BY c.id) FROM categories c WHERE c.vat_profile_id = v.id),
               '{}'
           ) AS category_ids
    FROM vat_profiles v
";

#[derive(Debug, sqlx::FromRow)]
struct VatProfileRow {
    id: VatProfileId,
    name: String,
    name_is: String,
    description: Option<String>,
    description_is: Option<String>,
    vat_rate: Decimal,
    is_default: bool,
    sort_order: i32,
    category_ids: Vec<CategoryId>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<VatProfileRow> for VatProfile {
    fn from(row: VatProfileRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            name_is: row.name_is,
            description: row.description,
            description_is: row.description_is,
            vat_rate: row.vat_rate,
            is_default: row.is_default,
            sort_order: row.sort_order,
            category_ids: row.category_ids,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

async fn clear_default(conn: &mut PgConnection, keep: VatProfileId) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE vat_profiles SET is_default = FALSE, updated_at = NOW() WHERE is_default AND id <> $1")
        .bind(keep)
        .execute(conn)
        .await?;
    Ok(())
}

async fn assign_categories(
    conn: &mut PgConnection,
    profile: VatProfileId,
    categories: &[CategoryId],
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE categories SET vat_profile_id = $1, updated_at = NOW() WHERE id = ANY($2)")
        .bind(profile)
        .bind(categories)
        .execute(conn)
        .await?;
    Ok(())
}

pub struct VatProfileRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> VatProfileRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self) -> Result<Vec<VatProfile>, RepositoryError> {
        let sql = format!("{SELECT_PROFILE} ORDER BY v.sort_order, v.name");
        let rows = sqlx::query_as::<_, VatProfileRow>(&sql)
            .fetch_all(self.pool)
            .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: VatProfileId) -> Result<Option<VatProfile>, RepositoryError> {
        let sql = format!("{SELECT_PROFILE} WHERE v.id = $1");
        let row = sqlx::query_as::<_, VatProfileRow>(&sql)
            .bind(id)
            .fetch_optional(self.pool)
            .await?;
        Ok(row.map(Into::into))
    }

    /// Id of the default profile, if one is set.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn default_id(&self) -> Result<Option<VatProfileId>, RepositoryError> {
        let id = sqlx::query_scalar::<_, VatProfileId>(
            "SELECT id FROM vat_profiles WHERE is_default",
        )
        .fetch_optional(self.pool)
        .await?;
        Ok(id)
    }

    /// Insert a profile, making it the only default if requested.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the transaction fails.
    pub async fn create(&self, input: &VatProfileInput) -> Result<VatProfile, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let id = sqlx::query_scalar::<_, VatProfileId>(
            r"
            INSERT INTO vat_profiles (
                name, name_is, description, description_is, vat_rate, sort_order
            )
            VALUES ($1, $2, $3, $4, $5, COALESCE($6, 0))
            RETURNING id
            ",
        )
        .bind(input.name.trim())
        .bind(input.name_is.trim())
        .bind(&input.description)
        .bind(&input.description_is)
        .bind(input.vat_rate)
        .bind(input.sort_order)
        .fetch_one(&mut *tx)
        .await?;

        if input.is_default {
            clear_default(&mut tx, id).await?;
            sqlx::query("UPDATE vat_profiles SET is_default = TRUE WHERE id = $1")
                .bind(id)
                .execute(&mut *tx)
                .await?;
        }
        if let Some(categories) = &input.category_ids {
            assign_categories(&mut tx, id, categories).await?;
        }

        tx.commit().await?;
        tracing::info!(vat_profile_id = %id, rate = %input.vat_rate, "Created VAT profile");

        self.get(id).await?.ok_or(RepositoryError::NotFound)
    }

    /// Apply a partial update.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the profile doesn't exist.
    pub async fn update(
        &self,
        id: VatProfileId,
        update: &VatProfileUpdate,
    ) -> Result<VatProfile, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        if update.is_default == Some(true) {
            clear_default(&mut tx, id).await?;
        }

        let result = sqlx::query(
            r"
            UPDATE vat_profiles SET
                name = COALESCE($2, name),
                name_is = COALESCE($3, name_is),
                description = COALESCE($4, description),
                description_is = COALESCE($5, description_is),
                vat_rate = COALESCE($6, vat_rate),
                is_default = COALESCE($7, is_default),
                sort_order = COALESCE($8, sort_order),
                updated_at = NOW()
            WHERE id = $1
            ",
        )
        .bind(id)
        .bind(update.name.as_deref().map(str::trim))
        .bind(update.name_is.as_deref().map(str::trim))
        .bind(&update.description)
        .bind(&update.description_is)
        .bind(update.vat_rate)
        .bind(update.is_default)
        .bind(update.sort_order)
        .execute(&mut *tx)
        .await?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        if let Some(categories) = &update.category_ids {
            assign_categories(&mut tx, id, categories).await?;
        }

        tx.commit().await?;
        self.get(id).await?.ok_or(RepositoryError::NotFound)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the profile doesn't exist.
    pub async fn delete(&self, id: VatProfileId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM vat_profiles WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}
