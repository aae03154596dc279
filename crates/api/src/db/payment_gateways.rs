//! Payment gateway repository.
//!
//! Secrets reach this layer already encrypted; see
//! [`crate::services::crypto::seal_submitted`].

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use sqlx::types::Json;

use olfong_core::{GatewayEnvironment, GatewayProvider, PaymentGatewayId};

use super::{RepositoryError, conflict_on_unique};
use crate::models::{PaymentGateway, PaymentGatewayInput, PaymentGatewayUpdate};

const NAME_CONFLICT: &str = "A payment gateway with this name already exists";

/// Encrypted secret values to write. `None` keeps what is stored.
#[derive(Debug, Clone, Default)]
pub struct SealedSecrets {
    pub api_key: Option<String>,
    pub secret_key: Option<String>,
    pub webhook_secret: Option<String>,
}

#[derive(Debug, sqlx::FromRow)]
struct PaymentGatewayRow {
    id: PaymentGatewayId,
    name: String,
    display_name: String,
    provider: GatewayProvider,
    is_enabled: bool,
    is_active: bool,
    sort_order: i32,
    config: Json<serde_json::Value>,
    merchant_id: Option<String>,
    api_key: Option<String>,
    secret_key: Option<String>,
    webhook_secret: Option<String>,
    environment: GatewayEnvironment,
    supported_currencies: Json<Vec<String>>,
    supported_countries: Json<Vec<String>>,
    supported_methods: Json<Vec<String>>,
    description: Option<String>,
    logo_url: Option<String>,
    website: Option<String>,
    documentation: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<PaymentGatewayRow> for PaymentGateway {
    fn from(row: PaymentGatewayRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            display_name: row.display_name,
            provider: row.provider,
            is_enabled: row.is_enabled,
            is_active: row.is_active,
            sort_order: row.sort_order,
            config: row.config.0,
            merchant_id: row.merchant_id,
            api_key: row.api_key,
            secret_key: row.secret_key,
            webhook_secret: row.webhook_secret,
            environment: row.environment,
            supported_currencies: row.supported_currencies.0,
            supported_countries: row.supported_countries.0,
            supported_methods: row.supported_methods.0,
            description: row.description,
            logo_url: row.logo_url,
            website: row.website,
            documentation: row.documentation,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

pub struct PaymentGatewayRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> PaymentGatewayRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self) -> Result<Vec<PaymentGateway>, RepositoryError> {
        let rows = sqlx::query_as::<_, PaymentGatewayRow>(
            "SELECT * FROM payment_gateways ORDER BY sort_order, display_name",
        )
        .fetch_all(self.pool)
        .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Gateways offered at checkout.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_active(&self) -> Result<Vec<PaymentGateway>, RepositoryError> {
        let rows = sqlx::query_as::<_, PaymentGatewayRow>(
            r"
            SELECT * FROM payment_gateways
            WHERE is_enabled AND is_active
            ORDER BY sort_order, display_name
            ",
        )
        .fetch_all(self.pool)
        .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: PaymentGatewayId) -> Result<Option<PaymentGateway>, RepositoryError> {
        let row = sqlx::query_as::<_, PaymentGatewayRow>(
            "SELECT * FROM payment_gateways WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;
        Ok(row.map(Into::into))
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the name is taken.
    pub async fn create(
        &self,
        input: &PaymentGatewayInput,
        secrets: &SealedSecrets,
    ) -> Result<PaymentGateway, RepositoryError> {
        let row = sqlx::query_as::<_, PaymentGatewayRow>(
            r#"
            INSERT INTO payment_gateways (
                name, display_name, provider, is_enabled, is_active, sort_order, config,
                merchant_id, api_key, secret_key, webhook_secret, environment,
                supported_currencies, supported_countries, supported_methods,
                description, logo_url, website, documentation
            )
            VALUES (
                $1, $2, $3, COALESCE($4, FALSE), COALESCE($5, TRUE), COALESCE($6, 0),
                COALESCE($7, '{}'), $8, $9, $10, $11, COALESCE($12, 'sandbox'),
                COALESCE($13, '["ISK"]'), COALESCE($14, '["IS"]'), COALESCE($15, '[]'),
                $16, $17, $18, $19
            )
            RETURNING *
            "#,
        )
        .bind(input.name.trim())
        .bind(input.display_name.trim())
        .bind(input.provider)
        .bind(input.is_enabled)
        .bind(input.is_active)
        .bind(input.sort_order)
        .bind(input.config.as_ref().map(Json))
        .bind(&input.merchant_id)
        .bind(&secrets.api_key)
        .bind(&secrets.secret_key)
        .bind(&secrets.webhook_secret)
        .bind(input.environment)
        .bind(input.supported_currencies.as_ref().map(Json))
        .bind(input.supported_countries.as_ref().map(Json))
        .bind(input.supported_methods.as_ref().map(Json))
        .bind(&input.description)
        .bind(&input.logo_url)
        .bind(&input.website)
        .bind(&input.documentation)
        .fetch_one(self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, NAME_CONFLICT))?;

        tracing::info!(gateway_id = %row.id, name = %row.name, "Created payment gateway");
        Ok(row.into())
    }

    /// Apply a partial update. Secrets set to `None` keep their stored value.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the gateway doesn't exist.
    pub async fn update(
        &self,
        id: PaymentGatewayId,
        update: &PaymentGatewayUpdate,
        secrets: &SealedSecrets,
    ) -> Result<PaymentGateway, RepositoryError> {
        sqlx::query_as::<_, PaymentGatewayRow>(
            r"
            UPDATE payment_gateways SET
                name = COALESCE($2, name),
                display_name = COALESCE($3, display_name),
                provider = COALESCE($4, provider),
                is_enabled = COALESCE($5, is_enabled),
                is_active = COALESCE($6, is_active),
                sort_order = COALESCE($7, sort_order),
                config = COALESCE($8, config),
                merchant_id = COALESCE($9, merchant_id),
                api_key = COALESCE($10, api_key),
                secret_key = COALESCE($11, secret_key),
                webhook_secret = COALESCE($12, webhook_secret),
                environment = COALESCE($13, environment),
                supported_currencies = COALESCE($14, supported_currencies),
                supported_countries = COALESCE($15, supported_countries),
                supported_methods = COALESCE($16, supported_methods),
                description = COALESCE($17, description),
                logo_url = COALESCE($18, logo_url),
                website = COALESCE($19, website),
                documentation = COALESCE($20, documentation),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            ",
        )
        .bind(id)
        .bind(update.name.as_deref().map(str::trim))
        .bind(update.display_name.as_deref().map(str::trim))
        .bind(update.provider)
        .bind(update.is_enabled)
        .bind(update.is_active)
        .bind(update.sort_order)
        .bind(update.config.as_ref().map(Json))
        .bind(&update.merchant_id)
        .bind(&secrets.api_key)
        .bind(&secrets.secret_key)
        .bind(&secrets.webhook_secret)
        .bind(update.environment)
        .bind(update.supported_currencies.as_ref().map(Json))
        .bind(update.supported_countries.as_ref().map(Json))
        .bind(update.supported_methods.as_ref().map(Json))
        .bind(&update.description)
        .bind(&update.logo_url)
        .bind(&update.website)
        .bind(&update.documentation)
        .fetch_optional(self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, NAME_CONFLICT))?
        .map(Into::into)
        .ok_or(RepositoryError::NotFound)
    }

    /// Create the gateway, or refresh its descriptive fields when one with
    /// the same name exists. Stored secrets and `is_enabled` are left alone.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn upsert_by_name(
        &self,
        input: &PaymentGatewayInput,
    ) -> Result<PaymentGateway, RepositoryError> {
        let row = sqlx::query_as::<_, PaymentGatewayRow>(
            r#"
            INSERT INTO payment_gateways (
                name, display_name, provider, is_enabled, sort_order, environment,
                supported_currencies, supported_countries, supported_methods,
                description, logo_url, website, documentation
            )
            VALUES (
                $1, $2, $3, COALESCE($4, FALSE), COALESCE($5, 0), COALESCE($6, 'sandbox'),
                COALESCE($7, '["ISK"]'), COALESCE($8, '["IS"]'), COALESCE($9, '[]'),
                $10, $11, $12, $13
            )
            ON CONFLICT (name) DO UPDATE SET
                display_name = EXCLUDED.display_name,
                provider = EXCLUDED.provider,
                sort_order = EXCLUDED.sort_order,
                supported_currencies = EXCLUDED.supported_currencies,
                supported_countries = EXCLUDED.supported_countries,
                supported_methods = EXCLUDED.supported_methods,
                description = EXCLUDED.description,
                logo_url = EXCLUDED.logo_url,
                website = EXCLUDED.website,
                documentation = EXCLUDED.documentation,
                updated_at = NOW()
            RETURNING *
            "#,
        )
        .bind(input.name.trim())
        .bind(input.display_name.trim())
        .bind(input.provider)
        .bind(input.is_enabled)
        .bind(input.sort_order)
        .bind(input.environment)
        .bind(input.supported_currencies.as_ref().map(Json))
        .bind(input.supported_countries.as_ref().map(Json))
        .bind(input.supported_methods.as_ref().map(Json))
        .bind(&input.description)
        .bind(&input.logo_url)
        .bind(&input.website)
        .bind(&input.documentation)
        .fetch_one(self.pool)
        .await?;
        Ok(row.into())
    }

    /// Flip `is_enabled`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the gateway doesn't exist.
    pub async fn toggle(&self, id: PaymentGatewayId) -> Result<PaymentGateway, RepositoryError> {
        sqlx::query_as::<_, PaymentGatewayRow>(
            r"
            UPDATE payment_gateways SET is_enabled = NOT is_enabled, updated_at = NOW()
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

    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the gateway doesn't exist.
    pub async fn delete(&self, id: PaymentGatewayId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM payment_gateways WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}
