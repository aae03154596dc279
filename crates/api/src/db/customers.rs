//! Customer statistics for the back office.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, QueryBuilder};

use olfong_core::UserId;

use super::RepositoryError;
use crate::models::customer::{INACTIVE_AFTER_MONTHS, VIP_ORDER_COUNT};
use crate::models::{CustomerFilter, CustomerSummary};

#[derive(Debug, sqlx::FromRow)]
struct CustomerRow {
    id: UserId,
    email: String,
    full_name: Option<String>,
    phone: Option<String>,
    date_of_birth: Option<NaiveDate>,
    created_at: DateTime<Utc>,
    total_orders: i64,
    total_spent: Decimal,
    last_order: Option<DateTime<Utc>>,
    last_delivery_address: Option<String>,
    status: String,
}

impl TryFrom<CustomerRow> for CustomerSummary {
    type Error = RepositoryError;

    fn try_from(row: CustomerRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            email: row.email,
            full_name: row.full_name,
            phone: row.phone,
            date_of_birth: row.date_of_birth,
            total_orders: row.total_orders,
            total_spent: row.total_spent,
            last_order: row.last_order,
            last_delivery_address: row.last_delivery_address,
            status: row.status.parse().map_err(RepositoryError::DataCorruption)?,
            joined_at: row.created_at,
        })
    }
}

/// `classified`: every customer with order count, spend, last order, last
/// delivery address and activity status, followed by `select`.
fn classified<'a>(select: &str) -> QueryBuilder<'a, Postgres> {
    let mut qb = QueryBuilder::new(
        r"
        WITH stats AS (
            SELECT
                u.id, u.email, u.full_name, u.phone, u.date_of_birth, u.created_at,
                COUNT(o.id) AS total_orders,
                COALESCE(SUM(o.total_amount) FILTER (WHERE o.status <> 'cancelled'), 0)
                    AS total_spent,
                MAX(o.created_at) AS last_order,
                (ARRAY_AGG(o.delivery_address ORDER BY o.created_at DESC)
                    FILTER (WHERE o.delivery_address IS NOT NULL))[1] AS last_delivery_address
            FROM users u
            LEFT JOIN orders o ON o.user_id = u.id
            WHERE u.role = 'customer'
            GROUP BY u.id
        ),
        classified AS (
            SELECT stats.*,
                CASE
                    WHEN last_order < NOW() - make_interval(months => ",
    );
    qb.push_bind(INACTIVE_AFTER_MONTHS)
        .push(") THEN 'inactive' WHEN total_orders > ")
        .push_bind(VIP_ORDER_COUNT)
        .push(
            r" THEN 'vip'
                    WHEN total_orders > 0 THEN 'active'
                    ELSE 'new'
                END AS status
            FROM stats
        )
        ",
        )
        .push(select)
        .push(" FROM classified c WHERE TRUE");
    qb
}

fn push_filters(qb: &mut QueryBuilder<'_, Postgres>, filter: &CustomerFilter) {
    if let Some(search) = filter.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        let pattern = format!("%{search}%");
        qb.push(" AND (c.email ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR c.full_name ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR c.phone ILIKE ")
            .push_bind(pattern)
            .push(")");
    }
    if let Some(status) = filter.status {
        qb.push(" AND c.status = ").push_bind(status.as_str());
    }
}

pub struct CustomerRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CustomerRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Customers matching `filter`, newest accounts first, with the total.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(
        &self,
        filter: &CustomerFilter,
    ) -> Result<(Vec<CustomerSummary>, i64), RepositoryError> {
        let mut count = classified("SELECT COUNT(*)");
        push_filters(&mut count, filter);
        let total: i64 = count.build_query_scalar().fetch_one(self.pool).await?;

        let mut query = classified("SELECT c.*");
        push_filters(&mut query, filter);
        query
            .push(" ORDER BY c.created_at DESC, c.id DESC LIMIT ")
            .push_bind(filter.page.limit())
            .push(" OFFSET ")
            .push_bind(filter.page.offset());
        let rows: Vec<CustomerRow> = query.build_query_as().fetch_all(self.pool).await?;

        let customers = rows
            .into_iter()
            .map(TryInto::try_into)
            .collect::<Result<Vec<_>, _>>()?;
        Ok((customers, total))
    }

    /// One customer's summary. Staff accounts are not customers.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: UserId) -> Result<Option<CustomerSummary>, RepositoryError> {
        let mut query = classified("SELECT c.*");
        query.push(" AND c.id = ").push_bind(id);
        let row: Option<CustomerRow> = query.build_query_as().fetch_optional(self.pool).await?;
        row.map(TryInto::try_into).transpose()
    }
}
