//! Reporting queries.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;

use olfong_core::OrderStatus;

use super::RepositoryError;
use crate::models::report::{
    InventoryItem, InventoryReport, ReportPeriod, SalesReport, SalesSummary, TopProduct,
};

const TOP_PRODUCTS: i64 = 10;

pub struct ReportRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ReportRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Sales of non-cancelled orders created in `[start, end]`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn sales(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<SalesReport, RepositoryError> {
        let (total_revenue, total_orders) = sqlx::query_as::<_, (Decimal, i64)>(
            r"
            SELECT COALESCE(SUM(total_amount), 0), COUNT(*)
            FROM orders
            WHERE created_at BETWEEN $1 AND $2 AND status <> 'cancelled'
            ",
        )
        .bind(start)
        .bind(end)
        .fetch_one(self.pool)
        .await?;

        let status_counts: HashMap<OrderStatus, i64> = sqlx::query_as::<_, (OrderStatus, i64)>(
            r"
            SELECT status, COUNT(*)
            FROM orders
            WHERE created_at BETWEEN $1 AND $2 AND status <> 'cancelled'
            GROUP BY status
            ",
        )
        .bind(start)
        .bind(end)
        .fetch_all(self.pool)
        .await?
        .into_iter()
        .collect();

        let top_products = sqlx::query_as::<_, TopProduct>(
            r"
            SELECT oi.product_id,
                   MAX(oi.product_name) AS product_name,
                   SUM(oi.quantity)::BIGINT AS quantity_sold,
                   SUM(oi.unit_price * oi.quantity) AS revenue
            FROM order_items oi
            JOIN orders o ON o.id = oi.order_id
            WHERE o.created_at BETWEEN $1 AND $2 AND o.status <> 'cancelled'
            GROUP BY oi.product_id
            ORDER BY revenue DESC
            LIMIT $3
            ",
        )
        .bind(start)
        .bind(end)
        .bind(TOP_PRODUCTS)
        .fetch_all(self.pool)
        .await?;

        Ok(SalesReport {
            period: ReportPeriod {
                start_date: start,
                end_date: end,
            },
            summary: SalesSummary::new(total_revenue, total_orders, status_counts),
            top_products,
        })
    }

    /// Stock and lifetime sales of every active product.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn inventory(&self) -> Result<InventoryReport, RepositoryError> {
        let items = sqlx::query_as::<_, InventoryItem>(
            r"
            SELECT p.id, p.name, p.name_is, c.name AS category_name, p.stock, p.price,
                   COALESCE(SUM(oi.quantity), 0)::BIGINT AS total_sold,
                   COALESCE(SUM(oi.unit_price * oi.quantity), 0) AS total_revenue,
                   COALESCE(ROUND(AVG(oi.unit_price), 2), 0) AS average_price
            FROM products p
            JOIN categories c ON c.id = p.category_id
            LEFT JOIN (
                SELECT i.* FROM order_items i
                JOIN orders o ON o.id = i.order_id AND o.status <> 'cancelled'
            ) oi ON oi.product_id = p.id
            WHERE p.is_active
            GROUP BY p.id, c.name
            ",
        )
        .fetch_all(self.pool)
        .await?;
        Ok(InventoryReport::new(items))
    }
}
