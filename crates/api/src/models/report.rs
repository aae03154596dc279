//! Sales and inventory reports.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use olfong_core::{OrderStatus, ProductId, round_isk};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SalesReport {
    pub period: ReportPeriod,
    pub summary: SalesSummary,
    pub top_products: Vec<TopProduct>,
}

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportPeriod {
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SalesSummary {
    pub total_revenue: Decimal,
    pub total_orders: i64,
    pub average_order_value: Decimal,
    pub status_counts: HashMap<OrderStatus, i64>,
}

impl SalesSummary {
    #[must_use]
    pub fn new(
        total_revenue: Decimal,
        total_orders: i64,
        status_counts: HashMap<OrderStatus, i64>,
    ) -> Self {
        let average_order_value = if total_orders > 0 {
            round_isk(total_revenue / Decimal::from(total_orders))
        } else {
            Decimal::ZERO
        };
        Self {
            total_revenue,
            total_orders,
            average_order_value,
            status_counts,
        }
    }
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct TopProduct {
    pub product_id: ProductId,
    pub product_name: String,
    pub quantity_sold: i64,
    pub revenue: Decimal,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryReport {
    pub summary: InventorySummary,
    pub products: Vec<InventoryItem>,
}

impl InventoryReport {
    /// Build the report, sorting by revenue and totalling the summary.
    #[must_use]
    pub fn new(mut products: Vec<InventoryItem>) -> Self {
        products.sort_by(|a, b| b.total_revenue.cmp(&a.total_revenue));
        let summary = InventorySummary {
            total_products: products.len(),
            total_stock_value: products
                .iter()
                .map(|p| p.price * Decimal::from(p.stock))
                .sum(),
            total_revenue: products.iter().map(|p| p.total_revenue).sum(),
        };
        Self { summary, products }
    }
}

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InventorySummary {
    pub total_products: usize,
    pub total_stock_value: Decimal,
    pub total_revenue: Decimal,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct InventoryItem {
    pub id: ProductId,
    pub name: String,
    pub name_is: String,
    pub category_name: String,
    pub stock: i32,
    pub price: Decimal,
    pub total_sold: i64,
    pub total_revenue: Decimal,
    pub average_price: Decimal,
}
