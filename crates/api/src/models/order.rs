//! Orders and order lines.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use olfong_core::{
    OrderId, OrderItemId, OrderStatus, PaymentMethod, PaymentStatus, ProductId,
    ShippingOptionId, UserId,
};

/// A placed order with its lines.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: OrderId,
    pub order_number: String,
    pub user_id: UserId,
    pub shipping_option_id: Option<ShippingOptionId>,
    pub delivery_address: Option<String>,
    pub pickup_time: Option<String>,
    pub status: OrderStatus,
    pub subtotal_before_vat: Decimal,
    pub tax_amount: Decimal,
    pub delivery_fee: Decimal,
    pub total_amount: Decimal,
    pub payment_method: PaymentMethod,
    pub payment_status: PaymentStatus,
    pub notes: Option<String>,
    pub delivery_person_id: Option<UserId>,
    pub estimated_delivery: Option<DateTime<Utc>>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub customer_email: Option<String>,
    pub customer_name: Option<String>,
    pub shipping_option_name: Option<String>,
    pub items: Vec<OrderItem>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// Whether `user_id` is the driver assigned to this order.
    #[must_use]
    pub fn is_assigned_to(&self, user_id: UserId) -> bool {
        self.delivery_person_id == Some(user_id)
    }
}

/// One line of an order, priced at the time of purchase.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub id: OrderItemId,
    pub order_id: OrderId,
    pub product_id: ProductId,
    pub product_name: String,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub vat_rate: Decimal,
}

/// Body of `POST /api/orders`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderInput {
    pub items: Vec<OrderItemInput>,
    pub shipping_option_id: ShippingOptionId,
    pub delivery_address: Option<String>,
    pub pickup_time: Option<String>,
    pub notes: Option<String>,
    pub payment_method: Option<PaymentMethod>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItemInput {
    pub product_id: ProductId,
    pub quantity: i32,
}

/// A priced order ready to be written in one transaction.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub order_number: String,
    pub user_id: UserId,
    pub shipping_option_id: ShippingOptionId,
    pub delivery_address: Option<String>,
    pub pickup_time: Option<String>,
    pub status: OrderStatus,
    pub subtotal_before_vat: Decimal,
    pub tax_amount: Decimal,
    pub delivery_fee: Decimal,
    pub total_amount: Decimal,
    pub payment_method: PaymentMethod,
    pub notes: Option<String>,
    pub items: Vec<NewOrderItem>,
}

#[derive(Debug, Clone)]
pub struct NewOrderItem {
    pub product_id: ProductId,
    pub product_name: String,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub vat_rate: Decimal,
}

/// Body of `PUT /api/orders/{id}/status`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusUpdate {
    pub status: OrderStatus,
    pub estimated_delivery: Option<DateTime<Utc>>,
}
