//! Order placement.
//!
//! Checks the basket against the shipping option, stock and the buyer's age,
//! prices it and writes order, lines and stock decrements in one transaction.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rand::seq::IndexedRandom;
use rust_decimal::Decimal;
use sqlx::PgPool;
use thiserror::Error;
use tracing::instrument;

use olfong_core::{
    OrderStatus, PaymentMethod, ProductId, ShippingType, VatLine, order_vat, round_isk,
};

use crate::db::{OrderRepository, ProductRepository, RepositoryError, ShippingRepository};
use crate::models::{NewOrder, NewOrderItem, Order, OrderInput, OrderItemInput, User};
use crate::validation::is_hhmm;

/// Cap on orders settled in cash or at the counter, ISK.
pub const OFFLINE_PAYMENT_LIMIT: Decimal = Decimal::from_parts(50_000, 0, 0, false, 0);

const ORDER_PREFIX: &str = "OLF";
const SUFFIX_CHARS: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

#[derive(Debug, Error)]
pub enum OrderError {
    #[error("Order must contain at least one item")]
    EmptyOrder,

    #[error("Invalid quantity")]
    InvalidQuantity,

    #[error("Shipping option not found")]
    ShippingNotFound,

    #[error("Shipping option is not available")]
    ShippingDisabled,

    #[error("Delivery address is required for delivery orders")]
    AddressRequired,

    #[error("Pickup time is required for pickup orders")]
    PickupTimeRequired,

    #[error("Pickup time must be in HH:MM format")]
    InvalidPickupTime,

    #[error("Product {0} not found")]
    ProductNotFound(i32),

    #[error("{0} is not available")]
    ProductUnavailable(String),

    #[error("Insufficient stock for {0}")]
    InsufficientStock(String),

    #[error("You must be at least {age} years old to purchase {product}")]
    AgeRestricted { product: String, age: i32 },

    #[error("Cash on delivery is only available for delivery orders")]
    CashRequiresDelivery,

    #[error("Pay on pickup is only available for pickup orders")]
    PayOnPickupRequiresPickup,

    #[error("Orders paid on delivery or pickup cannot exceed 50000 ISK")]
    OfflineLimitExceeded,

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// `OLF-<millis>-<6 random uppercase alphanumerics>`.
#[must_use]
pub fn generate_order_number(now: DateTime<Utc>) -> String {
    let mut rng = rand::rng();
    let suffix: String = (0..6)
        .filter_map(|_| SUFFIX_CHARS.choose(&mut rng).copied().map(char::from))
        .collect();
    format!("{ORDER_PREFIX}-{}-{suffix}", now.timestamp_millis())
}

/// Check the address or pickup time the shipping kind requires.
///
/// # Errors
///
/// Returns the missing or malformed field.
pub fn check_fulfilment(
    kind: ShippingType,
    delivery_address: Option<&str>,
    pickup_time: Option<&str>,
) -> Result<(), OrderError> {
    match kind {
        ShippingType::Delivery => {
            if delivery_address.is_none_or(|a| a.trim().is_empty()) {
                return Err(OrderError::AddressRequired);
            }
        }
        ShippingType::Pickup => {
            let time = pickup_time
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .ok_or(OrderError::PickupTimeRequired)?;
            if !is_hhmm(time) {
                return Err(OrderError::InvalidPickupTime);
            }
        }
    }
    Ok(())
}

/// Sum the quantities of repeated lines per product.
///
/// # Errors
///
/// Returns [`OrderError::InvalidQuantity`] for a line below 1 or a total
/// that does not fit in `i32`.
pub fn merge_quantities(items: &[OrderItemInput]) -> Result<HashMap<ProductId, i32>, OrderError> {
    let mut quantities: HashMap<ProductId, i32> = HashMap::new();
    for item in items {
        if item.quantity < 1 {
            return Err(OrderError::InvalidQuantity);
        }
        let total = quantities.entry(item.product_id).or_default();
        *total = total
            .checked_add(item.quantity)
            .ok_or(OrderError::InvalidQuantity)?;
    }
    Ok(quantities)
}

/// Initial status for an order paid with `method`.
///
/// Offline methods are tied to a shipping kind and capped; their orders are
/// confirmed straight away since no online payment is awaited.
///
/// # Errors
///
/// Returns the violated payment rule.
pub fn initial_status(
    method: PaymentMethod,
    kind: ShippingType,
    total: Decimal,
) -> Result<OrderStatus, OrderError> {
    match (method, kind) {
        (PaymentMethod::CashOnDelivery, ShippingType::Pickup) => {
            return Err(OrderError::CashRequiresDelivery);
        }
        (PaymentMethod::PayOnPickup, ShippingType::Delivery) => {
            return Err(OrderError::PayOnPickupRequiresPickup);
        }
        _ => {}
    }
    if !method.is_offline() {
        return Ok(OrderStatus::Pending);
    }
    if total > OFFLINE_PAYMENT_LIMIT {
        return Err(OrderError::OfflineLimitExceeded);
    }
    Ok(OrderStatus::Confirmed)
}

/// Order totals from VAT-inclusive lines plus the delivery fee.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderTotals {
    pub subtotal_before_vat: Decimal,
    pub tax_amount: Decimal,
    pub delivery_fee: Decimal,
    pub total_amount: Decimal,
}

#[must_use]
pub fn compute_totals(items: &[NewOrderItem], delivery_fee: Decimal) -> OrderTotals {
    let vat = order_vat(items.iter().map(|item| VatLine {
        unit_price: item.unit_price,
        quantity: item.quantity,
        vat_rate: item.vat_rate,
    }));
    OrderTotals {
        subtotal_before_vat: vat.subtotal_before_vat,
        tax_amount: vat.tax_amount,
        delivery_fee,
        total_amount: round_isk(vat.items_total + delivery_fee),
    }
}

pub struct OrderService<'a> {
    pool: &'a PgPool,
}

impl<'a> OrderService<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Validate, price and store an order for `buyer`.
    ///
    /// # Errors
    ///
    /// Returns an [`OrderError`] describing the first failed check.
    #[instrument(skip(self, buyer, input), fields(user_id = %buyer.id, items = input.items.len()))]
    pub async fn place(&self, buyer: &User, input: OrderInput) -> Result<Order, OrderError> {
        if input.items.is_empty() {
            return Err(OrderError::EmptyOrder);
        }
        let mut quantities = merge_quantities(&input.items)?;

        let shipping = ShippingRepository::new(self.pool)
            .get(input.shipping_option_id)
            .await?
            .ok_or(OrderError::ShippingNotFound)?;
        if !shipping.is_enabled {
            return Err(OrderError::ShippingDisabled);
        }
        check_fulfilment(
            shipping.kind,
            input.delivery_address.as_deref(),
            input.pickup_time.as_deref(),
        )?;

        let ids: Vec<_> = quantities.keys().copied().collect();
        let products: HashMap<_, _> = ProductRepository::new(self.pool)
            .get_with_vat_rates(&ids)
            .await?
            .into_iter()
            .map(|(product, rate)| (product.id, (product, rate)))
            .collect();

        let today = Utc::now().date_naive();
        let mut items = Vec::with_capacity(quantities.len());
        for item in &input.items {
            let Some(quantity) = quantities.remove(&item.product_id) else {
                continue;
            };
            let (product, vat_rate) = products
                .get(&item.product_id)
                .ok_or(OrderError::ProductNotFound(item.product_id.as_i32()))?;
            if !product.is_active {
                return Err(OrderError::ProductUnavailable(product.name.clone()));
            }
            if product.stock < quantity {
                return Err(OrderError::InsufficientStock(product.name.clone()));
            }
            if !buyer.meets_age(product.age_restriction, today) {
                return Err(OrderError::AgeRestricted {
                    product: product.name.clone(),
                    age: product.age_restriction,
                });
            }
            items.push(NewOrderItem {
                product_id: product.id,
                product_name: product.name.clone(),
                quantity,
                unit_price: product.price,
                vat_rate: *vat_rate,
            });
        }

        let totals = compute_totals(&items, shipping.fee);
        let payment_method = input.payment_method.unwrap_or_default();
        let status = initial_status(payment_method, shipping.kind, totals.total_amount)?;

        let new = NewOrder {
            order_number: generate_order_number(Utc::now()),
            user_id: buyer.id,
            shipping_option_id: shipping.id,
            delivery_address: input.delivery_address,
            pickup_time: input.pickup_time,
            status,
            subtotal_before_vat: totals.subtotal_before_vat,
            tax_amount: totals.tax_amount,
            delivery_fee: totals.delivery_fee,
            total_amount: totals.total_amount,
            payment_method,
            notes: input.notes,
            items,
        };

        let order = OrderRepository::new(self.pool).create(&new).await?;
        tracing::info!(
            order_number = %order.order_number,
            total = %order.total_amount,
            status = %order.status,
            "Order placed"
        );
        Ok(order)
    }
}
