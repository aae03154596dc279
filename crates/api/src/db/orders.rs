//! Order repository.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, QueryBuilder};

use olfong_core::{
    OrderId, OrderStatus, PageRequest, PaymentMethod, PaymentStatus, ShippingOptionId, UserId,
};

use super::RepositoryError;
use crate::models::{NewOrder, Order, OrderItem};

const SELECT_ORDER: &str = r"
    SELECT o.*,
           u.email AS customer_email,
           u.full_name AS customer_name,
           s.name AS shipping_option_name
    FROM orders o
    JOIN users u ON u.id = o.user_id
    LEFT JOIN shipping_options s ON s.id = o.shipping_option_id
";

#[derive(Debug, sqlx::FromRow)]
struct OrderRow {
    id: OrderId,
    order_number: String,
    user_id: UserId,
    shipping_option_id: Option<ShippingOptionId>,
    delivery_address: Option<String>,
    pickup_time: Option<String>,
    status: OrderStatus,
    subtotal_before_vat: Decimal,
    tax_amount: Decimal,
    delivery_fee: Decimal,
    total_amount: Decimal,
    payment_method: String,
    payment_status: PaymentStatus,
    notes: Option<String>,
    delivery_person_id: Option<UserId>,
    estimated_delivery: Option<DateTime<Utc>>,
    delivered_at: Option<DateTime<Utc>>,
    customer_email: Option<String>,
    customer_name: Option<String>,
    shipping_option_name: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<OrderRow> for Order {
    type Error = RepositoryError;

    fn try_from(row: OrderRow) -> Result<Self, Self::Error> {
        let payment_method: PaymentMethod = row
            .payment_method
            .parse()
            .map_err(RepositoryError::DataCorruption)?;

        Ok(Self {
            id: row.id,
            order_number: row.order_number,
            user_id: row.user_id,
            shipping_option_id: row.shipping_option_id,
            delivery_address: row.delivery_address,
            pickup_time: row.pickup_time,
            status: row.status,
            subtotal_before_vat: row.subtotal_before_vat,
            tax_amount: row.tax_amount,
            delivery_fee: row.delivery_fee,
            total_amount: row.total_amount,
            payment_method,
            payment_status: row.payment_status,
            notes: row.notes,
            delivery_person_id: row.delivery_person_id,
            estimated_delivery: row.estimated_delivery,
            delivered_at: row.delivered_at,
            customer_email: row.customer_email,
            customer_name: row.customer_name,
            shipping_option_name: row.shipping_option_name,
            items: Vec::new(),
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

fn push_filters(
    qb: &mut QueryBuilder<'_, Postgres>,
    user_id: Option<UserId>,
    status: Option<OrderStatus>,
) {
    qb.push(" WHERE TRUE");
    if let Some(user_id) = user_id {
        qb.push(" AND o.user_id = ").push_bind(user_id);
    }
    if let Some(status) = status {
        qb.push(" AND o.status = ").push_bind(status);
    }
}

pub struct OrderRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> OrderRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Write the order, its lines and the stock decrements atomically.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if stock ran out between the
    /// availability check and this write; nothing is stored in that case.
    pub async fn create(&self, order: &NewOrder) -> Result<Order, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let id = sqlx::query_scalar::<_, OrderId>(
            r"
            INSERT INTO orders (
                order_number, user_id, shipping_option_id, delivery_address, pickup_time,
                status, subtotal_before_vat, tax_amount, delivery_fee, total_amount,
                payment_method, payment_status, notes
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, 'pending', $12)
            RETURNING id
            ",
        )
        .bind(&order.order_number)
        .bind(order.user_id)
        .bind(order.shipping_option_id)
        .bind(&order.delivery_address)
        .bind(&order.pickup_time)
        .bind(order.status)
        .bind(order.subtotal_before_vat)
        .bind(order.tax_amount)
        .bind(order.delivery_fee)
        .bind(order.total_amount)
        .bind(order.payment_method.as_str())
        .bind(&order.notes)
        .fetch_one(&mut *tx)
        .await?;

        for item in &order.items {
            sqlx::query(
                r"
                INSERT INTO order_items (
                    order_id, product_id, product_name, quantity, unit_price, vat_rate
                )
                VALUES ($1, $2, $3, $4, $5, $6)
                ",
            )
            .bind(id)
            .bind(item.product_id)
            .bind(&item.product_name)
            .bind(item.quantity)
            .bind(item.unit_price)
            .bind(item.vat_rate)
            .execute(&mut *tx)
            .await?;

            let updated = sqlx::query(
                r"
                UPDATE products SET stock = stock - $2, updated_at = NOW()
                WHERE id = $1 AND stock >= $2
                ",
            )
            .bind(item.product_id)
            .bind(item.quantity)
            .execute(&mut *tx)
            .await?;
            if updated.rows_affected() == 0 {
                return Err(RepositoryError::Conflict(format!(
                    "Insufficient stock for {}",
                    item.product_name
                )));
            }
        }

        tx.commit().await?;
        self.get(id).await?.ok_or(RepositoryError::NotFound)
    }

    async fn attach_items(&self, mut orders: Vec<Order>) -> Result<Vec<Order>, RepositoryError> {
        let ids: Vec<OrderId> = orders.iter().map(|o| o.id).collect();
        let items = sqlx::query_as::<_, OrderItem>(
            "SELECT * FROM order_items WHERE order_id = ANY($1) ORDER BY id",
        )
        .bind(&ids)
        .fetch_all(self.pool)
        .await?;

        let mut by_order: HashMap<OrderId, Vec<OrderItem>> = HashMap::new();
        for item in items {
            by_order.entry(item.order_id).or_default().push(item);
        }
        for order in &mut orders {
            order.items = by_order.remove(&order.id).unwrap_or_default();
        }
        Ok(orders)
    }

    async fn page(
        &self,
        user_id: Option<UserId>,
        status: Option<OrderStatus>,
        page: PageRequest,
    ) -> Result<(Vec<Order>, i64), RepositoryError> {
        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM orders o");
        push_filters(&mut count, user_id, status);
        let total: i64 = count.build_query_scalar().fetch_one(self.pool).await?;

        let mut query = QueryBuilder::<Postgres>::new(SELECT_ORDER);
        push_filters(&mut query, user_id, status);
        query
            .push(" ORDER BY o.created_at DESC, o.id DESC LIMIT ")
            .push_bind(page.limit())
            .push(" OFFSET ")
            .push_bind(page.offset());
        let rows: Vec<OrderRow> = query.build_query_as().fetch_all(self.pool).await?;

        let orders = rows
            .into_iter()
            .map(TryInto::try_into)
            .collect::<Result<Vec<Order>, _>>()?;
        Ok((self.attach_items(orders).await?, total))
    }

    /// All orders, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(
        &self,
        status: Option<OrderStatus>,
        page: PageRequest,
    ) -> Result<(Vec<Order>, i64), RepositoryError> {
        self.page(None, status, page).await
    }

    /// One customer's orders, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_for_user(
        &self,
        user_id: UserId,
        status: Option<OrderStatus>,
        page: PageRequest,
    ) -> Result<(Vec<Order>, i64), RepositoryError> {
        self.page(Some(user_id), status, page).await
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if the payment method is unknown.
    pub async fn get(&self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        let sql = format!("{SELECT_ORDER} WHERE o.id = $1");
        let Some(row) = sqlx::query_as::<_, OrderRow>(&sql)
            .bind(id)
            .fetch_optional(self.pool)
            .await?
        else {
            return Ok(None);
        };
        Ok(self.attach_items(vec![row.try_into()?]).await?.pop())
    }

    /// Move an order from `from` to `status`.
    ///
    /// Delivery stamps `delivered_at` and settles a pending offline payment.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the order doesn't exist and
    /// `RepositoryError::Conflict` if it is no longer in `from`.
    pub async fn update_status(
        &self,
        id: OrderId,
        from: OrderStatus,
        status: OrderStatus,
        estimated_delivery: Option<DateTime<Utc>>,
    ) -> Result<Order, RepositoryError> {
        let offline = [
            PaymentMethod::CashOnDelivery.as_str(),
            PaymentMethod::PayOnPickup.as_str(),
        ];
        let result = sqlx::query(
            r"
            UPDATE orders SET
                status = $2,
                estimated_delivery = COALESCE($3, estimated_delivery),
                delivered_at = CASE WHEN $2 = 'delivered' THEN NOW() ELSE delivered_at END,
                payment_status = CASE
                    WHEN $2 = 'delivered' AND payment_status = 'pending'
                         AND payment_method = ANY($4)
                    THEN 'completed'
                    ELSE payment_status
                END,
                updated_at = NOW()
            WHERE id = $1 AND status = $5
            ",
        )
        .bind(id)
        .bind(status)
        .bind(estimated_delivery)
        .bind(&offline[..])
        .bind(from)
        .execute(self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(match self.get(id).await? {
                Some(_) => RepositoryError::Conflict(
                    "Order status was changed by another request".to_owned(),
                ),
                None => RepositoryError::NotFound,
            });
        }

        tracing::info!(order_id = %id, %status, "Order status updated");
        self.get(id).await?.ok_or(RepositoryError::NotFound)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the order doesn't exist.
    pub async fn assign_delivery(
        &self,
        id: OrderId,
        delivery_person_id: UserId,
    ) -> Result<Order, RepositoryError> {
        let result = sqlx::query(
            "UPDATE orders SET delivery_person_id = $2, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(delivery_person_id)
        .execute(self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        self.get(id).await?.ok_or(RepositoryError::NotFound)
    }
}
