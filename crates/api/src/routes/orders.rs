//! Order route handlers.

#![allow(clippy::used_underscore_binding)]

use axum::{
    Router,
    extract::State,
    routing::{get, put},
};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use olfong_core::{OrderId, OrderStatus, PageRequest, Pagination, UserId, UserRole};

use crate::db::{OrderRepository, UserRepository};
use crate::error::AppError;
use crate::middleware::{RequireAdmin, RequireAuth, RequireStaff};
use crate::models::{Order, OrderInput, StatusUpdate, User};
use crate::response::{ApiJson, ApiPath, ApiQuery, ApiResponse, ApiResult};
use crate::services::OrderService;
use crate::state::AppState;

use super::not_found;

const NOT_FOUND: &str = "Order not found";
const ACCESS_DENIED: &str = "Access denied";

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(index).post(create))
        .route("/my-orders", get(my_orders))
        .route("/delivery-persons", get(delivery_persons))
        .route("/{id}", get(show))
        .route("/{id}/status", put(update_status))
        .route("/{id}/assign-delivery", put(assign_delivery))
}

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub status: Option<OrderStatus>,
}

#[derive(Debug, Serialize)]
pub struct OrderList {
    pub orders: Vec<Order>,
    pub pagination: Pagination,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignDelivery {
    pub delivery_person_id: UserId,
}

/// Who may read an order: its owner, any admin, or the assigned courier.
fn can_view(user: &User, order: &Order) -> bool {
    user.role.is_admin() || order.user_id == user.id || order.is_assigned_to(user.id)
}

/// Who may move an order along: any admin, or the assigned courier.
fn can_update_status(user: &User, order: &Order) -> bool {
    user.role.is_admin() || (user.role == UserRole::Delivery && order.is_assigned_to(user.id))
}

/// Place an order for the signed-in customer.
#[instrument(skip(state, user, input), fields(user_id = %user.id))]
async fn create(
    RequireAuth(user): RequireAuth,
    State(state): State<AppState>,
    ApiJson(input): ApiJson<OrderInput>,
) -> ApiResult<Order> {
    let order = OrderService::new(state.pool()).place(&user, input).await?;
    Ok(ApiResponse::created("Order created successfully", order))
}

#[instrument(skip(state, user), fields(user_id = %user.id))]
async fn my_orders(
    RequireAuth(user): RequireAuth,
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<ListQuery>,
) -> ApiResult<OrderList> {
    let page = PageRequest::new(query.page, query.limit);
    let (orders, total) = OrderRepository::new(state.pool())
        .list_for_user(user.id, query.status, page)
        .await?;
    Ok(ApiResponse::ok(OrderList {
        orders,
        pagination: Pagination::new(page, total),
    }))
}

#[instrument(skip(state, _admin))]
async fn index(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<ListQuery>,
) -> ApiResult<OrderList> {
    let page = PageRequest::new(query.page, query.limit);
    let (orders, total) = OrderRepository::new(state.pool())
        .list(query.status, page)
        .await?;
    Ok(ApiResponse::ok(OrderList {
        orders,
        pagination: Pagination::new(page, total),
    }))
}

#[instrument(skip(state, user), fields(user_id = %user.id))]
async fn show(
    RequireAuth(user): RequireAuth,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<OrderId>,
) -> ApiResult<Order> {
    let order = OrderRepository::new(state.pool())
        .get(id)
        .await?
        .ok_or_else(|| AppError::NotFound(NOT_FOUND.to_string()))?;
    if !can_view(&user, &order) {
        return Err(AppError::Forbidden(ACCESS_DENIED.to_string()));
    }
    Ok(ApiResponse::ok(order))
}

#[instrument(skip(state, user), fields(user_id = %user.id, status = %update.status))]
async fn update_status(
    RequireStaff(user): RequireStaff,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<OrderId>,
    ApiJson(update): ApiJson<StatusUpdate>,
) -> ApiResult<Order> {
    let orders = OrderRepository::new(state.pool());
    let order = orders
        .get(id)
        .await?
        .ok_or_else(|| AppError::NotFound(NOT_FOUND.to_string()))?;

    if !can_update_status(&user, &order) {
        return Err(AppError::Forbidden(ACCESS_DENIED.to_string()));
    }
    if !order.status.can_transition_to(update.status) {
        return Err(AppError::BadRequest(format!(
            "Invalid status transition from {} to {}",
            order.status, update.status
        )));
    }

    let order = orders
        .update_status(id, order.status, update.status, update.estimated_delivery)
        .await
        .map_err(|e| not_found(e, NOT_FOUND))?;
    Ok(ApiResponse::with_message(
        "Order status updated successfully",
        order,
    ))
}

/// Couriers an order can be assigned to.
#[instrument(skip(state, _admin))]
async fn delivery_persons(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
) -> ApiResult<Vec<User>> {
    let couriers = UserRepository::new(state.pool())
        .list_by_role(UserRole::Delivery)
        .await?;
    Ok(ApiResponse::ok(couriers))
}

#[instrument(skip(state, _admin))]
async fn assign_delivery(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<OrderId>,
    ApiJson(request): ApiJson<AssignDelivery>,
) -> ApiResult<Order> {
    let courier = UserRepository::new(state.pool())
        .get_by_id(request.delivery_person_id)
        .await?
        .filter(|u| u.role == UserRole::Delivery)
        .ok_or_else(|| AppError::BadRequest("Invalid delivery person".to_string()))?;

    let order = OrderRepository::new(state.pool())
        .assign_delivery(id, courier.id)
        .await
        .map_err(|e| not_found(e, NOT_FOUND))?;
    tracing::info!(order_id = %id, delivery_person_id = %courier.id, "Delivery assigned");
    Ok(ApiResponse::with_message(
        "Delivery person assigned successfully",
        order,
    ))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Utc;
    use olfong_core::{Email, PaymentMethod, PaymentStatus};
    use rust_decimal::Decimal;

    use super::*;

    fn user(id: i32, role: UserRole) -> User {
        User {
            id: UserId::new(id),
            email: Email::parse(&format!("user{id}@olfong.is")).unwrap(),
            full_name: None,
            phone: None,
            date_of_birth: None,
            role,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn order(owner: i32, courier: Option<i32>) -> Order {
        Order {
            id: OrderId::new(1),
            order_number: "OLF-1".to_string(),
            user_id: UserId::new(owner),
            shipping_option_id: None,
            delivery_address: Some("Laugavegur 1".to_string()),
            pickup_time: None,
            status: OrderStatus::Confirmed,
            subtotal_before_vat: Decimal::from(1000),
            tax_amount: Decimal::from(240),
            delivery_fee: Decimal::ZERO,
            total_amount: Decimal::from(1240),
            payment_method: PaymentMethod::CashOnDelivery,
            payment_status: PaymentStatus::Pending,
            notes: None,
            delivery_person_id: courier.map(UserId::new),
            estimated_delivery: None,
            delivered_at: None,
            customer_email: None,
            customer_name: None,
            shipping_option_name: None,
            items: Vec::new(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_view_access() {
        let order = order(1, Some(3));
        assert!(can_view(&user(1, UserRole::Customer), &order));
        assert!(!can_view(&user(2, UserRole::Customer), &order));
        assert!(can_view(&user(9, UserRole::Admin), &order));
        assert!(can_view(&user(3, UserRole::Delivery), &order));
        assert!(!can_view(&user(4, UserRole::Delivery), &order));
    }

    #[test]
    fn test_status_access() {
        let order = order(1, Some(3));
        assert!(can_update_status(&user(9, UserRole::Admin), &order));
        assert!(can_update_status(&user(3, UserRole::Delivery), &order));
        assert!(!can_update_status(&user(4, UserRole::Delivery), &order));
        assert!(!can_update_status(&user(1, UserRole::Customer), &order));
    }

    #[test]
    fn test_list_query_status() {
        let query: ListQuery =
            serde_json::from_value(serde_json::json!({"status": "OUT_FOR_DELIVERY"})).unwrap();
        assert_eq!(query.status, Some(OrderStatus::OutForDelivery));
    }
}
