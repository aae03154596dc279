//! Back-office customer list.

#![allow(clippy::used_underscore_binding)]

use axum::{Router, extract::State, routing::get};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use olfong_core::{PageRequest, Pagination, UserId};

use crate::db::{CustomerRepository, OrderRepository};
use crate::error::AppError;
use crate::middleware::RequireAdmin;
use crate::models::{CustomerDetail, CustomerFilter, CustomerStatus, CustomerSummary};
use crate::response::{ApiPath, ApiQuery, ApiResponse, ApiResult};
use crate::state::AppState;

const NOT_FOUND: &str = "Customer not found";

/// Orders shown on the customer detail view.
const RECENT_ORDERS: i64 = 20;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(index))
        .route("/{id}", get(show))
}

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub search: Option<String>,
    pub status: Option<CustomerStatus>,
}

impl From<ListQuery> for CustomerFilter {
    fn from(q: ListQuery) -> Self {
        Self {
            search: q.search.map(|s| s.trim().to_string()).filter(|s| !s.is_empty()),
            status: q.status,
            page: PageRequest::new(q.page, q.limit),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CustomerList {
    pub customers: Vec<CustomerSummary>,
    pub pagination: Pagination,
}

#[instrument(skip(state, _admin))]
async fn index(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<ListQuery>,
) -> ApiResult<CustomerList> {
    let filter = CustomerFilter::from(query);
    let (customers, total) = CustomerRepository::new(state.pool()).list(&filter).await?;
    Ok(ApiResponse::ok(CustomerList {
        customers,
        pagination: Pagination::new(filter.page, total),
    }))
}

#[instrument(skip(state, _admin))]
async fn show(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<UserId>,
) -> ApiResult<CustomerDetail> {
    let customer = CustomerRepository::new(state.pool())
        .get(id)
        .await?
        .ok_or_else(|| AppError::NotFound(NOT_FOUND.to_string()))?;
    let (orders, _) = OrderRepository::new(state.pool())
        .list_for_user(id, None, PageRequest::new(Some(1), Some(RECENT_ORDERS)))
        .await?;
    Ok(ApiResponse::ok(CustomerDetail { customer, orders }))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_list_query_into_filter() {
        let query: ListQuery = serde_json::from_value(serde_json::json!({
            "search": "  ",
            "status": "vip",
            "page": 2
        }))
        .unwrap();
        let filter = CustomerFilter::from(query);
        assert!(filter.search.is_none());
        assert_eq!(filter.status, Some(CustomerStatus::Vip));
        assert_eq!(filter.page.offset(), 20);

        let bad: Result<ListQuery, _> =
            serde_json::from_value(serde_json::json!({"status": "gold"}));
        assert!(bad.is_err());
    }
}
