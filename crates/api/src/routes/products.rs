//! Product catalog route handlers.

#![allow(clippy::used_underscore_binding)]

use axum::{
    Router,
    extract::State,
    routing::{get, post},
};
use chrono::Utc;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use olfong_core::{PageRequest, Pagination, ProductId, discounted_price, validate_window};

use crate::db::{CategoryRepository, ProductRepository, VatProfileRepository};
use crate::error::AppError;
use crate::middleware::RequireAdmin;
use crate::models::{
    Category, DiscountInput, Product, ProductDetail, ProductFilter, ProductInput, ProductSort,
    ProductUpdate, SortDirection,
};
use crate::response::{ApiJson, ApiPath, ApiQuery, ApiResponse, ApiResult};
use crate::services::atvr::internal_category_for;
use crate::state::AppState;

use super::not_found;

const NOT_FOUND: &str = "Product not found";

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(index).post(create))
        .route("/discounted", get(discounted))
        .route("/categories", get(categories))
        .route("/{id}", get(show).put(update).delete(destroy))
        .route("/{id}/discount", post(set_discount).delete(clear_discount))
}

/// Storefront listing query.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListQuery {
    pub category: Option<String>,
    pub subcategory: Option<String>,
    pub search: Option<String>,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
    pub min_alcohol: Option<Decimal>,
    pub max_alcohol: Option<Decimal>,
    #[serde(default)]
    pub sort_by: ProductSort,
    #[serde(default)]
    pub sort_order: SortDirection,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl From<ListQuery> for ProductFilter {
    fn from(q: ListQuery) -> Self {
        Self {
            category: non_blank(q.category),
            subcategory: non_blank(q.subcategory),
            search: non_blank(q.search),
            min_price: q.min_price,
            max_price: q.max_price,
            min_alcohol: q.min_alcohol,
            max_alcohol: q.max_alcohol,
            sort_by: q.sort_by,
            sort_order: q.sort_order,
            page: PageRequest::new(q.page, q.limit),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ProductList {
    pub products: Vec<Product>,
    pub pagination: Pagination,
}

/// List active products.
#[instrument(skip(state))]
async fn index(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<ListQuery>,
) -> ApiResult<ProductList> {
    let filter = ProductFilter::from(query);
    let (products, total) = ProductRepository::new(state.pool()).list(&filter).await?;
    Ok(ApiResponse::ok(ProductList {
        products,
        pagination: Pagination::new(filter.page, total),
    }))
}

/// Products whose discount window contains now.
#[instrument(skip(state))]
async fn discounted(State(state): State<AppState>) -> ApiResult<Vec<Product>> {
    let products = ProductRepository::new(state.pool())
        .discounted(Utc::now())
        .await?;
    Ok(ApiResponse::ok(products))
}

/// Categories that have at least one active product.
#[instrument(skip(state))]
async fn categories(State(state): State<AppState>) -> ApiResult<Vec<Category>> {
    let categories = CategoryRepository::new(state.pool())
        .list_with_products()
        .await?;
    Ok(ApiResponse::ok(categories))
}

#[instrument(skip(state))]
async fn show(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<ProductId>,
) -> ApiResult<ProductDetail> {
    let product = ProductRepository::new(state.pool())
        .detail(id)
        .await?
        .ok_or_else(|| AppError::NotFound(NOT_FOUND.to_string()))?;
    Ok(ApiResponse::ok(product))
}

/// Create a product.
///
/// A `category` name (as scraped from ATVR) is mapped onto the internal
/// categories and created when missing.
#[instrument(skip(state, admin, input), fields(admin_id = %admin.id, name = %input.name))]
async fn create(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    ApiJson(mut input): ApiJson<ProductInput>,
) -> ApiResult<Product> {
    input.validate().map_err(AppError::BadRequest)?;

    let categories = CategoryRepository::new(state.pool());
    let category_id = match (input.category_id, input.category.as_deref()) {
        (Some(id), _) => {
            categories
                .get(id)
                .await?
                .ok_or_else(|| AppError::BadRequest("Category not found".to_string()))?
                .id
        }
        (None, Some(name)) => categories.ensure(&internal_category_for(name)).await?,
        (None, None) => return Err(AppError::BadRequest("Category is required".to_string())),
    };

    if input.atvr_product_id.is_some() && input.vat_profile_id.is_none() {
        input.vat_profile_id = VatProfileRepository::new(state.pool()).default_id().await?;
    }

    let product = ProductRepository::new(state.pool())
        .create(&input, category_id)
        .await?;
    tracing::info!(product_id = %product.id, "Product created");
    Ok(ApiResponse::created("Product created successfully", product))
}

#[instrument(skip(state, _admin, update))]
async fn update(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<ProductId>,
    ApiJson(update): ApiJson<ProductUpdate>,
) -> ApiResult<Product> {
    update.validate().map_err(AppError::BadRequest)?;
    let product = ProductRepository::new(state.pool())
        .update(id, &update)
        .await
        .map_err(|e| not_found(e, NOT_FOUND))?;
    Ok(ApiResponse::with_message("Product updated successfully", product))
}

/// Delete a product that no order refers to.
#[instrument(skip(state, _admin))]
async fn destroy(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<ProductId>,
) -> ApiResult<()> {
    let products = ProductRepository::new(state.pool());
    if products.get(id).await?.is_none() {
        return Err(AppError::NotFound(NOT_FOUND.to_string()));
    }
    if products.order_item_count(id).await? > 0 {
        return Err(AppError::BadRequest(
            "Cannot delete product that is referenced by orders".to_string(),
        ));
    }
    products.delete(id).await?;
    tracing::info!(product_id = %id, "Product deleted");
    Ok(ApiResponse::message("Product deleted successfully"))
}

#[instrument(skip(state, _admin))]
async fn set_discount(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<ProductId>,
    ApiJson(input): ApiJson<DiscountInput>,
) -> ApiResult<Product> {
    let price = discounted_price(input.original_price, input.discount_percentage)
        .map_err(|e| AppError::BadRequest(e.to_string()))?;
    validate_window(input.discount_start_date, input.discount_end_date)
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let product = ProductRepository::new(state.pool())
        .set_discount(
            id,
            input.original_price,
            input.discount_percentage,
            price,
            input.discount_start_date,
            input.discount_end_date,
        )
        .await
        .map_err(|e| not_found(e, NOT_FOUND))?;
    Ok(ApiResponse::with_message("Discount applied successfully", product))
}

#[instrument(skip(state, _admin))]
async fn clear_discount(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<ProductId>,
) -> ApiResult<Product> {
    let product = ProductRepository::new(state.pool())
        .clear_discount(id)
        .await
        .map_err(|e| not_found(e, NOT_FOUND))?;
    Ok(ApiResponse::with_message("Discount removed successfully", product))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use axum::{extract::Query, http::Uri};

    fn filter(query: &str) -> ProductFilter {
        let uri: Uri = format!("/api/products?{query}").parse().unwrap();
        let Query(query) = Query::<ListQuery>::try_from_uri(&uri).unwrap();
        query.into()
    }

    #[test]
    fn test_list_query_defaults() {
        let filter = filter("");
        assert_eq!(filter.sort_by, ProductSort::CreatedAt);
        assert_eq!(filter.sort_order, SortDirection::Desc);
        assert_eq!(filter.page.page(), 1);
        assert_eq!(filter.page.limit(), 20);
    }

    #[test]
    fn test_list_query_parses_filters() {
        let filter = filter(
            "category=wine&search=%20rioja%20&minPrice=1000&sortBy=price&sortOrder=asc&page=2&limit=500",
        );
        assert_eq!(filter.category.as_deref(), Some("wine"));
        assert_eq!(filter.search.as_deref(), Some("rioja"));
        assert_eq!(filter.min_price, Some(Decimal::from(1000)));
        assert_eq!(filter.sort_by, ProductSort::Price);
        assert_eq!(filter.sort_order, SortDirection::Asc);
        assert_eq!(filter.page.limit(), 100);
        assert_eq!(filter.page.offset(), 100);
    }

    #[test]
    fn test_blank_filters_are_ignored() {
        let filter = filter("category=&search=%20");
        assert!(filter.category.is_none());
        assert!(filter.search.is_none());
    }
}
