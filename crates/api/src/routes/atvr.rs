//! ATVR catalog route handlers (admin only).

#![allow(clippy::used_underscore_binding)]

use axum::{
    Router,
    extract::State,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use olfong_core::Locale;

use crate::error::AppError;
use crate::middleware::RequireAdmin;
use crate::response::{ApiJson, ApiPath, ApiQuery, ApiResponse, ApiResult};
use crate::services::atvr::catalog::{FOOD_CATEGORIES, LabelledCode, PRODUCT_CATEGORIES, labelled};
use crate::services::atvr::{AtvrProduct, ImportSummary, import_products};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/search", post(search))
        .route("/product/{product_id}", get(product))
        .route("/food-categories", get(food_categories))
        .route("/product-categories", get(product_categories))
        .route("/import", post(import))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchRequest {
    #[serde(default)]
    pub search_term: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResponse {
    pub products: Vec<AtvrProduct>,
    pub total: usize,
    pub search_term: String,
    pub language: &'static str,
}

#[derive(Debug, Default, Deserialize)]
pub struct LanguageQuery {
    #[serde(default)]
    pub language: Locale,
}

#[derive(Debug, Deserialize)]
pub struct ImportRequest {
    pub products: Vec<AtvrProduct>,
}

/// Search both catalog languages and merge the hits.
#[instrument(skip(state, _admin, request), fields(term = %request.search_term))]
async fn search(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    ApiJson(request): ApiJson<SearchRequest>,
) -> ApiResult<SearchResponse> {
    let term = request.search_term.trim();
    if term.is_empty() {
        return Err(AppError::BadRequest("Search term is required".to_string()));
    }

    let products = state.atvr().search(term).await?;
    Ok(ApiResponse::ok(SearchResponse {
        total: products.len(),
        products,
        search_term: term.to_string(),
        language: "both",
    }))
}

#[instrument(skip(state, _admin))]
async fn product(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    ApiPath(product_id): ApiPath<String>,
    ApiQuery(query): ApiQuery<LanguageQuery>,
) -> ApiResult<AtvrProduct> {
    let product = state
        .atvr()
        .product_detail(product_id.trim(), query.language)
        .await?
        .ok_or_else(|| AppError::NotFound("Product not found on ATVR".to_string()))?;
    Ok(ApiResponse::ok(product))
}

#[instrument(skip(_admin))]
async fn food_categories(
    RequireAdmin(_admin): RequireAdmin,
    ApiQuery(query): ApiQuery<LanguageQuery>,
) -> ApiResult<Vec<LabelledCode>> {
    Ok(ApiResponse::ok(labelled(FOOD_CATEGORIES, query.language)))
}

#[instrument(skip(_admin))]
async fn product_categories(
    RequireAdmin(_admin): RequireAdmin,
    ApiQuery(query): ApiQuery<LanguageQuery>,
) -> ApiResult<Vec<LabelledCode>> {
    Ok(ApiResponse::ok(labelled(PRODUCT_CATEGORIES, query.language)))
}

/// Import selected search results as inactive products.
#[instrument(skip(state, admin, request), fields(admin_id = %admin.id, count = request.products.len()))]
async fn import(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    ApiJson(request): ApiJson<ImportRequest>,
) -> ApiResult<ImportSummary> {
    if request.products.is_empty() {
        return Err(AppError::BadRequest("No products selected".to_string()));
    }
    let summary = import_products(state.pool(), request.products).await?;
    let message = format!(
        "Imported {} products, skipped {}",
        summary.imported, summary.skipped
    );
    Ok(ApiResponse::with_message(&message, summary))
}
