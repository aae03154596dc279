//! CMS page route handlers.

#![allow(clippy::used_underscore_binding)]

use axum::{
    Router,
    extract::State,
    routing::{get, patch, put},
};
use serde::Deserialize;
use tracing::instrument;

use olfong_core::PageId;

use crate::db::PageRepository;
use crate::error::AppError;
use crate::middleware::RequireAdmin;
use crate::models::{Page, PageInput, PageOrder, PageUpdate};
use crate::response::{ApiJson, ApiPath, ApiResponse, ApiResult};
use crate::state::AppState;
use crate::validation::validate_slug;

use super::not_found;

const NOT_FOUND: &str = "Page not found";

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(index).post(create))
        .route("/slug/{slug}", get(show_by_slug))
        .route("/admin/all", get(all))
        .route("/reorder", put(reorder))
        .route("/{id}", get(show).put(update).delete(destroy))
        .route("/{id}/toggle-visibility", patch(toggle_visibility))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReorderRequest {
    pub page_orders: Vec<PageOrder>,
}

/// Published, visible pages for the storefront menu.
#[instrument(skip(state))]
async fn index(State(state): State<AppState>) -> ApiResult<Vec<Page>> {
    let pages = PageRepository::new(state.pool()).list_public().await?;
    Ok(ApiResponse::ok(pages))
}

/// A published page. Drafts and archived pages are reported as missing.
#[instrument(skip(state))]
async fn show_by_slug(
    State(state): State<AppState>,
    ApiPath(slug): ApiPath<String>,
) -> ApiResult<Page> {
    let page = PageRepository::new(state.pool())
        .get_by_slug(&slug)
        .await?
        .filter(Page::is_public)
        .ok_or_else(|| AppError::NotFound(NOT_FOUND.to_string()))?;
    Ok(ApiResponse::ok(page))
}

#[instrument(skip(state, _admin))]
async fn all(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
) -> ApiResult<Vec<Page>> {
    let pages = PageRepository::new(state.pool()).list_all().await?;
    Ok(ApiResponse::ok(pages))
}

#[instrument(skip(state, _admin))]
async fn show(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<PageId>,
) -> ApiResult<Page> {
    let page = PageRepository::new(state.pool())
        .get(id)
        .await?
        .ok_or_else(|| AppError::NotFound(NOT_FOUND.to_string()))?;
    Ok(ApiResponse::ok(page))
}

#[instrument(skip(state, _admin, input), fields(slug = %input.slug))]
async fn create(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    ApiJson(input): ApiJson<PageInput>,
) -> ApiResult<Page> {
    let missing = input.missing_fields();
    if !missing.is_empty() {
        return Err(AppError::BadRequest(format!(
            "Missing required fields: {}",
            missing.join(", ")
        )));
    }
    validate_slug(&input.slug)?;

    let page = PageRepository::new(state.pool()).create(&input).await?;
    tracing::info!(page_id = %page.id, "Page created");
    Ok(ApiResponse::created("Page created successfully", page))
}

#[instrument(skip(state, _admin, update))]
async fn update(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<PageId>,
    ApiJson(update): ApiJson<PageUpdate>,
) -> ApiResult<Page> {
    if let Some(slug) = update.slug.as_deref() {
        validate_slug(slug)?;
    }
    let page = PageRepository::new(state.pool())
        .update(id, &update)
        .await
        .map_err(|e| not_found(e, NOT_FOUND))?;
    Ok(ApiResponse::with_message("Page updated successfully", page))
}

#[instrument(skip(state, _admin))]
async fn destroy(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<PageId>,
) -> ApiResult<()> {
    PageRepository::new(state.pool())
        .delete(id)
        .await
        .map_err(|e| not_found(e, NOT_FOUND))?;
    tracing::info!(page_id = %id, "Page deleted");
    Ok(ApiResponse::message("Page deleted successfully"))
}

/// Rewrite the menu order in one transaction.
#[instrument(skip(state, _admin, request), fields(count = request.page_orders.len()))]
async fn reorder(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    ApiJson(request): ApiJson<ReorderRequest>,
) -> ApiResult<()> {
    if request.page_orders.is_empty() {
        return Err(AppError::BadRequest("pageOrders cannot be empty".to_string()));
    }
    PageRepository::new(state.pool())
        .reorder(&request.page_orders)
        .await?;
    Ok(ApiResponse::message("Pages reordered successfully"))
}

#[instrument(skip(state, _admin))]
async fn toggle_visibility(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<PageId>,
) -> ApiResult<Page> {
    let page = PageRepository::new(state.pool())
        .toggle_visibility(id)
        .await
        .map_err(|e| not_found(e, NOT_FOUND))?;
    let message = if page.is_visible {
        "Page is now visible"
    } else {
        "Page is now hidden"
    };
    Ok(ApiResponse::with_message(message, page))
}
