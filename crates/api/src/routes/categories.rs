//! Category and subcategory route handlers.

#![allow(clippy::used_underscore_binding)]

use axum::{
    Router,
    extract::State,
    routing::{get, put},
};
use serde::Deserialize;
use tracing::instrument;

use olfong_core::{CategoryId, SubcategoryId};

use crate::db::CategoryRepository;
use crate::error::AppError;
use crate::middleware::RequireAdmin;
use crate::models::{Category, CategoryInput, CategoryUpdate, Subcategory, SubcategoryInput};
use crate::response::{ApiJson, ApiPath, ApiQuery, ApiResponse, ApiResult};
use crate::state::AppState;
use crate::validation::{required, slugify, validate_slug};

use super::not_found;

const NOT_FOUND: &str = "Category not found";
const SUBCATEGORY_NOT_FOUND: &str = "Subcategory not found";

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(index).post(create))
        .route("/slug/{slug}", get(show_by_slug))
        .route("/{id}", get(show).put(update).delete(destroy))
        .route(
            "/{id}/subcategories",
            get(subcategories).post(create_subcategory),
        )
}

/// Routes mounted at `/api/subcategories`.
pub fn subcategory_router() -> Router<AppState> {
    Router::new().route("/{id}", put(update_subcategory).delete(destroy_subcategory))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListQuery {
    #[serde(default)]
    pub include_inactive: bool,
}

/// Pick the slug for a new category or subcategory.
fn resolve_slug(slug: Option<&str>, name: &str) -> Result<String, AppError> {
    let slug = match slug.map(str::trim).filter(|s| !s.is_empty()) {
        Some(slug) => slug.to_string(),
        None => slugify(name),
    };
    if slug.is_empty() {
        return Err(AppError::BadRequest("Slug cannot be empty".to_string()));
    }
    validate_slug(&slug)?;
    Ok(slug)
}

#[instrument(skip(state))]
async fn index(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<ListQuery>,
) -> ApiResult<Vec<Category>> {
    let categories = CategoryRepository::new(state.pool())
        .list(query.include_inactive)
        .await?;
    Ok(ApiResponse::ok(categories))
}

#[instrument(skip(state))]
async fn show(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<CategoryId>,
) -> ApiResult<Category> {
    let category = CategoryRepository::new(state.pool())
        .get(id)
        .await?
        .ok_or_else(|| AppError::NotFound(NOT_FOUND.to_string()))?;
    Ok(ApiResponse::ok(category))
}

#[instrument(skip(state))]
async fn show_by_slug(
    State(state): State<AppState>,
    ApiPath(slug): ApiPath<String>,
) -> ApiResult<Category> {
    let category = CategoryRepository::new(state.pool())
        .get_by_slug(&slug)
        .await?
        .ok_or_else(|| AppError::NotFound(NOT_FOUND.to_string()))?;
    Ok(ApiResponse::ok(category))
}

/// Create a category. The name is stored upper-case.
#[instrument(skip(state, _admin, input), fields(name = %input.name))]
async fn create(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    ApiJson(mut input): ApiJson<CategoryInput>,
) -> ApiResult<Category> {
    required("Name", &input.name)?;
    required("Icelandic name", &input.name_is)?;
    input.name = input.name.trim().to_uppercase();
    let slug = resolve_slug(input.slug.as_deref(), &input.name)?;

    let category = CategoryRepository::new(state.pool())
        .create(&input, &slug)
        .await?;
    tracing::info!(category_id = %category.id, slug = %category.slug, "Category created");
    Ok(ApiResponse::created("Category created successfully", category))
}

#[instrument(skip(state, _admin, update))]
async fn update(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<CategoryId>,
    ApiJson(mut update): ApiJson<CategoryUpdate>,
) -> ApiResult<Category> {
    if let Some(name) = update.name.as_mut() {
        required("Name", name)?;
        *name = name.trim().to_uppercase();
    }
    if let Some(slug) = update.slug.as_deref() {
        validate_slug(slug)?;
    }
    let category = CategoryRepository::new(state.pool())
        .update(id, &update)
        .await
        .map_err(|e| not_found(e, NOT_FOUND))?;
    Ok(ApiResponse::with_message("Category updated successfully", category))
}

/// Delete an empty category. The offers category is never deleted.
#[instrument(skip(state, _admin))]
async fn destroy(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<CategoryId>,
) -> ApiResult<()> {
    let categories = CategoryRepository::new(state.pool());
    let category = categories
        .get(id)
        .await?
        .ok_or_else(|| AppError::NotFound(NOT_FOUND.to_string()))?;

    if category.is_protected() {
        return Err(AppError::BadRequest(
            "The offers category cannot be deleted".to_string(),
        ));
    }
    if category.product_count > 0 {
        return Err(AppError::BadRequest(format!(
            "Cannot delete category with {} products. Move or delete the products first.",
            category.product_count
        )));
    }

    categories.delete(id).await?;
    tracing::info!(category_id = %id, "Category deleted");
    Ok(ApiResponse::message("Category deleted successfully"))
}

#[instrument(skip(state))]
async fn subcategories(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<CategoryId>,
) -> ApiResult<Vec<Subcategory>> {
    let subcategories = CategoryRepository::new(state.pool())
        .subcategories(id)
        .await?;
    Ok(ApiResponse::ok(subcategories))
}

#[instrument(skip(state, _admin, input))]
async fn create_subcategory(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    ApiPath(category_id): ApiPath<CategoryId>,
    ApiJson(input): ApiJson<SubcategoryInput>,
) -> ApiResult<Subcategory> {
    let name = input.name.as_deref().unwrap_or_default().trim();
    let name_is = input.name_is.as_deref().unwrap_or_default().trim();
    required("Name", name)?;
    required("Icelandic name", name_is)?;

    let categories = CategoryRepository::new(state.pool());
    if categories.get(category_id).await?.is_none() {
        return Err(AppError::NotFound(NOT_FOUND.to_string()));
    }

    let name = name.to_uppercase();
    let slug = resolve_slug(input.slug.as_deref(), &name)?;
    let subcategory = categories
        .create_subcategory(category_id, &name, name_is, &slug, &input)
        .await?;
    Ok(ApiResponse::created(
        "Subcategory created successfully",
        subcategory,
    ))
}

#[instrument(skip(state, _admin, input))]
async fn update_subcategory(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<SubcategoryId>,
    ApiJson(mut input): ApiJson<SubcategoryInput>,
) -> ApiResult<Subcategory> {
    if let Some(name) = input.name.as_mut() {
        required("Name", name)?;
        *name = name.trim().to_uppercase();
    }
    if let Some(slug) = input.slug.as_deref() {
        validate_slug(slug)?;
    }
    let subcategory = CategoryRepository::new(state.pool())
        .update_subcategory(id, &input)
        .await
        .map_err(|e| not_found(e, SUBCATEGORY_NOT_FOUND))?;
    Ok(ApiResponse::with_message(
        "Subcategory updated successfully",
        subcategory,
    ))
}

#[instrument(skip(state, _admin))]
async fn destroy_subcategory(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<SubcategoryId>,
) -> ApiResult<()> {
    let categories = CategoryRepository::new(state.pool());
    if categories.get_subcategory(id).await?.is_none() {
        return Err(AppError::NotFound(SUBCATEGORY_NOT_FOUND.to_string()));
    }
    let count = categories.subcategory_product_count(id).await?;
    if count > 0 {
        return Err(AppError::BadRequest(format!(
            "Cannot delete subcategory with {count} products"
        )));
    }
    categories.delete_subcategory(id).await?;
    Ok(ApiResponse::message("Subcategory deleted successfully"))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_slug_defaults_from_name() {
        assert_eq!(resolve_slug(None, "RAUÐVÍN").unwrap(), "raudvin");
        assert_eq!(resolve_slug(Some("  "), "CIDER RTD").unwrap(), "cider-rtd");
        assert_eq!(resolve_slug(Some("bjor"), "BEERS").unwrap(), "bjor");
    }

    #[test]
    fn test_resolve_slug_rejects_bad_input() {
        assert!(resolve_slug(Some("Not A Slug"), "X").is_err());
        assert!(resolve_slug(None, "!!!").is_err());
    }
}
