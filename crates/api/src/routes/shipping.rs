//! Shipping option route handlers.

#![allow(clippy::used_underscore_binding)]

use axum::{
    Router,
    extract::State,
    routing::{get, patch},
};
use tracing::instrument;

use olfong_core::ShippingOptionId;

use crate::db::ShippingRepository;
use crate::error::AppError;
use crate::middleware::RequireAdmin;
use crate::models::{ShippingOption, ShippingOptionInput, ShippingOptionUpdate};
use crate::response::{ApiJson, ApiPath, ApiResponse, ApiResult};
use crate::state::AppState;

use super::not_found;

const NOT_FOUND: &str = "Shipping option not found";

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(index).post(create))
        .route("/active", get(active))
        .route("/{id}", get(show).put(update).delete(destroy))
        .route("/{id}/toggle", patch(toggle))
}

/// Options shown at checkout.
#[instrument(skip(state))]
async fn active(State(state): State<AppState>) -> ApiResult<Vec<ShippingOption>> {
    let options = ShippingRepository::new(state.pool()).list_active().await?;
    Ok(ApiResponse::ok(options))
}

#[instrument(skip(state, _admin))]
async fn index(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
) -> ApiResult<Vec<ShippingOption>> {
    let options = ShippingRepository::new(state.pool()).list().await?;
    Ok(ApiResponse::ok(options))
}

#[instrument(skip(state, _admin))]
async fn show(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<ShippingOptionId>,
) -> ApiResult<ShippingOption> {
    let option = ShippingRepository::new(state.pool())
        .get(id)
        .await?
        .ok_or_else(|| AppError::NotFound(NOT_FOUND.to_string()))?;
    Ok(ApiResponse::ok(option))
}

#[instrument(skip(state, _admin, input), fields(name = %input.name))]
async fn create(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    ApiJson(input): ApiJson<ShippingOptionInput>,
) -> ApiResult<ShippingOption> {
    input.validate().map_err(AppError::BadRequest)?;
    let option = ShippingRepository::new(state.pool()).create(&input).await?;
    tracing::info!(shipping_option_id = %option.id, "Shipping option created");
    Ok(ApiResponse::created(
        "Shipping option created successfully",
        option,
    ))
}

#[instrument(skip(state, _admin, update))]
async fn update(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<ShippingOptionId>,
    ApiJson(update): ApiJson<ShippingOptionUpdate>,
) -> ApiResult<ShippingOption> {
    update.validate().map_err(AppError::BadRequest)?;
    let option = ShippingRepository::new(state.pool())
        .update(id, &update)
        .await
        .map_err(|e| not_found(e, NOT_FOUND))?;
    Ok(ApiResponse::with_message(
        "Shipping option updated successfully",
        option,
    ))
}

/// Delete an option no order refers to.
#[instrument(skip(state, _admin))]
async fn destroy(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<ShippingOptionId>,
) -> ApiResult<()> {
    let shipping = ShippingRepository::new(state.pool());
    if shipping.get(id).await?.is_none() {
        return Err(AppError::NotFound(NOT_FOUND.to_string()));
    }
    let orders = shipping.order_count(id).await?;
    if orders > 0 {
        return Err(AppError::BadRequest(format!(
            "Cannot delete shipping option used by {orders} orders. Disable it instead."
        )));
    }
    shipping.delete(id).await?;
    Ok(ApiResponse::message("Shipping option deleted successfully"))
}

#[instrument(skip(state, _admin))]
async fn toggle(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<ShippingOptionId>,
) -> ApiResult<ShippingOption> {
    let option = ShippingRepository::new(state.pool())
        .toggle(id)
        .await
        .map_err(|e| not_found(e, NOT_FOUND))?;
    let message = if option.is_enabled {
        "Shipping option enabled"
    } else {
        "Shipping option disabled"
    };
    Ok(ApiResponse::with_message(message, option))
}
