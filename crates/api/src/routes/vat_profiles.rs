//! VAT profile route handlers.

#![allow(clippy::used_underscore_binding)]

use axum::{Router, extract::State, routing::get};
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::instrument;

use olfong_core::{DEFAULT_VAT_RATE, VatBreakdown, VatProfileId, vat_breakdown};

use crate::db::VatProfileRepository;
use crate::error::AppError;
use crate::middleware::RequireAdmin;
use crate::models::vat_profile::is_valid_rate;
use crate::models::{VatProfile, VatProfileInput, VatProfileUpdate};
use crate::response::{ApiJson, ApiPath, ApiQuery, ApiResponse, ApiResult};
use crate::state::AppState;
use crate::validation::required;

use super::not_found;

const NOT_FOUND: &str = "VAT profile not found";
const INVALID_RATE: &str = "VAT rate must be between 0 and 100";

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(index).post(create))
        .route("/breakdown", get(breakdown))
        .route("/{id}", get(show).put(update).delete(destroy))
}

#[derive(Debug, Deserialize)]
pub struct BreakdownQuery {
    pub amount: Decimal,
    pub rate: Option<Decimal>,
}

#[instrument(skip(state))]
async fn index(State(state): State<AppState>) -> ApiResult<Vec<VatProfile>> {
    let profiles = VatProfileRepository::new(state.pool()).list().await?;
    Ok(ApiResponse::ok(profiles))
}

#[instrument(skip(state))]
async fn show(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<VatProfileId>,
) -> ApiResult<VatProfile> {
    let profile = VatProfileRepository::new(state.pool())
        .get(id)
        .await?
        .ok_or_else(|| AppError::NotFound(NOT_FOUND.to_string()))?;
    Ok(ApiResponse::ok(profile))
}

/// VAT split of a VAT-inclusive amount. The rate defaults to 24%.
#[instrument]
async fn breakdown(ApiQuery(query): ApiQuery<BreakdownQuery>) -> ApiResult<VatBreakdown> {
    let rate = query.rate.unwrap_or(DEFAULT_VAT_RATE);
    if !is_valid_rate(rate) {
        return Err(AppError::BadRequest(INVALID_RATE.to_string()));
    }
    if query.amount.is_sign_negative() {
        return Err(AppError::BadRequest("Amount cannot be negative".to_string()));
    }
    Ok(ApiResponse::ok(vat_breakdown(query.amount, rate)))
}

#[instrument(skip(state, _admin, input), fields(name = %input.name))]
async fn create(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    ApiJson(input): ApiJson<VatProfileInput>,
) -> ApiResult<VatProfile> {
    required("Name", &input.name)?;
    required("Icelandic name", &input.name_is)?;
    if !is_valid_rate(input.vat_rate) {
        return Err(AppError::BadRequest(INVALID_RATE.to_string()));
    }

    let profile = VatProfileRepository::new(state.pool())
        .create(&input)
        .await?;
    tracing::info!(vat_profile_id = %profile.id, rate = %profile.vat_rate, "VAT profile created");
    Ok(ApiResponse::created("VAT profile created successfully", profile))
}

#[instrument(skip(state, _admin, update))]
async fn update(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<VatProfileId>,
    ApiJson(update): ApiJson<VatProfileUpdate>,
) -> ApiResult<VatProfile> {
    if update.vat_rate.is_some_and(|rate| !is_valid_rate(rate)) {
        return Err(AppError::BadRequest(INVALID_RATE.to_string()));
    }
    if let Some(name) = update.name.as_deref() {
        required("Name", name)?;
    }
    let profile = VatProfileRepository::new(state.pool())
        .update(id, &update)
        .await
        .map_err(|e| not_found(e, NOT_FOUND))?;
    Ok(ApiResponse::with_message("VAT profile updated successfully", profile))
}

/// Delete a profile no category is assigned to.
#[instrument(skip(state, _admin))]
async fn destroy(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<VatProfileId>,
) -> ApiResult<()> {
    let profiles = VatProfileRepository::new(state.pool());
    let profile = profiles
        .get(id)
        .await?
        .ok_or_else(|| AppError::NotFound(NOT_FOUND.to_string()))?;
    if !profile.category_ids.is_empty() {
        return Err(AppError::BadRequest(format!(
            "Cannot delete VAT profile assigned to {} categories",
            profile.category_ids.len()
        )));
    }
    profiles.delete(id).await?;
    tracing::info!(vat_profile_id = %id, "VAT profile deleted");
    Ok(ApiResponse::message("VAT profile deleted successfully"))
}
