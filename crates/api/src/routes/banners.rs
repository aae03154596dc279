//! Storefront banner handlers.

#![allow(clippy::used_underscore_binding)]

use axum::{
    Router,
    extract::State,
    routing::{get, patch},
};
use serde::Deserialize;
use tracing::instrument;

use olfong_core::{BannerId, MediaCollection, MediaId};

use crate::db::{BannerRepository, MediaRepository};
use crate::error::AppError;
use crate::middleware::RequireAdmin;
use crate::models::{Banner, BannerInput, BannerUpdate, Media};
use crate::response::{ApiJson, ApiPath, ApiQuery, ApiResponse, ApiResult};
use crate::state::AppState;

use super::not_found;

const NOT_FOUND: &str = "Banner not found";

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(index).post(create))
        .route("/{id}", get(show).put(update).delete(destroy))
        .route("/{id}/toggle", patch(toggle))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListQuery {
    #[serde(default)]
    pub include_inactive: bool,
}

/// A banner may only show media from the BANNERS collection.
fn check_banner_media(media: Option<Media>) -> Result<Media, AppError> {
    let media = media.ok_or_else(|| AppError::BadRequest("Banner media not found".to_string()))?;
    if media.collection != MediaCollection::Banners {
        return Err(AppError::BadRequest(
            "Banner images must come from the BANNERS collection".to_string(),
        ));
    }
    Ok(media)
}

async fn media_url(state: &AppState, id: MediaId) -> Result<String, AppError> {
    let media = MediaRepository::new(state.pool()).get(id).await?;
    Ok(check_banner_media(media)?.url)
}

#[instrument(skip(state))]
async fn index(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<ListQuery>,
) -> ApiResult<Vec<Banner>> {
    let banners = BannerRepository::new(state.pool())
        .list(query.include_inactive)
        .await?;
    Ok(ApiResponse::ok(banners))
}

#[instrument(skip(state))]
async fn show(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<BannerId>,
) -> ApiResult<Banner> {
    let banner = BannerRepository::new(state.pool())
        .get(id)
        .await?
        .ok_or_else(|| AppError::NotFound(NOT_FOUND.to_string()))?;
    Ok(ApiResponse::ok(banner))
}

#[instrument(skip(state, _admin, input))]
async fn create(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    ApiJson(input): ApiJson<BannerInput>,
) -> ApiResult<Banner> {
    input.validate()?;
    let image_url = match input.media_id {
        Some(id) => media_url(&state, id).await?,
        None => input.image_url.clone().unwrap_or_default(),
    };

    let banner = BannerRepository::new(state.pool())
        .create(&input, &image_url)
        .await?;
    Ok(ApiResponse::created("Banner created successfully", banner))
}

#[instrument(skip(state, _admin, update))]
async fn update(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<BannerId>,
    ApiJson(mut update): ApiJson<BannerUpdate>,
) -> ApiResult<Banner> {
    update.validate()?;
    if let Some(media_id) = update.media_id {
        update.image_url = Some(media_url(&state, media_id).await?);
    }

    let banner = BannerRepository::new(state.pool())
        .update(id, &update)
        .await
        .map_err(|e| not_found(e, NOT_FOUND))?;
    Ok(ApiResponse::with_message("Banner updated successfully", banner))
}

#[instrument(skip(state, _admin))]
async fn destroy(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<BannerId>,
) -> ApiResult<()> {
    BannerRepository::new(state.pool())
        .delete(id)
        .await
        .map_err(|e| not_found(e, NOT_FOUND))?;
    tracing::info!(banner_id = %id, "Banner deleted");
    Ok(ApiResponse::message("Banner deleted successfully"))
}

#[instrument(skip(state, _admin))]
async fn toggle(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<BannerId>,
) -> ApiResult<Banner> {
    let banner = BannerRepository::new(state.pool())
        .toggle(id)
        .await
        .map_err(|e| not_found(e, NOT_FOUND))?;
    Ok(ApiResponse::with_message(
        "Banner status updated successfully",
        banner,
    ))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Utc;

    use super::*;

    fn media(collection: MediaCollection) -> Media {
        Media {
            id: MediaId::generate(),
            collection,
            filename: "a.jpg".to_string(),
            original_name: "a.jpg".to_string(),
            mime_type: "image/jpeg".to_string(),
            size: 10,
            hash: "00".to_string(),
            url: "https://olfong.is/uploads/banners/originals/a.jpg".to_string(),
            path: "/tmp/a.jpg".to_string(),
            alt: None,
            caption: None,
            description: None,
            uploaded_by: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_banner_media_collection() {
        assert!(check_banner_media(Some(media(MediaCollection::Banners))).is_ok());
        assert!(matches!(
            check_banner_media(Some(media(MediaCollection::Products))),
            Err(AppError::BadRequest(_))
        ));
        assert!(matches!(check_banner_media(None), Err(AppError::BadRequest(_))));
    }

    #[test]
    fn test_list_query() {
        let query: ListQuery =
            serde_json::from_value(serde_json::json!({"includeInactive": true})).unwrap();
        assert!(query.include_inactive);
        assert!(!ListQuery::default().include_inactive);
    }
}
