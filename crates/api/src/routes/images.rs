//! Stock image search and import route handlers (admin only).

#![allow(clippy::used_underscore_binding)]

use std::sync::Arc;

use axum::{
    Router,
    extract::State,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::db::MediaRepository;
use crate::error::AppError;
use crate::middleware::RequireAdmin;
use crate::models::Media;
use crate::response::{ApiJson, ApiQuery, ApiResponse, ApiResult};
use crate::services::image_search::{ImageSource, SearchRequest, SearchResults};
use crate::services::media_storage::Upload;
use crate::state::AppState;

use super::media::parse_collection;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/search", get(search))
        .route("/sources", get(sources))
        .route("/import", post(import))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchQuery {
    #[serde(default)]
    pub query: String,
    pub per_page: Option<u32>,
    pub page: Option<u32>,
    /// Comma separated provider names.
    pub sources: Option<String>,
}

impl SearchQuery {
    fn into_request(self) -> Result<SearchRequest, AppError> {
        if self.query.trim().is_empty() {
            return Err(AppError::BadRequest("Search query is required".to_string()));
        }
        let sources = self
            .sources
            .as_deref()
            .map(|list| {
                list.split(',')
                    .filter(|s| !s.trim().is_empty())
                    .map(str::parse::<ImageSource>)
                    .collect::<Result<Vec<_>, _>>()
            })
            .transpose()
            .map_err(AppError::BadRequest)?
            .filter(|s| !s.is_empty());
        Ok(SearchRequest::new(
            &self.query,
            self.per_page,
            self.page,
            sources,
        ))
    }
}

#[derive(Debug, Serialize)]
pub struct SourceInfo {
    pub id: ImageSource,
    pub name: &'static str,
}

#[derive(Debug, Deserialize)]
pub struct ImportRequest {
    pub url: String,
    pub collection: Option<String>,
    pub alt: Option<String>,
}

/// Search every enabled provider at once.
#[instrument(skip(state, _admin))]
async fn search(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<SearchQuery>,
) -> ApiResult<SearchResults> {
    let request = query.into_request()?;
    let results = state.images().search(request).await?;
    Ok(ApiResponse::ok(Arc::unwrap_or_clone(results)))
}

#[instrument(skip(state, _admin))]
async fn sources(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
) -> ApiResult<Vec<SourceInfo>> {
    let sources = state
        .images()
        .enabled_sources()
        .into_iter()
        .map(|id| SourceInfo {
            id,
            name: id.display_name(),
        })
        .collect();
    Ok(ApiResponse::ok(sources))
}

/// Download a chosen result into the media library.
#[instrument(skip(state, admin, request), fields(admin_id = %admin.id, url = %request.url))]
async fn import(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    ApiJson(request): ApiJson<ImportRequest>,
) -> ApiResult<Media> {
    let collection = parse_collection(request.collection.as_deref())?;
    let image = state.images().download(&request.url, collection).await?;

    let repo = MediaRepository::new(state.pool());
    let ingested = state
        .media()
        .ingest(
            &repo,
            Upload {
                collection,
                original_name: image.file_name,
                mime_type: image.mime_type,
                bytes: image.bytes,
                alt: request.alt.filter(|a| !a.trim().is_empty()),
                caption: None,
                description: None,
                uploaded_by: Some(admin.id),
            },
        )
        .await?;

    if ingested.existing {
        return Ok(ApiResponse::with_message(
            "Image already exists, using existing media",
            ingested.media,
        ));
    }
    Ok(ApiResponse::created(
        "Image imported successfully",
        ingested.media,
    ))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn query(sources: Option<&str>) -> SearchQuery {
        SearchQuery {
            query: "red wine glass".to_string(),
            per_page: Some(500),
            page: None,
            sources: sources.map(str::to_string),
        }
    }

    #[test]
    fn test_sources_are_parsed_and_sorted() {
        let request = query(Some("pixabay,unsplash,pixabay")).into_request().unwrap();
        assert_eq!(
            request.sources,
            vec![ImageSource::Unsplash, ImageSource::Pixabay]
        );
        assert_eq!(request.per_page, 50);
        assert_eq!(request.page, 1);
    }

    #[test]
    fn test_empty_sources_mean_all() {
        assert!(query(Some("")).into_request().unwrap().sources.is_empty());
        assert!(query(None).into_request().unwrap().sources.is_empty());
    }

    #[test]
    fn test_rejects_unknown_source_and_blank_query() {
        assert!(query(Some("flickr")).into_request().is_err());
        let mut blank = query(None);
        blank.query = "  ".to_string();
        assert!(blank.into_request().is_err());
    }
}
