//! Media library route handlers.

#![allow(clippy::used_underscore_binding)]

use axum::{
    Router,
    extract::{Multipart, State},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use olfong_core::{MediaCollection, MediaId, PageRequest, Pagination};

use crate::db::MediaRepository;
use crate::error::AppError;
use crate::middleware::RequireAdmin;
use crate::models::{Media, MediaFilter, MediaSort, MediaUpdate, SortDirection};
use crate::response::{ApiJson, ApiPath, ApiQuery, ApiResponse, ApiResult};
use crate::services::media_storage::Upload;
use crate::state::AppState;

use super::not_found;

const NOT_FOUND: &str = "Media not found";
const IN_USE: &str = "Cannot delete media that is currently in use";

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(index))
        .route("/upload", post(upload))
        .route("/bulk-delete", post(bulk_delete))
        .route("/{id}", get(show).put(update).delete(destroy))
}

/// Parse a `collection` value, defaulting to the product collection.
pub(crate) fn parse_collection(value: Option<&str>) -> Result<MediaCollection, AppError> {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        Some(value) => value.parse().map_err(AppError::BadRequest),
        None => Ok(MediaCollection::Products),
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListQuery {
    pub collection: Option<String>,
    pub search: Option<String>,
    #[serde(default)]
    pub sort_by: MediaSort,
    #[serde(default)]
    pub sort_order: SortDirection,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

impl TryFrom<ListQuery> for MediaFilter {
    type Error = AppError;

    fn try_from(q: ListQuery) -> Result<Self, AppError> {
        let collection = match q.collection.as_deref().map(str::trim) {
            Some(value) if !value.is_empty() => Some(parse_collection(Some(value))?),
            _ => None,
        };
        Ok(Self {
            collection,
            search: q
                .search
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty()),
            sort_by: q.sort_by,
            sort_order: q.sort_order,
            page: PageRequest::new(q.page, q.limit),
        })
    }
}

#[derive(Debug, Serialize)]
pub struct MediaList {
    pub media: Vec<Media>,
    pub pagination: Pagination,
}

#[derive(Debug, Deserialize)]
pub struct BulkDeleteRequest {
    pub ids: Vec<MediaId>,
}

#[derive(Debug, Serialize)]
pub struct BulkDeleteResult {
    pub id: MediaId,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct BulkDeleteSummary {
    pub deleted: usize,
    pub results: Vec<BulkDeleteResult>,
}

/// Fields collected from an upload form.
#[derive(Debug, Default)]
struct UploadForm {
    file: Option<(String, String, Vec<u8>)>,
    collection: Option<String>,
    alt: Option<String>,
    caption: Option<String>,
    description: Option<String>,
}

async fn read_form(mut multipart: Multipart) -> Result<UploadForm, AppError> {
    let mut form = UploadForm::default();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.body_text()))?
    {
        let name = field.name().unwrap_or_default().to_string();
        if name == "file" {
            let file_name = field.file_name().unwrap_or("upload").to_string();
            let mime = field
                .content_type()
                .unwrap_or("application/octet-stream")
                .to_string();
            let bytes = field
                .bytes()
                .await
                .map_err(|e| AppError::BadRequest(e.body_text()))?;
            form.file = Some((file_name, mime, bytes.to_vec()));
            continue;
        }

        let value = field
            .text()
            .await
            .map_err(|e| AppError::BadRequest(e.body_text()))?;
        let value = Some(value).filter(|v| !v.trim().is_empty());
        match name.as_str() {
            "collection" => form.collection = value,
            "alt" => form.alt = value,
            "caption" => form.caption = value,
            "description" => form.description = value,
            _ => {}
        }
    }
    Ok(form)
}

/// Store an uploaded file. Identical content already in the collection is
/// reused instead of stored twice.
#[instrument(skip(state, admin, multipart), fields(admin_id = %admin.id))]
async fn upload(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    multipart: Multipart,
) -> ApiResult<Media> {
    let form = read_form(multipart).await?;
    let (original_name, mime_type, bytes) = form
        .file
        .ok_or_else(|| AppError::BadRequest("No file uploaded".to_string()))?;
    let collection = parse_collection(form.collection.as_deref())?;

    let repo = MediaRepository::new(state.pool());
    let ingested = state
        .media()
        .ingest(
            &repo,
            Upload {
                collection,
                original_name,
                mime_type,
                bytes,
                alt: form.alt,
                caption: form.caption,
                description: form.description,
                uploaded_by: Some(admin.id),
            },
        )
        .await?;

    if ingested.existing {
        return Ok(ApiResponse::with_message(
            "File already exists, using existing media",
            ingested.media,
        ));
    }
    tracing::info!(media_id = %ingested.media.id, "Media uploaded");
    Ok(ApiResponse::created(
        "File uploaded successfully",
        ingested.media,
    ))
}

#[instrument(skip(state, _admin))]
async fn index(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<ListQuery>,
) -> ApiResult<MediaList> {
    let filter = MediaFilter::try_from(query)?;
    let (media, total) = MediaRepository::new(state.pool()).list(&filter).await?;
    Ok(ApiResponse::ok(MediaList {
        media,
        pagination: Pagination::new(filter.page, total),
    }))
}

#[instrument(skip(state, _admin))]
async fn show(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<MediaId>,
) -> ApiResult<Media> {
    let media = MediaRepository::new(state.pool())
        .get(id)
        .await?
        .ok_or_else(|| AppError::NotFound(NOT_FOUND.to_string()))?;
    Ok(ApiResponse::ok(media))
}

#[instrument(skip(state, _admin, update))]
async fn update(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<MediaId>,
    ApiJson(update): ApiJson<MediaUpdate>,
) -> ApiResult<Media> {
    let media = MediaRepository::new(state.pool())
        .update(id, &update)
        .await
        .map_err(|e| not_found(e, NOT_FOUND))?;
    Ok(ApiResponse::with_message("Media updated successfully", media))
}

/// Delete an unused media entry and its file.
async fn delete_one(state: &AppState, id: MediaId) -> Result<(), AppError> {
    let repo = MediaRepository::new(state.pool());
    let media = repo
        .get(id)
        .await?
        .ok_or_else(|| AppError::NotFound(NOT_FOUND.to_string()))?;
    if repo.usage_count(&media).await? > 0 {
        return Err(AppError::BadRequest(IN_USE.to_string()));
    }
    repo.delete(id).await?;
    state.media().remove(&media.path).await;
    tracing::info!(media_id = %id, "Media deleted");
    Ok(())
}

#[instrument(skip(state, _admin))]
async fn destroy(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<MediaId>,
) -> ApiResult<()> {
    delete_one(&state, id).await?;
    Ok(ApiResponse::message("Media deleted successfully"))
}

/// Delete several entries, reporting each outcome.
#[instrument(skip(state, _admin, request), fields(count = request.ids.len()))]
async fn bulk_delete(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    ApiJson(request): ApiJson<BulkDeleteRequest>,
) -> ApiResult<BulkDeleteSummary> {
    if request.ids.is_empty() {
        return Err(AppError::BadRequest("No media ids given".to_string()));
    }

    let mut results = Vec::with_capacity(request.ids.len());
    for id in request.ids {
        let outcome = delete_one(&state, id).await;
        results.push(BulkDeleteResult {
            id,
            success: outcome.is_ok(),
            error: outcome.err().map(|e| match e {
                AppError::NotFound(msg) | AppError::BadRequest(msg) => msg,
                other => {
                    tracing::warn!(media_id = %id, error = %other, "Bulk delete failed");
                    "Failed to delete media".to_string()
                }
            }),
        });
    }
    let deleted = results.iter().filter(|r| r.success).count();

    Ok(ApiResponse::with_message(
        &format!("Deleted {deleted} of {} media files", results.len()),
        BulkDeleteSummary { deleted, results },
    ))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_collection() {
        assert_eq!(parse_collection(None).unwrap(), MediaCollection::Products);
        assert_eq!(
            parse_collection(Some("CATEGORIES")).unwrap(),
            MediaCollection::Categories
        );
        assert_eq!(
            parse_collection(Some("banners")).unwrap(),
            MediaCollection::Banners
        );
        assert!(parse_collection(Some("videos")).is_err());
    }

    #[test]
    fn test_list_query_into_filter() {
        let query: ListQuery = serde_json::from_value(serde_json::json!({
            "collection": "products",
            "search": "  ",
            "sortBy": "size",
            "sortOrder": "asc"
        }))
        .unwrap();
        let filter = MediaFilter::try_from(query).unwrap();
        assert_eq!(filter.collection, Some(MediaCollection::Products));
        assert!(filter.search.is_none());
        assert_eq!(filter.sort_by, MediaSort::Size);
        assert_eq!(filter.sort_order, SortDirection::Asc);

        let query: ListQuery =
            serde_json::from_value(serde_json::json!({"collection": "nope"})).unwrap();
        assert!(MediaFilter::try_from(query).is_err());
    }
}
