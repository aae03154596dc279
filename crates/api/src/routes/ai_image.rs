//! AI product photo route handlers (admin only).
//!
//! Jobs run on RunPod; the client polls `/status/{job_id}` until the job
//! completes, at which point the generated image replaces the media file.

#![allow(clippy::used_underscore_binding)]

use axum::{
    Router,
    body::Bytes,
    extract::State,
    routing::{get, post},
};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use tracing::instrument;

use olfong_core::MediaId;

use crate::db::MediaRepository;
use crate::error::AppError;
use crate::middleware::RequireAdmin;
use crate::response::{ApiJson, ApiPath, ApiResponse, ApiResult};
use crate::services::ai_image::prompt::{PromptOptions, variation_prompts};
use crate::services::ai_image::{AiImageError, StartedJob};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/generate/{media_id}", post(generate))
        .route("/batch", post(batch))
        .route("/variations/{media_id}", post(variations))
        .route("/status/{job_id}", get(status))
}

/// Parse an optional JSON body; an empty body yields the default.
fn optional_body<T: DeserializeOwned + Default>(body: &Bytes) -> Result<T, AppError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    serde_json::from_slice(body).map_err(|e| AppError::BadRequest(format!("Invalid JSON: {e}")))
}

fn ensure_configured(state: &AppState) -> Result<(), AppError> {
    if state.ai_image().is_configured() {
        Ok(())
    } else {
        Err(AiImageError::NotConfigured.into())
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchRequest {
    pub media_ids: Vec<MediaId>,
    #[serde(default)]
    pub options: PromptOptions,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchItem {
    pub media_id: MediaId,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct VariationsRequest {
    pub custom_prompts: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Variation {
    pub name: String,
    pub job_id: String,
    pub status: String,
}

/// Start a background replacement job for one image.
#[instrument(skip(state, admin, body), fields(admin_id = %admin.id))]
async fn generate(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    ApiPath(media_id): ApiPath<MediaId>,
    body: Bytes,
) -> ApiResult<StartedJob> {
    ensure_configured(&state)?;
    let options: PromptOptions = optional_body(&body)?;

    let job = state
        .ai_image()
        .generate(
            &MediaRepository::new(state.pool()),
            media_id,
            admin.id,
            &options.prompt(),
        )
        .await?;
    tracing::info!(job_id = %job.job_id, "AI image job started");
    Ok(ApiResponse::with_message("Image generation started", job))
}

/// Start one job per media id; failures are reported per item.
#[instrument(skip(state, admin, request), fields(admin_id = %admin.id, count = request.media_ids.len()))]
async fn batch(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    ApiJson(request): ApiJson<BatchRequest>,
) -> ApiResult<Vec<BatchItem>> {
    ensure_configured(&state)?;
    if request.media_ids.is_empty() {
        return Err(AppError::BadRequest("No media ids given".to_string()));
    }

    let prompt = request.options.prompt();
    let repo = MediaRepository::new(state.pool());
    let mut items = Vec::with_capacity(request.media_ids.len());
    for media_id in request.media_ids {
        let item = match state
            .ai_image()
            .generate(&repo, media_id, admin.id, &prompt)
            .await
        {
            Ok(job) => BatchItem {
                media_id,
                success: true,
                job_id: Some(job.job_id),
                error: None,
            },
            Err(err) => {
                tracing::warn!(%media_id, error = %err, "AI image job not started");
                BatchItem {
                    media_id,
                    success: false,
                    job_id: None,
                    error: Some(err.to_string()),
                }
            }
        };
        items.push(item);
    }

    let started = items.iter().filter(|i| i.success).count();
    Ok(ApiResponse::with_message(
        &format!("Started {started} of {} jobs", items.len()),
        items,
    ))
}

/// Start several jobs for the same image with different prompts.
#[instrument(skip(state, admin, body), fields(admin_id = %admin.id))]
async fn variations(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    ApiPath(media_id): ApiPath<MediaId>,
    body: Bytes,
) -> ApiResult<Vec<Variation>> {
    ensure_configured(&state)?;
    let request: VariationsRequest = optional_body(&body)?;

    let repo = MediaRepository::new(state.pool());
    let mut started = Vec::new();
    for (name, prompt) in variation_prompts(&request.custom_prompts) {
        let job = state
            .ai_image()
            .generate(&repo, media_id, admin.id, &prompt)
            .await?;
        started.push(Variation {
            name,
            job_id: job.job_id,
            status: job.status,
        });
    }
    Ok(ApiResponse::with_message("Variations started", started))
}

/// Poll a job; a completed job tracked by this server replaces its media file.
#[instrument(skip(state, _admin))]
async fn status(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    ApiPath(job_id): ApiPath<String>,
) -> ApiResult<serde_json::Value> {
    ensure_configured(&state)?;
    let outcome = state
        .ai_image()
        .check(state.pool(), state.media(), job_id.trim())
        .await?;
    Ok(ApiResponse::ok(outcome.to_json()))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_body_uses_defaults() {
        let options: PromptOptions = optional_body(&Bytes::new()).unwrap();
        assert!(options.shadow_style.is_none());
        let request: VariationsRequest = optional_body(&Bytes::from_static(b"  \n")).unwrap();
        assert!(request.custom_prompts.is_empty());
    }

    #[test]
    fn test_body_is_parsed() {
        let options: PromptOptions = optional_body(&Bytes::from_static(
            br##"{"shadowStyle":"dramatic","backgroundColor":"#000000"}"##,
        ))
        .unwrap();
        assert_eq!(options.shadow_style.as_deref(), Some("dramatic"));
        assert_eq!(options.background_color.as_deref(), Some("#000000"));
    }

    #[test]
    fn test_malformed_body_is_rejected() {
        let result: Result<PromptOptions, _> = optional_body(&Bytes::from_static(b"{oops"));
        assert!(matches!(result, Err(AppError::BadRequest(_))));
    }

    #[test]
    fn test_batch_request_options_default() {
        let request: BatchRequest = serde_json::from_value(serde_json::json!({
            "mediaIds": ["7f8c3a52-9a4e-4d2c-8d58-1b1e6a0f2c11"]
        }))
        .unwrap();
        assert_eq!(request.media_ids.len(), 1);
        assert!(request.options.custom_instructions.is_none());
    }
}
