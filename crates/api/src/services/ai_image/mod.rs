//! Product photo clean-up through a `RunPod` FLUX Kontext endpoint.
//!
//! A generation is submitted as a `RunPod` job. The admin UI polls the job
//! status; when a job this server started completes, the result replaces
//! the source media file and every product using that media.

pub mod prompt;

use std::sync::Arc;
use std::time::Duration;

use base64::Engine as _;
use moka::future::Cache;
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use thiserror::Error;
use tracing::instrument;

use olfong_core::{MediaCollection, MediaId, UserId};

use crate::config::AiImageConfig;
use crate::db::{MediaRepository, ProductRepository, RepositoryError};
use crate::models::Media;
use crate::services::media_storage::{MediaStorage, MediaStorageError, read_limited};

const JOB_TTL: Duration = Duration::from_secs(60 * 60);
const MAX_TRACKED_JOBS: u64 = 1_000;

#[derive(Debug, Error)]
pub enum AiImageError {
    #[error("RunPod API key not configured")]
    NotConfigured,

    #[error("Media not found")]
    MediaNotFound,

    #[error("Media must be an image")]
    NotAnImage,

    #[error("RunPod request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("RunPod API error: {0}")]
    Upstream(String),

    #[error("Generated image could not be read: {0}")]
    Output(String),

    #[error(transparent)]
    Storage(#[from] MediaStorageError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Who started a job and which media it rewrites.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JobTarget {
    pub media_id: MediaId,
    pub user_id: UserId,
}

/// A submitted job.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartedJob {
    #[serde(alias = "id")]
    pub job_id: String,
    pub status: String,
}

/// Raw status returned by `/status/{id}`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct JobStatus {
    status: String,
    #[serde(default)]
    output: Option<serde_json::Value>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    errors: Option<Vec<String>>,
    #[serde(default)]
    execution_time: Option<u64>,
}

impl JobStatus {
    fn failure_message(&self) -> String {
        self.error
            .clone()
            .or_else(|| self.errors.as_ref().map(|e| e.join(", ")))
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| "Unknown error occurred".to_string())
    }

    fn result_location(&self) -> Option<&str> {
        let output = self.output.as_ref()?;
        output
            .get("result")
            .or_else(|| output.get("image_url"))
            .and_then(serde_json::Value::as_str)
    }

    fn generation_time(&self) -> Option<f64> {
        self.output
            .as_ref()
            .and_then(|o| o.get("generation_time"))
            .and_then(serde_json::Value::as_f64)
            .or_else(|| {
                #[allow(clippy::cast_precision_loss)] // milliseconds stay far below 2^52
                self.execution_time.map(|ms| ms as f64)
            })
    }
}

/// What a status poll found.
#[derive(Debug)]
pub enum JobOutcome {
    Failed {
        error: String,
    },
    Completed {
        media: Box<Media>,
        generation_time: Option<f64>,
    },
    /// Still running, or completed by a job this server did not start.
    Upstream {
        status: String,
        output: Option<serde_json::Value>,
    },
}

impl JobOutcome {
    /// Response body for the status endpoint.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::Failed { error } => serde_json::json!({"status": "FAILED", "error": error}),
            Self::Completed {
                media,
                generation_time,
            } => serde_json::json!({
                "status": "COMPLETED",
                "media": media,
                "generationTime": generation_time,
            }),
            Self::Upstream { status, output } => match output {
                Some(output) => serde_json::json!({"status": status, "output": output}),
                None => serde_json::json!({"status": status}),
            },
        }
    }
}

/// Rewrite a stored media URL onto the server's public origin.
///
/// The GPU worker fetches the source image over the internet, so a URL
/// recorded with an internal host must be re-rooted on `public_url`.
#[must_use]
pub fn public_source_url(public_url: &str, media_url: &str) -> String {
    let public_url = public_url.trim_end_matches('/');
    if media_url.starts_with("http") {
        match url::Url::parse(media_url) {
            Ok(parsed) => {
                let query = parsed.query().map(|q| format!("?{q}")).unwrap_or_default();
                format!("{public_url}{}{query}", parsed.path())
            }
            Err(_) => media_url.to_string(),
        }
    } else {
        format!("{public_url}{media_url}")
    }
}

/// Client for the FLUX Kontext job API. Cheap to clone.
#[derive(Clone)]
pub struct AiImageClient {
    inner: Arc<AiImageInner>,
}

struct AiImageInner {
    http: reqwest::Client,
    config: AiImageConfig,
    public_url: String,
    jobs: Cache<String, JobTarget>,
}

impl AiImageClient {
    #[must_use]
    pub fn new(http: reqwest::Client, config: AiImageConfig, public_url: &str) -> Self {
        Self {
            inner: Arc::new(AiImageInner {
                http,
                config,
                public_url: public_url.trim_end_matches('/').to_string(),
                jobs: Cache::builder()
                    .max_capacity(MAX_TRACKED_JOBS)
                    .time_to_live(JOB_TTL)
                    .build(),
            }),
        }
    }

    #[must_use]
    pub fn is_configured(&self) -> bool {
        self.inner.config.api_key.is_some()
    }

    fn bearer(&self) -> Result<String, AiImageError> {
        self.inner
            .config
            .api_key
            .as_ref()
            .map(|key| format!("Bearer {}", key.expose_secret()))
            .ok_or(AiImageError::NotConfigured)
    }

    /// Submit one job for `image_url`.
    ///
    /// # Errors
    ///
    /// Returns `NotConfigured` without an API key, or the upstream error.
    #[instrument(skip(self, prompt))]
    pub async fn submit(&self, image_url: &str, prompt: &str) -> Result<StartedJob, AiImageError> {
        let config = &self.inner.config;
        let body = serde_json::json!({
            "input": {
                "image": image_url,
                "prompt": prompt,
                "size": format!("{0}*{0}", config.resolution),
                "num_inference_steps": config.steps,
                "guidance": config.guidance,
                "seed": -1,
                "output_format": "png",
                "enable_safety_checker": false,
            }
        });

        let response = self
            .inner
            .http
            .post(format!("{}/run", config.endpoint))
            .header(reqwest::header::AUTHORIZATION, self.bearer()?)
            .json(&body)
            .send()
            .await?;
        if !response.status().is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(AiImageError::Upstream(detail));
        }

        let job: StartedJob = response.json().await?;
        tracing::info!(job_id = %job.job_id, status = %job.status, "RunPod job submitted");
        Ok(job)
    }

    async fn poll(&self, job_id: &str) -> Result<JobStatus, AiImageError> {
        let response = self
            .inner
            .http
            .get(format!(
                "{}/status/{}",
                self.inner.config.endpoint,
                urlencoding::encode(job_id)
            ))
            .header(reqwest::header::AUTHORIZATION, self.bearer()?)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(AiImageError::Upstream("Failed to get job status".to_string()));
        }
        Ok(response.json().await?)
    }

    /// Start a generation for `media_id` with `prompt`.
    ///
    /// # Errors
    ///
    /// Returns `MediaNotFound`, `NotAnImage`, or a submission error.
    pub async fn generate(
        &self,
        media: &MediaRepository<'_>,
        media_id: MediaId,
        user_id: UserId,
        prompt: &str,
    ) -> Result<StartedJob, AiImageError> {
        let source = media.get(media_id).await?.ok_or(AiImageError::MediaNotFound)?;
        if !source.is_image() {
            return Err(AiImageError::NotAnImage);
        }

        let image_url = public_source_url(&self.inner.public_url, &source.url);
        let job = self.submit(&image_url, prompt).await?;
        self.inner
            .jobs
            .insert(job.job_id.clone(), JobTarget { media_id, user_id })
            .await;
        Ok(job)
    }

    /// The target of a job started by this server, if still tracked.
    pub async fn job_target(&self, job_id: &str) -> Option<JobTarget> {
        self.inner.jobs.get(job_id).await
    }

    /// Poll a job, and apply its result when it completed.
    ///
    /// # Errors
    ///
    /// Returns upstream, download, storage or database errors.
    #[instrument(skip(self, pool, storage))]
    pub async fn check(
        &self,
        pool: &PgPool,
        storage: &MediaStorage,
        job_id: &str,
    ) -> Result<JobOutcome, AiImageError> {
        let status = self.poll(job_id).await?;

        if status.status == "FAILED" {
            let error = status.failure_message();
            tracing::warn!(job_id, %error, "RunPod job failed");
            return Ok(JobOutcome::Failed { error });
        }

        if status.status == "COMPLETED"
            && let Some(location) = status.result_location()
            && let Some(target) = self.job_target(job_id).await
        {
            let bytes = self.fetch_output(location).await?;
            let stored = storage.store_generated(&bytes).await?;
            let path = stored.path.to_string_lossy();
            let media = MediaRepository::new(pool)
                .replace_file(
                    target.media_id,
                    &stored.url,
                    &path,
                    i64::try_from(bytes.len()).unwrap_or(i64::MAX),
                    &MediaStorage::content_hash(&bytes),
                )
                .await?;
            let products = ProductRepository::new(pool)
                .set_image_for_media(target.media_id, &stored.url)
                .await?;
            self.inner.jobs.invalidate(job_id).await;

            tracing::info!(
                job_id,
                media_id = %target.media_id,
                products,
                "Generated image applied"
            );
            return Ok(JobOutcome::Completed {
                generation_time: status.generation_time(),
                media: Box::new(media),
            });
        }

        Ok(JobOutcome::Upstream {
            status: status.status,
            output: status.output,
        })
    }

    /// The result is either a URL or a base64 `data:` URL, at most the
    /// product image size limit.
    async fn fetch_output(&self, location: &str) -> Result<Vec<u8>, AiImageError> {
        let max = MediaCollection::Products.max_size();
        let too_large = || {
            AiImageError::Storage(MediaStorageError::TooLarge {
                collection: MediaCollection::Products,
                max_mb: max / (1024 * 1024),
            })
        };

        if let Some(data) = location.strip_prefix("data:") {
            let (_, encoded) = data
                .split_once(";base64,")
                .ok_or_else(|| AiImageError::Output("unsupported data URL".to_string()))?;
            let bytes = base64::engine::general_purpose::STANDARD
                .decode(encoded.trim())
                .map_err(|e| AiImageError::Output(e.to_string()))?;
            if u64::try_from(bytes.len()).unwrap_or(u64::MAX) > max {
                return Err(too_large());
            }
            return Ok(bytes);
        }

        let response = self.inner.http.get(location).send().await?;
        if !response.status().is_success() {
            return Err(AiImageError::Output(format!(
                "download returned HTTP {}",
                response.status().as_u16()
            )));
        }
        read_limited(response, max).await?.ok_or_else(too_large)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use secrecy::SecretString;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> AiImageClient {
        let config = AiImageConfig {
            api_key: Some(SecretString::from("rp-key")),
            endpoint: server.uri(),
            ..AiImageConfig::default()
        };
        AiImageClient::new(reqwest::Client::new(), config, "https://olfong.is/")
    }

    #[test]
    fn test_public_source_url() {
        assert_eq!(
            public_source_url("https://olfong.is", "/uploads/products/originals/a.png"),
            "https://olfong.is/uploads/products/originals/a.png"
        );
        assert_eq!(
            public_source_url("https://olfong.is/", "http://10.0.0.5:5000/uploads/a.png?v=2"),
            "https://olfong.is/uploads/a.png?v=2"
        );
    }

    #[tokio::test]
    async fn test_submit_sends_job_input() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/run"))
            .and(header("authorization", "Bearer rp-key"))
            .and(body_partial_json(serde_json::json!({
                "input": {
                    "image": "https://olfong.is/uploads/a.png",
                    "size": "1024*1024",
                    "num_inference_steps": 28,
                    "seed": -1,
                    "output_format": "png",
                    "enable_safety_checker": false
                }
            })))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"id": "job-1", "status": "IN_QUEUE"})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let job = client(&server)
            .submit("https://olfong.is/uploads/a.png", "prompt")
            .await
            .unwrap();
        assert_eq!(job.job_id, "job-1");
        assert_eq!(job.status, "IN_QUEUE");
    }

    #[tokio::test]
    async fn test_submit_without_key() {
        let client = AiImageClient::new(reqwest::Client::new(), AiImageConfig::default(), "");
        assert!(!client.is_configured());
        let result = client.submit("https://x/a.png", "p").await;
        assert!(matches!(result, Err(AiImageError::NotConfigured)));
    }

    #[tokio::test]
    async fn test_submit_upstream_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/run"))
            .respond_with(ResponseTemplate::new(401).set_body_string("bad key"))
            .mount(&server)
            .await;

        let result = client(&server).submit("https://x/a.png", "p").await;
        assert!(matches!(result, Err(AiImageError::Upstream(m)) if m == "bad key"));
    }

    #[tokio::test]
    async fn test_poll_reads_output() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/status/job-2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "job-2",
                "status": "COMPLETED",
                "executionTime": 5100,
                "output": {"image_url": "https://cdn.runpod.io/out.png"}
            })))
            .mount(&server)
            .await;

        let status = client(&server).poll("job-2").await.unwrap();
        assert_eq!(status.status, "COMPLETED");
        assert_eq!(status.result_location(), Some("https://cdn.runpod.io/out.png"));
        assert_eq!(status.generation_time(), Some(5100.0));
    }

    #[test]
    fn test_failure_message() {
        let status: JobStatus = serde_json::from_value(serde_json::json!({
            "status": "FAILED",
            "errors": ["out of memory", "worker died"]
        }))
        .unwrap();
        assert_eq!(status.failure_message(), "out of memory, worker died");

        let status: JobStatus =
            serde_json::from_value(serde_json::json!({"status": "FAILED"})).unwrap();
        assert_eq!(status.failure_message(), "Unknown error occurred");
    }

    #[tokio::test]
    async fn test_fetch_data_url_output() {
        let client = AiImageClient::new(reqwest::Client::new(), AiImageConfig::default(), "");
        let bytes = client
            .fetch_output("data:image/png;base64,iVBORw0K")
            .await
            .unwrap();
        assert_eq!(&bytes[..4], &[0x89, b'P', b'N', b'G']);
        assert!(client.fetch_output("data:image/png,raw").await.is_err());
    }

    #[tokio::test]
    async fn test_fetch_output_over_limit() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/out.png"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0_u8; 6 * 1024 * 1024]))
            .mount(&server)
            .await;

        let result = client(&server)
            .fetch_output(&format!("{}/out.png", server.uri()))
            .await;
        assert!(matches!(
            result,
            Err(AiImageError::Storage(MediaStorageError::TooLarge { max_mb: 5, .. }))
        ));
    }

    #[test]
    fn test_outcome_serialization() {
        let failed = JobOutcome::Failed {
            error: "boom".to_string(),
        }
        .to_json();
        assert_eq!(failed, serde_json::json!({"status": "FAILED", "error": "boom"}));

        let running = JobOutcome::Upstream {
            status: "IN_PROGRESS".to_string(),
            output: None,
        }
        .to_json();
        assert_eq!(running, serde_json::json!({"status": "IN_PROGRESS"}));
    }
}
