//! Stock photo search across the configured providers.
//!
//! A search fans out to every enabled provider at once. Provider failures
//! are reported next to the results rather than failing the search.

pub mod providers;

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use moka::future::Cache;
use rand::seq::SliceRandom;
use reqwest::header::CONTENT_TYPE;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::instrument;

use olfong_core::MediaCollection;

use crate::config::ImageSearchConfig;
use crate::services::media_storage::read_limited;
use providers::{ProviderEndpoints, ProviderQuery};

pub const DEFAULT_PER_PAGE: u32 = 20;
pub const MAX_PER_PAGE: u32 = 50;

const CACHE_TTL: Duration = Duration::from_secs(300);
const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Error)]
pub enum ImageSearchError {
    #[error("No image sources configured")]
    NoSources,

    #[error("{provider}: {message}")]
    Provider {
        provider: ImageSource,
        message: String,
    },

    #[error("Image download failed: {0}")]
    Download(String),

    #[error("URL does not point to an image ({0})")]
    NotAnImage(String),

    #[error("Image exceeds the {max_mb}MB limit")]
    TooLarge { max_mb: u64 },
}

impl ImageSearchError {
    fn provider(source: ImageSource, message: impl Into<String>) -> Self {
        Self::Provider {
            provider: source,
            message: message.into(),
        }
    }
}

/// A stock photo provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageSource {
    Unsplash,
    Pexels,
    Pixabay,
    Google,
}

impl ImageSource {
    pub const ALL: [Self; 4] = [Self::Unsplash, Self::Pexels, Self::Pixabay, Self::Google];

    #[must_use]
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::Unsplash => "Unsplash",
            Self::Pexels => "Pexels",
            Self::Pixabay => "Pixabay",
            Self::Google => "Google Images",
        }
    }
}

impl std::fmt::Display for ImageSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.display_name())
    }
}

impl std::str::FromStr for ImageSource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "unsplash" => Ok(Self::Unsplash),
            "pexels" => Ok(Self::Pexels),
            "pixabay" => Ok(Self::Pixabay),
            "google" => Ok(Self::Google),
            other => Err(format!("unknown image source: {other}")),
        }
    }
}

/// One search hit, normalized across providers.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageResult {
    pub id: String,
    pub url: String,
    pub thumbnail: String,
    pub full_size: String,
    pub alt: String,
    pub source: ImageSource,
    pub source_name: String,
    pub photographer: Option<String>,
    pub photographer_url: Option<String>,
    pub download_url: String,
    pub width: u32,
    pub height: u32,
    pub color: Option<String>,
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceError {
    pub source: ImageSource,
    pub error: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResults {
    pub images: Vec<ImageResult>,
    pub total: usize,
    pub sources: Vec<ImageSource>,
    pub errors: Vec<SourceError>,
}

/// Search parameters after clamping.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SearchRequest {
    pub query: String,
    pub per_page: u32,
    pub page: u32,
    pub sources: Vec<ImageSource>,
}

impl SearchRequest {
    /// Clamp `per_page` to `1..=50` and `page` to at least 1.
    #[must_use]
    pub fn new(
        query: &str,
        per_page: Option<u32>,
        page: Option<u32>,
        sources: Option<Vec<ImageSource>>,
    ) -> Self {
        let mut sources = sources.unwrap_or_default();
        sources.sort_unstable();
        sources.dedup();
        Self {
            query: query.trim().to_string(),
            per_page: per_page.unwrap_or(DEFAULT_PER_PAGE).clamp(1, MAX_PER_PAGE),
            page: page.unwrap_or(1).max(1),
            sources,
        }
    }
}

/// Drop repeated URLs, shuffle and keep at most `limit` results.
#[must_use]
pub fn dedupe_and_truncate<R: rand::Rng + ?Sized>(
    images: Vec<ImageResult>,
    limit: usize,
    rng: &mut R,
) -> Vec<ImageResult> {
    let mut seen = HashSet::new();
    let mut unique: Vec<ImageResult> = images
        .into_iter()
        .filter(|image| seen.insert(image.url.clone()))
        .collect();
    unique.shuffle(rng);
    unique.truncate(limit);
    unique
}

/// An image fetched for import into the media library.
#[derive(Debug, Clone)]
pub struct DownloadedImage {
    pub bytes: Vec<u8>,
    pub mime_type: String,
    pub file_name: String,
}

/// Multi-provider search client with a 5 minute result cache.
#[derive(Clone)]
pub struct ImageSearchClient {
    inner: Arc<ImageSearchInner>,
}

struct ImageSearchInner {
    http: reqwest::Client,
    config: ImageSearchConfig,
    endpoints: ProviderEndpoints,
    cache: Cache<SearchRequest, Arc<SearchResults>>,
}

impl ImageSearchClient {
    #[must_use]
    pub fn new(http: reqwest::Client, config: ImageSearchConfig) -> Self {
        Self::with_endpoints(http, config, ProviderEndpoints::default())
    }

    #[must_use]
    pub fn with_endpoints(
        http: reqwest::Client,
        config: ImageSearchConfig,
        endpoints: ProviderEndpoints,
    ) -> Self {
        Self {
            inner: Arc::new(ImageSearchInner {
                http,
                config,
                endpoints,
                cache: Cache::builder()
                    .max_capacity(200)
                    .time_to_live(CACHE_TTL)
                    .build(),
            }),
        }
    }

    /// Providers with credentials configured.
    #[must_use]
    pub fn enabled_sources(&self) -> Vec<ImageSource> {
        let config = &self.inner.config;
        ImageSource::ALL
            .into_iter()
            .filter(|source| match source {
                ImageSource::Unsplash => config.unsplash_access_key.is_some(),
                ImageSource::Pexels => config.pexels_api_key.is_some(),
                ImageSource::Pixabay => config.pixabay_api_key.is_some(),
                ImageSource::Google => {
                    config.google_api_key.is_some() && config.google_search_engine_id.is_some()
                }
            })
            .collect()
    }

    async fn search_source(
        &self,
        source: ImageSource,
        query: ProviderQuery<'_>,
    ) -> Result<Vec<ImageResult>, ImageSearchError> {
        let inner = &self.inner;
        let config = &inner.config;
        let endpoints = &inner.endpoints;
        let missing = || ImageSearchError::provider(source, "not configured");
        match source {
            ImageSource::Unsplash => {
                let key = config.unsplash_access_key.as_ref().ok_or_else(missing)?;
                providers::search_unsplash(&inner.http, &endpoints.unsplash, key, query).await
            }
            ImageSource::Pexels => {
                let key = config.pexels_api_key.as_ref().ok_or_else(missing)?;
                providers::search_pexels(&inner.http, &endpoints.pexels, key, query).await
            }
            ImageSource::Pixabay => {
                let key = config.pixabay_api_key.as_ref().ok_or_else(missing)?;
                providers::search_pixabay(&inner.http, &endpoints.pixabay, key, query).await
            }
            ImageSource::Google => {
                let key = config.google_api_key.as_ref().ok_or_else(missing)?;
                let engine = config
                    .google_search_engine_id
                    .as_deref()
                    .ok_or_else(missing)?;
                providers::search_google(&inner.http, &endpoints.google, key, engine, query).await
            }
        }
    }

    /// Search the requested (or all enabled) providers concurrently.
    ///
    /// # Errors
    ///
    /// Returns `ImageSearchError::NoSources` if no requested provider is
    /// enabled. Provider failures are reported in [`SearchResults::errors`].
    #[instrument(skip(self), fields(query = %request.query))]
    pub async fn search(&self, request: SearchRequest) -> Result<Arc<SearchResults>, ImageSearchError> {
        let enabled = self.enabled_sources();
        let sources: Vec<ImageSource> = if request.sources.is_empty() {
            enabled
        } else {
            request
                .sources
                .iter()
                .copied()
                .filter(|s| enabled.contains(s))
                .collect()
        };
        if sources.is_empty() {
            return Err(ImageSearchError::NoSources);
        }

        if let Some(cached) = self.inner.cache.get(&request).await {
            tracing::debug!("Image search cache hit");
            return Ok(cached);
        }

        let query = ProviderQuery {
            query: &request.query,
            per_page: request.per_page,
            page: request.page,
        };
        let outcomes = join_all(
            sources
                .iter()
                .map(|&source| async move { (source, self.search_source(source, query).await) }),
        )
        .await;

        let mut images = Vec::new();
        let mut errors = Vec::new();
        for (source, outcome) in outcomes {
            match outcome {
                Ok(found) => images.extend(found),
                Err(e) => {
                    tracing::warn!(%source, error = %e, "Image provider failed");
                    errors.push(SourceError {
                        source,
                        error: e.to_string(),
                    });
                }
            }
        }

        let limit = usize::try_from(request.per_page).unwrap_or(usize::MAX);
        let images = dedupe_and_truncate(images, limit, &mut rand::rng());
        tracing::info!(count = images.len(), failed = errors.len(), "Image search finished");

        let results = Arc::new(SearchResults {
            total: images.len(),
            images,
            sources,
            errors,
        });
        if results.errors.is_empty() {
            self.inner.cache.insert(request, results.clone()).await;
        }
        Ok(results)
    }

    /// Fetch an image chosen from the results for import.
    ///
    /// # Errors
    ///
    /// Returns `ImageSearchError` if the download fails, the response is not
    /// an image, or it exceeds the collection's size limit.
    #[instrument(skip(self))]
    pub async fn download(
        &self,
        url: &str,
        collection: MediaCollection,
    ) -> Result<DownloadedImage, ImageSearchError> {
        let parsed =
            url::Url::parse(url).map_err(|e| ImageSearchError::Download(e.to_string()))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ImageSearchError::Download("unsupported URL scheme".to_string()));
        }

        let response = self
            .inner
            .http
            .get(parsed.clone())
            .timeout(DOWNLOAD_TIMEOUT)
            .send()
            .await
            .map_err(|e| ImageSearchError::Download(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(ImageSearchError::Download(format!("HTTP {}", status.as_u16())));
        }

        let mime_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(';').next())
            .map(|v| v.trim().to_ascii_lowercase())
            .unwrap_or_default();
        if !mime_type.starts_with("image/") {
            return Err(ImageSearchError::NotAnImage(mime_type));
        }

        let max = collection.max_size();
        let too_large = ImageSearchError::TooLarge {
            max_mb: max / (1024 * 1024),
        };
        let bytes = read_limited(response, max)
            .await
            .map_err(|e| ImageSearchError::Download(e.to_string()))?
            .ok_or(too_large)?;

        let file_name = parsed
            .path_segments()
            .and_then(|mut segments| segments.next_back())
            .filter(|s| !s.is_empty())
            .unwrap_or("image")
            .to_string();

        Ok(DownloadedImage {
            bytes,
            mime_type,
            file_name,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use secrecy::SecretString;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn image(url: &str) -> ImageResult {
        ImageResult {
            id: url.to_string(),
            url: url.to_string(),
            thumbnail: url.to_string(),
            full_size: url.to_string(),
            alt: "alt".to_string(),
            source: ImageSource::Pexels,
            source_name: "Pexels".to_string(),
            photographer: None,
            photographer_url: None,
            download_url: url.to_string(),
            width: 1,
            height: 1,
            color: None,
            tags: Vec::new(),
        }
    }

    #[test]
    fn test_dedupe_and_truncate() {
        let mut rng = StdRng::seed_from_u64(7);
        let images = vec![image("a"), image("b"), image("a"), image("c"), image("b")];
        let result = dedupe_and_truncate(images.clone(), 10, &mut rng);
        assert_eq!(result.len(), 3);
        let mut urls: Vec<_> = result.iter().map(|i| i.url.as_str()).collect();
        urls.sort_unstable();
        assert_eq!(urls, vec!["a", "b", "c"]);

        assert_eq!(dedupe_and_truncate(images, 2, &mut rng).len(), 2);
    }

    #[test]
    fn test_search_request_clamps() {
        let request = SearchRequest::new(" wine ", Some(500), Some(0), None);
        assert_eq!(request.query, "wine");
        assert_eq!(request.per_page, MAX_PER_PAGE);
        assert_eq!(request.page, 1);
        assert_eq!(SearchRequest::new("x", None, None, None).per_page, DEFAULT_PER_PAGE);

        let request = SearchRequest::new(
            "x",
            None,
            None,
            Some(vec![ImageSource::Pixabay, ImageSource::Unsplash, ImageSource::Pixabay]),
        );
        assert_eq!(request.sources, vec![ImageSource::Unsplash, ImageSource::Pixabay]);
    }

    #[test]
    fn test_source_parsing() {
        assert_eq!("Pexels".parse::<ImageSource>().unwrap(), ImageSource::Pexels);
        assert!("flickr".parse::<ImageSource>().is_err());
    }

    #[tokio::test]
    async fn test_no_sources_configured() {
        let client = ImageSearchClient::new(reqwest::Client::new(), ImageSearchConfig::default());
        assert!(client.enabled_sources().is_empty());
        let result = client.search(SearchRequest::new("wine", None, None, None)).await;
        assert!(matches!(result, Err(ImageSearchError::NoSources)));
    }

    #[test]
    fn test_google_needs_engine_id() {
        let config = ImageSearchConfig {
            google_api_key: Some(SecretString::from("g-key")),
            ..ImageSearchConfig::default()
        };
        let client = ImageSearchClient::new(reqwest::Client::new(), config);
        assert!(client.enabled_sources().is_empty());
    }

    #[tokio::test]
    async fn test_one_provider_failing_is_reported() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/search"))
            .and(header("authorization", "pexels-key"))
            .and(query_param("query", "red wine"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "photos": [{
                    "id": 1,
                    "src": {"original": "o1", "large2x": "l1", "medium": "m1", "small": "s1"},
                    "alt": "Wine", "photographer": "A", "photographer_url": "u",
                    "width": 1, "height": 1, "avg_color": null
                }]
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let config = ImageSearchConfig {
            pexels_api_key: Some(SecretString::from("pexels-key")),
            pixabay_api_key: Some(SecretString::from("pixabay-key")),
            ..ImageSearchConfig::default()
        };
        let client = ImageSearchClient::with_endpoints(
            reqwest::Client::new(),
            config,
            ProviderEndpoints::all_at(&server.uri()),
        );

        let results = client
            .search(SearchRequest::new("red wine", None, None, None))
            .await
            .unwrap();
        assert_eq!(results.images.len(), 1);
        assert_eq!(results.images[0].url, "m1");
        assert_eq!(results.errors.len(), 1);
        assert_eq!(results.errors[0].source, ImageSource::Pixabay);
        assert!(results.errors[0].error.contains("500"));
    }

    #[tokio::test]
    async fn test_download_rejects_non_images() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/page.html"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/html")
                    .set_body_string("<html></html>"),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/photo.jpg"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "image/jpeg")
                    .set_body_bytes(vec![0xFF, 0xD8, 0xFF]),
            )
            .mount(&server)
            .await;

        let client = ImageSearchClient::new(reqwest::Client::new(), ImageSearchConfig::default());
        let page = client
            .download(&format!("{}/page.html", server.uri()), MediaCollection::Products)
            .await;
        assert!(matches!(page, Err(ImageSearchError::NotAnImage(_))));

        let photo = client
            .download(&format!("{}/photo.jpg", server.uri()), MediaCollection::Products)
            .await
            .unwrap();
        assert_eq!(photo.mime_type, "image/jpeg");
        assert_eq!(photo.file_name, "photo.jpg");
        assert_eq!(photo.bytes.len(), 3);

        assert!(client.download("ftp://x/y.jpg", MediaCollection::Products).await.is_err());
    }

    #[tokio::test]
    async fn test_download_stops_at_collection_limit() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/poster.png"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "image/png")
                    .set_body_bytes(vec![0_u8; 3 * 1024 * 1024]),
            )
            .mount(&server)
            .await;

        let client = ImageSearchClient::new(reqwest::Client::new(), ImageSearchConfig::default());
        let url = format!("{}/poster.png", server.uri());
        assert!(matches!(
            client.download(&url, MediaCollection::Categories).await,
            Err(ImageSearchError::TooLarge { max_mb: 2 })
        ));
        assert!(client.download(&url, MediaCollection::Banners).await.is_ok());
    }
}
