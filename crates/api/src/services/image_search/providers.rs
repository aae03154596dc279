//! Stock photo provider requests and response mapping.

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use super::{ImageResult, ImageSearchError, ImageSource};

/// Base URLs of the provider APIs.
#[derive(Debug, Clone)]
pub struct ProviderEndpoints {
    pub unsplash: String,
    pub pexels: String,
    pub pixabay: String,
    pub google: String,
}

impl Default for ProviderEndpoints {
    fn default() -> Self {
        Self {
            unsplash: "https://api.unsplash.com".to_string(),
            pexels: "https://api.pexels.com".to_string(),
            pixabay: "https://pixabay.com".to_string(),
            google: "https://www.googleapis.com".to_string(),
        }
    }
}

impl ProviderEndpoints {
    /// Every provider at the same base URL (mock servers).
    #[must_use]
    pub fn all_at(base: &str) -> Self {
        let base = base.trim_end_matches('/').to_string();
        Self {
            unsplash: base.clone(),
            pexels: base.clone(),
            pixabay: base.clone(),
            google: base,
        }
    }
}

/// Parameters shared by every provider call.
#[derive(Debug, Clone, Copy)]
pub struct ProviderQuery<'a> {
    pub query: &'a str,
    pub per_page: u32,
    pub page: u32,
}

async fn get_json<T: for<'de> Deserialize<'de>>(
    source: ImageSource,
    request: reqwest::RequestBuilder,
) -> Result<T, ImageSearchError> {
    let response = request
        .send()
        .await
        .map_err(|e| ImageSearchError::provider(source, e.to_string()))?;
    let status = response.status();
    if !status.is_success() {
        return Err(ImageSearchError::provider(
            source,
            format!("{} API error: {}", source.display_name(), status.as_u16()),
        ));
    }
    response
        .json()
        .await
        .map_err(|e| ImageSearchError::provider(source, e.to_string()))
}

// =============================================================================
// Unsplash
// =============================================================================

#[derive(Debug, Deserialize)]
pub(crate) struct UnsplashResponse {
    #[serde(default)]
    results: Vec<UnsplashPhoto>,
}

#[derive(Debug, Deserialize)]
struct UnsplashPhoto {
    id: String,
    urls: UnsplashUrls,
    alt_description: Option<String>,
    description: Option<String>,
    user: UnsplashUser,
    links: UnsplashLinks,
    #[serde(default)]
    width: u32,
    #[serde(default)]
    height: u32,
    color: Option<String>,
    #[serde(default)]
    tags: Vec<UnsplashTag>,
}

#[derive(Debug, Deserialize)]
struct UnsplashUrls {
    regular: String,
    thumb: String,
    full: String,
}

#[derive(Debug, Deserialize)]
struct UnsplashUser {
    name: String,
    links: UnsplashUserLinks,
}

#[derive(Debug, Deserialize)]
struct UnsplashUserLinks {
    html: String,
}

#[derive(Debug, Deserialize)]
struct UnsplashLinks {
    download: String,
}

#[derive(Debug, Deserialize)]
struct UnsplashTag {
    title: String,
}

pub(crate) fn map_unsplash(response: UnsplashResponse, query: &str) -> Vec<ImageResult> {
    response
        .results
        .into_iter()
        .map(|photo| ImageResult {
            id: photo.id,
            url: photo.urls.regular,
            thumbnail: photo.urls.thumb,
            full_size: photo.urls.full,
            alt: photo
                .alt_description
                .or(photo.description)
                .unwrap_or_else(|| query.to_string()),
            source: ImageSource::Unsplash,
            source_name: ImageSource::Unsplash.display_name().to_string(),
            photographer: Some(photo.user.name),
            photographer_url: Some(photo.user.links.html),
            download_url: photo.links.download,
            width: photo.width,
            height: photo.height,
            color: photo.color,
            tags: photo.tags.into_iter().map(|t| t.title).collect(),
        })
        .collect()
}

pub(crate) async fn search_unsplash(
    http: &reqwest::Client,
    base: &str,
    key: &SecretString,
    q: ProviderQuery<'_>,
) -> Result<Vec<ImageResult>, ImageSearchError> {
    let request = http
        .get(format!("{base}/search/photos"))
        .header("Authorization", format!("Client-ID {}", key.expose_secret()))
        .query(&[
            ("query", q.query.to_string()),
            ("per_page", q.per_page.min(30).to_string()),
            ("page", q.page.to_string()),
        ]);
    let response: UnsplashResponse = get_json(ImageSource::Unsplash, request).await?;
    Ok(map_unsplash(response, q.query))
}

// =============================================================================
// Pexels
// =============================================================================

#[derive(Debug, Deserialize)]
pub(crate) struct PexelsResponse {
    #[serde(default)]
    photos: Vec<PexelsPhoto>,
}

#[derive(Debug, Deserialize)]
struct PexelsPhoto {
    id: u64,
    src: PexelsSrc,
    alt: Option<String>,
    photographer: Option<String>,
    photographer_url: Option<String>,
    #[serde(default)]
    width: u32,
    #[serde(default)]
    height: u32,
    avg_color: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PexelsSrc {
    original: String,
    large2x: String,
    medium: String,
    small: String,
}

pub(crate) fn map_pexels(response: PexelsResponse, query: &str) -> Vec<ImageResult> {
    response
        .photos
        .into_iter()
        .map(|photo| ImageResult {
            id: photo.id.to_string(),
            url: photo.src.medium,
            thumbnail: photo.src.small,
            full_size: photo.src.large2x,
            alt: photo
                .alt
                .filter(|a| !a.is_empty())
                .unwrap_or_else(|| query.to_string()),
            source: ImageSource::Pexels,
            source_name: ImageSource::Pexels.display_name().to_string(),
            photographer: photo.photographer,
            photographer_url: photo.photographer_url,
            download_url: photo.src.original,
            width: photo.width,
            height: photo.height,
            color: photo.avg_color,
            tags: Vec::new(),
        })
        .collect()
}

pub(crate) async fn search_pexels(
    http: &reqwest::Client,
    base: &str,
    key: &SecretString,
    q: ProviderQuery<'_>,
) -> Result<Vec<ImageResult>, ImageSearchError> {
    let request = http
        .get(format!("{base}/v1/search"))
        .header("Authorization", key.expose_secret())
        .query(&[
            ("query", q.query.to_string()),
            ("per_page", q.per_page.min(80).to_string()),
            ("page", q.page.to_string()),
        ]);
    let response: PexelsResponse = get_json(ImageSource::Pexels, request).await?;
    Ok(map_pexels(response, q.query))
}

// =============================================================================
// Pixabay
// =============================================================================

#[derive(Debug, Deserialize)]
pub(crate) struct PixabayResponse {
    #[serde(default)]
    hits: Vec<PixabayHit>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PixabayHit {
    id: u64,
    #[serde(rename = "webformatURL")]
    webformat_url: String,
    #[serde(rename = "previewURL")]
    preview_url: String,
    #[serde(rename = "largeImageURL")]
    large_image_url: String,
    #[serde(default)]
    tags: String,
    #[serde(default)]
    user: String,
    #[serde(default)]
    user_id: u64,
    #[serde(default)]
    image_width: u32,
    #[serde(default)]
    image_height: u32,
}

pub(crate) fn map_pixabay(response: PixabayResponse, query: &str) -> Vec<ImageResult> {
    response
        .hits
        .into_iter()
        .map(|hit| {
            let tags: Vec<String> = hit
                .tags
                .split(',')
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(str::to_string)
                .collect();
            ImageResult {
                id: hit.id.to_string(),
                url: hit.webformat_url,
                thumbnail: hit.preview_url,
                full_size: hit.large_image_url.clone(),
                alt: if hit.tags.is_empty() {
                    query.to_string()
                } else {
                    hit.tags.clone()
                },
                source: ImageSource::Pixabay,
                source_name: ImageSource::Pixabay.display_name().to_string(),
                photographer_url: Some(format!(
                    "https://pixabay.com/users/{}-{}/",
                    hit.user, hit.user_id
                )),
                photographer: Some(hit.user),
                download_url: hit.large_image_url,
                width: hit.image_width,
                height: hit.image_height,
                color: None,
                tags,
            }
        })
        .collect()
}

pub(crate) async fn search_pixabay(
    http: &reqwest::Client,
    base: &str,
    key: &SecretString,
    q: ProviderQuery<'_>,
) -> Result<Vec<ImageResult>, ImageSearchError> {
    let request = http.get(format!("{base}/api/")).query(&[
        ("key", key.expose_secret().to_string()),
        ("q", q.query.to_string()),
        ("image_type", "photo".to_string()),
        ("safesearch", "true".to_string()),
        ("per_page", q.per_page.clamp(3, 200).to_string()),
        ("page", q.page.to_string()),
    ]);
    let response: PixabayResponse = get_json(ImageSource::Pixabay, request).await?;
    Ok(map_pixabay(response, q.query))
}

// =============================================================================
// Google Custom Search
// =============================================================================

#[derive(Debug, Deserialize)]
pub(crate) struct GoogleResponse {
    #[serde(default)]
    items: Vec<GoogleItem>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GoogleItem {
    link: String,
    title: Option<String>,
    display_link: Option<String>,
    image: Option<GoogleImage>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GoogleImage {
    thumbnail_link: Option<String>,
    context_link: Option<String>,
    #[serde(default)]
    width: u32,
    #[serde(default)]
    height: u32,
}

pub(crate) fn map_google(response: GoogleResponse, query: &str) -> Vec<ImageResult> {
    response
        .items
        .into_iter()
        .map(|item| {
            let (thumbnail, context, width, height) = match item.image {
                Some(image) => (
                    image.thumbnail_link,
                    image.context_link,
                    image.width,
                    image.height,
                ),
                None => (None, None, 0, 0),
            };
            ImageResult {
                id: item.link.clone(),
                url: item.link.clone(),
                thumbnail: thumbnail.unwrap_or_else(|| item.link.clone()),
                full_size: item.link.clone(),
                alt: item.title.unwrap_or_else(|| query.to_string()),
                source: ImageSource::Google,
                source_name: ImageSource::Google.display_name().to_string(),
                photographer: item.display_link,
                photographer_url: Some(context.unwrap_or_else(|| item.link.clone())),
                download_url: item.link,
                width,
                height,
                color: None,
                tags: Vec::new(),
            }
        })
        .collect()
}

pub(crate) async fn search_google(
    http: &reqwest::Client,
    base: &str,
    key: &SecretString,
    engine_id: &str,
    q: ProviderQuery<'_>,
) -> Result<Vec<ImageResult>, ImageSearchError> {
    let num = q.per_page.clamp(1, 10);
    let start = q.page.saturating_sub(1) * num + 1;
    let request = http.get(format!("{base}/customsearch/v1")).query(&[
        ("key", key.expose_secret().to_string()),
        ("cx", engine_id.to_string()),
        ("q", q.query.to_string()),
        ("searchType", "image".to_string()),
        ("num", num.to_string()),
        ("start", start.to_string()),
        ("safe", "active".to_string()),
        ("imgType", "photo".to_string()),
    ]);
    let response: GoogleResponse = get_json(ImageSource::Google, request).await?;
    Ok(map_google(response, q.query))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_map_unsplash() {
        let response: UnsplashResponse = serde_json::from_value(serde_json::json!({
            "results": [{
                "id": "abc",
                "urls": {"regular": "https://u/r.jpg", "thumb": "https://u/t.jpg", "full": "https://u/f.jpg"},
                "alt_description": null,
                "description": "Red wine glass",
                "user": {"name": "Anna", "links": {"html": "https://unsplash.com/@anna"}},
                "links": {"download": "https://u/d"},
                "width": 4000, "height": 3000, "color": "#400000",
                "tags": [{"title": "wine"}, {"title": "glass"}]
            }]
        }))
        .unwrap();
        let images = map_unsplash(response, "wine");
        assert_eq!(images.len(), 1);
        let image = &images[0];
        assert_eq!(image.alt, "Red wine glass");
        assert_eq!(image.source_name, "Unsplash");
        assert_eq!(image.photographer.as_deref(), Some("Anna"));
        assert_eq!(image.tags, vec!["wine", "glass"]);
        assert_eq!(image.download_url, "https://u/d");
    }

    #[test]
    fn test_map_pexels_falls_back_to_query() {
        let response: PexelsResponse = serde_json::from_value(serde_json::json!({
            "photos": [{
                "id": 42,
                "src": {"original": "o", "large2x": "l", "medium": "m", "small": "s"},
                "alt": "",
                "photographer": "Jón",
                "photographer_url": "https://pexels.com/@jon",
                "width": 10, "height": 20, "avg_color": "#FFFFFF"
            }]
        }))
        .unwrap();
        let image = &map_pexels(response, "beer")[0];
        assert_eq!(image.id, "42");
        assert_eq!(image.alt, "beer");
        assert_eq!(image.url, "m");
        assert_eq!(image.download_url, "o");
        assert_eq!(image.color.as_deref(), Some("#FFFFFF"));
    }

    #[test]
    fn test_map_pixabay_tags() {
        let response: PixabayResponse = serde_json::from_value(serde_json::json!({
            "hits": [{
                "id": 7,
                "webformatURL": "w", "previewURL": "p", "largeImageURL": "l",
                "tags": "beer, glass, foam",
                "user": "brewer", "user_id": 99,
                "imageWidth": 640, "imageHeight": 480
            }]
        }))
        .unwrap();
        let image = &map_pixabay(response, "beer")[0];
        assert_eq!(image.tags, vec!["beer", "glass", "foam"]);
        assert_eq!(
            image.photographer_url.as_deref(),
            Some("https://pixabay.com/users/brewer-99/")
        );
        assert_eq!(image.width, 640);
    }

    #[test]
    fn test_map_google_without_image_block() {
        let response: GoogleResponse = serde_json::from_value(serde_json::json!({
            "items": [{"link": "https://x/y.jpg", "title": null, "displayLink": "x"}]
        }))
        .unwrap();
        let image = &map_google(response, "gin")[0];
        assert_eq!(image.thumbnail, "https://x/y.jpg");
        assert_eq!(image.alt, "gin");
        assert_eq!(image.width, 0);
        assert!(map_google(serde_json::from_str("{}").unwrap(), "gin").is_empty());
    }
}
