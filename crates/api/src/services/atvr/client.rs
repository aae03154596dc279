//! HTTP client for the Icelandic and English catalog sites.

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, USER_AGENT};
use thiserror::Error;
use tracing::instrument;

use olfong_core::Locale;

use super::{AtvrProduct, merge_detail, merge_search_results, parser};
use crate::config::AtvrConfig;

/// The catalog serves a reduced page to unknown agents.
const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";
const BROWSER_ACCEPT: &str =
    "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);
const CACHE_TTL: Duration = Duration::from_secs(600);

#[derive(Debug, Error)]
pub enum AtvrError {
    #[error("ATVR request timed out")]
    Timeout,

    #[error("ATVR request failed: {0}")]
    Http(reqwest::Error),

    #[error("ATVR returned HTTP {0}")]
    Status(u16),
}

impl From<reqwest::Error> for AtvrError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Timeout
        } else {
            Self::Http(e)
        }
    }
}

impl AtvrError {
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout)
    }
}

type CacheKey = (Locale, String);

/// Catalog client. Parsed pages are cached for 10 minutes per language.
#[derive(Clone)]
pub struct AtvrClient {
    inner: Arc<AtvrClientInner>,
}

struct AtvrClientInner {
    http: reqwest::Client,
    base_url_is: String,
    base_url_en: String,
    searches: Cache<CacheKey, Arc<Vec<AtvrProduct>>>,
    details: Cache<CacheKey, Arc<Option<AtvrProduct>>>,
}

impl AtvrClient {
    #[must_use]
    pub fn new(http: reqwest::Client, config: &AtvrConfig) -> Self {
        fn cache<V: Clone + Send + Sync + 'static>()
        -> moka::future::CacheBuilder<CacheKey, V, Cache<CacheKey, V>> {
            Cache::builder().max_capacity(500).time_to_live(CACHE_TTL)
        }
        Self {
            inner: Arc::new(AtvrClientInner {
                http,
                base_url_is: config.base_url_is.trim_end_matches('/').to_string(),
                base_url_en: config.base_url_en.trim_end_matches('/').to_string(),
                searches: cache().build(),
                details: cache().build(),
            }),
        }
    }

    fn base_url(&self, locale: Locale) -> &str {
        locale.pick(&self.inner.base_url_en, &self.inner.base_url_is)
    }

    #[must_use]
    pub fn search_url(&self, term: &str, locale: Locale) -> String {
        format!(
            "{}/heim/vorur/vorur.aspx/?text={}",
            self.base_url(locale),
            urlencoding::encode(term)
        )
    }

    #[must_use]
    pub fn detail_url(&self, product_id: &str, locale: Locale) -> String {
        format!(
            "{}/desktopdefault.aspx/tabid-54/?productID={}",
            self.base_url(locale),
            urlencoding::encode(product_id)
        )
    }

    async fn fetch(&self, url: &str, locale: Locale) -> Result<String, AtvrError> {
        let response = self
            .inner
            .http
            .get(url)
            .header(USER_AGENT, BROWSER_USER_AGENT)
            .header(ACCEPT, BROWSER_ACCEPT)
            .header(ACCEPT_LANGUAGE, locale.accept_language())
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            tracing::warn!(url, status = %status, "ATVR returned non-success status");
            return Err(AtvrError::Status(status.as_u16()));
        }
        Ok(response.text().await?)
    }

    /// Search one language site.
    ///
    /// # Errors
    ///
    /// Returns `AtvrError` if the request fails or times out.
    #[instrument(skip(self))]
    pub async fn search_language(
        &self,
        term: &str,
        locale: Locale,
    ) -> Result<Vec<AtvrProduct>, AtvrError> {
        let key = (locale, term.trim().to_lowercase());
        if let Some(cached) = self.inner.searches.get(&key).await {
            tracing::debug!("ATVR search cache hit");
            return Ok(cached.as_ref().clone());
        }

        let html = self.fetch(&self.search_url(term.trim(), locale), locale).await?;
        let products = parser::parse_search_results(&html, self.base_url(locale), locale);
        tracing::info!(count = products.len(), "ATVR search parsed");

        self.inner
            .searches
            .insert(key, Arc::new(products.clone()))
            .await;
        Ok(products)
    }

    /// Search both sites concurrently and merge the results by product ID.
    ///
    /// One site failing is tolerated; the other's results are returned.
    ///
    /// # Errors
    ///
    /// Returns an error only when both sites fail, preferring a timeout.
    #[instrument(skip(self))]
    pub async fn search(&self, term: &str) -> Result<Vec<AtvrProduct>, AtvrError> {
        let (is, en) = tokio::join!(
            self.search_language(term, Locale::Is),
            self.search_language(term, Locale::En)
        );
        match (is, en) {
            (Ok(is), Ok(en)) => Ok(merge_search_results(is, en)),
            (Ok(is), Err(e)) => {
                tracing::warn!(error = %e, "English ATVR search failed");
                Ok(merge_search_results(is, Vec::new()))
            }
            (Err(e), Ok(en)) => {
                tracing::warn!(error = %e, "Icelandic ATVR search failed");
                Ok(merge_search_results(Vec::new(), en))
            }
            (Err(is), Err(en)) => Err(if en.is_timeout() { en } else { is }),
        }
    }

    async fn detail_language(
        &self,
        product_id: &str,
        locale: Locale,
    ) -> Result<Option<AtvrProduct>, AtvrError> {
        let key = (locale, product_id.to_string());
        if let Some(cached) = self.inner.details.get(&key).await {
            return Ok(cached.as_ref().clone());
        }

        let url = self.detail_url(product_id, locale);
        let html = self.fetch(&url, locale).await?;
        let product = parser::parse_detail(&html, product_id, &url, self.base_url(locale), locale);

        self.inner
            .details
            .insert(key, Arc::new(product.clone()))
            .await;
        Ok(product)
    }

    /// Fetch a product's detail page in both languages, preferring
    /// `language` for the fields both provide.
    ///
    /// # Errors
    ///
    /// Returns an error only when both sites fail.
    #[instrument(skip(self))]
    pub async fn product_detail(
        &self,
        product_id: &str,
        language: Locale,
    ) -> Result<Option<AtvrProduct>, AtvrError> {
        let (is, en) = tokio::join!(
            self.detail_language(product_id, Locale::Is),
            self.detail_language(product_id, Locale::En)
        );
        match (is, en) {
            (Err(is), Err(en)) => Err(if en.is_timeout() { en } else { is }),
            (is, en) => {
                let is = is
                    .inspect_err(|e| tracing::warn!(error = %e, "Icelandic ATVR detail failed"))
                    .ok()
                    .flatten();
                let en = en
                    .inspect_err(|e| tracing::warn!(error = %e, "English ATVR detail failed"))
                    .ok()
                    .flatten();
                Ok(merge_detail(is, en, language))
            }
        }
    }
}
