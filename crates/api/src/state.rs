//! Application state shared across handlers.

use std::sync::Arc;
use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;

use crate::config::ApiConfig;
use crate::services::ai_image::AiImageClient;
use crate::services::atvr::AtvrClient;
use crate::services::auth::JwtKeys;
use crate::services::crypto::SecretCipher;
use crate::services::image_search::ImageSearchClient;
use crate::services::media_storage::MediaStorage;

const HTTP_TIMEOUT: Duration = Duration::from_secs(30);
const HTTP_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Application state shared across all handlers.
///
/// Cheaply cloneable via `Arc`. One `reqwest::Client` backs every outbound
/// integration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: ApiConfig,
    pool: PgPool,
    jwt: JwtKeys,
    cipher: SecretCipher,
    media: MediaStorage,
    atvr: AtvrClient,
    images: ImageSearchClient,
    ai_image: AiImageClient,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: ApiConfig, pool: PgPool) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .connect_timeout(HTTP_CONNECT_TIMEOUT)
            .build()?;

        let jwt = JwtKeys::new(&config.jwt.secret, config.jwt.expires_hours);
        let cipher = SecretCipher::new(config.encryption_key.expose_secret());
        let media = MediaStorage::new(config.upload_dir.clone(), &config.media_base_url);
        let atvr = AtvrClient::new(http.clone(), &config.atvr);
        let images = ImageSearchClient::new(http.clone(), config.image_search.clone());
        let ai_image = AiImageClient::new(http, config.ai_image.clone(), &config.public_url);

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                jwt,
                cipher,
                media,
                atvr,
                images,
                ai_image,
            }),
        })
    }

    #[must_use]
    pub fn config(&self) -> &ApiConfig {
        &self.inner.config
    }

    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    #[must_use]
    pub fn jwt(&self) -> &JwtKeys {
        &self.inner.jwt
    }

    /// Cipher for payment gateway secrets.
    #[must_use]
    pub fn cipher(&self) -> &SecretCipher {
        &self.inner.cipher
    }

    #[must_use]
    pub fn media(&self) -> &MediaStorage {
        &self.inner.media
    }

    #[must_use]
    pub fn atvr(&self) -> &AtvrClient {
        &self.inner.atvr
    }

    #[must_use]
    pub fn images(&self) -> &ImageSearchClient {
        &self.inner.images
    }

    #[must_use]
    pub fn ai_image(&self) -> &AiImageClient {
        &self.inner.ai_image
    }
}
