//! API configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `OLFONG_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)
//! - `JWT_SECRET` - Token signing secret (min 32 chars, high entropy)
//! - `ENCRYPTION_KEY` - Key material for payment gateway secrets (high entropy)
//!
//! ## Optional
//! - `API_HOST` - Bind address (default: 0.0.0.0)
//! - `API_PORT` - Listen port (default: 5000)
//! - `PUBLIC_URL` - Public URL of this server (default: `http://localhost:5000`)
//! - `MEDIA_BASE_URL` - Base URL for uploaded media (default: `PUBLIC_URL`)
//! - `UPLOAD_DIR` - Upload root directory (default: uploads)
//! - `CORS_ORIGINS` - Comma-separated allowed origins (default: any)
//! - `JWT_EXPIRES_HOURS` - Token lifetime in hours (default: 168)
//! - `ATVR_BASE_URL_IS` / `ATVR_BASE_URL_EN` - ATVR catalog base URLs
//! - `UNSPLASH_ACCESS_KEY`, `PEXELS_API_KEY`, `PIXABAY_API_KEY` - Stock photo keys
//! - `GOOGLE_API_KEY` + `GOOGLE_SEARCH_ENGINE_ID` - Google Custom Search
//! - `RUNPOD_API_KEY`, `RUNPOD_ENDPOINT` - AI image generation
//! - `AI_IMAGE_RESOLUTION` (1024), `AI_IMAGE_STEPS` (28), `AI_IMAGE_GUIDANCE` (3.5)
//! - `SENTRY_DSN`, `SENTRY_ENVIRONMENT`, `SENTRY_SAMPLE_RATE`, `SENTRY_TRACES_SAMPLE_RATE`

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::str::FromStr;

use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;

const MIN_JWT_SECRET_LENGTH: usize = 32;
const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;

const DEFAULT_ATVR_BASE_URL_IS: &str = "https://www.vinbudin.is";
const DEFAULT_ATVR_BASE_URL_EN: &str = "https://www.vinbudin.is/english";
const DEFAULT_RUNPOD_ENDPOINT: &str =
    "https://api.runpod.ai/v2/black-forest-labs-flux-1-kontext-dev";

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "secret",
    "password",
    "xxx",
    "todo",
    "fixme",
    "insert",
    "enter-",
    "put-your",
    "add-your",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// API server configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    pub host: IpAddr,
    pub port: u16,
    /// Public base URL of this server, used to build absolute media URLs
    pub public_url: String,
    pub media_base_url: String,
    pub upload_dir: PathBuf,
    /// Allowed CORS origins; empty means any origin
    pub cors_origins: Vec<String>,
    pub jwt: JwtConfig,
    /// Key material for AES-GCM encryption of gateway secrets
    pub encryption_key: SecretString,
    pub atvr: AtvrConfig,
    pub image_search: ImageSearchConfig,
    pub ai_image: AiImageConfig,
    pub sentry_dsn: Option<String>,
    pub sentry_environment: Option<String>,
    pub sentry_sample_rate: f32,
    pub sentry_traces_sample_rate: f32,
}

/// Token signing settings.
#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub secret: SecretString,
    pub expires_hours: i64,
}

/// ATVR catalog endpoints.
#[derive(Debug, Clone)]
pub struct AtvrConfig {
    pub base_url_is: String,
    pub base_url_en: String,
}

impl Default for AtvrConfig {
    fn default() -> Self {
        Self {
            base_url_is: DEFAULT_ATVR_BASE_URL_IS.to_string(),
            base_url_en: DEFAULT_ATVR_BASE_URL_EN.to_string(),
        }
    }
}

/// Stock photo provider credentials.
///
/// Implements `Debug` manually to redact keys.
#[derive(Clone, Default)]
pub struct ImageSearchConfig {
    pub unsplash_access_key: Option<SecretString>,
    pub pexels_api_key: Option<SecretString>,
    pub pixabay_api_key: Option<SecretString>,
    pub google_api_key: Option<SecretString>,
    pub google_search_engine_id: Option<String>,
}

impl std::fmt::Debug for ImageSearchConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let redact = |v: &Option<SecretString>| v.as_ref().map(|_| "[REDACTED]");
        f.debug_struct("ImageSearchConfig")
            .field("unsplash_access_key", &redact(&self.unsplash_access_key))
            .field("pexels_api_key", &redact(&self.pexels_api_key))
            .field("pixabay_api_key", &redact(&self.pixabay_api_key))
            .field("google_api_key", &redact(&self.google_api_key))
            .field("google_search_engine_id", &self.google_search_engine_id)
            .finish()
    }
}

/// `RunPod` image generation settings.
#[derive(Clone)]
pub struct AiImageConfig {
    pub api_key: Option<SecretString>,
    pub endpoint: String,
    pub resolution: u32,
    pub steps: u32,
    pub guidance: f64,
}

impl Default for AiImageConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            endpoint: DEFAULT_RUNPOD_ENDPOINT.to_string(),
            resolution: 1024,
            steps: 28,
            guidance: 3.5,
        }
    }
}

impl std::fmt::Debug for AiImageConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AiImageConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("endpoint", &self.endpoint)
            .field("resolution", &self.resolution)
            .field("steps", &self.steps)
            .field("guidance", &self.guidance)
            .finish()
    }
}

impl ApiConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if secrets fail validation (placeholder detection, entropy check).
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();

        let database_url = get_database_url("OLFONG_DATABASE_URL")?;
        let host = parse_env("API_HOST", "0.0.0.0")?;
        let port = parse_env("API_PORT", "5000")?;

        let public_url = get_env_or_default("PUBLIC_URL", "http://localhost:5000")
            .trim_end_matches('/')
            .to_string();
        url::Url::parse(&public_url)
            .map_err(|e| ConfigError::InvalidEnvVar("PUBLIC_URL".to_string(), e.to_string()))?;
        let media_base_url = get_optional_env("MEDIA_BASE_URL").map_or_else(
            || public_url.clone(),
            |u| u.trim_end_matches('/').to_string(),
        );
        let upload_dir = PathBuf::from(get_env_or_default("UPLOAD_DIR", "uploads"));
        let cors_origins = get_optional_env("CORS_ORIGINS")
            .map(|s| parse_list(&s))
            .unwrap_or_default();

        let jwt_secret = get_validated_secret("JWT_SECRET")?;
        validate_secret_length(&jwt_secret, "JWT_SECRET")?;
        let jwt = JwtConfig {
            secret: jwt_secret,
            expires_hours: parse_env("JWT_EXPIRES_HOURS", "168")?,
        };
        let encryption_key = get_validated_secret("ENCRYPTION_KEY")?;

        let atvr = AtvrConfig {
            base_url_is: get_env_or_default("ATVR_BASE_URL_IS", DEFAULT_ATVR_BASE_URL_IS),
            base_url_en: get_env_or_default("ATVR_BASE_URL_EN", DEFAULT_ATVR_BASE_URL_EN),
        };
        let image_search = ImageSearchConfig::from_env();
        let ai_image = AiImageConfig::from_env()?;

        let sentry_dsn = get_optional_env("SENTRY_DSN");
        let sentry_environment = get_optional_env("SENTRY_ENVIRONMENT");
        let sentry_sample_rate = get_optional_env("SENTRY_SAMPLE_RATE")
            .and_then(|s| s.parse().ok())
            .unwrap_or(1.0);
        let sentry_traces_sample_rate = get_optional_env("SENTRY_TRACES_SAMPLE_RATE")
            .and_then(|s| s.parse().ok())
            .unwrap_or(0.1);

        Ok(Self {
            database_url,
            host,
            port,
            public_url,
            media_base_url,
            upload_dir,
            cors_origins,
            jwt,
            encryption_key,
            atvr,
            image_search,
            ai_image,
            sentry_dsn,
            sentry_environment,
            sentry_sample_rate,
            sentry_traces_sample_rate,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

impl ImageSearchConfig {
    fn from_env() -> Self {
        Self {
            unsplash_access_key: get_optional_secret("UNSPLASH_ACCESS_KEY"),
            pexels_api_key: get_optional_secret("PEXELS_API_KEY"),
            pixabay_api_key: get_optional_secret("PIXABAY_API_KEY"),
            google_api_key: get_optional_secret("GOOGLE_API_KEY"),
            google_search_engine_id: get_optional_env("GOOGLE_SEARCH_ENGINE_ID")
                .filter(|s| !s.trim().is_empty()),
        }
    }
}

impl AiImageConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            api_key: get_optional_secret("RUNPOD_API_KEY"),
            endpoint: get_env_or_default("RUNPOD_ENDPOINT", DEFAULT_RUNPOD_ENDPOINT)
                .trim_end_matches('/')
                .to_string(),
            resolution: parse_env("AI_IMAGE_RESOLUTION", "1024")?,
            steps: parse_env("AI_IMAGE_STEPS", "28")?,
            guidance: parse_env("AI_IMAGE_GUIDANCE", "3.5")?,
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get database URL with fallback to generic `DATABASE_URL` (used by Fly.io postgres attach).
fn get_database_url(primary_key: &str) -> Result<SecretString, ConfigError> {
    if let Ok(value) = std::env::var(primary_key) {
        return Ok(SecretString::from(value));
    }
    if let Ok(value) = std::env::var("DATABASE_URL") {
        return Ok(SecretString::from(value));
    }
    Err(ConfigError::MissingEnvVar(primary_key.to_string()))
}

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// Get an optional, non-blank environment variable as a secret.
fn get_optional_secret(key: &str) -> Option<SecretString> {
    get_optional_env(key)
        .filter(|s| !s.trim().is_empty())
        .map(SecretString::from)
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Parse an environment variable (or its default) into `T`.
fn parse_env<T>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    get_env_or_default(key, default)
        .trim()
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

/// Split a comma-separated list, dropping blanks.
fn parse_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| s.trim_end_matches('/').to_string())
        .collect()
}

/// Validate that a signing secret meets minimum length requirements.
fn validate_secret_length(secret: &SecretString, var_name: &str) -> Result<(), ConfigError> {
    let value = secret.expose_secret();
    if value.len() < MIN_JWT_SECRET_LENGTH {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "must be at least {} characters (got {})",
                MIN_JWT_SECRET_LENGTH,
                value.len()
            ),
        ));
    }
    Ok(())
}

/// Calculate Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut freq: HashMap<char, usize> = HashMap::new();
    for c in s.chars() {
        *freq.entry(c).or_insert(0) += 1;
    }

    #[allow(clippy::cast_precision_loss)] // String length will never exceed f64 precision
    let len = s.chars().count() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)]
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Validate that a secret is not a placeholder and has sufficient entropy.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }

    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}). Use a randomly generated secret."
            ),
        ));
    }

    Ok(())
}

/// Load and validate a secret from environment.
fn get_validated_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    validate_secret_strength(&value, key)?;
    Ok(SecretString::from(value))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn test_config() -> ApiConfig {
        ApiConfig {
            database_url: SecretString::from("postgres://localhost/olfong"),
            host: "127.0.0.1".parse().unwrap(),
            port: 5000,
            public_url: "http://localhost:5000".to_string(),
            media_base_url: "http://localhost:5000".to_string(),
            upload_dir: PathBuf::from("uploads"),
            cors_origins: Vec::new(),
            jwt: JwtConfig {
                secret: SecretString::from("x".repeat(32)),
                expires_hours: 168,
            },
            encryption_key: SecretString::from("k".repeat(32)),
            atvr: AtvrConfig::default(),
            image_search: ImageSearchConfig {
                pexels_api_key: Some(SecretString::from("pexels_key_value_123")),
                ..ImageSearchConfig::default()
            },
            ai_image: AiImageConfig {
                api_key: Some(SecretString::from("runpod_key_value_456")),
                ..AiImageConfig::default()
            },
            sentry_dsn: None,
            sentry_environment: None,
            sentry_sample_rate: 1.0,
            sentry_traces_sample_rate: 0.1,
        }
    }

    #[test]
    fn test_shannon_entropy_empty() {
        assert!((shannon_entropy("") - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_shannon_entropy_two_chars() {
        let entropy = shannon_entropy("ab");
        assert!((entropy - 1.0).abs() < 0.01);
    }

    #[test]
    fn test_shannon_entropy_high() {
        let entropy = shannon_entropy("aB3$xY9!mK2@nL5#");
        assert!(entropy > 3.3);
    }

    #[test]
    fn test_validate_secret_strength_placeholder() {
        let result = validate_secret_strength("your-jwt-key-here", "JWT_SECRET");
        assert!(matches!(result, Err(ConfigError::InsecureSecret(_, _))));
        assert!(validate_secret_strength("changeme123", "JWT_SECRET").is_err());
    }

    #[test]
    fn test_validate_secret_strength_low_entropy() {
        let result = validate_secret_strength(&"a".repeat(40), "ENCRYPTION_KEY");
        assert!(matches!(result, Err(ConfigError::InsecureSecret(_, _))));
    }

    #[test]
    fn test_validate_secret_strength_valid() {
        let result = validate_secret_strength("aB3$xY9!mK2@nL5#pQ7&rT0*uW4^zC6", "JWT_SECRET");
        assert!(result.is_ok());
    }

    #[test]
    fn test_validate_secret_length() {
        assert!(validate_secret_length(&SecretString::from("short"), "JWT_SECRET").is_err());
        assert!(validate_secret_length(&SecretString::from("a".repeat(32)), "JWT_SECRET").is_ok());
    }

    #[test]
    fn test_parse_list() {
        assert_eq!(
            parse_list(" https://olfong.is/, ,https://admin.olfong.is "),
            vec!["https://olfong.is", "https://admin.olfong.is"]
        );
        assert!(parse_list("").is_empty());
    }

    #[test]
    fn test_socket_addr() {
        let addr = test_config().socket_addr();
        assert_eq!(addr.ip().to_string(), "127.0.0.1");
        assert_eq!(addr.port(), 5000);
    }

    #[test]
    fn test_debug_redacts_provider_keys() {
        let debug_output = format!("{:?}", test_config());
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("pexels_key_value_123"));
        assert!(!debug_output.contains("runpod_key_value_456"));
        assert!(debug_output.contains("black-forest-labs"));
    }
}
