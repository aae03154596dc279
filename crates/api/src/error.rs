//! Unified error handling with Sentry integration.
//!
//! Every handler returns `Result<T, AppError>`. Errors render as
//! `{"success": false, "message": ...}`; server-side failures are captured to
//! Sentry before responding and their details never reach the client.

use axum::{
    Json,
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::db::RepositoryError;
use crate::services::ai_image::AiImageError;
use crate::services::atvr::AtvrError;
use crate::services::auth::AuthError;
use crate::services::crypto::CryptoError;
use crate::services::image_search::ImageSearchError;
use crate::services::media_storage::MediaStorageError;
use crate::services::orders::OrderError;
use crate::validation::ValidationError;

/// Application-level error type for the API.
#[derive(Debug, Error)]
pub enum AppError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    #[error("Order error: {0}")]
    Order(#[from] OrderError),

    #[error("ATVR error: {0}")]
    Atvr(#[from] AtvrError),

    #[error("Image search error: {0}")]
    ImageSearch(#[from] ImageSearchError),

    #[error("AI image error: {0}")]
    AiImage(#[from] AiImageError),

    #[error("Media error: {0}")]
    Media(#[from] MediaStorageError),

    #[error("Crypto error: {0}")]
    Crypto(#[from] CryptoError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

const INTERNAL: &str = "Internal server error";
const EXTERNAL: &str = "External service error";

fn internal() -> (StatusCode, String) {
    (StatusCode::INTERNAL_SERVER_ERROR, INTERNAL.to_string())
}

/// Service errors are lowercase; client messages start with a capital.
fn capitalize(message: &str) -> String {
    let mut chars = message.chars();
    chars.next().map_or_else(String::new, |first| {
        first.to_uppercase().chain(chars).collect()
    })
}

fn repository(err: &RepositoryError, not_found: &str) -> (StatusCode, String) {
    match err {
        RepositoryError::NotFound => (StatusCode::NOT_FOUND, not_found.to_string()),
        RepositoryError::Conflict(msg) => (StatusCode::CONFLICT, msg.clone()),
        RepositoryError::Database(_) | RepositoryError::DataCorruption(_) => internal(),
    }
}

impl AppError {
    /// Status code and client-facing message.
    fn status_and_message(&self) -> (StatusCode, String) {
        match self {
            Self::Database(err) => repository(err, "Not found"),
            Self::Internal(_) | Self::Crypto(_) => internal(),

            Self::Auth(err) => match err {
                AuthError::InvalidCredentials => {
                    (StatusCode::UNAUTHORIZED, "Invalid credentials".to_string())
                }
                AuthError::InvalidToken => (StatusCode::UNAUTHORIZED, "Invalid token.".to_string()),
                AuthError::EmailTaken => (
                    StatusCode::CONFLICT,
                    "User already exists with this email".to_string(),
                ),
                AuthError::PasswordTooShort(_) | AuthError::BirthDateInFuture => {
                    (StatusCode::BAD_REQUEST, capitalize(&err.to_string()))
                }
                AuthError::InvalidEmail(_) => {
                    (StatusCode::BAD_REQUEST, "Invalid email address".to_string())
                }
                AuthError::Repository(err) => repository(err, "User not found"),
                AuthError::TokenSigning(_) | AuthError::PasswordHash => internal(),
            },

            Self::Order(err) => match err {
                OrderError::ShippingNotFound | OrderError::ProductNotFound(_) => {
                    (StatusCode::NOT_FOUND, err.to_string())
                }
                OrderError::AgeRestricted { .. } => (StatusCode::FORBIDDEN, err.to_string()),
                OrderError::Repository(RepositoryError::Conflict(msg)) => {
                    (StatusCode::CONFLICT, msg.clone())
                }
                OrderError::Repository(err) => repository(err, "Order not found"),
                _ => (StatusCode::BAD_REQUEST, err.to_string()),
            },

            Self::Atvr(err) => {
                if err.is_timeout() {
                    (
                        StatusCode::REQUEST_TIMEOUT,
                        "Request timeout - ATVR website is not responding".to_string(),
                    )
                } else {
                    (StatusCode::BAD_GATEWAY, EXTERNAL.to_string())
                }
            }

            Self::ImageSearch(err) => match err {
                ImageSearchError::NoSources
                | ImageSearchError::NotAnImage(_)
                | ImageSearchError::TooLarge { .. } => (StatusCode::BAD_REQUEST, err.to_string()),
                ImageSearchError::Provider { .. } | ImageSearchError::Download(_) => {
                    (StatusCode::BAD_GATEWAY, EXTERNAL.to_string())
                }
            },

            Self::AiImage(err) => match err {
                AiImageError::MediaNotFound => (StatusCode::NOT_FOUND, err.to_string()),
                AiImageError::NotAnImage | AiImageError::NotConfigured => {
                    (StatusCode::BAD_REQUEST, err.to_string())
                }
                AiImageError::Http(_) | AiImageError::Upstream(_) | AiImageError::Output(_) => {
                    (StatusCode::BAD_GATEWAY, EXTERNAL.to_string())
                }
                AiImageError::Storage(_) => internal(),
                AiImageError::Repository(err) => repository(err, "Media not found"),
            },

            Self::Media(err) => match err {
                MediaStorageError::TooLarge { .. } | MediaStorageError::UnsupportedType(_) => {
                    (StatusCode::BAD_REQUEST, err.to_string())
                }
                MediaStorageError::Io(_) => internal(),
                MediaStorageError::Repository(err) => repository(err, "Media not found"),
            },

            Self::Validation(err) => (StatusCode::BAD_REQUEST, err.to_string()),
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            Self::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg.clone()),
            Self::Forbidden(msg) => (StatusCode::FORBIDDEN, msg.clone()),
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            Self::Conflict(msg) => (StatusCode::CONFLICT, msg.clone()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = self.status_and_message();

        if status.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        } else {
            tracing::debug!(error = %self, status = status.as_u16(), "Request rejected");
        }

        (status, Json(json!({ "success": false, "message": message }))).into_response()
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Associate subsequent Sentry events with the authenticated user.
pub fn set_sentry_user(user_id: &impl ToString, role: &str) {
    sentry::configure_scope(|scope| {
        let mut user = sentry::User {
            id: Some(user_id.to_string()),
            ..Default::default()
        };
        user.other
            .insert("role".to_string(), serde_json::Value::String(role.to_string()));
        scope.set_user(Some(user));
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status(err: AppError) -> StatusCode {
        err.status_and_message().0
    }

    #[test]
    fn test_app_error_display() {
        let err = AppError::NotFound("Product not found".to_string());
        assert_eq!(err.to_string(), "Not found: Product not found");
    }

    #[test]
    fn test_plain_status_codes() {
        assert_eq!(status(AppError::NotFound(String::new())), StatusCode::NOT_FOUND);
        assert_eq!(status(AppError::Unauthorized(String::new())), StatusCode::UNAUTHORIZED);
        assert_eq!(status(AppError::Forbidden(String::new())), StatusCode::FORBIDDEN);
        assert_eq!(status(AppError::BadRequest(String::new())), StatusCode::BAD_REQUEST);
        assert_eq!(status(AppError::Conflict(String::new())), StatusCode::CONFLICT);
        assert_eq!(
            status(ValidationError::new("bad slug").into()),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn test_internal_details_hidden() {
        let (code, message) =
            AppError::Database(RepositoryError::DataCorruption("bad row".into()))
                .status_and_message();
        assert_eq!(code, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(message, "Internal server error");

        let (code, message) = AppError::Internal("secret detail".into()).status_and_message();
        assert_eq!(code, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(message, "Internal server error");
    }

    #[test]
    fn test_repository_mapping() {
        assert_eq!(
            status(RepositoryError::NotFound.into()),
            StatusCode::NOT_FOUND
        );
        let (code, message) =
            AppError::from(RepositoryError::Conflict("Slug taken".into())).status_and_message();
        assert_eq!(code, StatusCode::CONFLICT);
        assert_eq!(message, "Slug taken");
    }

    #[test]
    fn test_auth_mapping() {
        assert_eq!(status(AuthError::InvalidCredentials.into()), StatusCode::UNAUTHORIZED);
        assert_eq!(status(AuthError::EmailTaken.into()), StatusCode::CONFLICT);
        assert_eq!(
            status(AuthError::PasswordTooShort(8).into()),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(status(AuthError::PasswordHash.into()), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_order_mapping() {
        assert_eq!(status(OrderError::EmptyOrder.into()), StatusCode::BAD_REQUEST);
        assert_eq!(status(OrderError::ShippingNotFound.into()), StatusCode::NOT_FOUND);
        assert_eq!(
            status(
                OrderError::AgeRestricted {
                    product: "Brennivín".into(),
                    age: 20
                }
                .into()
            ),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            status(OrderError::InsufficientStock("Gull".into()).into()),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status(OrderError::Repository(RepositoryError::Conflict("x".into())).into()),
            StatusCode::CONFLICT
        );
    }

    #[test]
    fn test_external_mapping() {
        assert_eq!(status(AtvrError::Timeout.into()), StatusCode::REQUEST_TIMEOUT);
        assert_eq!(status(AtvrError::Status(503).into()), StatusCode::BAD_GATEWAY);
        assert_eq!(status(ImageSearchError::NoSources.into()), StatusCode::BAD_REQUEST);
        assert_eq!(
            status(ImageSearchError::Download("reset".into()).into()),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(status(AiImageError::MediaNotFound.into()), StatusCode::NOT_FOUND);
        assert_eq!(status(AiImageError::NotAnImage.into()), StatusCode::BAD_REQUEST);
        assert_eq!(
            status(AiImageError::Upstream("boom".into()).into()),
            StatusCode::BAD_GATEWAY
        );
    }

    #[test]
    fn test_no_sources_message() {
        let (_, message) = AppError::from(ImageSearchError::NoSources).status_and_message();
        assert_eq!(message, "No image sources configured");
    }
}
