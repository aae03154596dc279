//! Success envelope and request extractors that reject with [`AppError`].
//!
//! Successful responses are `{"success": true, "message"?: ..., "data": ...}`,
//! which is the shape the web client unwraps.

use axum::{
    Json,
    extract::{FromRequest, FromRequestParts},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

use crate::error::AppError;

/// JSON body extractor whose rejection renders as an error envelope.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct ApiJson<T>(pub T);

/// Query string extractor whose rejection renders as an error envelope.
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(AppError))]
pub struct ApiQuery<T>(pub T);

/// Path extractor whose rejection renders as an error envelope.
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(AppError))]
pub struct ApiPath<T>(pub T);

/// A successful response.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
    data: T,
    #[serde(skip)]
    status: StatusCode,
}

impl<T: Serialize> ApiResponse<T> {
    #[must_use]
    pub const fn ok(data: T) -> Self {
        Self {
            success: true,
            message: None,
            data,
            status: StatusCode::OK,
        }
    }

    /// 201 with a message.
    #[must_use]
    pub fn created(message: &str, data: T) -> Self {
        Self {
            status: StatusCode::CREATED,
            ..Self::with_message(message, data)
        }
    }

    #[must_use]
    pub fn with_message(message: &str, data: T) -> Self {
        Self {
            success: true,
            message: Some(message.to_string()),
            data,
            status: StatusCode::OK,
        }
    }
}

impl ApiResponse<()> {
    /// A success with nothing but a message (`data` is `null`).
    #[must_use]
    pub fn message(message: &str) -> Self {
        Self::with_message(message, ())
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        let status = self.status;
        (status, Json(self)).into_response()
    }
}

/// Result of a handler returning the success envelope.
pub type ApiResult<T> = crate::error::Result<ApiResponse<T>>;

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_envelope_shape() {
        let value = serde_json::to_value(ApiResponse::ok(vec![1, 2])).unwrap();
        assert_eq!(value, serde_json::json!({"success": true, "data": [1, 2]}));

        let value = serde_json::to_value(ApiResponse::message("Page deleted successfully")).unwrap();
        assert_eq!(
            value,
            serde_json::json!({"success": true, "message": "Page deleted successfully", "data": null})
        );
    }

    #[test]
    fn test_created_status() {
        let response = ApiResponse::created("Created", 1).into_response();
        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(ApiResponse::ok(1).into_response().status(), StatusCode::OK);
    }
}
