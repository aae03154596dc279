//! Bearer token extractors.
//!
//! The token only identifies the user; the account (and its role) is re-read
//! from the database on every request so role changes apply immediately.

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};

use crate::db::UserRepository;
use crate::error::{AppError, set_sentry_user};
use crate::models::User;
use crate::state::AppState;

const NO_TOKEN: &str = "Access denied. No token provided.";
const INVALID_TOKEN: &str = "Invalid token.";
const FORBIDDEN: &str = "Insufficient permissions";

fn bearer_token(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// Extractor that requires a valid bearer token.
///
/// # Example
///
/// ```rust,ignore
/// async fn profile(RequireAuth(user): RequireAuth) -> ApiResult<User> {
///     Ok(ApiResponse::ok(user))
/// }
/// ```
pub struct RequireAuth(pub User);

impl FromRequestParts<AppState> for RequireAuth {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, AppError> {
        let token =
            bearer_token(parts).ok_or_else(|| AppError::Unauthorized(NO_TOKEN.to_string()))?;
        let claims = state
            .jwt()
            .verify(token)
            .map_err(|_| AppError::Unauthorized(INVALID_TOKEN.to_string()))?;

        let user = UserRepository::new(state.pool())
            .get_by_id(claims.sub)
            .await?
            .ok_or_else(|| AppError::Unauthorized(INVALID_TOKEN.to_string()))?;

        set_sentry_user(&user.id, &user.role.to_string());
        Ok(Self(user))
    }
}

/// Extractor that requires an ADMIN account.
pub struct RequireAdmin(pub User);

impl FromRequestParts<AppState> for RequireAdmin {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, AppError> {
        let RequireAuth(user) = RequireAuth::from_request_parts(parts, state).await?;
        if !user.role.is_admin() {
            tracing::warn!(user_id = %user.id, role = %user.role, "Admin route refused");
            return Err(AppError::Forbidden(FORBIDDEN.to_string()));
        }
        Ok(Self(user))
    }
}

/// Extractor that requires an ADMIN or DELIVERY account.
pub struct RequireStaff(pub User);

impl FromRequestParts<AppState> for RequireStaff {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, AppError> {
        let RequireAuth(user) = RequireAuth::from_request_parts(parts, state).await?;
        if !user.role.is_staff() {
            return Err(AppError::Forbidden(FORBIDDEN.to_string()));
        }
        Ok(Self(user))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use axum::http::Request;

    fn parts(header: Option<&str>) -> Parts {
        let mut builder = Request::builder();
        if let Some(value) = header {
            builder = builder.header(AUTHORIZATION, value);
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[test]
    fn test_bearer_token() {
        assert_eq!(bearer_token(&parts(Some("Bearer abc.def"))), Some("abc.def"));
        assert_eq!(bearer_token(&parts(Some("Basic abc"))), None);
        assert_eq!(bearer_token(&parts(Some("Bearer   "))), None);
        assert_eq!(bearer_token(&parts(None)), None);
    }
}
