//! Account registration, login and profile handlers.

use axum::{
    Router,
    extract::State,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::db::UserRepository;
use crate::middleware::{RequireAuth, auth_rate_limiter};
use crate::models::{ProfileUpdate, User};
use crate::response::{ApiJson, ApiResponse, ApiResult};
use crate::services::auth::{AuthService, Registration};
use crate::state::AppState;

use super::not_found;

/// Build the auth router. Login and registration are rate limited per
/// client; the profile routes are not.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .layer(auth_rate_limiter())
        .route("/profile", get(profile).put(update_profile))
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// A user plus a freshly issued bearer token.
#[derive(Debug, Serialize)]
pub struct Session {
    pub user: User,
    pub token: String,
}

impl Session {
    fn issue(state: &AppState, user: User) -> Result<Self, crate::error::AppError> {
        let token = state.jwt().issue(user.id, user.role)?;
        Ok(Self { user, token })
    }
}

#[instrument(skip(state, registration), fields(email = %registration.email))]
async fn register(
    State(state): State<AppState>,
    ApiJson(registration): ApiJson<Registration>,
) -> ApiResult<Session> {
    let user = AuthService::new(state.pool()).register(registration).await?;
    tracing::info!(user_id = %user.id, "User registered");
    Ok(ApiResponse::created(
        "User registered successfully",
        Session::issue(&state, user)?,
    ))
}

#[instrument(skip(state, request), fields(email = %request.email))]
async fn login(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<LoginRequest>,
) -> ApiResult<Session> {
    let user = AuthService::new(state.pool())
        .login(&request.email, &request.password)
        .await
        .inspect_err(|e| tracing::info!(error = %e, "Login rejected"))?;
    Ok(ApiResponse::with_message(
        "Login successful",
        Session::issue(&state, user)?,
    ))
}

#[instrument(skip(user), fields(user_id = %user.id))]
async fn profile(RequireAuth(user): RequireAuth) -> ApiResult<User> {
    Ok(ApiResponse::ok(user))
}

#[instrument(skip(state, user, update), fields(user_id = %user.id))]
async fn update_profile(
    RequireAuth(user): RequireAuth,
    State(state): State<AppState>,
    ApiJson(update): ApiJson<ProfileUpdate>,
) -> ApiResult<User> {
    let update = ProfileUpdate {
        full_name: update.full_name.map(|s| s.trim().to_string()),
        phone: update.phone.map(|s| s.trim().to_string()),
        date_of_birth: update.date_of_birth,
    };
    let user = UserRepository::new(state.pool())
        .update_profile(user.id, &update)
        .await
        .map_err(|e| not_found(e, "User not found"))?;
    Ok(ApiResponse::with_message(
        "Profile updated successfully",
        user,
    ))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_registration_body() {
        let registration: Registration = serde_json::from_value(serde_json::json!({
            "email": "jon@olfong.is",
            "password": "longenough",
            "fullName": "Jón Jónsson",
            "dateOfBirth": "1990-05-17"
        }))
        .unwrap();
        assert_eq!(registration.full_name.as_deref(), Some("Jón Jónsson"));
        assert!(registration.phone.is_none());
        assert_eq!(
            registration.date_of_birth.unwrap().to_string(),
            "1990-05-17"
        );
    }

    #[test]
    fn test_login_requires_password() {
        let result: Result<LoginRequest, _> =
            serde_json::from_value(serde_json::json!({"email": "jon@olfong.is"}));
        assert!(result.is_err());
    }
}
