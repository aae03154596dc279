//! Back-office staff accounts (admins and delivery drivers).

#![allow(clippy::used_underscore_binding)]

use axum::{Router, extract::State, routing::get};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use olfong_core::{PageRequest, Pagination, UserId, UserRole};

use crate::db::{RepositoryError, UserRepository};
use crate::error::AppError;
use crate::middleware::RequireAdmin;
use crate::models::{StaffFilter, StaffInput, StaffUpdate, User};
use crate::response::{ApiJson, ApiPath, ApiQuery, ApiResponse, ApiResult};
use crate::services::auth::{self, AuthService, Registration};
use crate::state::AppState;

const NOT_FOUND: &str = "Staff member not found";

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(index).post(create))
        .route("/{id}", get(show).put(update).delete(destroy))
}

/// Staff endpoints only deal in ADMIN and DELIVERY accounts.
fn staff_role(role: UserRole) -> Result<UserRole, AppError> {
    if role.is_staff() {
        Ok(role)
    } else {
        Err(AppError::BadRequest(
            "Invalid role. Must be ADMIN or DELIVERY".to_string(),
        ))
    }
}

fn staff_error(err: RepositoryError) -> AppError {
    match err {
        RepositoryError::NotFound => AppError::NotFound(NOT_FOUND.to_string()),
        RepositoryError::Conflict(msg) => AppError::BadRequest(msg),
        other => other.into(),
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub search: Option<String>,
    pub role: Option<UserRole>,
}

impl TryFrom<ListQuery> for StaffFilter {
    type Error = AppError;

    fn try_from(q: ListQuery) -> Result<Self, AppError> {
        Ok(Self {
            search: q.search.map(|s| s.trim().to_string()).filter(|s| !s.is_empty()),
            role: q.role.map(staff_role).transpose()?,
            page: PageRequest::new(q.page, q.limit),
        })
    }
}

#[derive(Debug, Serialize)]
pub struct StaffList {
    pub staff: Vec<User>,
    pub pagination: Pagination,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedStaff {
    pub staff: User,
    /// Present only when the password was generated.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temporary_password: Option<String>,
}

#[instrument(skip(state, _admin))]
async fn index(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<ListQuery>,
) -> ApiResult<StaffList> {
    let filter = StaffFilter::try_from(query)?;
    let (staff, total) = UserRepository::new(state.pool())
        .list_staff(&filter)
        .await?;
    Ok(ApiResponse::ok(StaffList {
        staff,
        pagination: Pagination::new(filter.page, total),
    }))
}

#[instrument(skip(state, _admin))]
async fn show(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<UserId>,
) -> ApiResult<User> {
    let user = UserRepository::new(state.pool())
        .get_by_id(id)
        .await?
        .filter(|u| u.role.is_staff())
        .ok_or_else(|| AppError::NotFound(NOT_FOUND.to_string()))?;
    Ok(ApiResponse::ok(user))
}

#[instrument(skip(state, admin, input), fields(admin_id = %admin.id))]
async fn create(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    ApiJson(input): ApiJson<StaffInput>,
) -> ApiResult<CreatedStaff> {
    let role = staff_role(input.role)?;
    if input.full_name.trim().is_empty() {
        return Err(AppError::BadRequest("Full name is required".to_string()));
    }
    let (password, temporary_password) = match input.password {
        Some(password) => (password, None),
        None => {
            let generated = auth::temporary_password();
            (generated.clone(), Some(generated))
        }
    };

    let staff = AuthService::new(state.pool())
        .create_user(
            Registration {
                email: input.email,
                password,
                full_name: Some(input.full_name),
                phone: input.phone,
                date_of_birth: None,
            },
            role,
        )
        .await?;
    tracing::info!(user_id = %staff.id, %role, "Staff account created");

    Ok(ApiResponse::created(
        "Staff member created successfully",
        CreatedStaff {
            staff,
            temporary_password,
        },
    ))
}

#[instrument(skip(state, _admin, update))]
async fn update(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<UserId>,
    ApiJson(update): ApiJson<StaffUpdate>,
) -> ApiResult<User> {
    if let Some(role) = update.role {
        staff_role(role)?;
    }
    let password_hash = update
        .password
        .as_deref()
        .map(auth::new_password_hash)
        .transpose()?;

    let staff = UserRepository::new(state.pool())
        .update_staff(id, &update, password_hash.as_deref())
        .await
        .map_err(staff_error)?;
    Ok(ApiResponse::with_message(
        "Staff member updated successfully",
        staff,
    ))
}

#[instrument(skip(state, admin), fields(admin_id = %admin.id))]
async fn destroy(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<UserId>,
) -> ApiResult<()> {
    if id == admin.id {
        return Err(AppError::BadRequest(
            "You cannot delete your own account".to_string(),
        ));
    }
    UserRepository::new(state.pool())
        .delete_staff(id)
        .await
        .map_err(staff_error)?;
    Ok(ApiResponse::message("Staff member deleted successfully"))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_staff_role() {
        assert_eq!(staff_role(UserRole::Delivery).unwrap(), UserRole::Delivery);
        assert_eq!(staff_role(UserRole::Admin).unwrap(), UserRole::Admin);
        assert!(matches!(
            staff_role(UserRole::Customer),
            Err(AppError::BadRequest(_))
        ));
    }

    #[test]
    fn test_list_query_rejects_customer_role() {
        let query: ListQuery =
            serde_json::from_value(serde_json::json!({"role": "DELIVERY", "search": " "}))
                .unwrap();
        let filter = StaffFilter::try_from(query).unwrap();
        assert_eq!(filter.role, Some(UserRole::Delivery));
        assert!(filter.search.is_none());

        let query: ListQuery =
            serde_json::from_value(serde_json::json!({"role": "CUSTOMER"})).unwrap();
        assert!(StaffFilter::try_from(query).is_err());
    }

    #[test]
    fn test_last_admin_is_a_bad_request() {
        let err = staff_error(RepositoryError::Conflict(
            crate::db::users::LAST_ADMIN.to_string(),
        ));
        assert!(matches!(err, AppError::BadRequest(msg) if msg.contains("last admin")));
        assert!(matches!(
            staff_error(RepositoryError::NotFound),
            AppError::NotFound(_)
        ));
    }

    #[test]
    fn test_generated_password_is_returned_once() {
        let created = CreatedStaff {
            staff: User {
                id: UserId::new(9),
                email: olfong_core::Email::parse("bilstjori@olfong.is").unwrap(),
                full_name: Some("Bílstjóri".to_string()),
                phone: None,
                date_of_birth: None,
                role: UserRole::Delivery,
                created_at: chrono::Utc::now(),
                updated_at: chrono::Utc::now(),
            },
            temporary_password: None,
        };
        let json = serde_json::to_value(&created).unwrap();
        assert_eq!(json["staff"]["role"], "DELIVERY");
        assert!(json.get("temporaryPassword").is_none());
    }
}
