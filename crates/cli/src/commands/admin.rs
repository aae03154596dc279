//! Staff account commands.

use olfong_api::services::auth::{AuthError, AuthService, Registration};
use olfong_core::UserRole;

use super::{CommandError, connect};

/// Errors from admin user commands.
#[derive(Debug, thiserror::Error)]
pub enum AdminError {
    #[error(transparent)]
    Connect(#[from] CommandError),

    #[error("User already exists with email: {0}")]
    UserExists(String),

    #[error(transparent)]
    Auth(AuthError),
}

/// Create an account with the ADMIN or DELIVERY role.
///
/// # Returns
///
/// The ID of the created user.
///
/// # Errors
///
/// Returns an error for an invalid email, a short password, an existing
/// account or a database failure.
pub async fn create_user(
    email: &str,
    name: &str,
    password: &str,
    role: UserRole,
) -> Result<i32, AdminError> {
    let pool = connect().await?;

    tracing::info!("Creating {} user: {}", role, email);

    let registration = Registration {
        email: email.to_owned(),
        password: password.to_owned(),
        full_name: Some(name.to_owned()),
        phone: None,
        date_of_birth: None,
    };

    let user = AuthService::new(&pool)
        .create_user(registration, role)
        .await
        .map_err(|e| match e {
            AuthError::EmailTaken => AdminError::UserExists(email.to_owned()),
            other => AdminError::Auth(other),
        })?;

    tracing::info!(
        "User created successfully! ID: {}, Email: {}, Role: {}",
        user.id,
        user.email,
        user.role
    );

    Ok(user.id.as_i32())
}
