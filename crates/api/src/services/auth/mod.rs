//! Email/password accounts and bearer tokens.
//!
//! Passwords are stored as Argon2id PHC strings. Tokens are HS256 JWTs
//! carrying the user id and role; see [`jwt`].

mod error;
pub mod jwt;

pub use error::AuthError;
pub use jwt::{Claims, JwtKeys};

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use chrono::{NaiveDate, Utc};
use rand::Rng;
use serde::Deserialize;
use sqlx::PgPool;

use olfong_core::{Email, UserRole};

use crate::db::RepositoryError;
use crate::db::users::{NewUser, UserRepository};
use crate::models::user::User;

/// Minimum password length.
pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Body of `POST /api/auth/register`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Registration {
    pub email: String,
    pub password: String,
    pub full_name: Option<String>,
    pub phone: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
}

pub struct AuthService<'a> {
    users: UserRepository<'a>,
}

impl<'a> AuthService<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self {
            users: UserRepository::new(pool),
        }
    }

    /// Open a customer account.
    ///
    /// # Errors
    ///
    /// Rejects a malformed email, a short password, a birth date in the
    /// future, or an email that is already registered.
    pub async fn register(&self, registration: Registration) -> Result<User, AuthError> {
        self.create_user(registration, UserRole::Customer).await
    }

    /// Open an account with `role`. The CLI uses this for admins.
    ///
    /// # Errors
    ///
    /// Same as [`Self::register`].
    pub async fn create_user(
        &self,
        registration: Registration,
        role: UserRole,
    ) -> Result<User, AuthError> {
        let email = Email::parse(&registration.email)?;
        check_password(&registration.password)?;
        if registration
            .date_of_birth
            .is_some_and(|dob| dob > Utc::now().date_naive())
        {
            return Err(AuthError::BirthDateInFuture);
        }

        let new_user = NewUser {
            email,
            password_hash: hash_password(&registration.password)?,
            full_name: trimmed(registration.full_name),
            phone: trimmed(registration.phone),
            date_of_birth: registration.date_of_birth,
            role,
        };
        match self.users.create(&new_user).await {
            Err(RepositoryError::Conflict(_)) => Err(AuthError::EmailTaken),
            other => Ok(other?),
        }
    }

    /// Check an email/password pair and return the account.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` for an unknown email, a
    /// malformed one, or a wrong password.
    pub async fn login(&self, email: &str, password: &str) -> Result<User, AuthError> {
        let Ok(email) = Email::parse(email) else {
            return Err(AuthError::InvalidCredentials);
        };
        let (user, stored_hash) = self
            .users
            .get_password_hash(&email)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;
        verify_password(password, &stored_hash)?;
        Ok(user)
    }
}

fn trimmed(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn check_password(password: &str) -> Result<(), AuthError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::PasswordTooShort(MIN_PASSWORD_LENGTH));
    }
    Ok(())
}

/// Validate a new password and hash it.
///
/// # Errors
///
/// Returns `AuthError::PasswordTooShort` or `AuthError::PasswordHash`.
pub fn new_password_hash(password: &str) -> Result<String, AuthError> {
    check_password(password)?;
    hash_password(password)
}

/// Length of passwords handed out to new staff accounts.
pub const TEMPORARY_PASSWORD_LENGTH: usize = 14;

/// A random alphanumeric password for an account created by an admin.
#[must_use]
pub fn temporary_password() -> String {
    rand::rng()
        .sample_iter(&rand::distr::Alphanumeric)
        .take(TEMPORARY_PASSWORD_LENGTH)
        .map(char::from)
        .collect()
}

/// Argon2id hash in PHC string format, with a fresh random salt.
///
/// # Errors
///
/// Returns `AuthError::PasswordHash` if hashing fails.
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|phc| phc.to_string())
        .map_err(|_| AuthError::PasswordHash)
}

fn verify_password(password: &str, stored_hash: &str) -> Result<(), AuthError> {
    PasswordHash::new(stored_hash)
        .and_then(|phc| Argon2::default().verify_password(password.as_bytes(), &phc))
        .map_err(|_| AuthError::InvalidCredentials)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_password_roundtrip() {
        let hash = hash_password("correct horse").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password("correct horse", &hash).is_ok());
        assert!(matches!(
            verify_password("wrong horse", &hash),
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[test]
    fn test_optional_fields_are_trimmed() {
        assert_eq!(trimmed(Some("  Jón ".into())).as_deref(), Some("Jón"));
        assert!(trimmed(Some("   ".into())).is_none());
        assert!(trimmed(None).is_none());
    }

    #[test]
    fn test_salts_differ() {
        assert_ne!(hash_password("same").unwrap(), hash_password("same").unwrap());
    }

    #[test]
    fn test_password_length() {
        assert!(matches!(
            check_password("1234567"),
            Err(AuthError::PasswordTooShort(8))
        ));
        assert!(check_password("12345678").is_ok());
        assert!(check_password("þþþþþþþþ").is_ok());
        assert!(matches!(
            verify_password("x", "not-a-hash"),
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[test]
    fn test_temporary_password() {
        let first = temporary_password();
        assert_eq!(first.len(), TEMPORARY_PASSWORD_LENGTH);
        assert!(first.chars().all(|c| c.is_ascii_alphanumeric()));
        assert!(check_password(&first).is_ok());
        assert_ne!(first, temporary_password());
    }

    #[test]
    fn test_new_password_hash_checks_length() {
        assert!(matches!(
            new_password_hash("short"),
            Err(AuthError::PasswordTooShort(_))
        ));
        let hash = new_password_hash("nytt-lykilord").unwrap();
        assert!(verify_password("nytt-lykilord", &hash).is_ok());
    }
}
