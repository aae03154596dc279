use thiserror::Error;

use crate::db::RepositoryError;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] olfong_core::EmailError),

    /// Unknown email or wrong password. The two are not told apart.
    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("an account with this email already exists")]
    EmailTaken,

    #[error("password must be at least {0} characters")]
    PasswordTooShort(usize),

    #[error("date of birth cannot be in the future")]
    BirthDateInFuture,

    /// Missing, malformed, expired or badly signed bearer token.
    #[error("invalid token")]
    InvalidToken,

    #[error("token signing failed: {0}")]
    TokenSigning(String),

    #[error("password hashing failed")]
    PasswordHash,

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}
