//! Database operations for the Ölföng `PostgreSQL` database.
//!
//! ## Tables
//!
//! - `users` - Customers, admins and delivery staff
//! - `vat_profiles`, `categories`, `subcategories`, `products` - Catalog
//! - `pages`, `banners` - CMS pages and storefront banners
//! - `media` - Media library (content-addressed per collection)
//! - `shipping_options`, `payment_gateways` - Checkout configuration
//! - `orders`, `order_items` - Orders
//! - `translations` - UI strings per locale
//!
//! # Migrations
//!
//! Migrations are stored in `crates/api/migrations/` and run via:
//! ```bash
//! cargo run -p olfong-cli -- migrate
//! ```

pub mod banners;
pub mod categories;
pub mod customers;
pub mod media;
pub mod orders;
pub mod pages;
pub mod payment_gateways;
pub mod products;
pub mod reports;
pub mod shipping;
pub mod translations;
pub mod users;
pub mod vat_profiles;

use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

pub use banners::BannerRepository;
pub use categories::CategoryRepository;
pub use customers::CustomerRepository;
pub use media::MediaRepository;
pub use orders::OrderRepository;
pub use pages::PageRepository;
pub use payment_gateways::PaymentGatewayRepository;
pub use products::ProductRepository;
pub use reports::ReportRepository;
pub use shipping::ShippingRepository;
pub use translations::TranslationRepository;
pub use users::UserRepository;
pub use vat_profiles::VatProfileRepository;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., unique slug).
    #[error("{0}")]
    Conflict(String),
}

/// Map a unique violation to [`RepositoryError::Conflict`] with `message`.
pub(crate) fn conflict_on_unique(e: sqlx::Error, message: &str) -> RepositoryError {
    if let sqlx::Error::Database(ref db_err) = e
        && db_err.is_unique_violation()
    {
        return RepositoryError::Conflict(message.to_owned());
    }
    RepositoryError::Database(e)
}

/// Map a foreign key violation to [`RepositoryError::Conflict`] with `message`.
pub(crate) fn conflict_on_foreign_key(e: sqlx::Error, message: &str) -> RepositoryError {
    if let sqlx::Error::Database(ref db_err) = e
        && db_err.is_foreign_key_violation()
    {
        return RepositoryError::Conflict(message.to_owned());
    }
    RepositoryError::Database(e)
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}
