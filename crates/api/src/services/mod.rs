//! Business logic services.
//!
//! # Services
//!
//! - `auth` - Email/password accounts and bearer tokens
//! - `orders` - Order placement rules and totals
//! - `crypto` - Encryption of payment gateway secrets
//! - `media_storage` - Upload validation, de-duplication and file storage
//! - `atvr` - ATVR catalog search and product import
//! - `image_search` - Stock photo search across providers
//! - `ai_image` - `RunPod` product photo clean-up jobs

pub mod ai_image;
pub mod atvr;
pub mod auth;
pub mod crypto;
pub mod image_search;
pub mod media_storage;
pub mod orders;

pub use ai_image::{AiImageClient, AiImageError};
pub use atvr::{AtvrClient, AtvrError};
pub use auth::{AuthError, AuthService, JwtKeys};
pub use crypto::{CryptoError, SecretCipher};
pub use image_search::{ImageSearchClient, ImageSearchError};
pub use media_storage::{MediaStorage, MediaStorageError};
pub use orders::{OrderError, OrderService};
