//! Core types for Ölföng.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod discount;
pub mod email;
pub mod id;
pub mod locale;
pub mod media;
pub mod pagination;
pub mod status;
pub mod vat;

pub use discount::{DiscountError, discounted_price, is_discount_active, validate_window};
pub use email::{Email, EmailError};
pub use id::*;
pub use locale::Locale;
pub use media::{MediaCollection, extension_for};
pub use pagination::{PageRequest, Pagination};
pub use status::*;
pub use vat::{
    DEFAULT_VAT_RATE, OrderVat, VatBreakdown, VatInfo, VatLine, order_vat, round_isk,
    vat_breakdown,
};
