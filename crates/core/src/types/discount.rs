//! Percentage discounts on products and categories.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use super::vat::round_isk;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum DiscountError {
    #[error("discount percentage must be between 0 and 100, got {0}")]
    InvalidPercentage(Decimal),
    #[error("original price cannot be negative")]
    NegativePrice,
    #[error("discount start date must be before the end date")]
    InvertedWindow,
}

/// Price after taking `percentage` percent off `original`.
///
/// # Errors
///
/// Returns an error if `original` is negative or `percentage` is outside
/// `0..=100`.
pub fn discounted_price(original: Decimal, percentage: Decimal) -> Result<Decimal, DiscountError> {
    if original.is_sign_negative() {
        return Err(DiscountError::NegativePrice);
    }
    if percentage.is_sign_negative() || percentage > Decimal::ONE_HUNDRED {
        return Err(DiscountError::InvalidPercentage(percentage));
    }
    Ok(round_isk(
        original * (Decimal::ONE - percentage / Decimal::ONE_HUNDRED),
    ))
}

/// Check that an optional discount window is well-formed.
///
/// # Errors
///
/// Returns [`DiscountError::InvertedWindow`] if both bounds are set and the
/// start is after the end.
pub fn validate_window(
    start: Option<DateTime<Utc>>,
    end: Option<DateTime<Utc>>,
) -> Result<(), DiscountError> {
    match (start, end) {
        (Some(s), Some(e)) if s > e => Err(DiscountError::InvertedWindow),
        _ => Ok(()),
    }
}

/// Whether `now` falls inside the (inclusive, open-ended) window.
#[must_use]
pub fn is_discount_active(
    start: Option<DateTime<Utc>>,
    end: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> bool {
    start.is_none_or(|s| s <= now) && end.is_none_or(|e| now <= e)
}
