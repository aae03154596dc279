//! VAT arithmetic on VAT-inclusive ISK prices.
//!
//! Shelf prices already contain VAT. The breakdown extracts the tax portion
//! from a gross amount instead of adding tax on top.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// Standard Icelandic VAT rate, used when no profile applies.
pub const DEFAULT_VAT_RATE: Decimal = Decimal::from_parts(24, 0, 0, false, 0);

/// Round to two decimals, midpoint away from zero.
#[must_use]
pub fn round_isk(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Split of a VAT-inclusive amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VatBreakdown {
    pub total_incl_vat: Decimal,
    pub vat_rate: Decimal,
    pub amount_before_vat: Decimal,
    pub vat_amount: Decimal,
}

impl VatBreakdown {
    const fn zero(rate: Decimal) -> Self {
        Self {
            total_incl_vat: Decimal::ZERO,
            vat_rate: rate,
            amount_before_vat: Decimal::ZERO,
            vat_amount: Decimal::ZERO,
        }
    }
}

/// Extract the VAT from `total_incl_vat` at `rate` percent.
///
/// A negative total or a rate outside `0..=100` yields an all-zero breakdown.
///
/// ```
/// use olfong_core::vat_breakdown;
/// use rust_decimal::Decimal;
///
/// let b = vat_breakdown(Decimal::from(1240), Decimal::from(24));
/// assert_eq!(b.amount_before_vat, Decimal::from(1000));
/// assert_eq!(b.vat_amount, Decimal::from(240));
/// ```
#[must_use]
pub fn vat_breakdown(total_incl_vat: Decimal, rate: Decimal) -> VatBreakdown {
    if total_incl_vat.is_sign_negative() || rate.is_sign_negative() || rate > Decimal::ONE_HUNDRED
    {
        return VatBreakdown::zero(rate);
    }

    let divisor = Decimal::ONE + rate / Decimal::ONE_HUNDRED;
    let before = total_incl_vat / divisor;

    VatBreakdown {
        total_incl_vat: round_isk(total_incl_vat),
        vat_rate: rate,
        amount_before_vat: round_isk(before),
        vat_amount: round_isk(total_incl_vat - before),
    }
}

/// One order line as seen by the VAT calculation.
#[derive(Debug, Clone, Copy)]
pub struct VatLine {
    pub unit_price: Decimal,
    pub quantity: i32,
    pub vat_rate: Decimal,
}

/// Totals of an order's lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderVat {
    /// Sum of `unit_price × quantity` (VAT included).
    pub items_total: Decimal,
    /// Sum of the per-line VAT portions.
    pub tax_amount: Decimal,
    /// `items_total − tax_amount`.
    pub subtotal_before_vat: Decimal,
}

/// Sum per-line VAT breakdowns for a mixed-rate order.
#[must_use]
pub fn order_vat<I>(lines: I) -> OrderVat
where
    I: IntoIterator<Item = VatLine>,
{
    let (items_total, tax_amount) =
        lines
            .into_iter()
            .fold((Decimal::ZERO, Decimal::ZERO), |(total, tax), line| {
                let gross = line.unit_price * Decimal::from(line.quantity);
                let breakdown = vat_breakdown(gross, line.vat_rate);
                (total + gross, tax + breakdown.vat_amount)
            });

    let items_total = round_isk(items_total);
    let tax_amount = round_isk(tax_amount);
    OrderVat {
        items_total,
        tax_amount,
        subtotal_before_vat: items_total - tax_amount,
    }
}

/// Display metadata for a rate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VatInfo {
    pub rate: Decimal,
    pub label: String,
    pub currency: &'static str,
}

impl VatInfo {
    #[must_use]
    pub fn new(rate: Decimal) -> Self {
        Self {
            rate,
            label: format!("{}% VAT", rate.normalize()),
            currency: "ISK",
        }
    }
}
