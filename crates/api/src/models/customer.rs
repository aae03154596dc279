//! Customer accounts as seen from the back office.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use olfong_core::{PageRequest, UserId};

use super::Order;

/// More orders than this makes a customer `vip`.
pub const VIP_ORDER_COUNT: i64 = 10;

/// A customer whose last order is older than this is `inactive`.
pub const INACTIVE_AFTER_MONTHS: i32 = 3;

/// Activity bucket derived from a customer's orders.
///
/// Checked in order: `inactive` (last order too old), `vip`, `active`
/// (any order), `new`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CustomerStatus {
    New,
    Active,
    Vip,
    Inactive,
}

impl CustomerStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::New => "new",
            Self::Active => "active",
            Self::Vip => "vip",
            Self::Inactive => "inactive",
        }
    }
}

impl std::str::FromStr for CustomerStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "new" => Ok(Self::New),
            "active" => Ok(Self::Active),
            "vip" => Ok(Self::Vip),
            "inactive" => Ok(Self::Inactive),
            other => Err(format!("unknown customer status: {other}")),
        }
    }
}

/// A customer with their order statistics.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerSummary {
    pub id: UserId,
    pub email: String,
    pub full_name: Option<String>,
    pub phone: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub total_orders: i64,
    /// Sum of non-cancelled order totals, ISK.
    pub total_spent: Decimal,
    pub last_order: Option<DateTime<Utc>>,
    pub last_delivery_address: Option<String>,
    pub status: CustomerStatus,
    #[serde(rename = "joinDate")]
    pub joined_at: DateTime<Utc>,
}

/// `GET /api/customers/{id}`: the summary plus recent orders.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerDetail {
    #[serde(flatten)]
    pub customer: CustomerSummary,
    pub orders: Vec<Order>,
}

#[derive(Debug, Clone, Default)]
pub struct CustomerFilter {
    /// Matched against email, name and phone.
    pub search: Option<String>,
    pub status: Option<CustomerStatus>,
    pub page: PageRequest,
}
