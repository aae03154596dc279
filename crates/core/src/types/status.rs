//! Status and kind enums for various entities.
//!
//! On the wire these use the upper-case names the web client expects
//! (`PENDING`, `OUT_FOR_DELIVERY`); in `PostgreSQL` they map to snake_case enum
//! types created by the migrations.

use serde::{Deserialize, Serialize};

/// Account role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "user_role", rename_all = "snake_case")
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserRole {
    /// Storefront customer.
    #[default]
    Customer,
    /// Back-office administrator.
    Admin,
    /// Driver who can update the orders assigned to them.
    Delivery,
}

impl UserRole {
    /// Whether this role may use the back-office.
    #[must_use]
    pub const fn is_admin(self) -> bool {
        matches!(self, Self::Admin)
    }

    /// Whether this role may work on orders (admins and drivers).
    #[must_use]
    pub const fn is_staff(self) -> bool {
        matches!(self, Self::Admin | Self::Delivery)
    }
}

impl std::fmt::Display for UserRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Customer => write!(f, "CUSTOMER"),
            Self::Admin => write!(f, "ADMIN"),
            Self::Delivery => write!(f, "DELIVERY"),
        }
    }
}

impl std::str::FromStr for UserRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "CUSTOMER" => Ok(Self::Customer),
            "ADMIN" => Ok(Self::Admin),
            "DELIVERY" => Ok(Self::Delivery),
            _ => Err(format!("invalid user role: {s}")),
        }
    }
}

/// Order lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "order_status", rename_all = "snake_case")
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    #[default]
    Pending,
    Confirmed,
    Preparing,
    OutForDelivery,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    /// All statuses in lifecycle order.
    pub const ALL: [Self; 6] = [
        Self::Pending,
        Self::Confirmed,
        Self::Preparing,
        Self::OutForDelivery,
        Self::Delivered,
        Self::Cancelled,
    ];

    /// Statuses reachable from `self` in one step.
    #[must_use]
    pub const fn next_statuses(self) -> &'static [Self] {
        match self {
            Self::Pending => &[Self::Confirmed, Self::Cancelled],
            Self::Confirmed => &[Self::Preparing, Self::Cancelled],
            Self::Preparing => &[Self::OutForDelivery, Self::Cancelled],
            Self::OutForDelivery => &[Self::Delivered],
            Self::Delivered | Self::Cancelled => &[],
        }
    }

    /// Whether an order in `self` may move to `next`.
    #[must_use]
    pub fn can_transition_to(self, next: Self) -> bool {
        self.next_statuses().contains(&next)
    }

    /// Terminal statuses accept no further transitions.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Delivered | Self::Cancelled)
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Pending => "PENDING",
            Self::Confirmed => "CONFIRMED",
            Self::Preparing => "PREPARING",
            Self::OutForDelivery => "OUT_FOR_DELIVERY",
            Self::Delivered => "DELIVERED",
            Self::Cancelled => "CANCELLED",
        };
        f.write_str(s)
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_ascii_uppercase();
        Self::ALL
            .into_iter()
            .find(|status| status.to_string() == upper)
            .ok_or_else(|| format!("invalid order status: {s}"))
    }
}

/// Payment state of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "payment_status", rename_all = "snake_case")
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    #[default]
    Pending,
    Completed,
    Failed,
}

/// How the customer pays for an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    /// Card payment through the Valitor gateway.
    #[default]
    Valitor,
    /// Card payment through the Rapyd gateway.
    Rapyd,
    /// Cash handed to the driver; delivery orders only.
    CashOnDelivery,
    /// Paid at the counter; pickup orders only.
    PayOnPickup,
}

impl PaymentMethod {
    /// Offline methods are settled by staff when the order is handed over.
    #[must_use]
    pub const fn is_offline(self) -> bool {
        matches!(self, Self::CashOnDelivery | Self::PayOnPickup)
    }

    /// Stored label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Valitor => "valitor",
            Self::Rapyd => "rapyd",
            Self::CashOnDelivery => "cash_on_delivery",
            Self::PayOnPickup => "pay_on_pickup",
        }
    }
}

impl std::str::FromStr for PaymentMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "valitor" => Ok(Self::Valitor),
            "rapyd" => Ok(Self::Rapyd),
            "cash_on_delivery" => Ok(Self::CashOnDelivery),
            "pay_on_pickup" => Ok(Self::PayOnPickup),
            _ => Err(format!("invalid payment method: {s}")),
        }
    }
}

/// Publication state of a CMS page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "page_status", rename_all = "snake_case")
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PageStatus {
    #[default]
    Draft,
    Published,
}

/// Kind of shipping option.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "shipping_type", rename_all = "snake_case")
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ShippingType {
    /// Delivered to the customer's address.
    #[default]
    Delivery,
    /// Collected by the customer in store.
    Pickup,
}

/// Supported payment processors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "gateway_provider", rename_all = "lowercase")
)]
#[serde(rename_all = "lowercase")]
pub enum GatewayProvider {
    Valitor,
    Rapyd,
    Stripe,
    Paypal,
    Netgiro,
}

impl std::str::FromStr for GatewayProvider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "valitor" => Ok(Self::Valitor),
            "rapyd" => Ok(Self::Rapyd),
            "stripe" => Ok(Self::Stripe),
            "paypal" => Ok(Self::Paypal),
            "netgiro" => Ok(Self::Netgiro),
            _ => Err(format!("invalid payment provider: {s}")),
        }
    }
}

/// Payment gateway environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "gateway_environment", rename_all = "lowercase")
)]
#[serde(rename_all = "lowercase")]
pub enum GatewayEnvironment {
    #[default]
    Sandbox,
    Production,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_order_status_transitions() {
        use OrderStatus::*;

        assert!(Pending.can_transition_to(Confirmed));
        assert!(Pending.can_transition_to(Cancelled));
        assert!(!Pending.can_transition_to(Delivered));
        assert!(Confirmed.can_transition_to(Preparing));
        assert!(Preparing.can_transition_to(OutForDelivery));
        assert!(OutForDelivery.can_transition_to(Delivered));
        assert!(!OutForDelivery.can_transition_to(Cancelled));

        for status in [Delivered, Cancelled] {
            assert!(status.is_terminal());
            for next in OrderStatus::ALL {
                assert!(!status.can_transition_to(next));
            }
        }
    }

    #[test]
    fn test_order_status_wire_format() {
        let json = serde_json::to_string(&OrderStatus::OutForDelivery).unwrap();
        assert_eq!(json, "\"OUT_FOR_DELIVERY\"");
        assert_eq!(
            "out_for_delivery".parse::<OrderStatus>().unwrap(),
            OrderStatus::OutForDelivery
        );
        assert!("shipped".parse::<OrderStatus>().is_err());
    }

    #[test]
    fn test_user_role_permissions() {
        assert!(UserRole::Admin.is_admin());
        assert!(UserRole::Admin.is_staff());
        assert!(UserRole::Delivery.is_staff());
        assert!(!UserRole::Delivery.is_admin());
        assert!(!UserRole::Customer.is_staff());
        assert_eq!("admin".parse::<UserRole>().unwrap(), UserRole::Admin);
    }

    #[test]
    fn test_payment_method_parsing() {
        let method: PaymentMethod = serde_json::from_str("\"cash_on_delivery\"").unwrap();
        assert!(method.is_offline());
        assert!(!PaymentMethod::Valitor.is_offline());
        assert_eq!(
            "pay_on_pickup".parse::<PaymentMethod>().unwrap(),
            PaymentMethod::PayOnPickup
        );
    }

    #[test]
    fn test_gateway_provider_parsing() {
        assert_eq!(
            "Netgiro".parse::<GatewayProvider>().unwrap(),
            GatewayProvider::Netgiro
        );
        assert!("adyen".parse::<GatewayProvider>().is_err());
        let json = serde_json::to_string(&GatewayEnvironment::Production).unwrap();
        assert_eq!(json, "\"production\"");
    }
}
