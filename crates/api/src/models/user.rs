//! User accounts.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use olfong_core::{Email, PageRequest, UserId, UserRole};

/// A user account (customer, admin or delivery driver).
///
/// The password hash is kept in the repository layer and never leaves it.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: UserId,
    pub email: Email,
    pub full_name: Option<String>,
    pub phone: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub role: UserRole,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Age in whole years on `today`, if the date of birth is known.
    #[must_use]
    pub fn age_on(&self, today: NaiveDate) -> Option<u32> {
        self.date_of_birth.and_then(|dob| today.years_since(dob))
    }

    /// Whether the user may buy a product with the given age restriction.
    #[must_use]
    pub fn meets_age(&self, restriction: i32, today: NaiveDate) -> bool {
        let Ok(required) = u32::try_from(restriction) else {
            return true;
        };
        self.age_on(today).is_some_and(|age| age >= required)
    }
}

/// Profile fields a user may change about themselves.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    pub full_name: Option<String>,
    pub phone: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
}

/// Filter for `GET /api/staff`.
#[derive(Debug, Clone, Default)]
pub struct StaffFilter {
    /// Matched against email, name and phone.
    pub search: Option<String>,
    /// ADMIN or DELIVERY; both when absent.
    pub role: Option<UserRole>,
    pub page: PageRequest,
}

/// Body of `POST /api/staff`.
///
/// Without a password a temporary one is generated and returned once.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StaffInput {
    pub email: String,
    pub full_name: String,
    pub phone: Option<String>,
    pub role: UserRole,
    pub password: Option<String>,
}

/// Body of `PUT /api/staff/{id}`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StaffUpdate {
    pub full_name: Option<String>,
    pub phone: Option<String>,
    pub role: Option<UserRole>,
    /// A new password, at least 8 characters.
    pub password: Option<String>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn user(dob: Option<NaiveDate>) -> User {
        User {
            id: UserId::new(1),
            email: Email::parse("jon@olfong.is").unwrap(),
            full_name: Some("Jón".to_string()),
            phone: None,
            date_of_birth: dob,
            role: UserRole::Customer,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_age_gate() {
        let today = NaiveDate::from_ymd_opt(2025, 6, 15).unwrap();
        let turns_20_tomorrow = user(NaiveDate::from_ymd_opt(2005, 6, 16));
        let turned_20_today = user(NaiveDate::from_ymd_opt(2005, 6, 15));

        assert!(!turns_20_tomorrow.meets_age(20, today));
        assert!(turned_20_today.meets_age(20, today));
        assert!(turns_20_tomorrow.meets_age(18, today));
        assert!(!user(None).meets_age(18, today));
    }

    #[test]
    fn test_serialization_omits_password() {
        let json = serde_json::to_value(user(None)).unwrap();
        assert_eq!(json["email"], "jon@olfong.is");
        assert_eq!(json["role"], "CUSTOMER");
        assert!(json.get("passwordHash").is_none());
    }
}
