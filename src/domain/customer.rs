//! Customer directory: registered customers and checkout-time guests.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// A tenant-scoped customer. Guests are created at checkout with no
/// password; a registered customer is never downgraded to a guest.
#[derive(Clone, Debug, Serialize, sqlx::FromRow)]
pub struct Customer {
    pub id: i64,
    pub email: String,
    #[serde(skip_serializing)]
    pub hashed_password: Option<String>,
    pub first_name: String,
    pub last_name: String,
    pub phone: Option<String>,
    pub is_guest: bool,
    pub tenant_id: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Serialize, sqlx::FromRow)]
pub struct CustomerAddress {
    pub id: i64,
    pub customer_id: i64,
    pub address_line1: String,
    pub address_line2: Option<String>,
    pub city: String,
    pub state: String,
    pub postal_code: String,
    pub country: String,
    pub is_default: bool,
    pub created_at: DateTime<Utc>,
}

/// Identity supplied with a guest order; no password involved.
#[derive(Clone, Debug, Deserialize, Validate)]
pub struct GuestInfo {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1))]
    pub first_name: String,
    #[validate(length(min = 1))]
    pub last_name: String,
    pub phone: Option<String>,
}

/// Shipping address captured fresh with every order.
#[derive(Clone, Debug, Deserialize, Validate)]
pub struct AddressDraft {
    #[validate(length(min = 1))]
    pub address_line1: String,
    pub address_line2: Option<String>,
    #[validate(length(min = 1))]
    pub city: String,
    pub state: String,
    pub postal_code: String,
    #[serde(default = "default_country")]
    pub country: String,
}

fn default_country() -> String {
    "United States".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guest_info_requires_valid_email() {
        let info = GuestInfo {
            email: "not-an-email".into(),
            first_name: "Ada".into(),
            last_name: "Lovelace".into(),
            phone: None,
        };
        assert!(info.validate().is_err());
    }

    #[test]
    fn test_address_defaults_country() {
        let draft: AddressDraft = serde_json::from_value(serde_json::json!({
            "address_line1": "1 Main St",
            "city": "Springfield",
            "state": "IL",
            "postal_code": "62701"
        }))
        .unwrap();
        assert_eq!(draft.country, "United States");
    }
}
