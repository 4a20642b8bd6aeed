//! Tenant (store) records and platform roles.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Serialize, Deserialize, sqlx::FromRow)]
pub struct Tenant {
    pub id: i64,
    pub name: String,
    pub domain: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Access role attached to an authenticated request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "user_role", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Role {
    SuperAdmin,
    TenantAdmin,
    Customer,
}

impl Role {
    /// Roles allowed to manage a tenant's orders.
    pub fn can_manage_orders(self) -> bool {
        matches!(self, Role::SuperAdmin | Role::TenantAdmin)
    }
}

impl std::str::FromStr for Role {
    type Err = ();

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "super_admin" => Ok(Role::SuperAdmin),
            "tenant_admin" => Ok(Role::TenantAdmin),
            "customer" => Ok(Role::Customer),
            _ => Err(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_parsing() {
        assert_eq!("tenant_admin".parse::<Role>(), Ok(Role::TenantAdmin));
        assert!("root".parse::<Role>().is_err());
    }

    #[test]
    fn test_order_management_roles() {
        assert!(Role::SuperAdmin.can_manage_orders());
        assert!(Role::TenantAdmin.can_manage_orders());
        assert!(!Role::Customer.can_manage_orders());
    }
}
