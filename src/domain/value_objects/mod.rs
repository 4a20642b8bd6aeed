//! Value objects shared across the domain.

use std::fmt;

/// Human-readable order number, unique per platform.
///
/// Format: `ORD-{year}-{tenant:03}-{sequence:04}`, where sequence is the
/// count of the tenant's orders in the current calendar year plus one.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct OrderNumber(String);

impl OrderNumber {
    pub fn generate(year: i32, tenant_id: i64, sequence: i64) -> Self {
        Self(format!("ORD-{:04}-{:03}-{:04}", year, tenant_id, sequence))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OrderNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
