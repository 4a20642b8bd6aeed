//! Orders, line items and the status state machine.
//!
//! Pricing and transition planning are pure functions here; the engine
//! applies their results inside a single database transaction.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::domain::product::Product;
use crate::{CommerceError, Result};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "order_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Confirmed,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::Processing => "processing",
            Self::Shipped => "shipped",
            Self::Delivered => "delivered",
            Self::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, sqlx::FromRow)]
pub struct Order {
    pub id: i64,
    pub order_number: String,
    pub customer_id: i64,
    pub tenant_id: i64,
    pub status: OrderStatus,
    pub total_amount: Decimal,
    pub shipping_address_id: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One product+quantity entry within an order. `unit_price` is snapshotted
/// from the product at order time, so later price changes never alter the
/// historical order value. Immutable after creation.
#[derive(Clone, Debug, Serialize, Deserialize, sqlx::FromRow)]
pub struct OrderItem {
    pub id: i64,
    pub order_id: i64,
    pub product_id: i64,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub total_price: Decimal,
}

/// Requested line in an incoming order.
#[derive(Clone, Debug, Deserialize, Validate)]
pub struct OrderItemRequest {
    pub product_id: i64,
    #[validate(range(min = 1))]
    pub quantity: i32,
}

/// A priced line, ready to persist: stock has been checked against the
/// product and the unit price snapshotted.
#[derive(Clone, Debug, PartialEq)]
pub struct LineDraft {
    pub product_id: i64,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub total_price: Decimal,
}

/// Price one requested line against the product's current state.
///
/// Fails with `InsufficientInventory` when the request exceeds stock; the
/// error carries the product name and both counts for the caller.
pub fn price_line(product: &Product, requested: i32) -> Result<LineDraft> {
    if product.quantity < requested {
        return Err(CommerceError::InsufficientInventory {
            product: product.name.clone(),
            available: product.quantity,
            requested,
        });
    }
    let unit_price = product.price;
    let total_price = unit_price * Decimal::from(requested);
    Ok(LineDraft {
        product_id: product.id,
        quantity: requested,
        unit_price,
        total_price,
    })
}

/// Grand total of an order: the sum of its line totals.
pub fn order_total(lines: &[LineDraft]) -> Decimal {
    lines.iter().map(|l| l.total_price).sum()
}

/// Inventory side effect implied by a status transition.
///
/// Any non-cancelled state moving to cancelled releases reserved stock;
/// moving out of cancelled into an active fulfilment state re-reserves it.
/// Every other transition is a pure status write.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InventoryEffect {
    None,
    Restore,
    Reserve,
}

pub fn transition_effect(previous: OrderStatus, next: OrderStatus) -> InventoryEffect {
    use OrderStatus::*;
    match (previous, next) {
        (p, n) if p == n => InventoryEffect::None,
        (p, Cancelled) if p != Cancelled => InventoryEffect::Restore,
        (Cancelled, Confirmed | Processing | Shipped) => InventoryEffect::Reserve,
        _ => InventoryEffect::None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn product(id: i64, name: &str, price: Decimal, quantity: i32) -> Product {
        Product {
            id,
            name: name.into(),
            description: None,
            price,
            quantity,
            category: "General".into(),
            tenant_id: 1,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_line_total_is_price_times_quantity() {
        let p = product(1, "Widget", Decimal::new(1250, 2), 10);
        let line = price_line(&p, 3).unwrap();
        assert_eq!(line.unit_price, Decimal::new(1250, 2));
        assert_eq!(line.total_price, Decimal::new(3750, 2));
    }

    #[test]
    fn test_order_total_matches_sum_of_lines() {
        let a = product(1, "A", Decimal::new(1000, 2), 5);
        let b = product(2, "B", Decimal::new(250, 2), 5);
        let lines = vec![price_line(&a, 2).unwrap(), price_line(&b, 4).unwrap()];
        assert_eq!(order_total(&lines), Decimal::new(3000, 2));
        let item_sum: Decimal = lines
            .iter()
            .map(|l| l.unit_price * Decimal::from(l.quantity))
            .sum();
        assert_eq!(order_total(&lines), item_sum);
    }

    #[test]
    fn test_insufficient_inventory_reports_counts() {
        // Stock 5, first order of 3 succeeds and leaves 2; a second order
        // of 3 must fail naming available=2, requested=3.
        let mut p = product(1, "Widget", Decimal::new(500, 2), 5);
        let line = price_line(&p, 3).unwrap();
        p.quantity -= line.quantity;
        assert_eq!(p.quantity, 2);

        match price_line(&p, 3) {
            Err(CommerceError::InsufficientInventory {
                product,
                available,
                requested,
            }) => {
                assert_eq!(product, "Widget");
                assert_eq!(available, 2);
                assert_eq!(requested, 3);
            }
            other => panic!("expected InsufficientInventory, got {:?}", other),
        }
    }

    #[test]
    fn test_exact_stock_is_accepted() {
        let p = product(1, "Widget", Decimal::ONE, 3);
        assert!(price_line(&p, 3).is_ok());
    }

    #[test]
    fn test_same_status_has_no_effect() {
        for s in [
            OrderStatus::Pending,
            OrderStatus::Confirmed,
            OrderStatus::Cancelled,
        ] {
            assert_eq!(transition_effect(s, s), InventoryEffect::None);
        }
    }

    #[test]
    fn test_cancellation_restores_from_any_active_state() {
        for s in [
            OrderStatus::Pending,
            OrderStatus::Confirmed,
            OrderStatus::Processing,
            OrderStatus::Shipped,
            OrderStatus::Delivered,
        ] {
            assert_eq!(
                transition_effect(s, OrderStatus::Cancelled),
                InventoryEffect::Restore
            );
        }
    }

    #[test]
    fn test_reactivation_reserves() {
        for s in [
            OrderStatus::Confirmed,
            OrderStatus::Processing,
            OrderStatus::Shipped,
        ] {
            assert_eq!(
                transition_effect(OrderStatus::Cancelled, s),
                InventoryEffect::Reserve
            );
        }
        // Leaving cancelled for pending or delivered re-reserves nothing.
        assert_eq!(
            transition_effect(OrderStatus::Cancelled, OrderStatus::Pending),
            InventoryEffect::None
        );
        assert_eq!(
            transition_effect(OrderStatus::Cancelled, OrderStatus::Delivered),
            InventoryEffect::None
        );
    }

    #[test]
    fn test_plain_transitions_leave_inventory_alone() {
        assert_eq!(
            transition_effect(OrderStatus::Pending, OrderStatus::Confirmed),
            InventoryEffect::None
        );
        assert_eq!(
            transition_effect(OrderStatus::Confirmed, OrderStatus::Processing),
            InventoryEffect::None
        );
        assert_eq!(
            transition_effect(OrderStatus::Shipped, OrderStatus::Delivered),
            InventoryEffect::None
        );
    }

    #[test]
    fn test_cancel_restores_each_line_exactly() {
        // Two items (qty 3 and 1) against stock (2, 10): after the cancel
        // restoration the stock becomes (5, 11).
        let items = vec![(1i64, 3i32), (2, 1)];
        let mut stock: HashMap<i64, i32> = HashMap::from([(1, 2), (2, 10)]);

        assert_eq!(
            transition_effect(OrderStatus::Confirmed, OrderStatus::Cancelled),
            InventoryEffect::Restore
        );
        for (product_id, qty) in &items {
            *stock.get_mut(product_id).unwrap() += qty;
        }
        assert_eq!(stock[&1], 5);
        assert_eq!(stock[&2], 11);
    }
}
