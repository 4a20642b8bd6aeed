//! Order Engine.
//!
//! Orchestrates order placement and status transitions: address capture,
//! inventory validation, price snapshotting, payment gating and the
//! inventory reconciliation driven by cancellation/reactivation. Every
//! operation runs inside a single database transaction; failure anywhere
//! unwinds the whole thing.

use chrono::{Datelike, Utc};
use rust_decimal::Decimal;
use sqlx::{Acquire, PgPool, Postgres, Transaction};
use tracing::{info, warn};
use validator::Validate;

use crate::domain::customer::{AddressDraft, GuestInfo};
use crate::domain::order::{
    order_total, price_line, transition_effect, InventoryEffect, LineDraft, OrderItemRequest,
};
use crate::domain::{Customer, CustomerAddress, Order, OrderItem, OrderNumber, OrderStatus, Product, Tenant};
use crate::payment::{CardDetails, MockGateway, PaymentReceipt};
use crate::{CommerceError, Result};

/// Bounded retries for order-number allocation; collisions only happen when
/// two orders for one tenant race within the same year-sequence window.
const ORDER_NUMBER_ATTEMPTS: u32 = 3;

/// Incoming order, already tenant- and customer-resolved by the API layer.
#[derive(Clone, Debug)]
pub struct OrderDraft {
    pub items: Vec<OrderItemRequest>,
    pub shipping_address: AddressDraft,
    pub payment: Option<CardDetails>,
}

/// A committed order together with its line items and, when payment was
/// part of the flow, the authorization receipt.
#[derive(Debug)]
pub struct PlacedOrder {
    pub order: Order,
    pub items: Vec<OrderItem>,
    pub receipt: Option<PaymentReceipt>,
}

#[derive(Clone)]
pub struct OrderEngine {
    pool: PgPool,
    gateway: MockGateway,
}

impl OrderEngine {
    pub fn new(pool: PgPool, gateway: MockGateway) -> Self {
        Self { pool, gateway }
    }

    pub async fn tenant_by_domain(&self, domain: &str) -> Result<Tenant> {
        sqlx::query_as::<_, Tenant>("SELECT * FROM tenants WHERE domain = $1")
            .bind(domain)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(CommerceError::StoreNotFound)
    }

    /// Resolve a customer by email within the tenant, creating a
    /// passwordless guest record when none exists. An existing customer,
    /// registered or guest, is returned untouched.
    pub async fn get_or_create_guest(&self, tenant_id: i64, info: &GuestInfo) -> Result<Customer> {
        info.validate()
            .map_err(|e| CommerceError::Validation(e.to_string()))?;

        if let Some(existing) = self.customer_by_email(tenant_id, &info.email).await? {
            return Ok(existing);
        }

        let inserted = sqlx::query_as::<_, Customer>(
            "INSERT INTO customers (email, hashed_password, first_name, last_name, phone, is_guest, tenant_id) \
             VALUES ($1, NULL, $2, $3, $4, TRUE, $5) \
             ON CONFLICT (tenant_id, email) DO NOTHING RETURNING *",
        )
        .bind(&info.email)
        .bind(&info.first_name)
        .bind(&info.last_name)
        .bind(&info.phone)
        .bind(tenant_id)
        .fetch_optional(&self.pool)
        .await?;

        match inserted {
            Some(customer) => {
                info!(tenant_id, email = %customer.email, "created guest customer");
                Ok(customer)
            }
            // Lost a concurrent creation race; the existing row wins.
            None => self
                .customer_by_email(tenant_id, &info.email)
                .await?
                .ok_or_else(|| {
                    CommerceError::Internal("guest customer vanished after conflict".to_string())
                }),
        }
    }

    async fn customer_by_email(&self, tenant_id: i64, email: &str) -> Result<Option<Customer>> {
        let customer = sqlx::query_as::<_, Customer>(
            "SELECT * FROM customers WHERE tenant_id = $1 AND email = $2",
        )
        .bind(tenant_id)
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(customer)
    }

    /// Place an order: capture the shipping address, validate inventory and
    /// snapshot prices, gate on payment authorization, persist the order
    /// with its items and decrement stock. One transaction end to end; a
    /// declined payment or any failure leaves no trace.
    pub async fn place_order(
        &self,
        tenant: &Tenant,
        customer_id: i64,
        draft: OrderDraft,
    ) -> Result<PlacedOrder> {
        validate_draft(&draft)?;

        let mut tx = self.pool.begin().await?;

        let address = sqlx::query_as::<_, CustomerAddress>(
            "INSERT INTO customer_addresses (customer_id, address_line1, address_line2, city, state, postal_code, country) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING *",
        )
        .bind(customer_id)
        .bind(&draft.shipping_address.address_line1)
        .bind(&draft.shipping_address.address_line2)
        .bind(&draft.shipping_address.city)
        .bind(&draft.shipping_address.state)
        .bind(&draft.shipping_address.postal_code)
        .bind(&draft.shipping_address.country)
        .fetch_one(&mut *tx)
        .await?;

        // Fetch, validate and price every line before touching anything
        // else. Products must belong to the requesting tenant.
        let mut priced: Vec<(Product, LineDraft)> = Vec::with_capacity(draft.items.len());
        for item in &draft.items {
            let product = sqlx::query_as::<_, Product>(
                "SELECT * FROM products WHERE id = $1 AND tenant_id = $2",
            )
            .bind(item.product_id)
            .bind(tenant.id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(CommerceError::ProductNotFound {
                product_id: item.product_id,
            })?;
            let line = price_line(&product, item.quantity)?;
            priced.push((product, line));
        }
        let lines: Vec<LineDraft> = priced.iter().map(|(_, l)| l.clone()).collect();
        let total = order_total(&lines);

        // Payment gates persistence: a decline aborts before any order
        // record or inventory mutation exists. Paid orders auto-confirm.
        let receipt = match &draft.payment {
            Some(card) => Some(
                self.gateway
                    .authorize(card, total)
                    .map_err(|decline| CommerceError::PaymentDeclined(decline.reason))?,
            ),
            None => None,
        };
        let status = if receipt.is_some() {
            OrderStatus::Confirmed
        } else {
            OrderStatus::Pending
        };

        let order = self
            .insert_numbered_order(&mut tx, tenant.id, customer_id, status, total, address.id)
            .await?;

        let mut items = Vec::with_capacity(priced.len());
        for (product, line) in &priced {
            let item = sqlx::query_as::<_, OrderItem>(
                "INSERT INTO order_items (order_id, product_id, quantity, unit_price, total_price) \
                 VALUES ($1, $2, $3, $4, $5) RETURNING *",
            )
            .bind(order.id)
            .bind(line.product_id)
            .bind(line.quantity)
            .bind(line.unit_price)
            .bind(line.total_price)
            .fetch_one(&mut *tx)
            .await?;
            items.push(item);

            // Floor-checked decrement: a concurrent order that drained the
            // stock between our read and this write makes it affect zero
            // rows, and the whole transaction unwinds.
            let affected = sqlx::query(
                "UPDATE products SET quantity = quantity - $1, updated_at = now() \
                 WHERE id = $2 AND tenant_id = $3 AND quantity >= $1",
            )
            .bind(line.quantity)
            .bind(line.product_id)
            .bind(tenant.id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

            if affected == 0 {
                let available: i32 =
                    sqlx::query_scalar("SELECT quantity FROM products WHERE id = $1")
                        .bind(line.product_id)
                        .fetch_one(&mut *tx)
                        .await?;
                return Err(CommerceError::InsufficientInventory {
                    product: product.name.clone(),
                    available,
                    requested: line.quantity,
                });
            }
        }

        tx.commit().await?;
        info!(
            order_number = %order.order_number,
            tenant_id = tenant.id,
            total = %order.total_amount,
            paid = receipt.is_some(),
            "order placed"
        );
        Ok(PlacedOrder {
            order,
            items,
            receipt,
        })
    }

    /// Allocate the tenant's next order number and insert the order row.
    ///
    /// The sequence is the count of the tenant's orders this calendar year
    /// plus one; the unique constraint on order_number catches concurrent
    /// allocations, and the insert retries under a savepoint with a fresh
    /// count.
    async fn insert_numbered_order(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        tenant_id: i64,
        customer_id: i64,
        status: OrderStatus,
        total: Decimal,
        shipping_address_id: i64,
    ) -> Result<Order> {
        let year = Utc::now().year();
        for attempt in 0..ORDER_NUMBER_ATTEMPTS {
            let count: i64 = sqlx::query_scalar(
                "SELECT COUNT(*) FROM orders WHERE tenant_id = $1 AND date_part('year', created_at)::int = $2",
            )
            .bind(tenant_id)
            .bind(year)
            .fetch_one(&mut **tx)
            .await?;
            let number = OrderNumber::generate(year, tenant_id, count + 1);

            let mut savepoint = tx.begin().await?;
            let inserted = sqlx::query_as::<_, Order>(
                "INSERT INTO orders (order_number, customer_id, tenant_id, status, total_amount, shipping_address_id) \
                 VALUES ($1, $2, $3, $4, $5, $6) RETURNING *",
            )
            .bind(number.as_str())
            .bind(customer_id)
            .bind(tenant_id)
            .bind(status)
            .bind(total)
            .bind(shipping_address_id)
            .fetch_one(&mut *savepoint)
            .await;

            match inserted {
                Ok(order) => {
                    savepoint.commit().await?;
                    return Ok(order);
                }
                Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                    savepoint.rollback().await?;
                    warn!(tenant_id, attempt, number = %number, "order number collision, retrying");
                }
                Err(e) => return Err(e.into()),
            }
        }
        Err(CommerceError::Internal(
            "order number allocation exhausted retries".to_string(),
        ))
    }

    /// Move an order to `next`, reconciling inventory where the transition
    /// demands it. Setting the current status again is a no-op. There is no
    /// transition table: any status may move to any other.
    ///
    /// Reconciliation is deliberately asymmetric with placement: creation
    /// hard-fails on inventory problems, while restoration and reactivation
    /// log a warning, skip the item and let the status change stand.
    pub async fn update_status(
        &self,
        order_id: i64,
        tenant_id: i64,
        next: OrderStatus,
    ) -> Result<Order> {
        let mut tx = self.pool.begin().await?;

        let order = sqlx::query_as::<_, Order>(
            "SELECT * FROM orders WHERE id = $1 AND tenant_id = $2",
        )
        .bind(order_id)
        .bind(tenant_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(CommerceError::OrderNotFound)?;

        if order.status == next {
            return Ok(order);
        }
        info!(order_number = %order.order_number, from = %order.status, to = %next, "order status transition");

        let items = sqlx::query_as::<_, OrderItem>(
            "SELECT * FROM order_items WHERE order_id = $1",
        )
        .bind(order.id)
        .fetch_all(&mut *tx)
        .await?;

        match transition_effect(order.status, next) {
            InventoryEffect::Restore => {
                for item in &items {
                    let affected = sqlx::query(
                        "UPDATE products SET quantity = quantity + $1, updated_at = now() \
                         WHERE id = $2 AND tenant_id = $3",
                    )
                    .bind(item.quantity)
                    .bind(item.product_id)
                    .bind(tenant_id)
                    .execute(&mut *tx)
                    .await?
                    .rows_affected();
                    if affected == 0 {
                        warn!(
                            product_id = item.product_id,
                            order_number = %order.order_number,
                            "could not restore inventory: product missing or tenant mismatch"
                        );
                    }
                }
            }
            InventoryEffect::Reserve => {
                for item in &items {
                    let affected = sqlx::query(
                        "UPDATE products SET quantity = quantity - $1, updated_at = now() \
                         WHERE id = $2 AND tenant_id = $3 AND quantity >= $1",
                    )
                    .bind(item.quantity)
                    .bind(item.product_id)
                    .bind(tenant_id)
                    .execute(&mut *tx)
                    .await?
                    .rows_affected();
                    if affected == 0 {
                        warn!(
                            product_id = item.product_id,
                            order_number = %order.order_number,
                            quantity = item.quantity,
                            "insufficient stock while reactivating order, leaving item under-reserved"
                        );
                    }
                }
            }
            InventoryEffect::None => {}
        }

        let updated = sqlx::query_as::<_, Order>(
            "UPDATE orders SET status = $1, updated_at = now() WHERE id = $2 RETURNING *",
        )
        .bind(next)
        .bind(order.id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(updated)
    }

    pub async fn list_orders(&self, tenant_id: i64, skip: i64, limit: i64) -> Result<Vec<Order>> {
        let orders = sqlx::query_as::<_, Order>(
            "SELECT * FROM orders WHERE tenant_id = $1 ORDER BY created_at DESC OFFSET $2 LIMIT $3",
        )
        .bind(tenant_id)
        .bind(skip)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(orders)
    }

    pub async fn get_order(&self, order_id: i64, tenant_id: i64) -> Result<(Order, Vec<OrderItem>)> {
        let order = sqlx::query_as::<_, Order>(
            "SELECT * FROM orders WHERE id = $1 AND tenant_id = $2",
        )
        .bind(order_id)
        .bind(tenant_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(CommerceError::OrderNotFound)?;
        let items = sqlx::query_as::<_, OrderItem>(
            "SELECT * FROM order_items WHERE order_id = $1",
        )
        .bind(order.id)
        .fetch_all(&self.pool)
        .await?;
        Ok((order, items))
    }
}

fn validate_draft(draft: &OrderDraft) -> Result<()> {
    if draft.items.is_empty() {
        return Err(CommerceError::Validation(
            "Order must contain at least one item".to_string(),
        ));
    }
    for item in &draft.items {
        item.validate()
            .map_err(|e| CommerceError::Validation(e.to_string()))?;
    }
    draft
        .shipping_address
        .validate()
        .map_err(|e| CommerceError::Validation(e.to_string()))?;
    Ok(())
}
