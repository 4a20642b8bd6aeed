//! Storefront endpoints, tenant-resolved by the `:tenant_domain` path
//! segment.

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Deserialize;
use serde_json::json;

use crate::domain::customer::{AddressDraft, GuestInfo};
use crate::domain::order::OrderItemRequest;
use crate::domain::{Product, Role};
use crate::engine::{OrderDraft, PlacedOrder};
use crate::http::auth::AuthContext;
use crate::payment::CardDetails;
use crate::{AppState, CommerceError, Result};

#[derive(Debug, Deserialize)]
pub struct ListParams {
    pub skip: Option<i64>,
    pub limit: Option<i64>,
    pub category: Option<String>,
}

pub async fn list_products(
    State(state): State<AppState>,
    Path(tenant_domain): Path<String>,
    Query(params): Query<ListParams>,
) -> Result<Json<Vec<Product>>> {
    let tenant = state.engine.tenant_by_domain(&tenant_domain).await?;
    let skip = params.skip.unwrap_or(0).max(0);
    let limit = params.limit.unwrap_or(100).clamp(1, 100);

    // Storefront listings only show in-stock items.
    let products = match params.category {
        Some(category) => {
            sqlx::query_as::<_, Product>(
                "SELECT * FROM products WHERE tenant_id = $1 AND category = $2 AND quantity > 0 \
                 ORDER BY name OFFSET $3 LIMIT $4",
            )
            .bind(tenant.id)
            .bind(category)
            .bind(skip)
            .bind(limit)
            .fetch_all(&state.db)
            .await?
        }
        None => {
            sqlx::query_as::<_, Product>(
                "SELECT * FROM products WHERE tenant_id = $1 AND quantity > 0 \
                 ORDER BY name OFFSET $2 LIMIT $3",
            )
            .bind(tenant.id)
            .bind(skip)
            .bind(limit)
            .fetch_all(&state.db)
            .await?
        }
    };
    Ok(Json(products))
}

pub async fn get_product(
    State(state): State<AppState>,
    Path((tenant_domain, product_id)): Path<(String, i64)>,
) -> Result<Json<Product>> {
    let tenant = state.engine.tenant_by_domain(&tenant_domain).await?;
    let product = sqlx::query_as::<_, Product>(
        "SELECT * FROM products WHERE id = $1 AND tenant_id = $2",
    )
    .bind(product_id)
    .bind(tenant.id)
    .fetch_optional(&state.db)
    .await?
    .ok_or(CommerceError::ProductNotFound { product_id })?;
    Ok(Json(product))
}

#[derive(Debug, Deserialize)]
pub struct OrderRequest {
    pub items: Vec<OrderItemRequest>,
    pub shipping_address: AddressDraft,
    pub payment: CardDetails,
}

#[derive(Debug, Deserialize)]
pub struct GuestOrderRequest {
    pub items: Vec<OrderItemRequest>,
    pub shipping_address: AddressDraft,
    pub payment: CardDetails,
    pub customer_info: GuestInfo,
}

fn placed_order_response(placed: PlacedOrder) -> Json<serde_json::Value> {
    Json(json!({
        "success": true,
        "order": placed.order,
        "items": placed.items,
        "payment": placed.receipt,
        "message": "Order placed successfully!"
    }))
}

/// Place an order as an authenticated customer.
pub async fn create_order(
    State(state): State<AppState>,
    Path(tenant_domain): Path<String>,
    auth: AuthContext,
    Json(request): Json<OrderRequest>,
) -> Result<Json<serde_json::Value>> {
    let tenant = state.engine.tenant_by_domain(&tenant_domain).await?;
    if auth.role != Role::Customer {
        return Err(CommerceError::Forbidden);
    }
    let customer_id = auth.customer_id.ok_or(CommerceError::Unauthorized)?;
    if auth.tenant_id != tenant.id {
        return Err(CommerceError::Forbidden);
    }

    let placed = state
        .engine
        .place_order(
            &tenant,
            customer_id,
            OrderDraft {
                items: request.items,
                shipping_address: request.shipping_address,
                payment: Some(request.payment),
            },
        )
        .await?;
    Ok(placed_order_response(placed))
}

/// Guest checkout: resolves or creates a guest customer by email, then
/// places the order.
pub async fn create_guest_order(
    State(state): State<AppState>,
    Path(tenant_domain): Path<String>,
    Json(request): Json<GuestOrderRequest>,
) -> Result<Json<serde_json::Value>> {
    let tenant = state.engine.tenant_by_domain(&tenant_domain).await?;
    let customer = state
        .engine
        .get_or_create_guest(tenant.id, &request.customer_info)
        .await?;

    let placed = state
        .engine
        .place_order(
            &tenant,
            customer.id,
            OrderDraft {
                items: request.items,
                shipping_address: request.shipping_address,
                payment: Some(request.payment),
            },
        )
        .await?;
    Ok(placed_order_response(placed))
}
