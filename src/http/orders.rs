//! Tenant-admin order endpoints.

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::domain::{Order, OrderItem, OrderStatus};
use crate::http::auth::AuthContext;
use crate::{AppState, CommerceError, Result};

#[derive(Debug, Deserialize)]
pub struct PageParams {
    pub skip: Option<i64>,
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct OrderDetail {
    #[serde(flatten)]
    pub order: Order,
    pub order_items: Vec<OrderItem>,
}

#[derive(Debug, Deserialize)]
pub struct OrderStatusUpdate {
    pub status: OrderStatus,
}

pub async fn list_orders(
    State(state): State<AppState>,
    auth: AuthContext,
    Query(params): Query<PageParams>,
) -> Result<Json<Vec<Order>>> {
    if !auth.role.can_manage_orders() {
        return Err(CommerceError::Forbidden);
    }
    let skip = params.skip.unwrap_or(0).max(0);
    let limit = params.limit.unwrap_or(100).clamp(1, 100);
    let orders = state.engine.list_orders(auth.tenant_id, skip, limit).await?;
    Ok(Json(orders))
}

pub async fn get_order(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(order_id): Path<i64>,
) -> Result<Json<OrderDetail>> {
    if !auth.role.can_manage_orders() {
        return Err(CommerceError::Forbidden);
    }
    let (order, order_items) = state.engine.get_order(order_id, auth.tenant_id).await?;
    Ok(Json(OrderDetail { order, order_items }))
}

pub async fn update_status(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(order_id): Path<i64>,
    Json(update): Json<OrderStatusUpdate>,
) -> Result<Json<Order>> {
    if !auth.role.can_manage_orders() {
        return Err(CommerceError::Forbidden);
    }
    let order = state
        .engine
        .update_status(order_id, auth.tenant_id, update.status)
        .await?;
    Ok(Json(order))
}
