//! HTTP surface: thin request/response mapping over the order engine.

use axum::routing::{get, post, put};
use axum::{Json, Router};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::AppState;

pub mod auth;
pub mod orders;
pub mod store;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/store/:tenant_domain/products", get(store::list_products))
        .route(
            "/store/:tenant_domain/products/:product_id",
            get(store::get_product),
        )
        .route("/store/:tenant_domain/orders", post(store::create_order))
        .route(
            "/store/:tenant_domain/orders/guest",
            post(store::create_guest_order),
        )
        .route("/orders", get(orders::list_orders))
        .route("/orders/:order_id", get(orders::get_order))
        .route("/orders/:order_id/status", put(orders::update_status))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "healthy", "service": "tenant-commerce" }))
}
