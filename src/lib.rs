//! Tenant Commerce Platform
//!
//! Multi-tenant storefront backend: each tenant (store) owns its products,
//! customers and orders, partitioned by tenant id.
//!
//! ## Features
//! - Tenant-scoped product catalog
//! - Customer and guest checkout
//! - Order placement with inventory reservation
//! - Status-transition-driven inventory reconciliation
//! - Mock payment authorization

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;

pub mod config;
pub mod domain;
pub mod engine;
pub mod http;
pub mod payment;

pub use config::Config;
pub use engine::OrderEngine;

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub db: sqlx::PgPool,
    pub engine: OrderEngine,
}

// =============================================================================
// Error Types
// =============================================================================

#[derive(Error, Debug)]
pub enum CommerceError {
    #[error("Product {product_id} not found")]
    ProductNotFound { product_id: i64 },

    #[error("Insufficient inventory for {product}. Available: {available}, Requested: {requested}")]
    InsufficientInventory {
        product: String,
        available: i32,
        requested: i32,
    },

    #[error("{0}")]
    PaymentDeclined(String),

    #[error("Order not found")]
    OrderNotFound,

    #[error("Store not found")]
    StoreNotFound,

    #[error("Missing or invalid credentials")]
    Unauthorized,

    #[error("Customer not authorized for this store")]
    Forbidden,

    #[error("{0}")]
    Validation(String),

    #[error("Storage error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("{0}")]
    Internal(String),
}

impl CommerceError {
    fn status(&self) -> StatusCode {
        match self {
            Self::ProductNotFound { .. }
            | Self::InsufficientInventory { .. }
            | Self::PaymentDeclined(_)
            | Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::OrderNotFound | Self::StoreNotFound => StatusCode::NOT_FOUND,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::Database(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for CommerceError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(error = %self, "request failed");
        }
        let body = Json(serde_json::json!({ "detail": self.to_string() }));
        (status, body).into_response()
    }
}

pub type Result<T> = std::result::Result<T, CommerceError>;
