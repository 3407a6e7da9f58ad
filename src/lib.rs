//! Discount service for the multi-tenant laundry platform.
//!
//! Tenancy admins maintain prioritized discount rule sets; the customer
//! checkout asks which of them apply to a candidate order.

pub mod cache;
pub mod config;
pub mod discounts;
pub mod error;
pub mod extract;
pub mod response;
pub mod tenancy;

use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;
use sqlx::PgPool;
use tower_http::{compression::CompressionLayer, cors::CorsLayer, trace::TraceLayer};

use crate::cache::{AppCache, CacheStats};
use crate::response::ApiResponse;

/// Shared state handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub cache: AppCache,
}

/// Build the full application router
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .merge(discounts::router())
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    cache: CacheStats,
}

async fn health(State(state): State<AppState>) -> Json<ApiResponse<HealthResponse>> {
    response::ok(HealthResponse {
        status: "ok",
        cache: state.cache.stats(),
    })
}
