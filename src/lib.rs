//! Stockroom API Library
//!
//! Inventory management backend: catalog master data, stock rows, the stock
//! movement ledger, role-based accounts and a public storefront listing.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

pub mod auth;
pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod handlers;
pub mod middleware_helpers;
pub mod migrator;
pub mod openapi;
pub mod services;
pub mod tracing;

use axum::{Extension, Router};
use sea_orm::DatabaseConnection;
use std::sync::Arc;

use crate::auth::{AuthConfig, AuthService};
use crate::errors::ServiceError;

/// Shared state handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DatabaseConnection>,
    pub config: config::AppConfig,
    pub auth: Arc<AuthService>,
    pub services: services::AppServices,
}

impl AppState {
    /// Wires the auth service and every resource service onto one pool.
    pub fn new(db: Arc<DatabaseConnection>, config: config::AppConfig) -> Self {
        let auth = Arc::new(AuthService::new(AuthConfig::from(&config), db.clone()));
        let services = services::AppServices::new(db.clone(), auth.clone());
        Self {
            db,
            config,
            auth,
            services,
        }
    }
}

/// Every `/api` route, each group already carrying its auth layers
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .merge(handlers::health::health_routes())
        .merge(handlers::auth::auth_routes())
        .merge(handlers::categories::category_routes())
        .merge(handlers::products::product_routes())
        .merge(handlers::suppliers::supplier_routes())
        .merge(handlers::inventory::inventory_routes())
        .merge(handlers::stock_movements::stock_movement_routes())
        .merge(handlers::users::user_routes())
        .merge(handlers::catalog::catalog_routes())
}

/// API routes plus Swagger UI, tracing, the auth extension and request ids.
///
/// CORS and compression are environment dependent and added by the binary.
pub fn build_router(state: AppState) -> Router {
    let auth = state.auth.clone();

    Router::new()
        .merge(api_routes())
        .fallback(route_not_found)
        .with_state(state)
        .merge(openapi::swagger_ui())
        .layer(crate::tracing::configure_http_tracing())
        .layer(Extension(auth))
        .layer(axum::middleware::from_fn(
            middleware_helpers::request_id_middleware,
        ))
}

async fn route_not_found() -> ServiceError {
    ServiceError::NotFound("Route not found".to_string())
}
