use crate::handlers::AppState;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use chrono::Utc;
use serde::Serialize;
use serde_json::json;
use std::time::Instant;
use tracing::{error, warn};
use utoipa::ToSchema;

/// Outcome of each database probe
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct DatabaseHealth {
    /// Pool ping succeeded
    pub pool: bool,
    /// `SELECT 1` succeeded through the ORM
    pub query: bool,
    pub timestamp: String,
    #[serde(rename = "latencyMs")]
    pub latency_ms: u64,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct DbHealthResponse {
    /// `healthy` or `unhealthy`
    pub status: String,
    pub database: DatabaseHealth,
    pub timestamp: String,
}

pub fn health_routes() -> Router<AppState> {
    Router::new()
        .route("/api/health", get(liveness_check))
        .route("/api/health/db", get(database_health_check))
}

/// Liveness probe; never touches the database
#[utoipa::path(
    get,
    path = "/api/health",
    responses((status = 200, description = "Service is running")),
    tag = "health"
)]
pub async fn liveness_check() -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": Utc::now().to_rfc3339(),
    }))
}

/// Database probe: pool ping plus a `SELECT 1` round-trip
#[utoipa::path(
    get,
    path = "/api/health/db",
    responses(
        (status = 200, description = "Database reachable", body = DbHealthResponse),
        (status = 503, description = "Database unreachable", body = DbHealthResponse),
        (status = 500, description = "Health check failed")
    ),
    tag = "health"
)]
pub async fn database_health_check(State(state): State<AppState>) -> Response {
    let start = Instant::now();

    // Panics inside the probe surface as a 500
    let db = state.db.clone();
    let probe = tokio::spawn(async move {
        let pool = crate::db::check_connection(&db).await;
        let query = crate::db::check_query(&db).await;
        (pool, query)
    })
    .await;

    let (pool, query) = match probe {
        Ok(results) => results,
        Err(e) => {
            error!("Database health probe aborted: {}", e);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "status": "error",
                    "message": "Health check failed",
                    "timestamp": Utc::now().to_rfc3339(),
                })),
            )
                .into_response();
        }
    };

    if let Err(e) = &query {
        warn!("Database query probe failed: {}", e);
    }

    let healthy = pool.is_ok() && query.is_ok();
    let timestamp = Utc::now().to_rfc3339();
    let body = DbHealthResponse {
        status: if healthy { "healthy" } else { "unhealthy" }.to_string(),
        database: DatabaseHealth {
            pool: pool.is_ok(),
            query: query.is_ok(),
            timestamp: timestamp.clone(),
            latency_ms: start.elapsed().as_millis() as u64,
        },
        timestamp,
    };

    let status = if healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(body)).into_response()
}
