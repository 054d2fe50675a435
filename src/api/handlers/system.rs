use super::AppState;
use crate::api::models::{ComponentHealth, ComponentsHealth, HealthResponse, HealthStatus};
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use chrono::Utc;

/// Handler for GET /health
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let database = match state.account_repo.count().await {
        Ok(accounts) => ComponentHealth::healthy(format!("{} accounts", accounts)),
        Err(e) => ComponentHealth::unhealthy(format!("Database error: {}", e)),
    };

    let sessions = match state.session_store.load("health-probe").await {
        Ok(_) => ComponentHealth::healthy("Session store reachable"),
        Err(e) => ComponentHealth::unhealthy(format!("Session store error: {}", e)),
    };

    let healthy = database.is_healthy() && sessions.is_healthy();
    let status = if healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let response = HealthResponse {
        status: if healthy {
            HealthStatus::Healthy
        } else {
            HealthStatus::Unhealthy
        },
        components: ComponentsHealth { database, sessions },
        timestamp: Utc::now().to_rfc3339(),
        version: env!("CARGO_PKG_VERSION"),
    };

    (status, Json(response))
}
