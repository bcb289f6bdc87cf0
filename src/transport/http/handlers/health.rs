use crate::transport::http::types::{AppState, HealthResponse};
use axum::extract::State;
use axum::Json;

/// Always answers 200 so load balancers keep the instance while the database
/// recovers. The body reports what is actually reachable.
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service is up; body reports database reachability", body = HealthResponse)
    )
)]
pub async fn healthcheck_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    let database = match state.store.ping().await {
        Ok(()) => "connected",
        Err(e) => {
            tracing::warn!("health check: database ping failed: {}", e);
            "disconnected"
        }
    };

    Json(HealthResponse {
        status: "healthy".to_string(),
        timestamp: chrono::Utc::now(),
        database: database.to_string(),
        storage: state.store.backend().as_str().to_string(),
        mongo_url_configured: state.config.mongo_url.is_some(),
        monitoring_active: state.monitoring.is_running(),
    })
}
