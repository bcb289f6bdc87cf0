use crate::transport::http::types::{ApiStatusResponse, AppState, EndpointMap, ServiceBanner};
use axum::extract::State;
use axum::Json;

#[utoipa::path(
    get,
    path = "/",
    responses((status = 200, description = "Service banner", body = ServiceBanner))
)]
pub async fn service_banner_handler(State(state): State<AppState>) -> Json<ServiceBanner> {
    let database = if state.store.ping().await.is_ok() {
        "connected"
    } else {
        "disconnected"
    };

    Json(ServiceBanner {
        message: "StatusTrackr Backend API".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        status: "running".to_string(),
        deployment: state.config.deployment.as_str().to_string(),
        database: database.to_string(),
        endpoints: EndpointMap {
            api_root: "/api/".to_string(),
            api_docs: "/docs".to_string(),
            monitors: "/api/monitors".to_string(),
            dashboard: "/api/dashboard/stats".to_string(),
            health: "/health".to_string(),
        },
    })
}

#[utoipa::path(
    get,
    path = "/api/",
    responses((status = 200, description = "API root", body = ApiStatusResponse))
)]
pub async fn api_root_handler() -> Json<ApiStatusResponse> {
    Json(ApiStatusResponse {
        message: "Uptime Monitoring API".to_string(),
        status: "running".to_string(),
    })
}
