use crate::domain::{
    AlertSettings, AlertSettingsCreate, CheckDetails, DashboardStats, DnsRecordType, HistoryPoint,
    KeywordMatchType, Monitor, MonitorCreate, MonitorStatus, MonitorType, PortProtocol, UptimeLog,
};
use crate::error::ErrorResponse;
use crate::transport::http::handlers::{alerts, dashboard, health, monitors, root};
use crate::transport::http::types::{
    ApiStatusResponse, AppState, CheckResponse, EndpointMap, HealthResponse, MessageResponse,
    ServiceBanner,
};
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    info(title = "StatusTrackr", description = "Uptime monitoring API"),
    paths(
        root::service_banner_handler,
        root::api_root_handler,
        health::healthcheck_handler,
        monitors::create_monitor_handler,
        monitors::list_monitors_handler,
        monitors::get_monitor_handler,
        monitors::delete_monitor_handler,
        monitors::check_monitor_handler,
        monitors::monitor_history_handler,
        monitors::monitor_logs_handler,
        dashboard::dashboard_stats_handler,
        alerts::create_alert_handler,
        alerts::get_alert_handler,
        alerts::delete_alert_handler
    ),
    components(schemas(
        Monitor,
        MonitorCreate,
        MonitorStatus,
        MonitorType,
        PortProtocol,
        DnsRecordType,
        KeywordMatchType,
        UptimeLog,
        CheckDetails,
        CheckResponse,
        HistoryPoint,
        DashboardStats,
        AlertSettings,
        AlertSettingsCreate,
        HealthResponse,
        ServiceBanner,
        EndpointMap,
        ApiStatusResponse,
        MessageResponse,
        ErrorResponse
    ))
)]
pub struct ApiDoc;

/// API routes bound to `app_state`, without docs or middleware.
pub fn create_router(app_state: AppState) -> Router {
    Router::new()
        .route("/", get(root::service_banner_handler))
        .route("/health", get(health::healthcheck_handler))
        .route("/api", get(root::api_root_handler))
        .route("/api/", get(root::api_root_handler))
        .route(
            "/api/monitors",
            post(monitors::create_monitor_handler).get(monitors::list_monitors_handler),
        )
        .route(
            "/api/monitors/:id",
            get(monitors::get_monitor_handler).delete(monitors::delete_monitor_handler),
        )
        .route("/api/monitors/:id/check", post(monitors::check_monitor_handler))
        .route("/api/monitors/:id/history", get(monitors::monitor_history_handler))
        .route("/api/monitors/:id/logs", get(monitors::monitor_logs_handler))
        .route("/api/dashboard/stats", get(dashboard::dashboard_stats_handler))
        .route("/api/alerts", post(alerts::create_alert_handler))
        .route(
            "/api/alerts/:monitor_id",
            get(alerts::get_alert_handler).delete(alerts::delete_alert_handler),
        )
        .with_state(app_state)
}

/// The complete application: routes, Swagger UI at `/docs`, CORS and request tracing.
/// Hosts that bring their own server (serverless adapters) wrap this router directly.
pub fn build_app(app_state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    create_router(app_state)
        .merge(SwaggerUi::new("/docs").url("/openapi.json", ApiDoc::openapi()))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}
