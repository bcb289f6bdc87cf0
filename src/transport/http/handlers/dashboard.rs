use crate::domain::DashboardStats;
use crate::error::{ApiResult, ErrorResponse};
use crate::transport::http::types::AppState;
use axum::extract::State;
use axum::Json;

#[utoipa::path(
    get,
    path = "/api/dashboard/stats",
    responses(
        (status = 200, description = "Aggregate monitor statistics", body = DashboardStats),
        (status = 503, description = "Database not available", body = ErrorResponse)
    )
)]
pub async fn dashboard_stats_handler(State(state): State<AppState>) -> ApiResult<Json<DashboardStats>> {
    let monitors = state.store.list_monitors().await?;
    Ok(Json(DashboardStats::from_monitors(&monitors)))
}
