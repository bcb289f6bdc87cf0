use crate::domain::{hourly_history, HistoryPoint, Monitor, MonitorCreate, UptimeLog};
use crate::error::{ApiError, ApiResult, ErrorResponse};
use crate::storage::SortOrder;
use crate::transport::http::types::{
    json_422, path_400, query_400, AppState, CheckResponse, MessageResponse, WindowQuery,
};
use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::Json;
use chrono::{TimeDelta, Utc};

async fn load_monitor(state: &AppState, id: &str) -> ApiResult<Monitor> {
    state
        .store
        .get_monitor(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Monitor not found"))
}

#[utoipa::path(
    post,
    path = "/api/monitors",
    request_body = MonitorCreate,
    responses(
        (status = 200, description = "Monitor created", body = Monitor),
        (status = 400, description = "Missing or invalid settings for the monitor type", body = ErrorResponse),
        (status = 422, description = "Malformed JSON body", body = ErrorResponse),
        (status = 503, description = "Database not available", body = ErrorResponse)
    )
)]
pub async fn create_monitor_handler(
    State(state): State<AppState>,
    request: Result<Json<MonitorCreate>, JsonRejection>,
) -> ApiResult<Json<Monitor>> {
    let Json(request) = request.map_err(json_422)?;
    let monitor = Monitor::from_create(request)?;
    state.store.insert_monitor(&monitor).await?;
    tracing::info!(
        monitor_id = %monitor.id,
        name = %monitor.name,
        monitor_type = %monitor.monitor_type,
        "monitor created"
    );

    state.monitoring.start().await;
    Ok(Json(monitor))
}

#[utoipa::path(
    get,
    path = "/api/monitors",
    responses(
        (status = 200, description = "All monitors", body = Vec<Monitor>),
        (status = 503, description = "Database not available", body = ErrorResponse)
    )
)]
pub async fn list_monitors_handler(State(state): State<AppState>) -> ApiResult<Json<Vec<Monitor>>> {
    Ok(Json(state.store.list_monitors().await?))
}

#[utoipa::path(
    get,
    path = "/api/monitors/{id}",
    params(("id" = String, Path, description = "Monitor id")),
    responses(
        (status = 200, description = "The monitor", body = Monitor),
        (status = 404, description = "Monitor not found", body = ErrorResponse)
    )
)]
pub async fn get_monitor_handler(
    State(state): State<AppState>,
    id: Result<Path<String>, PathRejection>,
) -> ApiResult<Json<Monitor>> {
    let Path(id) = id.map_err(path_400)?;
    Ok(Json(load_monitor(&state, &id).await?))
}

#[utoipa::path(
    delete,
    path = "/api/monitors/{id}",
    params(("id" = String, Path, description = "Monitor id")),
    responses(
        (status = 200, description = "Monitor, its logs and its alert settings removed", body = MessageResponse),
        (status = 404, description = "Monitor not found", body = ErrorResponse)
    )
)]
pub async fn delete_monitor_handler(
    State(state): State<AppState>,
    id: Result<Path<String>, PathRejection>,
) -> ApiResult<Json<MessageResponse>> {
    let Path(id) = id.map_err(path_400)?;
    if !state.store.delete_monitor(&id).await? {
        return Err(ApiError::not_found("Monitor not found"));
    }
    tracing::info!(monitor_id = %id, "monitor deleted");
    Ok(Json(MessageResponse::new("Monitor deleted successfully")))
}

#[utoipa::path(
    post,
    path = "/api/monitors/{id}/check",
    params(("id" = String, Path, description = "Monitor id")),
    responses(
        (status = 200, description = "Probe result; also logged and applied to the monitor", body = CheckResponse),
        (status = 404, description = "Monitor not found", body = ErrorResponse)
    )
)]
pub async fn check_monitor_handler(
    State(state): State<AppState>,
    id: Result<Path<String>, PathRejection>,
) -> ApiResult<Json<CheckResponse>> {
    let Path(id) = id.map_err(path_400)?;
    let monitor = load_monitor(&state, &id).await?;
    let outcome = state.monitoring.execute_check(monitor).await?;
    Ok(Json(CheckResponse::from(outcome)))
}

#[utoipa::path(
    get,
    path = "/api/monitors/{id}/history",
    params(("id" = String, Path, description = "Monitor id"), WindowQuery),
    responses(
        (status = 200, description = "Hourly uptime and latency, oldest first", body = Vec<HistoryPoint>),
        (status = 400, description = "hours out of range", body = ErrorResponse)
    )
)]
pub async fn monitor_history_handler(
    State(state): State<AppState>,
    id: Result<Path<String>, PathRejection>,
    window: Result<Query<WindowQuery>, QueryRejection>,
) -> ApiResult<Json<Vec<HistoryPoint>>> {
    let Path(id) = id.map_err(path_400)?;
    let Query(window) = window.map_err(query_400)?;
    let since = Utc::now() - TimeDelta::hours(window.hours()?);
    let logs = state
        .store
        .logs_since(&id, since, SortOrder::Ascending)
        .await?;
    Ok(Json(hourly_history(&logs)))
}

#[utoipa::path(
    get,
    path = "/api/monitors/{id}/logs",
    params(("id" = String, Path, description = "Monitor id"), WindowQuery),
    responses(
        (status = 200, description = "Check logs, newest first", body = Vec<UptimeLog>),
        (status = 400, description = "hours out of range", body = ErrorResponse)
    )
)]
pub async fn monitor_logs_handler(
    State(state): State<AppState>,
    id: Result<Path<String>, PathRejection>,
    window: Result<Query<WindowQuery>, QueryRejection>,
) -> ApiResult<Json<Vec<UptimeLog>>> {
    let Path(id) = id.map_err(path_400)?;
    let Query(window) = window.map_err(query_400)?;
    let since = Utc::now() - TimeDelta::hours(window.hours()?);
    let logs = state
        .store
        .logs_since(&id, since, SortOrder::Descending)
        .await?;
    Ok(Json(logs))
}
