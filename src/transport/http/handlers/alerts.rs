use crate::domain::{AlertSettings, AlertSettingsCreate};
use crate::error::{ApiError, ApiResult, ErrorResponse, StoreError};
use crate::transport::http::types::{json_422, path_400, AppState, MessageResponse};
use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Path, State};
use axum::Json;

const ALREADY_EXISTS: &str = "Alert settings already exist for this monitor";

#[utoipa::path(
    post,
    path = "/api/alerts",
    request_body = AlertSettingsCreate,
    responses(
        (status = 200, description = "Alert settings created", body = AlertSettings),
        (status = 400, description = "Settings already exist or invalid email", body = ErrorResponse),
        (status = 404, description = "Monitor not found", body = ErrorResponse),
        (status = 422, description = "Malformed JSON body", body = ErrorResponse)
    )
)]
pub async fn create_alert_handler(
    State(state): State<AppState>,
    request: Result<Json<AlertSettingsCreate>, JsonRejection>,
) -> ApiResult<Json<AlertSettings>> {
    let Json(request) = request.map_err(json_422)?;

    if state.store.get_monitor(&request.monitor_id).await?.is_none() {
        return Err(ApiError::not_found("Monitor not found"));
    }
    if !state.store.alerts_for(&request.monitor_id).await?.is_empty() {
        return Err(ApiError::bad_request(ALREADY_EXISTS));
    }

    let settings = AlertSettings::from_create(request)?;
    // Concurrent requests can both pass the check above.
    state
        .store
        .insert_alert(&settings)
        .await
        .map_err(|e| match e {
            StoreError::Duplicate(_) => ApiError::bad_request(ALREADY_EXISTS),
            other => other.into(),
        })?;
    tracing::info!(monitor_id = %settings.monitor_id, "alert settings created");
    Ok(Json(settings))
}

#[utoipa::path(
    get,
    path = "/api/alerts/{monitor_id}",
    params(("monitor_id" = String, Path, description = "Monitor id")),
    responses(
        (status = 200, description = "Alert settings for the monitor", body = AlertSettings),
        (status = 404, description = "Alert settings not found", body = ErrorResponse)
    )
)]
pub async fn get_alert_handler(
    State(state): State<AppState>,
    monitor_id: Result<Path<String>, PathRejection>,
) -> ApiResult<Json<AlertSettings>> {
    let Path(monitor_id) = monitor_id.map_err(path_400)?;
    state
        .store
        .alerts_for(&monitor_id)
        .await?
        .into_iter()
        .next()
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Alert settings not found"))
}

#[utoipa::path(
    delete,
    path = "/api/alerts/{monitor_id}",
    params(("monitor_id" = String, Path, description = "Monitor id")),
    responses(
        (status = 200, description = "Alert settings removed", body = MessageResponse),
        (status = 404, description = "Alert settings not found", body = ErrorResponse)
    )
)]
pub async fn delete_alert_handler(
    State(state): State<AppState>,
    monitor_id: Result<Path<String>, PathRejection>,
) -> ApiResult<Json<MessageResponse>> {
    let Path(monitor_id) = monitor_id.map_err(path_400)?;
    if !state.store.delete_alert(&monitor_id).await? {
        return Err(ApiError::not_found("Alert settings not found"));
    }
    Ok(Json(MessageResponse::new("Alert settings deleted successfully")))
}
