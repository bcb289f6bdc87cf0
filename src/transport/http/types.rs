use crate::app::monitoring_service::MonitoringService;
use crate::domain::{CheckDetails, CheckOutcome, MonitorStatus};
use crate::error::ApiError;
use crate::infra::config::AppConfig;
use crate::storage::MonitorStore;
use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::{IntoParams, ToSchema};

/// Longest history window the API serves, in hours (30 days).
pub const MAX_WINDOW_HOURS: i64 = 720;
pub const DEFAULT_WINDOW_HOURS: i64 = 24;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn MonitorStore>,
    pub monitoring: Arc<MonitoringService>,
    pub config: Arc<AppConfig>,
}

#[derive(Serialize, Deserialize, Debug, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, ToSchema)]
pub struct ApiStatusResponse {
    pub message: String,
    pub status: String,
}

#[derive(Serialize, Deserialize, Debug, ToSchema)]
pub struct EndpointMap {
    pub api_root: String,
    pub api_docs: String,
    pub monitors: String,
    pub dashboard: String,
    pub health: String,
}

#[derive(Serialize, Deserialize, Debug, ToSchema)]
pub struct ServiceBanner {
    pub message: String,
    pub version: String,
    pub status: String,
    pub deployment: String,
    pub database: String,
    pub endpoints: EndpointMap,
}

#[derive(Serialize, Deserialize, Debug, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    /// `connected` or `disconnected`.
    pub database: String,
    /// `mongodb` or `memory`.
    pub storage: String,
    pub mongo_url_configured: bool,
    pub monitoring_active: bool,
}

/// Result of `POST /api/monitors/{id}/check`.
#[derive(Serialize, Deserialize, Debug, ToSchema)]
pub struct CheckResponse {
    pub status: MonitorStatus,
    pub response_time: Option<f64>,
    pub error: Option<String>,
    pub additional_data: CheckDetails,
}

impl From<CheckOutcome> for CheckResponse {
    fn from(outcome: CheckOutcome) -> Self {
        Self {
            status: outcome.status,
            response_time: outcome.response_time,
            error: outcome.error,
            additional_data: outcome.details,
        }
    }
}

#[derive(Deserialize, Debug, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct WindowQuery {
    /// Look-back window in hours (1 to 720, default 24).
    pub hours: Option<i64>,
}

impl WindowQuery {
    pub fn hours(&self) -> Result<i64, ApiError> {
        let hours = self.hours.unwrap_or(DEFAULT_WINDOW_HOURS);
        if !(1..=MAX_WINDOW_HOURS).contains(&hours) {
            return Err(ApiError::bad_request(format!(
                "hours must be between 1 and {}",
                MAX_WINDOW_HOURS
            )));
        }
        Ok(hours)
    }
}

pub fn json_422(err: JsonRejection) -> ApiError {
    ApiError::unprocessable(format!("Invalid JSON body: {}", err.body_text()))
}

pub fn query_400(err: QueryRejection) -> ApiError {
    ApiError::bad_request(format!("Invalid query string: {}", err.body_text()))
}

pub fn path_400(err: PathRejection) -> ApiError {
    ApiError::bad_request(format!("Invalid path parameter: {}", err.body_text()))
}
