//! Probe results and the uptime log entries they become.

use crate::domain::monitor::MonitorStatus;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Per-probe data. Only the fields the probe produced are set.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, ToSchema)]
pub struct CheckDetails {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ssl_expires_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ssl_days_until_expiry: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dns_resolution_time: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dns_result: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port_open: Option<bool>,
    /// Percent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ping_packet_loss: Option<f64>,
    /// Seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ping_min_time: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ping_max_time: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ping_avg_time: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keyword_found: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keyword_match_count: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_status_code: Option<u16>,
    /// Bytes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_response_size: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub json_validation_passed: Option<bool>,
}

/// What a single probe observed.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckOutcome {
    pub status: MonitorStatus,
    /// Seconds.
    pub response_time: Option<f64>,
    pub error: Option<String>,
    pub details: CheckDetails,
}

impl CheckOutcome {
    pub fn up(response_time: Option<f64>) -> Self {
        Self {
            status: MonitorStatus::Up,
            response_time,
            error: None,
            details: CheckDetails::default(),
        }
    }

    pub fn down(response_time: Option<f64>, error: impl Into<String>) -> Self {
        Self {
            status: MonitorStatus::Down,
            response_time,
            error: Some(error.into()),
            details: CheckDetails::default(),
        }
    }

    pub fn warning(response_time: Option<f64>, error: impl Into<String>) -> Self {
        Self {
            status: MonitorStatus::Warning,
            response_time,
            error: Some(error.into()),
            details: CheckDetails::default(),
        }
    }

    pub fn with_details(mut self, details: CheckDetails) -> Self {
        self.details = details;
        self
    }
}

/// One stored probe result.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, ToSchema)]
pub struct UptimeLog {
    pub id: String,
    pub monitor_id: String,
    pub timestamp: DateTime<Utc>,
    pub status: MonitorStatus,
    pub response_time: Option<f64>,
    pub error_message: Option<String>,
    #[serde(flatten)]
    pub details: CheckDetails,
}

impl UptimeLog {
    pub fn from_outcome(monitor_id: &str, outcome: &CheckOutcome, timestamp: DateTime<Utc>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            monitor_id: monitor_id.to_string(),
            timestamp,
            status: outcome.status,
            response_time: outcome.response_time,
            error_message: outcome.error.clone(),
            details: outcome.details.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_flattens_only_present_details() {
        let outcome = CheckOutcome::up(Some(0.12)).with_details(CheckDetails {
            port_open: Some(true),
            ..Default::default()
        });
        let log = UptimeLog::from_outcome("m-1", &outcome, Utc::now());
        let json = serde_json::to_value(&log).unwrap();
        assert_eq!(json["status"], "up");
        assert_eq!(json["port_open"], true);
        assert!(json.get("dns_result").is_none());
        assert!(json.get("details").is_none());

        let back: UptimeLog = serde_json::from_value(json).unwrap();
        assert_eq!(back.details.port_open, Some(true));
    }
}
