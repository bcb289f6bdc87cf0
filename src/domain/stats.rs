//! Aggregations over monitors and uptime logs.

use crate::domain::log::UptimeLog;
use crate::domain::monitor::{Monitor, MonitorStatus};
use chrono::{DateTime, DurationRound, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use utoipa::ToSchema;

/// Window used for the per-monitor uptime percentage.
pub const UPTIME_WINDOW_HOURS: i64 = 24;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, ToSchema)]
pub struct DashboardStats {
    pub total_monitors: usize,
    pub monitors_up: usize,
    pub monitors_down: usize,
    pub overall_uptime: f64,
}

impl DashboardStats {
    pub fn from_monitors(monitors: &[Monitor]) -> Self {
        let total_monitors = monitors.len();
        let monitors_up = monitors
            .iter()
            .filter(|m| m.status == MonitorStatus::Up)
            .count();
        let monitors_down = monitors
            .iter()
            .filter(|m| m.status == MonitorStatus::Down)
            .count();
        let overall_uptime = if total_monitors > 0 {
            monitors.iter().map(|m| m.uptime_percentage).sum::<f64>() / total_monitors as f64
        } else {
            0.0
        };
        Self {
            total_monitors,
            monitors_up,
            monitors_down,
            overall_uptime,
        }
    }
}

/// Share of `up` logs, in percent. `None` when there is nothing to measure.
pub fn uptime_percentage(logs: &[UptimeLog]) -> Option<f64> {
    if logs.is_empty() {
        return None;
    }
    let up = logs
        .iter()
        .filter(|l| l.status == MonitorStatus::Up)
        .count();
    Some(up as f64 / logs.len() as f64 * 100.0)
}

/// One hour of history for charts.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, ToSchema)]
pub struct HistoryPoint {
    pub timestamp: DateTime<Utc>,
    pub uptime_percentage: f64,
    /// Milliseconds.
    pub avg_response_time: f64,
    pub total_checks: u64,
}

#[derive(Default)]
struct HourBucket {
    up: u64,
    down: u64,
    response_total: f64,
    response_count: u64,
}

fn truncate_to_hour(ts: DateTime<Utc>) -> DateTime<Utc> {
    ts.duration_trunc(TimeDelta::hours(1)).unwrap_or(ts)
}

/// Buckets logs per hour. Only `up` logs count as up; their response times
/// feed the average.
pub fn hourly_history(logs: &[UptimeLog]) -> Vec<HistoryPoint> {
    let mut buckets: BTreeMap<DateTime<Utc>, HourBucket> = BTreeMap::new();
    for log in logs {
        let bucket = buckets.entry(truncate_to_hour(log.timestamp)).or_default();
        if log.status == MonitorStatus::Up {
            bucket.up += 1;
            if let Some(rt) = log.response_time.filter(|rt| *rt > 0.0) {
                bucket.response_total += rt;
                bucket.response_count += 1;
            }
        } else {
            bucket.down += 1;
        }
    }

    buckets
        .into_iter()
        .map(|(timestamp, b)| {
            let total_checks = b.up + b.down;
            let uptime_percentage = if total_checks > 0 {
                b.up as f64 / total_checks as f64 * 100.0
            } else {
                0.0
            };
            let avg_response_time = if b.response_count > 0 {
                b.response_total / b.response_count as f64 * 1000.0
            } else {
                0.0
            };
            HistoryPoint {
                timestamp,
                uptime_percentage,
                avg_response_time,
                total_checks,
            }
        })
        .collect()
}
