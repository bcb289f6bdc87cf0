//! Monitoring domain: monitors, probe results, alert subscriptions and statistics.

pub mod alert;
pub mod log;
pub mod monitor;
pub mod stats;

pub use alert::{is_transition, AlertEmail, AlertKind, AlertSettings, AlertSettingsCreate};
pub use log::{CheckDetails, CheckOutcome, UptimeLog};
pub use monitor::{
    ApiProbe, CheckTarget, DnsProbe, DnsRecordType, KeywordMatchType, Monitor, MonitorCreate,
    MonitorStatus, MonitorType, PortProtocol,
};
pub use stats::{hourly_history, uptime_percentage, DashboardStats, HistoryPoint, UPTIME_WINDOW_HOURS};
