//! Alert subscriptions and the emails sent for status transitions.

use crate::domain::monitor::MonitorStatus;
use crate::error::ValidationError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

fn default_true() -> bool {
    true
}

/// Request body for `POST /api/alerts`.
#[derive(Deserialize, Serialize, Debug, Clone, ToSchema)]
pub struct AlertSettingsCreate {
    pub monitor_id: String,
    pub email_address: String,
    #[serde(default = "default_true")]
    pub alert_on_down: bool,
    #[serde(default = "default_true")]
    pub alert_on_up: bool,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, ToSchema)]
pub struct AlertSettings {
    pub id: String,
    pub monitor_id: String,
    #[serde(default = "default_true")]
    pub email_enabled: bool,
    pub email_address: String,
    pub alert_on_down: bool,
    pub alert_on_up: bool,
    pub created_at: DateTime<Utc>,
}

impl AlertSettings {
    pub fn from_create(req: AlertSettingsCreate) -> Result<Self, ValidationError> {
        let email_address = req.email_address.trim().to_string();
        email_address
            .parse::<lettre::Address>()
            .map_err(|e| ValidationError::new(format!("Invalid email address: {}", e)))?;
        Ok(Self {
            id: uuid::Uuid::new_v4().to_string(),
            monitor_id: req.monitor_id,
            email_enabled: true,
            email_address,
            alert_on_down: req.alert_on_down,
            alert_on_up: req.alert_on_up,
            created_at: Utc::now(),
        })
    }

    /// Warnings are delivered to subscribers of down alerts.
    pub fn wants(&self, status: MonitorStatus) -> bool {
        if !self.email_enabled {
            return false;
        }
        match status {
            MonitorStatus::Down | MonitorStatus::Warning => self.alert_on_down,
            MonitorStatus::Up => self.alert_on_up,
            MonitorStatus::Unknown => false,
        }
    }
}

/// A status change worth alerting on. The first check after creation is not one.
pub fn is_transition(previous: MonitorStatus, current: MonitorStatus) -> bool {
    previous != current && previous != MonitorStatus::Unknown
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertKind {
    Down,
    Recovery,
    Warning,
}

impl AlertKind {
    pub fn for_status(status: MonitorStatus) -> Option<Self> {
        match status {
            MonitorStatus::Down => Some(AlertKind::Down),
            MonitorStatus::Up => Some(AlertKind::Recovery),
            MonitorStatus::Warning => Some(AlertKind::Warning),
            MonitorStatus::Unknown => None,
        }
    }

    fn color(&self) -> &'static str {
        match self {
            AlertKind::Down => "#dc3545",
            AlertKind::Recovery => "#28a745",
            AlertKind::Warning => "#fd7e14",
        }
    }
}

/// Rendered alert email.
#[derive(Debug, Clone, PartialEq)]
pub struct AlertEmail {
    pub subject: String,
    pub text_body: String,
    pub html_body: String,
}

fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

impl AlertEmail {
    pub fn render(
        kind: AlertKind,
        monitor_name: &str,
        target: &str,
        detail: Option<&str>,
        at: DateTime<Utc>,
        brand: &str,
    ) -> Self {
        let time = at.format("%Y-%m-%d %H:%M:%S").to_string();
        let (subject, headline, status_label, time_label, paragraphs): (String, String, &str, &str, Vec<&str>) =
            match kind {
                AlertKind::Down => (
                    format!("🔴 ALERT: {} is DOWN - {} Monitoring", monitor_name, brand),
                    format!("🔴 MONITOR ALERT: {} is DOWN", monitor_name),
                    "DOWN",
                    "Time",
                    vec![
                        "Your website is currently not responding. Please check your server.",
                        "Action required: check your server status, verify the site is reachable, review server logs and contact your hosting provider if needed.",
                        "We'll continue monitoring and notify you when the service is restored.",
                    ],
                ),
                AlertKind::Recovery => (
                    format!("🟢 RECOVERY: {} is back UP - {} Monitoring", monitor_name, brand),
                    format!("🟢 MONITOR RECOVERY: {} is back UP", monitor_name),
                    "UP",
                    "Recovery Time",
                    vec![
                        "Good news! Your website is now responding normally.",
                        "We'll continue monitoring your service 24/7.",
                    ],
                ),
                AlertKind::Warning => (
                    format!("🟠 WARNING: {} needs attention - {} Monitoring", monitor_name, brand),
                    format!("🟠 MONITOR WARNING: {} needs attention", monitor_name),
                    "WARNING",
                    "Time",
                    vec![
                        "The service is reachable but degraded.",
                        "We'll continue monitoring and notify you if the status changes.",
                    ],
                ),
            };

        let mut text_body = format!(
            "{}\n\nDetails:\n- Name: {}\n- URL: {}\n- Status: {}\n- {}: {} UTC\n",
            headline, monitor_name, target, status_label, time_label, time
        );
        if let Some(detail) = detail {
            text_body.push_str(&format!("- Reason: {}\n", detail));
        }
        for p in &paragraphs {
            text_body.push('\n');
            text_body.push_str(p);
            text_body.push('\n');
        }
        text_body.push_str(&format!(
            "\n---\nThis message was sent by {} Uptime Monitoring.\n",
            brand
        ));

        let name_html = escape_html(monitor_name);
        let target_html = escape_html(target);
        let reason_html = detail
            .map(|d| format!("<p><strong>Reason:</strong> {}</p>", escape_html(d)))
            .unwrap_or_default();
        let paragraphs_html: String = paragraphs
            .iter()
            .map(|p| format!("<p>{}</p>", escape_html(p)))
            .collect();
        let color = kind.color();
        let html_body = format!(
            r#"<!DOCTYPE html>
<html>
<head><meta charset="utf-8"></head>
<body style="font-family: Arial, sans-serif; line-height: 1.6; color: #333;">
  <div style="max-width: 600px; margin: 0 auto; padding: 20px;">
    <div style="background: {color}; color: white; padding: 20px; text-align: center; border-radius: 8px 8px 0 0;">
      <h2>{headline}</h2>
    </div>
    <div style="background: #f8f9fa; padding: 20px; border-radius: 0 0 8px 8px;">
      <div style="background: white; padding: 15px; border-left: 4px solid {color}; margin: 15px 0;">
        <p><strong>Monitor Name:</strong> {name}</p>
        <p><strong>URL:</strong> <a href="{target}">{target}</a></p>
        <p><strong>Status:</strong> <span style="color: {color}; font-weight: bold;">{status}</span></p>
        <p><strong>{time_label}:</strong> {time} UTC</p>
        {reason}
      </div>
      {paragraphs}
    </div>
    <div style="text-align: center; margin-top: 20px; font-size: 12px; color: #666;">
      <p>This message was sent by {brand} Uptime Monitoring.</p>
    </div>
  </div>
</body>
</html>
"#,
            color = color,
            headline = escape_html(&headline),
            name = name_html,
            target = target_html,
            status = status_label,
            time_label = time_label,
            time = time,
            reason = reason_html,
            paragraphs = paragraphs_html,
            brand = escape_html(brand),
        );

        Self {
            subject,
            text_body,
            html_body,
        }
    }
}
