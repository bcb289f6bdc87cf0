//! Monitors: what to probe and how.
//!
//! The wire/storage shape is a flat record with optional per-type fields. The
//! probes work on [`CheckTarget`], the typed view produced by [`Monitor::target`].

use crate::domain::log::CheckOutcome;
use crate::error::ValidationError;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::net::IpAddr;
use utoipa::ToSchema;

pub const DEFAULT_CHECK_INTERVAL: u64 = 300;
pub const DEFAULT_TIMEOUT: u64 = 10;
pub const DEFAULT_SSL_EXPIRY_THRESHOLD: i64 = 30;
pub const DEFAULT_DNS_SERVER: &str = "8.8.8.8";
pub const DEFAULT_PING_COUNT: u32 = 4;
pub const DEFAULT_PING_PACKET_SIZE: u32 = 32;
/// 30 days.
pub const MAX_CHECK_INTERVAL: u64 = 2_592_000;
pub const MAX_TIMEOUT: u64 = 300;
pub const MAX_PING_COUNT: u32 = 100;
pub const MAX_PING_PACKET_SIZE: u32 = 65_507;
pub const DEFAULT_API_METHOD: &str = "GET";
pub const DEFAULT_EXPECTED_STATUS: u16 = 200;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, Default, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum MonitorStatus {
    Up,
    Down,
    #[default]
    Unknown,
    /// Reachable but degraded (certificate close to expiry, packet loss, slow API).
    Warning,
}

impl MonitorStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MonitorStatus::Up => "up",
            MonitorStatus::Down => "down",
            MonitorStatus::Unknown => "unknown",
            MonitorStatus::Warning => "warning",
        }
    }
}

impl fmt::Display for MonitorStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum MonitorType {
    Http,
    #[default]
    Https,
    Ssl,
    Dns,
    Port,
    Ping,
    Keyword,
    Api,
}

impl MonitorType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MonitorType::Http => "http",
            MonitorType::Https => "https",
            MonitorType::Ssl => "ssl",
            MonitorType::Dns => "dns",
            MonitorType::Port => "port",
            MonitorType::Ping => "ping",
            MonitorType::Keyword => "keyword",
            MonitorType::Api => "api",
        }
    }
}

impl fmt::Display for MonitorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum PortProtocol {
    #[default]
    Tcp,
    Udp,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default, ToSchema)]
#[allow(clippy::upper_case_acronyms)]
pub enum DnsRecordType {
    #[default]
    A,
    AAAA,
    CNAME,
    MX,
    NS,
    TXT,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum KeywordMatchType {
    #[default]
    Contains,
    Exact,
    Regex,
}

/// Request body for `POST /api/monitors`.
#[derive(Deserialize, Serialize, Debug, Clone, Default, ToSchema)]
pub struct MonitorCreate {
    pub name: String,
    #[serde(default)]
    pub url: Option<String>,
    /// Seconds between checks (default 300).
    #[serde(default)]
    pub check_interval: Option<u64>,
    #[serde(default)]
    pub monitor_type: MonitorType,
    /// Probe timeout in seconds (default 10).
    #[serde(default)]
    pub timeout: Option<u64>,

    #[serde(default)]
    pub ssl_domain: Option<String>,
    /// Days before expiry that count as a warning (default 30).
    #[serde(default)]
    pub ssl_expiry_threshold: Option<i64>,

    #[serde(default)]
    pub dns_hostname: Option<String>,
    #[serde(default)]
    pub dns_server: Option<String>,
    #[serde(default)]
    pub dns_record_type: Option<DnsRecordType>,
    #[serde(default)]
    pub expected_dns_result: Option<String>,

    #[serde(default)]
    pub port_host: Option<String>,
    #[serde(default)]
    pub port_number: Option<u16>,
    #[serde(default)]
    pub port_protocol: Option<PortProtocol>,

    #[serde(default)]
    pub ping_host: Option<String>,
    #[serde(default)]
    pub ping_count: Option<u32>,
    #[serde(default)]
    pub ping_packet_size: Option<u32>,

    #[serde(default)]
    pub keyword_url: Option<String>,
    #[serde(default)]
    pub keyword_text: Option<String>,
    #[serde(default)]
    pub keyword_match_type: Option<KeywordMatchType>,

    #[serde(default)]
    pub api_url: Option<String>,
    #[serde(default)]
    pub api_method: Option<String>,
    #[serde(default)]
    pub api_headers: Option<HashMap<String, String>>,
    #[serde(default)]
    pub api_body: Option<String>,
    #[serde(default)]
    pub expected_status_code: Option<u16>,
    /// Maximum acceptable response time in seconds.
    #[serde(default)]
    pub expected_response_time: Option<f64>,
    /// Dotted path into the JSON response, e.g. `data.status`.
    #[serde(default)]
    pub json_path: Option<String>,
    #[serde(default)]
    pub expected_json_value: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, ToSchema)]
pub struct Monitor {
    pub id: String,
    pub name: String,
    pub url: Option<String>,
    pub check_interval: u64,
    pub monitor_type: MonitorType,
    pub timeout: u64,
    #[serde(default)]
    pub status: MonitorStatus,
    pub last_checked: Option<DateTime<Utc>>,
    /// Seconds.
    pub response_time: Option<f64>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub uptime_percentage: f64,

    pub ssl_domain: Option<String>,
    pub ssl_expiry_threshold: Option<i64>,
    pub ssl_expires_at: Option<DateTime<Utc>>,

    pub dns_hostname: Option<String>,
    pub dns_server: Option<String>,
    pub dns_record_type: Option<DnsRecordType>,
    pub expected_dns_result: Option<String>,

    pub port_host: Option<String>,
    pub port_number: Option<u16>,
    pub port_protocol: Option<PortProtocol>,

    pub ping_host: Option<String>,
    pub ping_count: Option<u32>,
    pub ping_packet_size: Option<u32>,
    pub ping_packet_loss: Option<f64>,

    pub keyword_url: Option<String>,
    pub keyword_text: Option<String>,
    pub keyword_match_type: Option<KeywordMatchType>,
    pub keyword_found: Option<bool>,

    pub api_url: Option<String>,
    pub api_method: Option<String>,
    pub api_headers: Option<HashMap<String, String>>,
    pub api_body: Option<String>,
    pub expected_status_code: Option<u16>,
    pub expected_response_time: Option<f64>,
    pub json_path: Option<String>,
    pub expected_json_value: Option<String>,
    pub actual_status_code: Option<u16>,
    pub json_validation_result: Option<bool>,
}

/// Settings for a DNS probe.
#[derive(Debug, Clone, PartialEq)]
pub struct DnsProbe {
    pub hostname: String,
    pub server: IpAddr,
    pub record_type: DnsRecordType,
    pub expected: Option<String>,
}

/// Settings for an API endpoint probe.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiProbe {
    pub url: String,
    pub method: String,
    pub headers: HashMap<String, String>,
    pub body: Option<String>,
    pub expected_status: u16,
    pub expected_response_time: Option<f64>,
    pub json_path: Option<String>,
    pub expected_json_value: Option<String>,
}

/// Typed probe description derived from a [`Monitor`].
#[derive(Debug, Clone, PartialEq)]
pub enum CheckTarget {
    Http {
        url: String,
    },
    Ssl {
        domain: String,
        expiry_threshold_days: i64,
    },
    Dns(DnsProbe),
    Port {
        host: String,
        port: u16,
        protocol: PortProtocol,
    },
    Ping {
        host: String,
        count: u32,
        packet_size: u32,
    },
    Keyword {
        url: String,
        keyword: String,
        match_type: KeywordMatchType,
    },
    Api(ApiProbe),
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn normalize_http_url(value: Option<String>, field: &str) -> Result<Option<String>, ValidationError> {
    let Some(raw) = non_empty(value) else {
        return Ok(None);
    };
    let parsed = url::Url::parse(&raw)
        .map_err(|e| ValidationError::new(format!("{} is not a valid URL: {}", field, e)))?;
    if !matches!(parsed.scheme(), "http" | "https") || parsed.host_str().is_none() {
        return Err(ValidationError::new(format!(
            "{} must be an absolute http(s) URL",
            field
        )));
    }
    Ok(Some(parsed.to_string()))
}

impl Monitor {
    /// Validates a create request and fills in defaults.
    pub fn from_create(req: MonitorCreate) -> Result<Self, ValidationError> {
        let name = req.name.trim().to_string();
        if name.is_empty() {
            return Err(ValidationError::new("Monitor name must not be empty"));
        }

        let url = normalize_http_url(req.url, "url")?;
        let keyword_url = normalize_http_url(req.keyword_url, "keyword_url")?;
        let api_url = normalize_http_url(req.api_url, "api_url")?;
        let ssl_domain = non_empty(req.ssl_domain);
        let dns_hostname = non_empty(req.dns_hostname);
        let port_host = non_empty(req.port_host);
        let ping_host = non_empty(req.ping_host);
        let keyword_text = req.keyword_text.filter(|k| !k.is_empty());

        let check_interval = req.check_interval.unwrap_or(DEFAULT_CHECK_INTERVAL);
        if !(1..=MAX_CHECK_INTERVAL).contains(&check_interval) {
            return Err(ValidationError::new(format!(
                "check_interval must be between 1 and {} seconds",
                MAX_CHECK_INTERVAL
            )));
        }
        let timeout = req.timeout.unwrap_or(DEFAULT_TIMEOUT);
        if !(1..=MAX_TIMEOUT).contains(&timeout) {
            return Err(ValidationError::new(format!(
                "timeout must be between 1 and {} seconds",
                MAX_TIMEOUT
            )));
        }
        let ping_count = req.ping_count.unwrap_or(DEFAULT_PING_COUNT);
        if !(1..=MAX_PING_COUNT).contains(&ping_count) {
            return Err(ValidationError::new(format!(
                "ping_count must be between 1 and {}",
                MAX_PING_COUNT
            )));
        }
        let ping_packet_size = req.ping_packet_size.unwrap_or(DEFAULT_PING_PACKET_SIZE);
        if ping_packet_size > MAX_PING_PACKET_SIZE {
            return Err(ValidationError::new(format!(
                "ping_packet_size must be at most {} bytes",
                MAX_PING_PACKET_SIZE
            )));
        }

        let keyword_match_type = req.keyword_match_type.unwrap_or_default();
        let dns_server = non_empty(req.dns_server).unwrap_or_else(|| DEFAULT_DNS_SERVER.to_string());

        match req.monitor_type {
            MonitorType::Http | MonitorType::Https => {
                if url.is_none() {
                    return Err(ValidationError::new("URL is required for HTTP/HTTPS monitors"));
                }
            }
            MonitorType::Ssl => {
                if ssl_domain.is_none() {
                    return Err(ValidationError::new("SSL domain is required for SSL monitors"));
                }
            }
            MonitorType::Dns => {
                if dns_hostname.is_none() {
                    return Err(ValidationError::new("DNS hostname is required for DNS monitors"));
                }
                if dns_server.parse::<IpAddr>().is_err() {
                    return Err(ValidationError::new(format!(
                        "DNS server must be an IP address (got '{}')",
                        dns_server
                    )));
                }
            }
            MonitorType::Port => {
                if port_host.is_none() || req.port_number.unwrap_or(0) == 0 {
                    return Err(ValidationError::new(
                        "Port host and number are required for port monitors",
                    ));
                }
            }
            MonitorType::Ping => {
                if ping_host.is_none() {
                    return Err(ValidationError::new("Ping host is required for ping monitors"));
                }
            }
            MonitorType::Keyword => {
                if keyword_url.is_none() || keyword_text.is_none() {
                    return Err(ValidationError::new(
                        "Keyword URL and text are required for keyword monitors",
                    ));
                }
                if keyword_match_type == KeywordMatchType::Regex {
                    if let Some(pattern) = keyword_text.as_deref() {
                        regex::Regex::new(pattern).map_err(|e| {
                            ValidationError::new(format!("Invalid keyword regex: {}", e))
                        })?;
                    }
                }
            }
            MonitorType::Api => {
                if api_url.is_none() {
                    return Err(ValidationError::new("API URL is required for API monitors"));
                }
            }
        }

        Ok(Self {
            id: uuid::Uuid::new_v4().to_string(),
            name,
            url,
            check_interval,
            monitor_type: req.monitor_type,
            timeout,
            status: MonitorStatus::Unknown,
            last_checked: None,
            response_time: None,
            created_at: Utc::now(),
            uptime_percentage: 0.0,

            ssl_domain,
            ssl_expiry_threshold: Some(
                req.ssl_expiry_threshold
                    .unwrap_or(DEFAULT_SSL_EXPIRY_THRESHOLD),
            ),
            ssl_expires_at: None,

            dns_hostname,
            dns_server: Some(dns_server),
            dns_record_type: Some(req.dns_record_type.unwrap_or_default()),
            expected_dns_result: non_empty(req.expected_dns_result),

            port_host,
            port_number: req.port_number,
            port_protocol: Some(req.port_protocol.unwrap_or_default()),

            ping_host,
            ping_count: Some(ping_count),
            ping_packet_size: Some(ping_packet_size),
            ping_packet_loss: None,

            keyword_url,
            keyword_text,
            keyword_match_type: Some(keyword_match_type),
            keyword_found: None,

            api_url,
            api_method: Some(
                non_empty(req.api_method)
                    .map(|m| m.to_ascii_uppercase())
                    .unwrap_or_else(|| DEFAULT_API_METHOD.to_string()),
            ),
            api_headers: req.api_headers,
            api_body: req.api_body,
            expected_status_code: Some(req.expected_status_code.unwrap_or(DEFAULT_EXPECTED_STATUS)),
            expected_response_time: req.expected_response_time,
            json_path: non_empty(req.json_path),
            expected_json_value: req.expected_json_value,
            actual_status_code: None,
            json_validation_result: None,
        })
    }

    /// Typed probe description; `Err` names the missing setting.
    pub fn target(&self) -> Result<CheckTarget, String> {
        fn required<'a>(value: &'a Option<String>, what: &str) -> Result<&'a str, String> {
            value
                .as_deref()
                .filter(|v| !v.is_empty())
                .ok_or_else(|| format!("Monitor has no {}", what))
        }

        Ok(match self.monitor_type {
            MonitorType::Http | MonitorType::Https => CheckTarget::Http {
                url: required(&self.url, "URL")?.to_string(),
            },
            MonitorType::Ssl => CheckTarget::Ssl {
                domain: required(&self.ssl_domain, "SSL domain")?.to_string(),
                expiry_threshold_days: self
                    .ssl_expiry_threshold
                    .unwrap_or(DEFAULT_SSL_EXPIRY_THRESHOLD),
            },
            MonitorType::Dns => {
                let server = self.dns_server.as_deref().unwrap_or(DEFAULT_DNS_SERVER);
                CheckTarget::Dns(DnsProbe {
                    hostname: required(&self.dns_hostname, "DNS hostname")?.to_string(),
                    server: server
                        .parse()
                        .map_err(|_| format!("Invalid DNS server address '{}'", server))?,
                    record_type: self.dns_record_type.unwrap_or_default(),
                    expected: self.expected_dns_result.clone().filter(|e| !e.is_empty()),
                })
            }
            MonitorType::Port => CheckTarget::Port {
                host: required(&self.port_host, "port host")?.to_string(),
                port: self
                    .port_number
                    .filter(|p| *p != 0)
                    .ok_or_else(|| "Monitor has no port number".to_string())?,
                protocol: self.port_protocol.unwrap_or_default(),
            },
            MonitorType::Ping => CheckTarget::Ping {
                host: required(&self.ping_host, "ping host")?.to_string(),
                count: self.ping_count.unwrap_or(DEFAULT_PING_COUNT).max(1),
                packet_size: self.ping_packet_size.unwrap_or(DEFAULT_PING_PACKET_SIZE),
            },
            MonitorType::Keyword => CheckTarget::Keyword {
                url: required(&self.keyword_url, "keyword URL")?.to_string(),
                keyword: required(&self.keyword_text, "keyword text")?.to_string(),
                match_type: self.keyword_match_type.unwrap_or_default(),
            },
            MonitorType::Api => CheckTarget::Api(ApiProbe {
                url: required(&self.api_url, "API URL")?.to_string(),
                method: self
                    .api_method
                    .clone()
                    .unwrap_or_else(|| DEFAULT_API_METHOD.to_string()),
                headers: self.api_headers.clone().unwrap_or_default(),
                body: self.api_body.clone(),
                expected_status: self.expected_status_code.unwrap_or(DEFAULT_EXPECTED_STATUS),
                expected_response_time: self.expected_response_time,
                json_path: self.json_path.clone(),
                expected_json_value: self.expected_json_value.clone(),
            }),
        })
    }

    /// An interval too large to represent is never due again.
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        let Some(last) = self.last_checked else {
            return true;
        };
        match i64::try_from(self.check_interval)
            .ok()
            .and_then(Duration::try_seconds)
        {
            Some(interval) => now.signed_duration_since(last) >= interval,
            None => false,
        }
    }

    /// The most descriptive target string, for alert emails.
    pub fn display_target(&self) -> String {
        [
            &self.url,
            &self.ssl_domain,
            &self.dns_hostname,
            &self.port_host,
            &self.ping_host,
            &self.keyword_url,
            &self.api_url,
        ]
        .into_iter()
        .flatten()
        .find(|v| !v.is_empty())
        .cloned()
        .unwrap_or_else(|| "N/A".to_string())
    }

    pub fn apply_outcome(&mut self, outcome: &CheckOutcome, now: DateTime<Utc>) {
        self.last_checked = Some(now);
        self.status = outcome.status;
        self.response_time = outcome.response_time;

        let details = &outcome.details;
        if details.ssl_expires_at.is_some() {
            self.ssl_expires_at = details.ssl_expires_at;
        }
        if details.ping_packet_loss.is_some() {
            self.ping_packet_loss = details.ping_packet_loss;
        }
        if details.keyword_found.is_some() {
            self.keyword_found = details.keyword_found;
        }
        if details.api_status_code.is_some() {
            self.actual_status_code = details.api_status_code;
            self.json_validation_result = details.json_validation_passed;
        }
    }
}
