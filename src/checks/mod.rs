//! One probe per monitor type.
//!
//! Probes never fail: every problem becomes a `down` [`CheckOutcome`] carrying
//! the reason, so the scheduler can log and persist it like any other result.

pub mod api;
pub mod dns;
pub mod http;
pub mod keyword;
pub mod ping;
pub mod port;
pub mod ssl;

use crate::domain::monitor::MAX_TIMEOUT;
use crate::domain::{CheckOutcome, CheckTarget, Monitor};
use std::time::{Duration, Instant};

/// Seconds elapsed since `start`.
pub(crate) fn elapsed_secs(start: Instant) -> f64 {
    start.elapsed().as_secs_f64()
}

/// Shared client builder so every HTTP-based probe behaves the same.
pub(crate) fn http_client(timeout: Duration) -> Result<reqwest::Client, reqwest::Error> {
    reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(concat!("StatusTrackr/", env!("CARGO_PKG_VERSION")))
        .build()
}

/// Runs the probe described by `monitor`.
pub async fn run_check(monitor: &Monitor) -> CheckOutcome {
    let timeout = Duration::from_secs(monitor.timeout.clamp(1, MAX_TIMEOUT));
    let target = match monitor.target() {
        Ok(t) => t,
        Err(reason) => return CheckOutcome::down(None, reason),
    };

    match target {
        CheckTarget::Http { url } => http::check_url(&url, timeout).await,
        CheckTarget::Ssl {
            domain,
            expiry_threshold_days,
        } => ssl::check_certificate(&domain, timeout, expiry_threshold_days).await,
        CheckTarget::Dns(probe) => dns::check_resolution(&probe, timeout).await,
        CheckTarget::Port {
            host,
            port,
            protocol,
        } => port::check_port(&host, port, protocol, timeout).await,
        CheckTarget::Ping {
            host,
            count,
            packet_size,
        } => ping::check_ping(&host, count, packet_size, timeout).await,
        CheckTarget::Keyword {
            url,
            keyword,
            match_type,
        } => keyword::check_keyword(&url, &keyword, match_type, timeout).await,
        CheckTarget::Api(probe) => api::check_endpoint(&probe, timeout).await,
    }
}
