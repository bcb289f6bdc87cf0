//! TLS certificate expiry probe.

use super::elapsed_secs;
use crate::domain::{CheckDetails, CheckOutcome};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::TcpStream;
use tokio_rustls::rustls::{self, pki_types::ServerName, RootCertStore};
use tokio_rustls::TlsConnector;

const TLS_PORT: u16 = 443;
const SECONDS_PER_DAY: i64 = 86_400;

/// `https://host:8443/path` -> `host`.
pub fn normalize_domain(input: &str) -> String {
    let trimmed = input.trim();
    let without_scheme = trimmed
        .strip_prefix("https://")
        .or_else(|| trimmed.strip_prefix("http://"))
        .unwrap_or(trimmed);
    let host = without_scheme.split('/').next().unwrap_or(without_scheme);
    host.split(':').next().unwrap_or(host).to_string()
}

/// Whole days from `now` until `expiry`, rounded toward negative infinity.
pub fn days_until(expiry: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    (expiry - now).num_seconds().div_euclid(SECONDS_PER_DAY)
}

/// Maps the certificate's remaining lifetime to a status.
pub fn classify_expiry(
    expiry: DateTime<Utc>,
    now: DateTime<Utc>,
    threshold_days: i64,
    response_time: Option<f64>,
) -> CheckOutcome {
    let days = days_until(expiry, now);
    let outcome = if days < 0 {
        CheckOutcome::down(
            response_time,
            format!("Certificate expired {} days ago", days.abs()),
        )
    } else if days <= threshold_days {
        CheckOutcome::warning(response_time, format!("Certificate expires in {} days", days))
    } else {
        CheckOutcome::up(response_time)
    };
    outcome.with_details(CheckDetails {
        ssl_expires_at: Some(expiry),
        ssl_days_until_expiry: Some(days),
        ..Default::default()
    })
}

fn tls_connector() -> Result<TlsConnector, rustls::Error> {
    let roots = RootCertStore {
        roots: webpki_roots::TLS_SERVER_ROOTS.to_vec(),
    };
    let config = rustls::ClientConfig::builder_with_provider(Arc::new(
        rustls::crypto::ring::default_provider(),
    ))
    .with_safe_default_protocol_versions()?
    .with_root_certificates(roots)
    .with_no_client_auth();
    Ok(TlsConnector::from(Arc::new(config)))
}

async fn fetch_expiry(domain: &str) -> Result<DateTime<Utc>, String> {
    let connector = tls_connector().map_err(|e| e.to_string())?;
    let server_name = ServerName::try_from(domain.to_string()).map_err(|e| e.to_string())?;
    let tcp = TcpStream::connect((domain, TLS_PORT))
        .await
        .map_err(|e| e.to_string())?;
    let tls = connector
        .connect(server_name, tcp)
        .await
        .map_err(|e| e.to_string())?;

    let (_, session) = tls.get_ref();
    let leaf = session
        .peer_certificates()
        .and_then(|certs| certs.first())
        .ok_or_else(|| "Server presented no certificate".to_string())?;
    let (_, cert) = x509_parser::parse_x509_certificate(leaf.as_ref())
        .map_err(|e| format!("Invalid certificate: {}", e))?;
    let not_after = cert.validity().not_after.timestamp();
    DateTime::<Utc>::from_timestamp(not_after, 0)
        .ok_or_else(|| format!("Certificate expiry out of range: {}", not_after))
}

/// TLS-connects to `domain:443` and checks how long the leaf certificate has left.
pub async fn check_certificate(domain: &str, timeout: Duration, threshold_days: i64) -> CheckOutcome {
    let start = Instant::now();
    let domain = normalize_domain(domain);

    match tokio::time::timeout(timeout, fetch_expiry(&domain)).await {
        Err(_) => CheckOutcome::down(Some(elapsed_secs(start)), "Connection timeout"),
        Ok(Err(reason)) => CheckOutcome::down(Some(elapsed_secs(start)), reason),
        Ok(Ok(expiry)) => {
            classify_expiry(expiry, Utc::now(), threshold_days, Some(elapsed_secs(start)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::MonitorStatus;
    use chrono::TimeDelta;

    #[test]
    fn strips_scheme_path_and_port() {
        assert_eq!(normalize_domain("https://moracity.com/cars?x=1"), "moracity.com");
        assert_eq!(normalize_domain("http://moracity.com:8443"), "moracity.com");
        assert_eq!(normalize_domain(" moracity.com "), "moracity.com");
    }

    #[test]
    fn days_floor_toward_negative_infinity() {
        let now = Utc::now();
        assert_eq!(days_until(now + TimeDelta::hours(36), now), 1);
        assert_eq!(days_until(now - TimeDelta::hours(1), now), -1);
        assert_eq!(days_until(now - TimeDelta::hours(25), now), -2);
    }

    #[test]
    fn classify_expiry_bands() {
        let now = Utc::now();
        let up = classify_expiry(now + TimeDelta::days(90), now, 30, None);
        assert_eq!(up.status, MonitorStatus::Up);
        assert_eq!(up.details.ssl_days_until_expiry, Some(90));

        let warn = classify_expiry(now + TimeDelta::days(10) + TimeDelta::hours(1), now, 30, None);
        assert_eq!(warn.status, MonitorStatus::Warning);
        assert_eq!(warn.error.as_deref(), Some("Certificate expires in 10 days"));

        let expired = classify_expiry(now - TimeDelta::days(3), now, 30, None);
        assert_eq!(expired.status, MonitorStatus::Down);
        assert_eq!(expired.error.as_deref(), Some("Certificate expired 3 days ago"));
    }
}
