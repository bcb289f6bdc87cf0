//! DNS resolution probe against a chosen nameserver.

use super::elapsed_secs;
use crate::domain::{CheckDetails, CheckOutcome, DnsProbe, DnsRecordType};
use hickory_resolver::config::{NameServerConfigGroup, ResolverConfig, ResolverOpts};
use hickory_resolver::error::{ResolveError, ResolveErrorKind};
use hickory_resolver::proto::op::ResponseCode;
use hickory_resolver::proto::rr::RecordType;
use hickory_resolver::TokioAsyncResolver;
use std::time::{Duration, Instant};

const DNS_PORT: u16 = 53;

fn record_type(kind: DnsRecordType) -> RecordType {
    match kind {
        DnsRecordType::A => RecordType::A,
        DnsRecordType::AAAA => RecordType::AAAA,
        DnsRecordType::CNAME => RecordType::CNAME,
        DnsRecordType::MX => RecordType::MX,
        DnsRecordType::NS => RecordType::NS,
        DnsRecordType::TXT => RecordType::TXT,
    }
}

fn resolver_for(probe: &DnsProbe, timeout: Duration) -> TokioAsyncResolver {
    let nameservers = NameServerConfigGroup::from_ips_clear(&[probe.server], DNS_PORT, true);
    let config = ResolverConfig::from_parts(None, vec![], nameservers);
    let mut opts = ResolverOpts::default();
    opts.timeout = timeout;
    opts.attempts = 1;
    opts.cache_size = 0;
    TokioAsyncResolver::tokio(config, opts)
}

fn describe_error(err: &ResolveError) -> String {
    match err.kind() {
        ResolveErrorKind::NoRecordsFound {
            response_code: ResponseCode::NXDomain,
            ..
        } => "Domain does not exist".to_string(),
        ResolveErrorKind::Timeout => "DNS resolution timeout".to_string(),
        _ => err.to_string(),
    }
}

/// Compares the rendered answers with the expected fragment, if any.
pub fn evaluate_answers(resolved: String, expected: Option<&str>, response_time: f64) -> CheckOutcome {
    let outcome = match expected {
        Some(expected) if !resolved.contains(expected) => CheckOutcome::down(
            Some(response_time),
            format!("Expected '{}' but got '{}'", expected, resolved),
        ),
        _ => CheckOutcome::up(Some(response_time)),
    };
    outcome.with_details(CheckDetails {
        dns_resolution_time: Some(response_time),
        dns_result: Some(resolved),
        ..Default::default()
    })
}

pub async fn check_resolution(probe: &DnsProbe, timeout: Duration) -> CheckOutcome {
    let start = Instant::now();
    let resolver = resolver_for(probe, timeout);
    let lookup = tokio::time::timeout(
        timeout,
        resolver.lookup(probe.hostname.as_str(), record_type(probe.record_type)),
    )
    .await;

    let response_time = elapsed_secs(start);
    match lookup {
        Err(_) => CheckOutcome::down(Some(response_time), "DNS resolution timeout"),
        Ok(Err(err)) => CheckOutcome::down(Some(response_time), describe_error(&err)),
        Ok(Ok(answers)) => {
            let resolved = answers
                .iter()
                .map(|rdata| rdata.to_string())
                .collect::<Vec<_>>()
                .join(", ");
            evaluate_answers(resolved, probe.expected.as_deref(), response_time)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::MonitorStatus;

    #[test]
    fn expected_fragment_must_appear() {
        let ok = evaluate_answers("93.184.216.34".to_string(), Some("93.184"), 0.05);
        assert_eq!(ok.status, MonitorStatus::Up);
        assert_eq!(ok.details.dns_result.as_deref(), Some("93.184.216.34"));
        assert_eq!(ok.details.dns_resolution_time, Some(0.05));

        let bad = evaluate_answers("10.0.0.1, 10.0.0.2".to_string(), Some("93.184"), 0.05);
        assert_eq!(bad.status, MonitorStatus::Down);
        assert_eq!(
            bad.error.as_deref(),
            Some("Expected '93.184' but got '10.0.0.1, 10.0.0.2'")
        );
    }

    #[test]
    fn no_expectation_is_up() {
        let outcome = evaluate_answers("mail.example.com.".to_string(), None, 0.01);
        assert_eq!(outcome.status, MonitorStatus::Up);
        assert!(outcome.error.is_none());
    }

    #[test]
    fn record_types_map_one_to_one() {
        assert_eq!(record_type(DnsRecordType::AAAA), RecordType::AAAA);
        assert_eq!(record_type(DnsRecordType::TXT), RecordType::TXT);
    }
}
