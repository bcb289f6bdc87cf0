//! ICMP reachability via the system `ping` binary.

use crate::domain::{CheckDetails, CheckOutcome};
use regex::Regex;
use std::process::Stdio;
use std::sync::OnceLock;
use std::time::Duration;
use tokio::process::Command;

/// Summary lines of a `ping` run. Times are milliseconds, as printed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PingStats {
    pub packet_loss: Option<f64>,
    pub min_ms: Option<f64>,
    pub avg_ms: Option<f64>,
    pub max_ms: Option<f64>,
}

fn loss_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(\d+(?:\.\d+)?)%").expect("static regex"))
}

fn rtt_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(\d+(?:\.\d+)?)/(\d+(?:\.\d+)?)/(\d+(?:\.\d+)?)").expect("static regex")
    })
}

/// Parses iputils and BSD style summaries.
pub fn parse_ping_output(output: &str) -> PingStats {
    let mut stats = PingStats::default();

    if let Some(line) = output.lines().find(|l| l.contains("packet loss")) {
        stats.packet_loss = loss_pattern()
            .captures(line)
            .and_then(|c| c[1].parse().ok());
    }

    if let Some(line) = output.lines().find(|l| l.contains("min/avg/max")) {
        if let Some(c) = rtt_pattern().captures(line) {
            stats.min_ms = c[1].parse().ok();
            stats.avg_ms = c[2].parse().ok();
            stats.max_ms = c[3].parse().ok();
        }
    }
    stats
}

fn ms_to_secs(ms: Option<f64>) -> Option<f64> {
    ms.map(|v| v / 1000.0)
}

/// Turns an exit status and parsed summary into an outcome.
pub fn evaluate_ping(success: bool, stats: &PingStats, stderr: &str) -> CheckOutcome {
    let loss = stats.packet_loss.unwrap_or(0.0);
    if loss >= 100.0 {
        return CheckOutcome::down(None, "100% packet loss").with_details(CheckDetails {
            ping_packet_loss: Some(loss),
            ..Default::default()
        });
    }
    if !success {
        return CheckOutcome::down(None, format!("Ping failed: {}", stderr.trim()));
    }

    let avg = ms_to_secs(stats.avg_ms);
    let outcome = if loss == 0.0 {
        CheckOutcome::up(avg)
    } else {
        CheckOutcome::warning(avg, format!("{}% packet loss", loss))
    };
    outcome.with_details(CheckDetails {
        ping_packet_loss: Some(loss),
        ping_min_time: ms_to_secs(stats.min_ms),
        ping_max_time: ms_to_secs(stats.max_ms),
        ping_avg_time: avg,
        ..Default::default()
    })
}

/// Overall budget for a run: each echo may wait up to the reply timeout, plus
/// one second between sends.
pub fn run_deadline(count: u32, per_reply_secs: u64) -> Duration {
    let per_echo = per_reply_secs.saturating_add(1);
    Duration::from_secs(per_reply_secs.saturating_add(u64::from(count).saturating_mul(per_echo)))
}

pub async fn check_ping(host: &str, count: u32, packet_size: u32, timeout: Duration) -> CheckOutcome {
    let per_reply = timeout.as_secs().max(1);
    let mut cmd = Command::new("ping");
    cmd.arg("-c")
        .arg(count.to_string())
        .arg("-s")
        .arg(packet_size.to_string())
        .arg("-W")
        .arg(per_reply.to_string())
        .arg(host)
        .stdin(Stdio::null())
        .kill_on_drop(true);

    let output = match tokio::time::timeout(run_deadline(count, per_reply), cmd.output()).await {
        Err(_) => return CheckOutcome::down(None, "Ping timeout"),
        Ok(Err(e)) => return CheckOutcome::down(None, format!("Ping failed: {}", e)),
        Ok(Ok(output)) => output,
    };

    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    let stats = parse_ping_output(&stdout);
    evaluate_ping(output.status.success(), &stats, &stderr)
}
