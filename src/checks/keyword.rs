//! Page content probe: fetch a page and look for a keyword.

use super::{elapsed_secs, http_client};
use crate::domain::{CheckDetails, CheckOutcome, KeywordMatchType};
use regex::Regex;
use std::time::{Duration, Instant};

/// `(found, match_count)` for `keyword` in `body`.
pub fn match_keyword(body: &str, keyword: &str, match_type: KeywordMatchType) -> Result<(bool, u64), regex::Error> {
    let count = match match_type {
        KeywordMatchType::Contains => body.matches(keyword).count() as u64,
        KeywordMatchType::Exact => u64::from(body.trim() == keyword),
        KeywordMatchType::Regex => Regex::new(keyword)?.find_iter(body).count() as u64,
    };
    Ok((count > 0, count))
}

fn not_found(response_time: f64, error: String) -> CheckOutcome {
    CheckOutcome::down(Some(response_time), error).with_details(CheckDetails {
        keyword_found: Some(false),
        keyword_match_count: Some(0),
        ..Default::default()
    })
}

pub async fn check_keyword(
    url: &str,
    keyword: &str,
    match_type: KeywordMatchType,
    timeout: Duration,
) -> CheckOutcome {
    let start = Instant::now();
    let client = match http_client(timeout) {
        Ok(c) => c,
        Err(e) => return CheckOutcome::down(None, e.to_string()),
    };

    let response = match client.get(url).send().await {
        Ok(r) => r,
        Err(e) if e.is_timeout() => return not_found(elapsed_secs(start), "Timeout".to_string()),
        Err(e) => return not_found(elapsed_secs(start), e.to_string()),
    };
    let status = response.status();
    if status.as_u16() != 200 {
        return not_found(elapsed_secs(start), format!("HTTP {}", status.as_u16()));
    }

    let body = match response.text().await {
        Ok(b) => b,
        Err(e) if e.is_timeout() => return not_found(elapsed_secs(start), "Timeout".to_string()),
        Err(e) => return not_found(elapsed_secs(start), e.to_string()),
    };
    let response_time = elapsed_secs(start);

    let (found, count) = match match_keyword(&body, keyword, match_type) {
        Ok(m) => m,
        Err(e) => return not_found(response_time, format!("Invalid keyword regex: {}", e)),
    };
    let outcome = if found {
        CheckOutcome::up(Some(response_time))
    } else {
        CheckOutcome::down(Some(response_time), format!("Keyword '{}' not found", keyword))
    };
    outcome.with_details(CheckDetails {
        keyword_found: Some(found),
        keyword_match_count: Some(count),
        ..Default::default()
    })
}
