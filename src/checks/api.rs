//! API endpoint probe: status code, latency budget and an optional JSON field.

use super::{elapsed_secs, http_client};
use crate::domain::{ApiProbe, CheckDetails, CheckOutcome};
use reqwest::Method;
use serde_json::Value;
use std::time::{Duration, Instant};

/// Follows a dotted path. Numeric segments index into arrays.
pub fn lookup_json_path<'a>(root: &'a Value, path: &str) -> Result<&'a Value, String> {
    let mut current = root;
    for segment in path.split('.') {
        current = match current {
            Value::Object(map) => map
                .get(segment)
                .ok_or_else(|| format!("key '{}' not found", segment))?,
            Value::Array(items) => {
                let index: usize = segment
                    .parse()
                    .map_err(|_| format!("'{}' is not an array index", segment))?;
                items
                    .get(index)
                    .ok_or_else(|| format!("index {} out of range", index))?
            }
            other => {
                return Err(format!(
                    "cannot look up '{}' in {}",
                    segment,
                    json_kind(other)
                ))
            }
        };
    }
    Ok(current)
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Strings render as their content, everything else as JSON text.
pub fn render_json_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

pub fn json_value_matches(actual: &Value, expected: &str) -> bool {
    match actual {
        Value::Bool(b) => expected.trim().eq_ignore_ascii_case(&b.to_string()),
        other => render_json_value(other) == expected,
    }
}

fn sends_body(method: &Method) -> bool {
    matches!(*method, Method::POST | Method::PUT | Method::PATCH)
}

fn transport_failure(response_time: f64, error: String) -> CheckOutcome {
    CheckOutcome::down(Some(response_time), error).with_details(CheckDetails {
        api_status_code: Some(0),
        json_validation_passed: Some(false),
        ..Default::default()
    })
}

/// Applies the status, latency and JSON rules, in that order.
pub fn evaluate_response(probe: &ApiProbe, status_code: u16, body: &str, response_time: f64) -> CheckOutcome {
    let details = |passed: bool| CheckDetails {
        api_status_code: Some(status_code),
        api_response_size: Some(body.len() as u64),
        json_validation_passed: Some(passed),
        ..Default::default()
    };

    if status_code != probe.expected_status {
        return CheckOutcome::down(
            Some(response_time),
            format!("Expected status {}, got {}", probe.expected_status, status_code),
        )
        .with_details(details(false));
    }

    if let Some(limit) = probe.expected_response_time.filter(|l| *l > 0.0) {
        if response_time > limit {
            return CheckOutcome::warning(
                Some(response_time),
                format!("Response time {:.2}s exceeds limit {}s", response_time, limit),
            )
            .with_details(details(false));
        }
    }

    if let (Some(path), Some(expected)) = (
        probe.json_path.as_deref().filter(|p| !p.is_empty()),
        probe.expected_json_value.as_deref().filter(|e| !e.is_empty()),
    ) {
        let actual = serde_json::from_str::<Value>(body)
            .map_err(|e| e.to_string())
            .and_then(|json| lookup_json_path(&json, path).map(Value::clone));
        match actual {
            Err(reason) => {
                return CheckOutcome::down(
                    Some(response_time),
                    format!("JSON validation error: {}", reason),
                )
                .with_details(details(false))
            }
            Ok(value) if !json_value_matches(&value, expected) => {
                return CheckOutcome::down(
                    Some(response_time),
                    format!(
                        "JSON validation failed: expected '{}', got '{}'",
                        expected,
                        render_json_value(&value)
                    ),
                )
                .with_details(details(false))
            }
            Ok(_) => {}
        }
    }

    CheckOutcome::up(Some(response_time)).with_details(details(true))
}

pub async fn check_endpoint(probe: &ApiProbe, timeout: Duration) -> CheckOutcome {
    let start = Instant::now();
    let method = match Method::from_bytes(probe.method.to_uppercase().as_bytes()) {
        Ok(m) => m,
        Err(_) => return transport_failure(0.0, format!("Unsupported HTTP method '{}'", probe.method)),
    };
    let client = match http_client(timeout) {
        Ok(c) => c,
        Err(e) => return transport_failure(0.0, e.to_string()),
    };

    let mut request = client.request(method.clone(), &probe.url);
    for (name, value) in &probe.headers {
        request = request.header(name.as_str(), value.as_str());
    }
    if let Some(body) = probe.body.as_ref().filter(|_| sends_body(&method)) {
        request = request.body(body.clone());
    }

    let response = match request.send().await {
        Ok(r) => r,
        Err(e) if e.is_timeout() => return transport_failure(elapsed_secs(start), "Timeout".to_string()),
        Err(e) => return transport_failure(elapsed_secs(start), e.to_string()),
    };
    let response_time = elapsed_secs(start);
    let status_code = response.status().as_u16();
    let body = match response.text().await {
        Ok(b) => b,
        Err(e) => return transport_failure(elapsed_secs(start), e.to_string()),
    };

    evaluate_response(probe, status_code, &body, response_time)
}
