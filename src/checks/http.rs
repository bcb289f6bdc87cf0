use super::{elapsed_secs, http_client};
use crate::domain::CheckOutcome;
use std::time::{Duration, Instant};

/// GET `url`; only a 200 counts as up.
pub async fn check_url(url: &str, timeout: Duration) -> CheckOutcome {
    let start = Instant::now();
    let client = match http_client(timeout) {
        Ok(c) => c,
        Err(e) => return CheckOutcome::down(None, e.to_string()),
    };

    match client.get(url).send().await {
        Ok(response) => {
            let rt = Some(elapsed_secs(start));
            let status = response.status();
            if status == reqwest::StatusCode::OK {
                CheckOutcome::up(rt)
            } else {
                CheckOutcome::down(rt, format!("HTTP {}", status.as_u16()))
            }
        }
        Err(e) if e.is_timeout() => CheckOutcome::down(Some(elapsed_secs(start)), "Timeout"),
        Err(e) => CheckOutcome::down(Some(elapsed_secs(start)), e.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::MonitorStatus;
    use httpmock::prelude::*;

    #[tokio::test]
    async fn ok_is_up() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET).path("/");
                then.status(200).body("hello");
            })
            .await;

        let outcome = check_url(&server.url("/"), Duration::from_secs(5)).await;
        mock.assert_async().await;
        assert_eq!(outcome.status, MonitorStatus::Up);
        assert!(outcome.error.is_none());
        assert!(outcome.response_time.is_some());
    }

    #[tokio::test]
    async fn non_200_is_down_with_code() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/fleet");
                then.status(503);
            })
            .await;

        let outcome = check_url(&server.url("/fleet"), Duration::from_secs(5)).await;
        assert_eq!(outcome.status, MonitorStatus::Down);
        assert_eq!(outcome.error.as_deref(), Some("HTTP 503"));
    }

    #[tokio::test]
    async fn slow_response_times_out() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/slow");
                then.status(200).delay(Duration::from_secs(3));
            })
            .await;

        let outcome = check_url(&server.url("/slow"), Duration::from_millis(300)).await;
        assert_eq!(outcome.status, MonitorStatus::Down);
        assert_eq!(outcome.error.as_deref(), Some("Timeout"));
    }
}
