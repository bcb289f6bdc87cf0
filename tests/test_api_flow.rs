//! End-to-end API flow over a real listener:
//! 1) Service banner, health and docs endpoints.
//! 2) Monitor create / list / manual check / logs / history / dashboard.
//! 3) Alert settings create / duplicate / read / delete.
//! 4) Monitor delete cascades to logs and alert settings.
//!
//! Uses the in-memory store and a mock HTTP target, so no database or network is needed.

use httpmock::prelude::*;
use serde_json::{json, Value};
use statustrackr::{transport, AppConfig, DisabledNotifier, MemoryStore, MonitoringService};
use std::net::SocketAddr;
use std::sync::Arc;

struct TestServer {
    base_url: String,
    monitoring: Arc<MonitoringService>,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn start() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_lookup(|key| match key {
            "CHECK_CYCLE_SECS" => Some("3600".to_string()),
            _ => None,
        })?);
        let store = Arc::new(MemoryStore::new());
        let monitoring = Arc::new(MonitoringService::new(
            store.clone(),
            Arc::new(DisabledNotifier),
            &config,
        ));
        let state = transport::http::AppState {
            store,
            monitoring: monitoring.clone(),
            config,
        };
        let app = transport::http::build_app(state);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let addr: SocketAddr = listener.local_addr()?;
        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Ok(Self {
            base_url: format!("http://{}", addr),
            monitoring,
            handle,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn shutdown(self) {
        self.monitoring.stop().await;
        self.handle.abort();
        let _ = self.handle.await;
    }
}

fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(30))
        .build()
        .unwrap()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_service_endpoints() -> anyhow::Result<()> {
    let server = TestServer::start().await?;
    let client = client();

    let banner: Value = client.get(server.url("/")).send().await?.json().await?;
    assert_eq!(banner["message"], "StatusTrackr Backend API");
    assert_eq!(banner["status"], "running");
    assert_eq!(banner["database"], "connected");
    assert_eq!(banner["endpoints"]["api_docs"], "/docs");

    let health = client.get(server.url("/health")).send().await?;
    assert_eq!(health.status(), 200);
    let health: Value = health.json().await?;
    assert_eq!(health["status"], "healthy");
    assert_eq!(health["storage"], "memory");
    assert_eq!(health["mongo_url_configured"], false);
    assert_eq!(health["monitoring_active"], false);

    for path in ["/api/", "/api"] {
        let body: Value = client.get(server.url(path)).send().await?.json().await?;
        assert_eq!(
            body,
            json!({"message": "Uptime Monitoring API", "status": "running"})
        );
    }

    let doc: Value = client
        .get(server.url("/openapi.json"))
        .send()
        .await?
        .json()
        .await?;
    assert!(doc["paths"]["/api/monitors"].is_object());
    assert!(doc["paths"]["/api/alerts/{monitor_id}"].is_object());

    let cors = client
        .get(server.url("/api/"))
        .header("Origin", "https://app.example.com")
        .send()
        .await?;
    assert_eq!(
        cors.headers()
            .get("access-control-allow-origin")
            .and_then(|v| v.to_str().ok()),
        Some("*")
    );

    server.shutdown().await;
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_monitor_and_alert_lifecycle() -> anyhow::Result<()> {
    let target = MockServer::start_async().await;
    target
        .mock_async(|when, then| {
            when.method(GET).path("/");
            then.status(200).body("ok");
        })
        .await;

    let server = TestServer::start().await?;
    let client = client();

    // --- Validation ---
    let missing_url = client
        .post(server.url("/api/monitors"))
        .json(&json!({"name": "No URL", "monitor_type": "http"}))
        .send()
        .await?;
    assert_eq!(missing_url.status(), 400);
    let body: Value = missing_url.json().await?;
    assert_eq!(body["detail"], "URL is required for HTTP/HTTPS monitors");

    let malformed = client
        .post(server.url("/api/monitors"))
        .header("content-type", "application/json")
        .body("{\"name\": ")
        .send()
        .await?;
    assert_eq!(malformed.status(), 422);
    let body: Value = malformed.json().await?;
    assert!(body["detail"].is_string());

    // --- Create ---
    let created = client
        .post(server.url("/api/monitors"))
        .json(&json!({
            "name": "Landing page",
            "url": target.url("/"),
            "monitor_type": "http",
            "check_interval": 60
        }))
        .send()
        .await?;
    assert_eq!(created.status(), 200);
    let monitor: Value = created.json().await?;
    let id = monitor["id"].as_str().unwrap().to_string();
    assert_eq!(monitor["check_interval"], 60);
    assert_eq!(monitor["timeout"], 10);
    assert!(server.monitoring.is_running());

    let listed: Value = client
        .get(server.url("/api/monitors"))
        .send()
        .await?
        .json()
        .await?;
    assert!(listed
        .as_array()
        .unwrap()
        .iter()
        .any(|m| m["id"] == id.as_str()));

    let fetched = client.get(server.url(&format!("/api/monitors/{}", id))).send().await?;
    assert_eq!(fetched.status(), 200);

    let unknown = client.get(server.url("/api/monitors/does-not-exist")).send().await?;
    assert_eq!(unknown.status(), 404);
    let body: Value = unknown.json().await?;
    assert_eq!(body["detail"], "Monitor not found");

    // --- Manual check ---
    let check: Value = client
        .post(server.url(&format!("/api/monitors/{}/check", id)))
        .send()
        .await?
        .json()
        .await?;
    assert_eq!(check["status"], "up");
    assert!(check["error"].is_null());
    assert!(check["response_time"].as_f64().unwrap() >= 0.0);

    let stored: Value = client
        .get(server.url(&format!("/api/monitors/{}", id)))
        .send()
        .await?
        .json()
        .await?;
    assert_eq!(stored["status"], "up");
    assert_eq!(stored["uptime_percentage"], 100.0);
    assert!(stored["last_checked"].is_string());

    let logs: Value = client
        .get(server.url(&format!("/api/monitors/{}/logs", id)))
        .send()
        .await?
        .json()
        .await?;
    let logs = logs.as_array().unwrap();
    assert!(!logs.is_empty());
    assert!(logs.iter().all(|l| l["monitor_id"] == id.as_str()));

    let history: Value = client
        .get(server.url(&format!("/api/monitors/{}/history?hours=48", id)))
        .send()
        .await?
        .json()
        .await?;
    assert_eq!(history[0]["uptime_percentage"], 100.0);

    let bad_window = client
        .get(server.url(&format!("/api/monitors/{}/history?hours=0", id)))
        .send()
        .await?;
    assert_eq!(bad_window.status(), 400);

    let stats: Value = client
        .get(server.url("/api/dashboard/stats"))
        .send()
        .await?
        .json()
        .await?;
    assert_eq!(stats["total_monitors"], 1);
    assert_eq!(stats["monitors_up"], 1);
    assert_eq!(stats["monitors_down"], 0);

    // --- Alerts ---
    let alert = client
        .post(server.url("/api/alerts"))
        .json(&json!({"monitor_id": id, "email_address": "ops@example.com"}))
        .send()
        .await?;
    assert_eq!(alert.status(), 200);
    let alert: Value = alert.json().await?;
    assert_eq!(alert["alert_on_down"], true);
    assert_eq!(alert["alert_on_up"], true);
    assert_eq!(alert["email_enabled"], true);

    let duplicate = client
        .post(server.url("/api/alerts"))
        .json(&json!({"monitor_id": id, "email_address": "other@example.com"}))
        .send()
        .await?;
    assert_eq!(duplicate.status(), 400);
    let body: Value = duplicate.json().await?;
    assert_eq!(body["detail"], "Alert settings already exist for this monitor");

    let orphan = client
        .post(server.url("/api/alerts"))
        .json(&json!({"monitor_id": "nope", "email_address": "ops@example.com"}))
        .send()
        .await?;
    assert_eq!(orphan.status(), 404);

    let fetched_alert: Value = client
        .get(server.url(&format!("/api/alerts/{}", id)))
        .send()
        .await?
        .json()
        .await?;
    assert_eq!(fetched_alert["email_address"], "ops@example.com");

    // --- Delete cascades ---
    let deleted: Value = client
        .delete(server.url(&format!("/api/monitors/{}", id)))
        .send()
        .await?
        .json()
        .await?;
    assert_eq!(deleted["message"], "Monitor deleted successfully");

    let gone_alert = client.get(server.url(&format!("/api/alerts/{}", id))).send().await?;
    assert_eq!(gone_alert.status(), 404);
    let body: Value = gone_alert.json().await?;
    assert_eq!(body["detail"], "Alert settings not found");

    let gone_logs: Value = client
        .get(server.url(&format!("/api/monitors/{}/logs", id)))
        .send()
        .await?
        .json()
        .await?;
    assert_eq!(gone_logs, json!([]));

    let second_delete = client
        .delete(server.url(&format!("/api/monitors/{}", id)))
        .send()
        .await?;
    assert_eq!(second_delete.status(), 404);

    server.shutdown().await;
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_failed_check_and_alert_validation() -> anyhow::Result<()> {
    let target = MockServer::start_async().await;
    target
        .mock_async(|when, then| {
            when.method(GET).path("/broken");
            then.status(500);
        })
        .await;

    let server = TestServer::start().await?;
    let client = client();

    let monitor: Value = client
        .post(server.url("/api/monitors"))
        .json(&json!({"name": "Broken", "url": target.url("/broken"), "monitor_type": "https"}))
        .send()
        .await?
        .json()
        .await?;
    let id = monitor["id"].as_str().unwrap().to_string();

    let check: Value = client
        .post(server.url(&format!("/api/monitors/{}/check", id)))
        .send()
        .await?
        .json()
        .await?;
    assert_eq!(check["status"], "down");
    assert_eq!(check["error"], "HTTP 500");

    let missing = client
        .post(server.url("/api/monitors/unknown/check"))
        .send()
        .await?;
    assert_eq!(missing.status(), 404);

    let bad_email = client
        .post(server.url("/api/alerts"))
        .json(&json!({"monitor_id": id, "email_address": "not-an-address"}))
        .send()
        .await?;
    assert_eq!(bad_email.status(), 400);

    let delete_missing = client
        .delete(server.url(&format!("/api/alerts/{}", id)))
        .send()
        .await?;
    assert_eq!(delete_missing.status(), 404);

    let bad_hours = client
        .get(server.url(&format!("/api/monitors/{}/logs?hours=abc", id)))
        .send()
        .await?;
    assert_eq!(bad_hours.status(), 400);
    assert_eq!(
        bad_hours
            .headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok()),
        Some("application/json")
    );
    let body: Value = bad_hours.json().await?;
    assert!(body["detail"]
        .as_str()
        .unwrap()
        .starts_with("Invalid query string"));

    let huge_interval = client
        .post(server.url("/api/monitors"))
        .json(&json!({
            "name": "Forever",
            "url": target.url("/broken"),
            "monitor_type": "http",
            "check_interval": 10_000_000_000_000_000u64
        }))
        .send()
        .await?;
    assert_eq!(huge_interval.status(), 400);

    // Simultaneous subscriptions for one monitor: exactly one wins.
    let attempts = (0..6).map(|i| {
        client
            .post(server.url("/api/alerts"))
            .json(&json!({"monitor_id": id, "email_address": format!("ops{}@example.com", i)}))
            .send()
    });
    let mut created = 0;
    for response in futures_util::future::join_all(attempts).await {
        let response = response?;
        match response.status().as_u16() {
            200 => created += 1,
            400 => {
                let body: Value = response.json().await?;
                assert_eq!(body["detail"], "Alert settings already exist for this monitor");
            }
            other => panic!("unexpected status {}", other),
        }
    }
    assert_eq!(created, 1);

    let bad_type = client
        .post(server.url("/api/monitors"))
        .json(&json!({"name": "x", "monitor_type": "smtp"}))
        .send()
        .await?;
    assert_eq!(bad_type.status(), 422);

    server.shutdown().await;
    Ok(())
}
