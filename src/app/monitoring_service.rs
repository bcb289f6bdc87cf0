//! The background scheduler that probes monitors and raises alerts.
//!
//! One task ticks every `check_cycle`. Each tick lists the monitors, picks the
//! due ones and probes them with bounded concurrency. The same
//! [`MonitoringService::execute_check`] path serves manual checks from the API,
//! so logs, uptime and alerts behave identically for both. Checks of one
//! monitor never overlap.

use crate::checks;
use crate::domain::{
    is_transition, uptime_percentage, AlertEmail, AlertKind, CheckOutcome, Monitor, UptimeLog,
    UPTIME_WINDOW_HOURS,
};
use crate::error::StoreError;
use crate::infra::config::AppConfig;
use crate::infra::mailer::AlertNotifier;
use crate::storage::{MonitorStore, SortOrder};
use chrono::{TimeDelta, Utc};
use futures_util::StreamExt;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError};
use std::time::Duration;
use tokio::sync::{Mutex, Notify};
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};

pub struct MonitoringService {
    store: Arc<dyn MonitorStore>,
    notifier: Arc<dyn AlertNotifier>,
    check_cycle: Duration,
    max_concurrent_checks: usize,
    brand: String,
    running: AtomicBool,
    shutdown: Notify,
    task: Mutex<Option<JoinHandle<()>>>,
    /// Per-monitor locks, present only while a check holds or waits on them.
    check_locks: std::sync::Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl MonitoringService {
    pub fn new(
        store: Arc<dyn MonitorStore>,
        notifier: Arc<dyn AlertNotifier>,
        config: &AppConfig,
    ) -> Self {
        Self::with_settings(
            store,
            notifier,
            config.check_cycle,
            config.max_concurrent_checks,
            config.brand(),
        )
    }

    pub fn with_settings(
        store: Arc<dyn MonitorStore>,
        notifier: Arc<dyn AlertNotifier>,
        check_cycle: Duration,
        max_concurrent_checks: usize,
        brand: &str,
    ) -> Self {
        Self {
            store,
            notifier,
            check_cycle,
            max_concurrent_checks: max_concurrent_checks.max(1),
            brand: brand.to_string(),
            running: AtomicBool::new(false),
            shutdown: Notify::new(),
            task: Mutex::new(None),
            check_locks: std::sync::Mutex::new(HashMap::new()),
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Spawns the scheduler. A second call while running is a no-op.
    pub async fn start(self: &Arc<Self>) {
        if self.running.swap(true, Ordering::SeqCst) {
            return;
        }
        tracing::info!(
            cycle_secs = self.check_cycle.as_secs(),
            max_concurrent = self.max_concurrent_checks,
            "monitoring service started"
        );
        let service = Arc::clone(self);
        let handle = tokio::spawn(async move { service.run_loop().await });
        *self.task.lock().await = Some(handle);
    }

    /// Signals the scheduler and waits for the current cycle to finish.
    pub async fn stop(&self) {
        if !self.running.swap(false, Ordering::SeqCst) {
            return;
        }
        self.shutdown.notify_one();
        if let Some(handle) = self.task.lock().await.take() {
            if let Err(e) = handle.await {
                tracing::warn!("monitoring task ended abnormally: {}", e);
            }
        }
        tracing::info!("monitoring service stopped");
    }

    async fn run_loop(&self) {
        let mut ticker = interval(self.check_cycle);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    match self.run_cycle().await {
                        Ok(0) => tracing::trace!("no monitors due"),
                        Ok(checked) => tracing::debug!(checked, "monitoring cycle complete"),
                        Err(e) => tracing::error!("monitoring cycle failed: {}", e),
                    }
                }
                _ = self.shutdown.notified() => break,
            }
        }
    }

    /// Probes every due monitor. Returns how many were checked.
    pub async fn run_cycle(&self) -> Result<usize, StoreError> {
        let now = Utc::now();
        let due: Vec<Monitor> = self
            .store
            .list_monitors()
            .await?
            .into_iter()
            .filter(|m| m.is_due(now))
            .collect();
        let count = due.len();

        futures_util::stream::iter(due)
            .for_each_concurrent(self.max_concurrent_checks, |monitor| async move {
                let id = monitor.id.clone();
                if let Err(e) = self.execute_check(monitor).await {
                    tracing::error!(monitor_id = %id, "failed to record check: {}", e);
                }
            })
            .await;
        Ok(count)
    }

    /// Probes one monitor, records the result and alerts on a status change.
    ///
    /// `monitor` only identifies the target: the stored record is re-read
    /// under the monitor's lock, so the previous status is never stale.
    pub async fn execute_check(&self, monitor: Monitor) -> Result<CheckOutcome, StoreError> {
        let id = monitor.id.clone();
        let lock = self.check_lock(&id);
        let result = {
            let _guard = lock.lock().await;
            self.check_and_record(monitor).await
        };
        drop(lock);
        self.release_check_lock(&id);
        result
    }

    fn check_lock(&self, id: &str) -> Arc<Mutex<()>> {
        let mut locks = self
            .check_locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        Arc::clone(locks.entry(id.to_string()).or_default())
    }

    fn release_check_lock(&self, id: &str) {
        let mut locks = self
            .check_locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if locks.get(id).is_some_and(|lock| Arc::strong_count(lock) == 1) {
            locks.remove(id);
        }
    }

    async fn check_and_record(&self, snapshot: Monitor) -> Result<CheckOutcome, StoreError> {
        let mut monitor = self
            .store
            .get_monitor(&snapshot.id)
            .await?
            .unwrap_or(snapshot);
        let previous = monitor.status;
        let outcome = checks::run_check(&monitor).await;
        let now = Utc::now();

        tracing::debug!(
            monitor_id = %monitor.id,
            monitor_type = %monitor.monitor_type,
            status = %outcome.status,
            response_time = ?outcome.response_time,
            "check finished"
        );

        let log = UptimeLog::from_outcome(&monitor.id, &outcome, now);
        monitor.apply_outcome(&outcome, now);
        let window_start = now - TimeDelta::hours(UPTIME_WINDOW_HOURS);
        let mut recent = self
            .store
            .logs_since(&monitor.id, window_start, SortOrder::Ascending)
            .await?;
        recent.push(log.clone());
        if let Some(uptime) = uptime_percentage(&recent) {
            monitor.uptime_percentage = uptime;
        }

        if !self.store.update_monitor(&monitor).await? {
            tracing::debug!(monitor_id = %monitor.id, "monitor deleted during check");
            return Ok(outcome);
        }
        self.store.insert_log(&log).await?;

        if is_transition(previous, outcome.status) {
            tracing::info!(
                monitor = %monitor.name,
                from = %previous,
                to = %outcome.status,
                "status changed"
            );
            self.notify_transition(&monitor, &outcome).await;
        }
        Ok(outcome)
    }

    async fn notify_transition(&self, monitor: &Monitor, outcome: &CheckOutcome) {
        let Some(kind) = AlertKind::for_status(outcome.status) else {
            return;
        };
        if !self.notifier.is_enabled() {
            tracing::debug!(monitor_id = %monitor.id, "alert email disabled, skipping");
            return;
        }

        let subscriptions = match self.store.alerts_for(&monitor.id).await {
            Ok(s) => s,
            Err(e) => {
                tracing::error!(monitor_id = %monitor.id, "failed to load alert settings: {}", e);
                return;
            }
        };

        let email = AlertEmail::render(
            kind,
            &monitor.name,
            &monitor.display_target(),
            outcome.error.as_deref(),
            monitor.last_checked.unwrap_or_else(Utc::now),
            &self.brand,
        );
        for subscription in subscriptions
            .iter()
            .filter(|s| s.wants(outcome.status))
        {
            if let Err(e) = self.notifier.send(&subscription.email_address, &email).await {
                tracing::error!(
                    to = %subscription.email_address,
                    "failed to send alert email: {}",
                    e
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{AlertSettings, AlertSettingsCreate, MonitorCreate, MonitorStatus, MonitorType};
    use crate::error::NotifyError;
    use crate::storage::{MemoryStore, StorageBackend};
    use async_trait::async_trait;
    use chrono::DateTime;
    use httpmock::prelude::*;

    #[derive(Default)]
    struct RecordingNotifier {
        sent: std::sync::Mutex<Vec<(String, AlertEmail)>>,
    }

    impl RecordingNotifier {
        fn subjects(&self) -> Vec<String> {
            self.sent
                .lock()
                .unwrap()
                .iter()
                .map(|(_, e)| e.subject.clone())
                .collect()
        }
    }

    #[async_trait]
    impl AlertNotifier for RecordingNotifier {
        async fn send(&self, to: &str, email: &AlertEmail) -> Result<(), NotifyError> {
            self.sent
                .lock()
                .unwrap()
                .push((to.to_string(), email.clone()));
            Ok(())
        }
    }

    /// SMTP that always refuses.
    struct BrokenSmtp;

    #[async_trait]
    impl AlertNotifier for BrokenSmtp {
        async fn send(&self, _to: &str, _email: &AlertEmail) -> Result<(), NotifyError> {
            Err(NotifyError::Transport("connection refused".to_string()))
        }
    }

    /// Memory store whose monitor writes fail for one id.
    struct FailingWrites {
        inner: MemoryStore,
        failing_id: String,
    }

    #[async_trait]
    impl MonitorStore for FailingWrites {
        fn backend(&self) -> StorageBackend {
            self.inner.backend()
        }
        async fn ping(&self) -> Result<(), StoreError> {
            self.inner.ping().await
        }
        async fn insert_monitor(&self, monitor: &Monitor) -> Result<(), StoreError> {
            self.inner.insert_monitor(monitor).await
        }
        async fn list_monitors(&self) -> Result<Vec<Monitor>, StoreError> {
            self.inner.list_monitors().await
        }
        async fn get_monitor(&self, id: &str) -> Result<Option<Monitor>, StoreError> {
            self.inner.get_monitor(id).await
        }
        async fn update_monitor(&self, monitor: &Monitor) -> Result<bool, StoreError> {
            if monitor.id == self.failing_id {
                return Err(StoreError::Backend("write conflict".to_string()));
            }
            self.inner.update_monitor(monitor).await
        }
        async fn delete_monitor(&self, id: &str) -> Result<bool, StoreError> {
            self.inner.delete_monitor(id).await
        }
        async fn insert_log(&self, log: &UptimeLog) -> Result<(), StoreError> {
            self.inner.insert_log(log).await
        }
        async fn logs_since(
            &self,
            monitor_id: &str,
            since: DateTime<Utc>,
            order: SortOrder,
        ) -> Result<Vec<UptimeLog>, StoreError> {
            self.inner.logs_since(monitor_id, since, order).await
        }
        async fn insert_alert(&self, alert: &AlertSettings) -> Result<(), StoreError> {
            self.inner.insert_alert(alert).await
        }
        async fn alerts_for(&self, monitor_id: &str) -> Result<Vec<AlertSettings>, StoreError> {
            self.inner.alerts_for(monitor_id).await
        }
        async fn delete_alert(&self, monitor_id: &str) -> Result<bool, StoreError> {
            self.inner.delete_alert(monitor_id).await
        }
    }

    fn http_monitor(url: String) -> Monitor {
        Monitor::from_create(MonitorCreate {
            name: "Web".to_string(),
            monitor_type: MonitorType::Http,
            url: Some(url),
            timeout: Some(5),
            ..Default::default()
        })
        .unwrap()
    }

    fn service(
        store: Arc<dyn MonitorStore>,
        notifier: Arc<dyn AlertNotifier>,
    ) -> Arc<MonitoringService> {
        Arc::new(MonitoringService::with_settings(
            store,
            notifier,
            Duration::from_millis(50),
            4,
            "StatusTrackr",
        ))
    }

    async fn subscribe(store: &dyn MonitorStore, monitor_id: &str, on_down: bool, on_up: bool) {
        let alert = AlertSettings::from_create(AlertSettingsCreate {
            monitor_id: monitor_id.to_string(),
            email_address: "ops@example.com".to_string(),
            alert_on_down: on_down,
            alert_on_up: on_up,
        })
        .unwrap();
        store.insert_alert(&alert).await.unwrap();
    }

    async fn log_count(store: &dyn MonitorStore, monitor_id: &str) -> usize {
        store
            .logs_since(monitor_id, Utc::now() - TimeDelta::hours(1), SortOrder::Ascending)
            .await
            .unwrap()
            .len()
    }

    #[tokio::test]
    async fn first_check_records_without_alerting() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/");
                then.status(200);
            })
            .await;

        let store = Arc::new(MemoryStore::new());
        let notifier = Arc::new(RecordingNotifier::default());
        let monitor = http_monitor(server.url("/"));
        store.insert_monitor(&monitor).await.unwrap();
        subscribe(store.as_ref(), &monitor.id, true, true).await;

        let svc = service(store.clone(), notifier.clone());
        let outcome = svc.execute_check(monitor.clone()).await.unwrap();
        assert_eq!(outcome.status, MonitorStatus::Up);

        let stored = store.get_monitor(&monitor.id).await.unwrap().unwrap();
        assert_eq!(stored.status, MonitorStatus::Up);
        assert_eq!(stored.uptime_percentage, 100.0);
        assert!(stored.last_checked.is_some());
        assert_eq!(log_count(store.as_ref(), &monitor.id).await, 1);
        assert!(notifier.subjects().is_empty());
    }

    #[tokio::test]
    async fn transition_notifies_matching_subscribers() {
        let server = MockServer::start_async().await;
        let mut failing = server
            .mock_async(|when, then| {
                when.method(GET).path("/");
                then.status(503);
            })
            .await;

        let store = Arc::new(MemoryStore::new());
        let notifier = Arc::new(RecordingNotifier::default());
        let mut monitor = http_monitor(server.url("/"));
        monitor.status = MonitorStatus::Up;
        store.insert_monitor(&monitor).await.unwrap();
        subscribe(store.as_ref(), &monitor.id, true, false).await;

        let svc = service(store.clone(), notifier.clone());
        let outcome = svc.execute_check(monitor.clone()).await.unwrap();
        assert_eq!(outcome.error.as_deref(), Some("HTTP 503"));

        let subjects = notifier.subjects();
        assert_eq!(subjects.len(), 1);
        assert_eq!(subjects[0], "🔴 ALERT: Web is DOWN - StatusTrackr Monitoring");

        let stored = store.get_monitor(&monitor.id).await.unwrap().unwrap();
        assert_eq!(stored.status, MonitorStatus::Down);
        assert_eq!(stored.uptime_percentage, 0.0);

        // Same status again: no new alert.
        svc.execute_check(stored.clone()).await.unwrap();
        assert_eq!(notifier.subjects().len(), 1);

        // Recovery is not wanted by a down-only subscriber.
        failing.delete_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/");
                then.status(200);
            })
            .await;
        let outcome = svc.execute_check(stored).await.unwrap();
        assert_eq!(outcome.status, MonitorStatus::Up);
        assert_eq!(notifier.subjects().len(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn overlapping_checks_alert_once() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/");
                then.status(503).delay(Duration::from_millis(100));
            })
            .await;

        let store = Arc::new(MemoryStore::new());
        let notifier = Arc::new(RecordingNotifier::default());
        let mut monitor = http_monitor(server.url("/"));
        monitor.status = MonitorStatus::Up;
        store.insert_monitor(&monitor).await.unwrap();
        subscribe(store.as_ref(), &monitor.id, true, true).await;

        let svc = service(store.clone(), notifier.clone());
        let (cycle, manual) = tokio::join!(svc.run_cycle(), svc.execute_check(monitor.clone()));
        assert_eq!(cycle.unwrap(), 1);
        assert_eq!(manual.unwrap().status, MonitorStatus::Down);

        assert_eq!(notifier.subjects().len(), 1);
        assert_eq!(log_count(store.as_ref(), &monitor.id).await, 2);
        assert!(svc.check_locks.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn check_of_deleted_monitor_leaves_no_log() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/");
                then.status(200);
            })
            .await;

        let store = Arc::new(MemoryStore::new());
        let monitor = http_monitor(server.url("/"));
        let svc = service(store.clone(), Arc::new(RecordingNotifier::default()));

        let outcome = svc.execute_check(monitor.clone()).await.unwrap();
        assert_eq!(outcome.status, MonitorStatus::Up);
        assert_eq!(log_count(store.as_ref(), &monitor.id).await, 0);
        assert!(store.get_monitor(&monitor.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn notification_failure_does_not_fail_the_check() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/");
                then.status(500);
            })
            .await;

        let store = Arc::new(MemoryStore::new());
        let mut monitor = http_monitor(server.url("/"));
        monitor.status = MonitorStatus::Up;
        store.insert_monitor(&monitor).await.unwrap();
        subscribe(store.as_ref(), &monitor.id, true, true).await;

        let svc = service(store.clone(), Arc::new(BrokenSmtp));
        let outcome = svc.execute_check(monitor.clone()).await.unwrap();
        assert_eq!(outcome.status, MonitorStatus::Down);

        let stored = store.get_monitor(&monitor.id).await.unwrap().unwrap();
        assert_eq!(stored.status, MonitorStatus::Down);
        assert_eq!(log_count(store.as_ref(), &monitor.id).await, 1);
    }

    #[tokio::test]
    async fn store_failure_on_one_monitor_does_not_stop_the_cycle() {
        let server = MockServer::start_async().await;
        let hits = server
            .mock_async(|when, then| {
                when.method(GET).path("/");
                then.status(200);
            })
            .await;

        let broken = http_monitor(server.url("/"));
        let healthy = http_monitor(server.url("/"));
        let store = Arc::new(FailingWrites {
            inner: MemoryStore::new(),
            failing_id: broken.id.clone(),
        });
        store.insert_monitor(&broken).await.unwrap();
        store.insert_monitor(&healthy).await.unwrap();

        let svc = service(store.clone(), Arc::new(RecordingNotifier::default()));
        assert_eq!(svc.run_cycle().await.unwrap(), 2);
        hits.assert_hits_async(2).await;

        let stored = store.get_monitor(&healthy.id).await.unwrap().unwrap();
        assert_eq!(stored.status, MonitorStatus::Up);
        assert!(stored.last_checked.is_some());
        assert!(store
            .get_monitor(&broken.id)
            .await
            .unwrap()
            .unwrap()
            .last_checked
            .is_none());
    }

    #[tokio::test]
    async fn cycle_only_checks_due_monitors() {
        let server = MockServer::start_async().await;
        let hits = server
            .mock_async(|when, then| {
                when.method(GET).path("/");
                then.status(200);
            })
            .await;

        let store = Arc::new(MemoryStore::new());
        let due = http_monitor(server.url("/"));
        let mut fresh = http_monitor(server.url("/"));
        fresh.last_checked = Some(Utc::now());
        store.insert_monitor(&due).await.unwrap();
        store.insert_monitor(&fresh).await.unwrap();

        let svc = service(store.clone(), Arc::new(RecordingNotifier::default()));
        assert_eq!(svc.run_cycle().await.unwrap(), 1);
        hits.assert_hits_async(1).await;
        assert_eq!(svc.run_cycle().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn scheduler_survives_unrepresentable_interval() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/");
                then.status(200);
            })
            .await;

        let store = Arc::new(MemoryStore::new());
        let mut stale = http_monitor(server.url("/"));
        stale.check_interval = 10_000_000_000_000_000;
        stale.last_checked = Some(Utc::now() - TimeDelta::days(1));
        let healthy = http_monitor(server.url("/"));
        store.insert_monitor(&stale).await.unwrap();
        store.insert_monitor(&healthy).await.unwrap();

        let svc = service(store.clone(), Arc::new(RecordingNotifier::default()));
        svc.start().await;
        tokio::time::sleep(Duration::from_millis(500)).await;

        assert!(svc.is_running());
        assert!(store
            .get_monitor(&healthy.id)
            .await
            .unwrap()
            .unwrap()
            .last_checked
            .is_some());
        assert_eq!(svc.run_cycle().await.unwrap(), 0);
        svc.stop().await;
    }

    #[tokio::test]
    async fn start_and_stop_are_idempotent() {
        let store = Arc::new(MemoryStore::new());
        let svc = service(store, Arc::new(RecordingNotifier::default()));
        assert!(!svc.is_running());
        svc.start().await;
        svc.start().await;
        assert!(svc.is_running());
        tokio::time::sleep(Duration::from_millis(120)).await;
        svc.stop().await;
        assert!(!svc.is_running());
        svc.stop().await;
    }
}
