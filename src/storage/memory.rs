//! In-process store. Used by tests and when no database is configured.

use super::{MonitorStore, SortOrder, StorageBackend, LIST_LIMIT};
use crate::domain::{AlertSettings, Monitor, UptimeLog};
use crate::error::StoreError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

#[derive(Default)]
pub struct MemoryStore {
    monitors: RwLock<Vec<Monitor>>,
    logs: RwLock<Vec<UptimeLog>>,
    alerts: RwLock<Vec<AlertSettings>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MonitorStore for MemoryStore {
    fn backend(&self) -> StorageBackend {
        StorageBackend::Memory
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }

    async fn insert_monitor(&self, monitor: &Monitor) -> Result<(), StoreError> {
        self.monitors.write().await.push(monitor.clone());
        Ok(())
    }

    async fn list_monitors(&self) -> Result<Vec<Monitor>, StoreError> {
        let monitors = self.monitors.read().await;
        Ok(monitors.iter().take(LIST_LIMIT).cloned().collect())
    }

    async fn get_monitor(&self, id: &str) -> Result<Option<Monitor>, StoreError> {
        let monitors = self.monitors.read().await;
        Ok(monitors.iter().find(|m| m.id == id).cloned())
    }

    async fn update_monitor(&self, monitor: &Monitor) -> Result<bool, StoreError> {
        let mut monitors = self.monitors.write().await;
        match monitors.iter_mut().find(|m| m.id == monitor.id) {
            Some(slot) => {
                *slot = monitor.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_monitor(&self, id: &str) -> Result<bool, StoreError> {
        let removed = {
            let mut monitors = self.monitors.write().await;
            let before = monitors.len();
            monitors.retain(|m| m.id != id);
            monitors.len() != before
        };
        if removed {
            self.logs.write().await.retain(|l| l.monitor_id != id);
            self.alerts.write().await.retain(|a| a.monitor_id != id);
        }
        Ok(removed)
    }

    async fn insert_log(&self, log: &UptimeLog) -> Result<(), StoreError> {
        self.logs.write().await.push(log.clone());
        Ok(())
    }

    async fn logs_since(
        &self,
        monitor_id: &str,
        since: DateTime<Utc>,
        order: SortOrder,
    ) -> Result<Vec<UptimeLog>, StoreError> {
        let logs = self.logs.read().await;
        let mut matching: Vec<UptimeLog> = logs
            .iter()
            .filter(|l| l.monitor_id == monitor_id && l.timestamp >= since)
            .cloned()
            .collect();
        match order {
            SortOrder::Ascending => matching.sort_by_key(|l| l.timestamp),
            SortOrder::Descending => matching.sort_by(|a, b| b.timestamp.cmp(&a.timestamp)),
        }
        matching.truncate(LIST_LIMIT);
        Ok(matching)
    }

    async fn insert_alert(&self, alert: &AlertSettings) -> Result<(), StoreError> {
        let mut alerts = self.alerts.write().await;
        if alerts.iter().any(|a| a.monitor_id == alert.monitor_id) {
            return Err(StoreError::Duplicate(format!(
                "alert settings for monitor {}",
                alert.monitor_id
            )));
        }
        alerts.push(alert.clone());
        Ok(())
    }

    async fn alerts_for(&self, monitor_id: &str) -> Result<Vec<AlertSettings>, StoreError> {
        let alerts = self.alerts.read().await;
        Ok(alerts
            .iter()
            .filter(|a| a.monitor_id == monitor_id)
            .cloned()
            .collect())
    }

    async fn delete_alert(&self, monitor_id: &str) -> Result<bool, StoreError> {
        let mut alerts = self.alerts.write().await;
        let before = alerts.len();
        alerts.retain(|a| a.monitor_id != monitor_id);
        Ok(alerts.len() != before)
    }
}
