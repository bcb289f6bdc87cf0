//! Persistence for monitors, uptime logs and alert subscriptions.

pub mod memory;
pub mod mongo;

pub use memory::MemoryStore;
pub use mongo::MongoStore;

use crate::domain::{AlertSettings, Monitor, UptimeLog};
use crate::error::StoreError;
use crate::infra::config::AppConfig;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// Upper bound on rows returned by list queries.
pub const LIST_LIMIT: usize = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Ascending,
    Descending,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    Mongo,
    Memory,
}

impl StorageBackend {
    pub fn as_str(&self) -> &'static str {
        match self {
            StorageBackend::Mongo => "mongodb",
            StorageBackend::Memory => "memory",
        }
    }
}

#[async_trait]
pub trait MonitorStore: Send + Sync {
    fn backend(&self) -> StorageBackend;

    /// Round-trip to the backend.
    async fn ping(&self) -> Result<(), StoreError>;

    async fn insert_monitor(&self, monitor: &Monitor) -> Result<(), StoreError>;

    /// At most [`LIST_LIMIT`] monitors, in insertion order.
    async fn list_monitors(&self) -> Result<Vec<Monitor>, StoreError>;

    async fn get_monitor(&self, id: &str) -> Result<Option<Monitor>, StoreError>;

    /// Replaces the stored monitor with the same id. `false` if it is gone.
    async fn update_monitor(&self, monitor: &Monitor) -> Result<bool, StoreError>;

    /// Removes the monitor together with its logs and alert settings.
    async fn delete_monitor(&self, id: &str) -> Result<bool, StoreError>;

    async fn insert_log(&self, log: &UptimeLog) -> Result<(), StoreError>;

    /// Logs at or after `since`, at most [`LIST_LIMIT`].
    async fn logs_since(
        &self,
        monitor_id: &str,
        since: DateTime<Utc>,
        order: SortOrder,
    ) -> Result<Vec<UptimeLog>, StoreError>;

    /// One subscription per monitor; a second is [`StoreError::Duplicate`].
    async fn insert_alert(&self, alert: &AlertSettings) -> Result<(), StoreError>;

    async fn alerts_for(&self, monitor_id: &str) -> Result<Vec<AlertSettings>, StoreError>;

    /// Removes every subscription for the monitor. `false` if there was none.
    async fn delete_alert(&self, monitor_id: &str) -> Result<bool, StoreError>;
}

/// MongoDB when `MONGO_URL` is set, otherwise the in-memory store.
pub async fn store_from_config(config: &AppConfig) -> Result<Arc<dyn MonitorStore>, StoreError> {
    match &config.mongo_url {
        Some(url) => {
            let store = MongoStore::connect(url, &config.db_name).await?;
            match store.ping().await {
                Ok(()) => {
                    tracing::info!(db = %config.db_name, "connected to MongoDB");
                    if let Err(e) = store.ensure_indexes().await {
                        tracing::warn!("failed to create indexes: {}", e);
                    }
                }
                Err(e) => tracing::warn!("MongoDB not reachable at startup: {}", e),
            }
            Ok(Arc::new(store))
        }
        None => {
            tracing::warn!("MONGO_URL not set, using in-memory storage (data is lost on restart)");
            Ok(Arc::new(MemoryStore::new()))
        }
    }
}
