//! MongoDB-backed store.

use super::{MonitorStore, SortOrder, StorageBackend, LIST_LIMIT};
use crate::domain::{AlertSettings, Monitor, UptimeLog};
use crate::error::StoreError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures_util::TryStreamExt;
use mongodb::bson::{self, doc, Document};
use mongodb::options::{ClientOptions, IndexOptions};
use mongodb::{Client, Collection, Database, IndexModel};
use std::time::Duration;

const MONITORS: &str = "monitors";
const UPTIME_LOGS: &str = "uptime_logs";
const ALERT_SETTINGS: &str = "alert_settings";
const ALERT_MONITOR_INDEX: &str = "alert_settings_monitor_unique";
const SERVER_SELECTION_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Clone)]
pub struct MongoStore {
    db: Database,
}

impl MongoStore {
    /// Parses the connection string. The driver connects lazily, so an
    /// unreachable cluster only shows up on the first operation.
    pub async fn connect(url: &str, db_name: &str) -> Result<Self, StoreError> {
        let mut options = ClientOptions::parse(url).await?;
        options.server_selection_timeout = Some(SERVER_SELECTION_TIMEOUT);
        options.app_name = Some("statustrackr".to_string());
        let client = Client::with_options(options)?;
        Ok(Self {
            db: client.database(db_name),
        })
    }

    pub async fn ensure_indexes(&self) -> Result<(), StoreError> {
        self.logs()
            .create_index(
                IndexModel::builder()
                    .keys(doc! { "monitor_id": 1, "timestamp_ms": -1 })
                    .build(),
            )
            .await?;
        self.monitors()
            .create_index(IndexModel::builder().keys(doc! { "id": 1 }).build())
            .await?;
        // Earlier deployments carry a non-unique index on the same key.
        if let Err(e) = self.alerts().drop_index("monitor_id_1").await {
            tracing::debug!("no legacy alert_settings index to drop: {}", e);
        }
        self.alerts()
            .create_index(
                IndexModel::builder()
                    .keys(doc! { "monitor_id": 1 })
                    .options(
                        IndexOptions::builder()
                            .unique(true)
                            .name(ALERT_MONITOR_INDEX.to_string())
                            .build(),
                    )
                    .build(),
            )
            .await?;
        Ok(())
    }

    fn monitors(&self) -> Collection<Monitor> {
        self.db.collection(MONITORS)
    }

    fn logs(&self) -> Collection<Document> {
        self.db.collection(UPTIME_LOGS)
    }

    fn alerts(&self) -> Collection<AlertSettings> {
        self.db.collection(ALERT_SETTINGS)
    }
}

/// Log document with the extra integer timestamp used for queries.
fn log_document(log: &UptimeLog) -> Result<Document, StoreError> {
    let mut document = bson::to_document(log)?;
    document.insert("timestamp_ms", log.timestamp.timestamp_millis());
    Ok(document)
}

#[async_trait]
impl MonitorStore for MongoStore {
    fn backend(&self) -> StorageBackend {
        StorageBackend::Mongo
    }

    async fn ping(&self) -> Result<(), StoreError> {
        self.db.run_command(doc! { "ping": 1 }).await?;
        Ok(())
    }

    async fn insert_monitor(&self, monitor: &Monitor) -> Result<(), StoreError> {
        self.monitors().insert_one(monitor).await?;
        Ok(())
    }

    async fn list_monitors(&self) -> Result<Vec<Monitor>, StoreError> {
        let cursor = self
            .monitors()
            .find(doc! {})
            .projection(doc! { "_id": 0 })
            .limit(LIST_LIMIT as i64)
            .await?;
        Ok(cursor.try_collect().await?)
    }

    async fn get_monitor(&self, id: &str) -> Result<Option<Monitor>, StoreError> {
        Ok(self
            .monitors()
            .find_one(doc! { "id": id })
            .projection(doc! { "_id": 0 })
            .await?)
    }

    async fn update_monitor(&self, monitor: &Monitor) -> Result<bool, StoreError> {
        let result = self
            .monitors()
            .replace_one(doc! { "id": monitor.id.as_str() }, monitor)
            .await?;
        Ok(result.matched_count > 0)
    }

    async fn delete_monitor(&self, id: &str) -> Result<bool, StoreError> {
        let result = self.monitors().delete_one(doc! { "id": id }).await?;
        if result.deleted_count == 0 {
            return Ok(false);
        }
        self.logs().delete_many(doc! { "monitor_id": id }).await?;
        self.alerts().delete_many(doc! { "monitor_id": id }).await?;
        Ok(true)
    }

    async fn insert_log(&self, log: &UptimeLog) -> Result<(), StoreError> {
        self.logs().insert_one(log_document(log)?).await?;
        Ok(())
    }

    async fn logs_since(
        &self,
        monitor_id: &str,
        since: DateTime<Utc>,
        order: SortOrder,
    ) -> Result<Vec<UptimeLog>, StoreError> {
        let direction = match order {
            SortOrder::Ascending => 1,
            SortOrder::Descending => -1,
        };
        let mut cursor = self
            .logs()
            .find(doc! {
                "monitor_id": monitor_id,
                "timestamp_ms": { "$gte": since.timestamp_millis() },
            })
            .projection(doc! { "_id": 0, "timestamp_ms": 0 })
            .sort(doc! { "timestamp_ms": direction })
            .limit(LIST_LIMIT as i64)
            .await?;

        let mut logs = Vec::new();
        while let Some(document) = cursor.try_next().await? {
            logs.push(bson::from_document(document)?);
        }
        Ok(logs)
    }

    /// The unique `monitor_id` index turns a second subscription into
    /// [`StoreError::Duplicate`].
    async fn insert_alert(&self, alert: &AlertSettings) -> Result<(), StoreError> {
        self.alerts().insert_one(alert).await?;
        Ok(())
    }

    async fn alerts_for(&self, monitor_id: &str) -> Result<Vec<AlertSettings>, StoreError> {
        let cursor = self
            .alerts()
            .find(doc! { "monitor_id": monitor_id })
            .projection(doc! { "_id": 0 })
            .limit(LIST_LIMIT as i64)
            .await?;
        Ok(cursor.try_collect().await?)
    }

    async fn delete_alert(&self, monitor_id: &str) -> Result<bool, StoreError> {
        let result = self
            .alerts()
            .delete_many(doc! { "monitor_id": monitor_id })
            .await?;
        Ok(result.deleted_count > 0)
    }
}
