//! ==============================================================================
//! store.rs - Store Gateway
//! ==============================================================================
//!
//! purpose:
//!     narrow interface over the readings collection: insert-one,
//!     find-with-filter-sort-limit, distinct-sensor-values. handlers only see
//!     the `StoreGateway` trait, so the production MongoDB store and the
//!     in-process `MemoryStore` (tests, dev boxes without a database) are
//!     interchangeable.
//!
//! data layout:
//!     one flat collection of documents
//!         { sensor, value, unit, timestamp }
//!     legacy documents written by the first firmware revision carry `valor`
//!     instead of `value`; the read path in routes.rs handles both. a compound
//!     index on (sensor, timestamp) is recommended for the query pattern.
//!
//! ==============================================================================

use anyhow::{Context, Result};
use async_trait::async_trait;
use bson::{doc, Bson, Document};
use chrono::{DateTime, Utc};
use futures::stream::TryStreamExt;
use mongodb::{Client, Collection};
use tokio::sync::RwLock;

use crate::config::DatabaseConfig;
use crate::domain::Reading;

/// insert/find/distinct over the readings collection
#[async_trait]
pub trait StoreGateway: Send + Sync {
    /// persist one reading, returning the store-assigned id
    async fn insert_reading(&self, reading: &Reading) -> Result<String>;

    /// readings for one sensor, ascending timestamp, at most `limit`.
    /// `range` bounds are inclusive; `None` means no timestamp filter.
    async fn find_readings(
        &self,
        sensor: &str,
        range: Option<(DateTime<Utc>, DateTime<Utc>)>,
        limit: i64,
    ) -> Result<Vec<Document>>;

    /// distinct sensor names currently in the store (store-defined order)
    async fn distinct_sensors(&self) -> Result<Vec<String>>;
}

// ==============================================================================
// MongoDB implementation
// ==============================================================================

pub struct MongoStore {
    collection: Collection<Document>,
}

impl MongoStore {
    /// connect and ping. a failed ping here is what puts the service into
    /// store-unavailable mode, so fail fast rather than lazily.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        let client = Client::with_uri_str(&config.uri)
            .await
            .context("invalid MongoDB connection string")?;

        let database = client.database(&config.database);
        database
            .run_command(doc! { "ping": 1 })
            .await
            .context("MongoDB ping failed")?;

        Ok(Self {
            collection: database.collection(&config.collection),
        })
    }
}

#[async_trait]
impl StoreGateway for MongoStore {
    async fn insert_reading(&self, reading: &Reading) -> Result<String> {
        let document = doc! {
            "sensor": &reading.sensor,
            "value": reading.value,
            "unit": &reading.unit,
            "timestamp": bson::DateTime::from_chrono(reading.timestamp),
        };

        let result = self
            .collection
            .insert_one(document)
            .await
            .context("insert_one failed")?;

        Ok(match result.inserted_id {
            Bson::ObjectId(id) => id.to_hex(),
            other => other.to_string(),
        })
    }

    async fn find_readings(
        &self,
        sensor: &str,
        range: Option<(DateTime<Utc>, DateTime<Utc>)>,
        limit: i64,
    ) -> Result<Vec<Document>> {
        let mut filter = doc! { "sensor": sensor };
        if let Some((from, to)) = range {
            filter.insert(
                "timestamp",
                doc! {
                    "$gte": bson::DateTime::from_chrono(from),
                    "$lte": bson::DateTime::from_chrono(to),
                },
            );
        }

        let cursor = self
            .collection
            .find(filter)
            .sort(doc! { "timestamp": 1 })
            .limit(limit)
            .await
            .context("find failed")?;

        cursor.try_collect().await.context("cursor drain failed")
    }

    async fn distinct_sensors(&self) -> Result<Vec<String>> {
        let values = self
            .collection
            .distinct("sensor", doc! {})
            .await
            .context("distinct failed")?;

        Ok(values
            .into_iter()
            .filter_map(|v| match v {
                Bson::String(s) => Some(s),
                _ => None,
            })
            .collect())
    }
}

// ==============================================================================
// In-memory implementation (tests, dev boxes without a database)
// ==============================================================================

#[derive(Default)]
pub struct MemoryStore {
    documents: RwLock<Vec<Document>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// seed a raw document, bypassing ingest normalization. used by tests to
    /// plant legacy-shaped documents (`valor`, string values, missing fields).
    pub async fn insert_document(&self, document: Document) {
        self.documents.write().await.push(document);
    }

    pub async fn documents(&self) -> Vec<Document> {
        self.documents.read().await.clone()
    }
}

fn timestamp_millis(document: &Document) -> Option<i64> {
    document
        .get_datetime("timestamp")
        .ok()
        .map(|ts| ts.timestamp_millis())
}

#[async_trait]
impl StoreGateway for MemoryStore {
    async fn insert_reading(&self, reading: &Reading) -> Result<String> {
        let id = bson::oid::ObjectId::new();
        self.documents.write().await.push(doc! {
            "_id": id,
            "sensor": &reading.sensor,
            "value": reading.value,
            "unit": &reading.unit,
            "timestamp": bson::DateTime::from_chrono(reading.timestamp),
        });
        Ok(id.to_hex())
    }

    async fn find_readings(
        &self,
        sensor: &str,
        range: Option<(DateTime<Utc>, DateTime<Utc>)>,
        limit: i64,
    ) -> Result<Vec<Document>> {
        let documents = self.documents.read().await;

        let mut matches: Vec<Document> = documents
            .iter()
            .filter(|d| d.get_str("sensor") == Ok(sensor))
            .filter(|d| match range {
                // like MongoDB's $gte/$lte, a missing timestamp never matches
                // a range filter
                Some((from, to)) => timestamp_millis(d).is_some_and(|ms| {
                    ms >= from.timestamp_millis() && ms <= to.timestamp_millis()
                }),
                None => true,
            })
            .cloned()
            .collect();

        matches.sort_by_key(|d| timestamp_millis(d).unwrap_or(i64::MIN));
        matches.truncate(limit.max(0) as usize);
        Ok(matches)
    }

    async fn distinct_sensors(&self) -> Result<Vec<String>> {
        let documents = self.documents.read().await;
        let mut sensors: Vec<String> = Vec::new();
        for document in documents.iter() {
            if let Ok(sensor) = document.get_str("sensor") {
                if !sensors.iter().any(|s| s == sensor) {
                    sensors.push(sensor.to_string());
                }
            }
        }
        Ok(sensors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(hour: u32) -> bson::DateTime {
        bson::DateTime::from_chrono(Utc.with_ymd_and_hms(2024, 1, 1, hour, 0, 0).unwrap())
    }

    #[tokio::test]
    async fn test_find_filters_sorts_and_limits() {
        let store = MemoryStore::new();
        store
            .insert_document(doc! { "sensor": "temp", "value": 2.0, "timestamp": at(2) })
            .await;
        store
            .insert_document(doc! { "sensor": "temp", "value": 1.0, "timestamp": at(1) })
            .await;
        store
            .insert_document(doc! { "sensor": "other", "value": 9.0, "timestamp": at(1) })
            .await;
        store
            .insert_document(doc! { "sensor": "temp", "value": 3.0, "timestamp": at(3) })
            .await;

        let docs = store.find_readings("temp", None, 2).await.unwrap();
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[0].get_f64("value").unwrap(), 1.0);
        assert_eq!(docs[1].get_f64("value").unwrap(), 2.0);
    }

    #[tokio::test]
    async fn test_find_range_bounds_are_inclusive() {
        let store = MemoryStore::new();
        for hour in 1..=4 {
            store
                .insert_document(
                    doc! { "sensor": "temp", "value": hour as f64, "timestamp": at(hour) },
                )
                .await;
        }

        let from = Utc.with_ymd_and_hms(2024, 1, 1, 2, 0, 0).unwrap();
        let to = Utc.with_ymd_and_hms(2024, 1, 1, 3, 0, 0).unwrap();
        let docs = store
            .find_readings("temp", Some((from, to)), 5000)
            .await
            .unwrap();

        assert_eq!(docs.len(), 2);
        assert_eq!(docs[0].get_f64("value").unwrap(), 2.0);
        assert_eq!(docs[1].get_f64("value").unwrap(), 3.0);
    }

    #[tokio::test]
    async fn test_range_filter_excludes_documents_without_timestamp() {
        let store = MemoryStore::new();
        store
            .insert_document(doc! { "sensor": "temp", "value": 1.0 })
            .await;

        let from = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let to = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();
        let docs = store
            .find_readings("temp", Some((from, to)), 5000)
            .await
            .unwrap();
        assert!(docs.is_empty());

        // without a range filter the document still comes back
        let docs = store.find_readings("temp", None, 5000).await.unwrap();
        assert_eq!(docs.len(), 1);
    }

    #[tokio::test]
    async fn test_distinct_sensors_first_seen_order() {
        let store = MemoryStore::new();
        store
            .insert_document(doc! { "sensor": "b", "value": 1.0, "timestamp": at(1) })
            .await;
        store
            .insert_document(doc! { "sensor": "a", "value": 1.0, "timestamp": at(2) })
            .await;
        store
            .insert_document(doc! { "sensor": "b", "value": 2.0, "timestamp": at(3) })
            .await;

        let sensors = store.distinct_sensors().await.unwrap();
        assert_eq!(sensors, vec!["b".to_string(), "a".to_string()]);
    }
}
