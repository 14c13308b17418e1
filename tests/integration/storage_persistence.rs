//! Integration tests for storage persistence
//!
//! These tests verify that:
//! - Readings from the ingest bridge end up in SQLite
//! - History queries see readings still in the write buffer
//! - Data survives reopening the database
//! - Retention cleanup removes old readings on startup

use std::time::Duration;

use chrono::Utc;
use hydro_monitor::{
    PartialReading, ReadingSource, SensorReading,
    actors::storage::{StorageHandle, StorageOptions},
    storage::{HistoryRange, ReadingRow, StorageBackend, sqlite::SqliteBackend},
};
use tempfile::tempdir;
use tokio::sync::broadcast;

use crate::helpers::{mock_expo, spawn_hub_with_storage};

fn partial(temperature: f64) -> PartialReading {
    PartialReading {
        temperature: Some(temperature),
        humidity: Some(60.0),
        water_temp: Some(24.0),
    }
}

#[tokio::test]
async fn test_readings_persist_across_restart() {
    let temp_dir = tempdir().unwrap();
    let db_path = temp_dir.path().join("readings.db");
    let server = mock_expo().await;

    let backend = SqliteBackend::new(&db_path).await.unwrap();
    let hub = spawn_hub_with_storage(&server, Box::new(backend));

    for temperature in [21.0, 22.0, 23.0] {
        hub.bridge.ingest(partial(temperature), ReadingSource::Http).await;
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    // nothing flushed yet, the query flushes first
    tokio::time::sleep(Duration::from_millis(50)).await;
    let rows = hub
        .storage
        .query_history(HistoryRange::Minute, 100)
        .await
        .unwrap();
    assert_eq!(rows.len(), 3);
    assert_eq!(
        rows.iter().map(|r| r.temperature).collect::<Vec<_>>(),
        vec![21.0, 22.0, 23.0]
    );
    assert!(rows.iter().all(|r| r.source == ReadingSource::Http));

    hub.shutdown().await;
    tokio::time::sleep(Duration::from_millis(200)).await;

    let reopened = SqliteBackend::new(&db_path).await.unwrap();
    assert_eq!(reopened.count().await.unwrap(), 3);

    let stored = reopened
        .query_range(Utc::now() - chrono::Duration::hours(1), Utc::now(), 100)
        .await
        .unwrap();
    assert_eq!(stored.len(), 3);
    assert_eq!(stored[2].temperature, 23.0);
    reopened.close().await.unwrap();
}

#[tokio::test]
async fn test_retention_cleanup_on_startup() {
    let temp_dir = tempdir().unwrap();
    let db_path = temp_dir.path().join("retention.db");

    let backend = SqliteBackend::new(&db_path).await.unwrap();
    let now = Utc::now();
    backend
        .insert_batch(vec![
            ReadingRow::from_reading(
                &SensorReading::new(20.0, 50.0, 22.0).at(now - chrono::Duration::days(40)),
                ReadingSource::Mqtt,
            ),
            ReadingRow::from_reading(
                &SensorReading::new(21.0, 51.0, 22.5).at(now - chrono::Duration::hours(1)),
                ReadingSource::Mqtt,
            ),
        ])
        .await
        .unwrap();

    let (tx, _) = broadcast::channel(16);
    let storage = StorageHandle::spawn(
        tx.subscribe(),
        Box::new(backend),
        StorageOptions {
            retention_days: Some(30),
            ..StorageOptions::default()
        },
    );

    let stats = tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            let stats = storage.get_stats().await.unwrap();
            if stats.last_cleanup_time.is_some() {
                return stats;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await
    .expect("startup cleanup did not run");

    assert_eq!(stats.total_readings_deleted, 1);
    assert_eq!(stats.total_readings, 1);
    assert!(stats.backend.starts_with("SQLite"));

    let day = storage.query_history(HistoryRange::Day, 100).await.unwrap();
    assert_eq!(day.len(), 1);
    assert_eq!(day[0].temperature, 21.0);

    storage.shutdown().await;
}
