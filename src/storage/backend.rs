//! Storage backend trait definition

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::error::StorageResult;
use super::schema::ReadingRow;

/// Health status of the storage backend
#[derive(Debug, Clone)]
pub struct HealthStatus {
    pub healthy: bool,

    /// Human-readable status message
    pub message: String,

    /// Additional backend-specific metadata
    pub metadata: HashMap<String, String>,
}

/// Persistent store for sensor readings
///
/// Implementations must be `Send + Sync`; the storage actor owns one behind a
/// `Box<dyn StorageBackend>` and other tasks never touch it directly.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Insert a batch of readings atomically
    async fn insert_batch(&self, rows: Vec<ReadingRow>) -> StorageResult<()>;

    /// Readings with `start <= timestamp <= end`, oldest first, at most `limit`
    async fn query_range(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        limit: usize,
    ) -> StorageResult<Vec<ReadingRow>>;

    /// Delete readings older than `before`, returning how many were removed
    async fn cleanup_old_readings(&self, before: DateTime<Utc>) -> StorageResult<usize>;

    async fn health_check(&self) -> StorageResult<HealthStatus>;

    /// Human-readable statistics, e.g. "SQLite: 1200 rows, 0.35 MB on disk"
    async fn get_stats(&self) -> StorageResult<String>;

    /// Total number of stored readings
    async fn count(&self) -> StorageResult<usize>;

    async fn close(&self) -> StorageResult<()>;
}
