//! In-memory storage backend (no persistence)
//!
//! Readings are kept in a bounded ring buffer; once it is full the oldest
//! reading is evicted. Everything is lost on restart.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tracing::{debug, trace};

use super::backend::{HealthStatus, StorageBackend};
use super::error::{StorageError, StorageResult};
use super::schema::ReadingRow;

/// Default ring buffer capacity (roughly one day at one reading per minute)
pub const DEFAULT_CAPACITY: usize = 1440;

pub struct MemoryBackend {
    rows: RwLock<VecDeque<ReadingRow>>,
    capacity: usize,
    closed: AtomicBool,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            rows: RwLock::new(VecDeque::with_capacity(capacity)),
            capacity,
            closed: AtomicBool::new(false),
        }
    }

    fn ensure_open(&self) -> StorageResult<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(StorageError::Closed);
        }
        Ok(())
    }
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StorageBackend for MemoryBackend {
    async fn insert_batch(&self, batch: Vec<ReadingRow>) -> StorageResult<()> {
        self.ensure_open()?;

        let mut rows = self.rows.write().await;
        for row in batch {
            // keep the buffer ordered even if a batch arrives out of order
            let position = rows.partition_point(|r| r.timestamp <= row.timestamp);
            rows.insert(position, row);
            if rows.len() > self.capacity {
                rows.pop_front();
            }
        }

        trace!("memory backend holds {} readings", rows.len());
        Ok(())
    }

    async fn query_range(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        limit: usize,
    ) -> StorageResult<Vec<ReadingRow>> {
        self.ensure_open()?;

        let rows = self.rows.read().await;
        Ok(rows
            .iter()
            .filter(|r| r.timestamp >= start && r.timestamp <= end)
            .take(limit)
            .copied()
            .collect())
    }

    async fn cleanup_old_readings(&self, before: DateTime<Utc>) -> StorageResult<usize> {
        self.ensure_open()?;

        let mut rows = self.rows.write().await;
        let initial = rows.len();
        rows.retain(|r| r.timestamp >= before);
        let deleted = initial - rows.len();

        debug!("deleted {deleted} readings from memory");
        Ok(deleted)
    }

    async fn health_check(&self) -> StorageResult<HealthStatus> {
        let closed = self.closed.load(Ordering::Acquire);

        let mut metadata = HashMap::new();
        metadata.insert("backend".to_string(), "memory".to_string());
        metadata.insert("capacity".to_string(), self.capacity.to_string());

        Ok(HealthStatus {
            healthy: !closed,
            message: if closed {
                "in-memory backend closed".to_string()
            } else {
                "in-memory backend operational".to_string()
            },
            metadata,
        })
    }

    async fn get_stats(&self) -> StorageResult<String> {
        let rows = self.rows.read().await;
        Ok(format!(
            "Memory: {} rows (capacity {})",
            rows.len(),
            self.capacity
        ))
    }

    async fn count(&self) -> StorageResult<usize> {
        Ok(self.rows.read().await.len())
    }

    async fn close(&self) -> StorageResult<()> {
        self.closed.store(true, Ordering::Release);
        Ok(())
    }
}
