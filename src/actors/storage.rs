//! StorageActor - persists readings to the history store
//!
//! ## Batching Strategy
//!
//! Readings are buffered and written in batches:
//! - **Size trigger**: flush after 50 readings
//! - **Time trigger**: flush every 5 seconds
//!
//! A failed flush is logged and its readings are dropped; alerting never waits
//! on storage. Queries flush the buffer first so they see every reading the
//! actor has received.
//!
//! ## Retention
//!
//! With `retention_days` set, readings older than that are deleted on startup
//! and then once a day.

use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::time;
use tracing::{debug, error, info, instrument, trace, warn};

use super::messages::{ReadingEvent, StorageCommand, StorageStats};
use crate::storage::{HistoryRange, ReadingRow, StorageBackend, StorageError, StorageResult};

/// Batch size trigger - flush after this many readings
const BATCH_SIZE_TRIGGER: usize = 50;

/// Batch time trigger - flush after this duration
const BATCH_TIME_TRIGGER: Duration = Duration::from_secs(5);

/// Cleanup interval - run retention cleanup daily
const CLEANUP_INTERVAL: Duration = Duration::from_secs(24 * 60 * 60);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StorageOptions {
    pub retention_days: Option<u32>,
    pub batch_size: usize,
    pub flush_interval: Duration,
    pub cleanup_interval: Duration,
}

impl Default for StorageOptions {
    fn default() -> Self {
        Self {
            retention_days: None,
            batch_size: BATCH_SIZE_TRIGGER,
            flush_interval: BATCH_TIME_TRIGGER,
            cleanup_interval: CLEANUP_INTERVAL,
        }
    }
}

/// Oldest timestamp kept with the given retention, `None` if out of range
fn retention_cutoff(now: DateTime<Utc>, retention_days: u32) -> Option<DateTime<Utc>> {
    now.checked_sub_signed(chrono::Duration::try_days(retention_days.into())?)
}

pub struct StorageActor {
    backend: Box<dyn StorageBackend>,

    /// Readings waiting to be flushed
    batch_buffer: Vec<ReadingRow>,

    options: StorageOptions,

    command_rx: mpsc::Receiver<StorageCommand>,

    reading_rx: broadcast::Receiver<ReadingEvent>,

    flush_count: u64,
    failed_flushes: u64,
    last_cleanup_time: Option<chrono::DateTime<Utc>>,
    total_readings_deleted: u64,
}

impl StorageActor {
    pub fn new(
        backend: Box<dyn StorageBackend>,
        options: StorageOptions,
        command_rx: mpsc::Receiver<StorageCommand>,
        reading_rx: broadcast::Receiver<ReadingEvent>,
    ) -> Self {
        if let Some(days) = options.retention_days {
            debug!("retention cleanup enabled: {} days", days);
        }

        Self {
            backend,
            batch_buffer: Vec::with_capacity(options.batch_size),
            options,
            command_rx,
            reading_rx,
            flush_count: 0,
            failed_flushes: 0,
            last_cleanup_time: None,
            total_readings_deleted: 0,
        }
    }

    /// Run the actor's main loop
    #[instrument(skip(self))]
    pub async fn run(mut self) {
        debug!("starting storage actor");

        match self.backend.health_check().await {
            Ok(health) if health.healthy => debug!("storage backend healthy: {}", health.message),
            Ok(health) => warn!("storage backend unhealthy: {}", health.message),
            Err(e) => error!("storage health check failed: {}", e),
        }

        let has_retention = self.options.retention_days.is_some();
        let period = self.options.flush_interval;
        let mut flush_interval = time::interval_at(time::Instant::now() + period, period);
        // the first tick fires immediately, which doubles as the startup cleanup
        let mut cleanup_interval = time::interval(self.options.cleanup_interval);

        loop {
            tokio::select! {
                result = self.reading_rx.recv() => {
                    match result {
                        Ok(event) => self.store_reading(event).await,
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            warn!("storage actor lagged, skipped {skipped} readings");
                        }
                        Err(broadcast::error::RecvError::Closed) => {
                            warn!("reading channel closed, shutting down");
                            break;
                        }
                    }
                }

                _ = flush_interval.tick() => {
                    if !self.batch_buffer.is_empty() {
                        trace!("time-based flush triggered ({} readings)", self.batch_buffer.len());
                        let _ = self.flush_batch().await;
                    }
                }

                _ = cleanup_interval.tick(), if has_retention => {
                    debug!("retention cleanup triggered");
                    self.run_cleanup().await;
                }

                Some(cmd) = self.command_rx.recv() => {
                    if !self.handle_command(cmd).await {
                        break;
                    }
                }

                else => {
                    warn!("command channel closed, shutting down");
                    break;
                }
            }
        }

        if !self.batch_buffer.is_empty() {
            debug!(
                "final flush before shutdown ({} readings)",
                self.batch_buffer.len()
            );
            let _ = self.flush_batch().await;
        }

        if let Err(e) = self.backend.close().await {
            error!("error closing backend: {}", e);
        }

        debug!("storage actor stopped");
    }

    async fn store_reading(&mut self, event: ReadingEvent) {
        trace!("buffering reading from {}", event.reading.timestamp);

        self.batch_buffer
            .push(ReadingRow::from_reading(&event.reading, event.source));

        if self.batch_buffer.len() >= self.options.batch_size {
            trace!(
                "size-based flush triggered ({} readings)",
                self.batch_buffer.len()
            );
            let _ = self.flush_batch().await;
        }
    }

    async fn flush_batch(&mut self) -> StorageResult<()> {
        if self.batch_buffer.is_empty() {
            return Ok(());
        }

        let batch: Vec<ReadingRow> = self.batch_buffer.drain(..).collect();
        let batch_size = batch.len();
        debug!("flushing {} readings to backend", batch_size);

        match self.backend.insert_batch(batch).await {
            Ok(()) => {
                self.flush_count += 1;
                trace!(
                    "flush #{} complete ({} readings)",
                    self.flush_count, batch_size
                );
                Ok(())
            }
            Err(e) => {
                self.failed_flushes += 1;
                error!("failed to flush batch, dropping {batch_size} readings: {}", e);
                Err(e)
            }
        }
    }

    async fn run_cleanup(&mut self) {
        let Some(retention_days) = self.options.retention_days else {
            return;
        };

        let Some(cutoff) = retention_cutoff(Utc::now(), retention_days) else {
            error!("retention of {retention_days} days is out of range, skipping cleanup");
            return;
        };
        debug!("running retention cleanup (deleting data before {})", cutoff);

        match self.backend.cleanup_old_readings(cutoff).await {
            Ok(deleted) => {
                self.total_readings_deleted += deleted as u64;
                if deleted > 0 {
                    info!(
                        "retention cleanup complete: deleted {} old readings (total: {})",
                        deleted, self.total_readings_deleted
                    );
                } else {
                    trace!("retention cleanup: no old readings to delete");
                }
            }
            Err(e) => {
                // retried on the next interval
                error!("failed to cleanup old readings: {}", e);
            }
        }

        self.last_cleanup_time = Some(Utc::now());
    }

    /// Returns `false` when the actor should stop
    async fn handle_command(&mut self, cmd: StorageCommand) -> bool {
        match cmd {
            StorageCommand::QueryHistory {
                range,
                limit,
                respond_to,
            } => {
                let result = self.query_history(range, limit).await;
                let _ = respond_to.send(result);
            }

            StorageCommand::Flush { respond_to } => {
                debug!("manual flush requested");
                let _ = respond_to.send(self.flush_batch().await);
            }

            StorageCommand::GetStats { respond_to } => {
                let _ = respond_to.send(self.get_stats().await);
            }

            StorageCommand::Shutdown => {
                debug!("received shutdown command");
                return false;
            }
        }

        true
    }

    async fn query_history(
        &mut self,
        range: HistoryRange,
        limit: usize,
    ) -> StorageResult<Vec<ReadingRow>> {
        self.drain_pending_readings().await;

        if let Err(e) = self.flush_batch().await {
            warn!("answering history query without the pending batch: {e}");
        }

        let (start, end) = range.window(Utc::now());
        self.backend.query_range(start, end, limit).await
    }

    /// Buffer readings that were published but not yet received, so a query
    /// sees everything published before it was sent.
    async fn drain_pending_readings(&mut self) {
        loop {
            match self.reading_rx.try_recv() {
                Ok(event) => self.store_reading(event).await,
                Err(broadcast::error::TryRecvError::Lagged(skipped)) => {
                    warn!("storage actor lagged, skipped {skipped} readings");
                }
                Err(_) => break,
            }
        }
    }

    async fn get_stats(&self) -> StorageStats {
        let total_readings = match self.backend.count().await {
            Ok(count) => count,
            Err(e) => {
                warn!("failed to count stored readings: {e}");
                0
            }
        };

        let backend = self
            .backend
            .get_stats()
            .await
            .unwrap_or_else(|e| format!("unavailable: {e}"));

        StorageStats {
            total_readings,
            buffer_size: self.batch_buffer.len(),
            flush_count: self.flush_count,
            failed_flushes: self.failed_flushes,
            last_cleanup_time: self.last_cleanup_time,
            total_readings_deleted: self.total_readings_deleted,
            backend,
        }
    }
}

/// Handle for controlling the StorageActor
#[derive(Clone)]
pub struct StorageHandle {
    sender: mpsc::Sender<StorageCommand>,
}

impl StorageHandle {
    pub fn spawn(
        reading_rx: broadcast::Receiver<ReadingEvent>,
        backend: Box<dyn StorageBackend>,
        options: StorageOptions,
    ) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::channel(32);

        let actor = StorageActor::new(backend, options, cmd_rx, reading_rx);
        tokio::spawn(actor.run());

        Self { sender: cmd_tx }
    }

    /// Stored readings for a history range, oldest first
    pub async fn query_history(
        &self,
        range: HistoryRange,
        limit: usize,
    ) -> StorageResult<Vec<ReadingRow>> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(StorageCommand::QueryHistory {
                range,
                limit,
                respond_to: tx,
            })
            .await
            .map_err(|_| StorageError::Closed)?;

        rx.await.map_err(|_| StorageError::Closed)?
    }

    /// Manually flush the write buffer
    pub async fn flush(&self) -> StorageResult<()> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(StorageCommand::Flush { respond_to: tx })
            .await
            .map_err(|_| StorageError::Closed)?;

        rx.await.map_err(|_| StorageError::Closed)?
    }

    pub async fn get_stats(&self) -> Option<StorageStats> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(StorageCommand::GetStats { respond_to: tx })
            .await
            .ok()?;

        rx.await.ok()
    }

    pub async fn shutdown(&self) {
        let _ = self.sender.send(StorageCommand::Shutdown).await;
    }
}
