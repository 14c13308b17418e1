//! Reading history persistence
//!
//! The `StorageBackend` trait hides where readings end up. Two backends exist:
//!
//! - **SQLite** (feature `storage-sqlite`): embedded database, survives restarts
//! - **In-Memory**: bounded ring buffer, used when persistence is disabled
//!
//! ```no_run
//! use hydro_monitor::storage::{StorageBackend, sqlite::SqliteBackend};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let backend = SqliteBackend::new("./readings.db").await?;
//!     println!("{}", backend.get_stats().await?);
//!     Ok(())
//! }
//! ```

pub mod backend;
pub mod error;
pub mod memory;
pub mod schema;
#[cfg(feature = "storage-sqlite")]
pub mod sqlite;

pub use backend::{HealthStatus, StorageBackend};
pub use error::{StorageError, StorageResult};
pub use memory::MemoryBackend;
pub use schema::{HISTORY_LIMIT, HistoryRange, ReadingRow};
