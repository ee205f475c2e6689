//! Storage backends - the record sink
//!
//! A trait-based abstraction over where probe observations are persisted.
//!
//! ## Design
//!
//! - **Trait-based**: `StorageBackend` allows swapping implementations
//! - **Async**: all operations are async for compatibility with the actors
//! - **Batch-oriented**: the recorder writes in batches for throughput
//! - **Append-only**: records are never updated, only inserted and
//!   eventually expired by the retention cleanup
//!
//! ## Backends
//!
//! - **SQLite** (default): embedded database, WAL mode, pooled connections
//! - **In-memory**: bounded ring buffer per target, for tests and
//!   persistence-free deployments

pub mod backend;
pub mod error;
pub mod memory;
pub mod schema;
pub mod sqlite;

pub use backend::{HealthStatus, RecordQuery, StorageBackend};
pub use error::{StorageError, StorageResult};
pub use memory::MemoryBackend;
pub use schema::TargetStats;
pub use sqlite::SqliteBackend;
