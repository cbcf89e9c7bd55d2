//! Persistence backends for the Context Document.
//!
//! The store sees persistence as an opaque key/value [`StorageBackend`].
//! Three implementations are provided:
//! - [`MemoryBackend`]: in-process, for tests and throwaway sessions
//! - [`FileBackend`]: one JSON file per key, atomic replace on write
//! - [`SqliteBackend`]: Turso Embedded / libSQL with integrity hashes
//!
//! [`open_backend`] builds whichever one the config names.

mod file;
mod memory;
mod migrations;
mod sqlite;

use std::sync::Arc;

use async_trait::async_trait;
use brandctx_shared::{BackendKind, Result, StorageConfig};

pub use file::FileBackend;
pub use memory::MemoryBackend;
pub use sqlite::SqliteBackend;

/// Opaque key/value persistence used by the Context Store.
///
/// Implementations report unreachable or rejected I/O as
/// [`ContextError::Storage`](brandctx_shared::ContextError::Storage). A value
/// that cannot be trusted (e.g. failed integrity check) is a
/// [`ContextError::Format`](brandctx_shared::ContextError::Format).
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Short identifier used in logs.
    fn name(&self) -> &'static str;

    /// Read the value under `key`, or `None` if nothing is stored.
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Replace the value under `key`.
    async fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Remove the value under `key`. Removing a missing key succeeds.
    async fn clear(&self, key: &str) -> Result<()>;
}

/// Build the backend described by `config`.
pub async fn open_backend(config: &StorageConfig) -> Result<Arc<dyn StorageBackend>> {
    let backend: Arc<dyn StorageBackend> = match config.backend {
        BackendKind::Memory => Arc::new(MemoryBackend::new()),
        BackendKind::File => Arc::new(FileBackend::new(config.resolved_path()?)),
        BackendKind::Sqlite => Arc::new(SqliteBackend::open(&config.resolved_path()?).await?),
    };
    tracing::debug!(backend = backend.name(), path = %config.path, "opened storage backend");
    Ok(backend)
}
