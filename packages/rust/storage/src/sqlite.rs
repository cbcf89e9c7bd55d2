//! Turso Embedded / libSQL key/value backend.
//!
//! Each value is stored next to a SHA-256 hash of its content. A row whose
//! hash no longer matches is reported as a format error on read rather than
//! handed to the deserializer.
//!
//! **Access rules:**
//! - The Context Store process: read-write via [`SqliteBackend::open`]
//! - Inspection tooling: read-only via [`SqliteBackend::open_readonly`]

use std::path::Path;

use async_trait::async_trait;
use brandctx_shared::{ContextError, Result};
use chrono::Utc;
use libsql::{Connection, Database, params};
use sha2::{Digest, Sha256};

use crate::StorageBackend;
use crate::migrations;

/// Storage handle wrapping a libSQL database.
pub struct SqliteBackend {
    #[allow(dead_code)]
    db: Database,
    conn: Connection,
    readonly: bool,
}

impl SqliteBackend {
    /// Open or create a database at `path` in read-write mode.
    pub async fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ContextError::io(parent, e))?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| ContextError::Storage(e.to_string()))?;

        let conn = db
            .connect()
            .map_err(|e| ContextError::Storage(e.to_string()))?;

        let backend = Self {
            db,
            conn,
            readonly: false,
        };
        backend.run_migrations().await?;
        Ok(backend)
    }

    /// Open an existing database at `path` in read-only mode.
    pub async fn open_readonly(path: &Path) -> Result<Self> {
        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| ContextError::Storage(e.to_string()))?;

        let conn = db
            .connect()
            .map_err(|e| ContextError::Storage(e.to_string()))?;

        Ok(Self {
            db,
            conn,
            readonly: true,
        })
    }

    /// Run pending schema migrations.
    async fn run_migrations(&self) -> Result<()> {
        let current_version = self.get_schema_version().await;

        for migration in migrations::all_migrations() {
            if migration.version > current_version {
                tracing::info!(
                    version = migration.version,
                    description = migration.description,
                    "applying migration"
                );
                self.conn
                    .execute_batch(migration.sql)
                    .await
                    .map_err(|e| {
                        ContextError::Storage(format!(
                            "migration v{} failed: {e}",
                            migration.version
                        ))
                    })?;
            }
        }
        Ok(())
    }

    /// Get the current schema version, or 0 if no migrations have been applied.
    async fn get_schema_version(&self) -> u32 {
        let result = self
            .conn
            .query("SELECT MAX(version) FROM schema_migrations", params![])
            .await;

        match result {
            Ok(mut rows) => {
                if let Ok(Some(row)) = rows.next().await {
                    row.get::<u32>(0).unwrap_or(0)
                } else {
                    0
                }
            }
            Err(_) => 0, // Table doesn't exist yet
        }
    }

    /// Ensure we're in read-write mode before writing.
    fn check_writable(&self) -> Result<()> {
        if self.readonly {
            return Err(ContextError::Storage(
                "database is opened in read-only mode".into(),
            ));
        }
        Ok(())
    }

    /// When the value under `key` was last written, if present.
    pub async fn last_written(&self, key: &str) -> Result<Option<String>> {
        let mut rows = self
            .conn
            .query(
                "SELECT updated_at FROM kv_entries WHERE key = ?1",
                params![key],
            )
            .await
            .map_err(|e| ContextError::Storage(e.to_string()))?;

        match rows.next().await {
            Ok(Some(row)) => Ok(Some(
                row.get::<String>(0)
                    .map_err(|e| ContextError::Storage(e.to_string()))?,
            )),
            Ok(None) => Ok(None),
            Err(e) => Err(ContextError::Storage(e.to_string())),
        }
    }
}

#[async_trait]
impl StorageBackend for SqliteBackend {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut rows = self
            .conn
            .query(
                "SELECT value, content_hash FROM kv_entries WHERE key = ?1",
                params![key],
            )
            .await
            .map_err(|e| ContextError::Storage(e.to_string()))?;

        match rows.next().await {
            Ok(Some(row)) => {
                let value: String = row
                    .get(0)
                    .map_err(|e| ContextError::Storage(e.to_string()))?;
                let stored_hash: String = row
                    .get(1)
                    .map_err(|e| ContextError::Storage(e.to_string()))?;
                if content_hash(&value) != stored_hash {
                    tracing::warn!(key, "stored value does not match its content hash");
                    return Err(ContextError::format(format!(
                        "value under '{key}' failed its integrity check"
                    )));
                }
                Ok(Some(value))
            }
            Ok(None) => Ok(None),
            Err(e) => Err(ContextError::Storage(e.to_string())),
        }
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        self.check_writable()?;
        let now = Utc::now().to_rfc3339();
        let hash = content_hash(value);
        self.conn
            .execute(
                "INSERT INTO kv_entries (key, value, content_hash, updated_at)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(key) DO UPDATE SET
                   value = excluded.value,
                   content_hash = excluded.content_hash,
                   updated_at = excluded.updated_at",
                params![key, value, hash.as_str(), now.as_str()],
            )
            .await
            .map_err(|e| ContextError::Storage(e.to_string()))?;
        Ok(())
    }

    async fn clear(&self, key: &str) -> Result<()> {
        self.check_writable()?;
        self.conn
            .execute("DELETE FROM kv_entries WHERE key = ?1", params![key])
            .await
            .map_err(|e| ContextError::Storage(e.to_string()))?;
        Ok(())
    }
}

/// Hex-encoded SHA-256 of a stored value.
fn content_hash(value: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(value.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn temp_db_path() -> std::path::PathBuf {
        std::env::temp_dir().join(format!("brandctx_test_{}.db", Uuid::now_v7()))
    }

    /// Create a temp file database for testing.
    async fn test_backend() -> SqliteBackend {
        SqliteBackend::open(&temp_db_path())
            .await
            .expect("open test db")
    }

    #[tokio::test]
    async fn open_and_migrate() {
        let backend = test_backend().await;
        assert_eq!(backend.get_schema_version().await, 1);
    }

    #[tokio::test]
    async fn idempotent_migration() {
        let tmp = temp_db_path();
        let first = SqliteBackend::open(&tmp).await.expect("first open");
        drop(first);
        let second = SqliteBackend::open(&tmp).await.expect("second open");
        assert_eq!(second.get_schema_version().await, 1);
    }

    #[tokio::test]
    async fn set_get_clear() {
        let backend = test_backend().await;

        assert!(backend.get("ctx").await.expect("get missing").is_none());

        backend.set("ctx", r#"{"a":1}"#).await.expect("set");
        assert_eq!(
            backend.get("ctx").await.expect("get").as_deref(),
            Some(r#"{"a":1}"#)
        );

        backend.set("ctx", r#"{"a":2}"#).await.expect("overwrite");
        assert_eq!(
            backend.get("ctx").await.unwrap().as_deref(),
            Some(r#"{"a":2}"#)
        );
        assert!(backend.last_written("ctx").await.unwrap().is_some());

        backend.clear("ctx").await.expect("clear");
        assert!(backend.get("ctx").await.unwrap().is_none());

        // Clearing a missing key is a no-op.
        backend.clear("ctx").await.expect("clear again");
    }

    #[tokio::test]
    async fn tampered_value_fails_integrity_check() {
        let backend = test_backend().await;
        backend.set("ctx", "{}").await.unwrap();
        backend
            .conn
            .execute(
                "UPDATE kv_entries SET value = ?1 WHERE key = ?2",
                params!["{\"tampered\":true}", "ctx"],
            )
            .await
            .unwrap();

        let result = backend.get("ctx").await;
        assert!(matches!(result, Err(ContextError::Format { .. })));
    }

    #[tokio::test]
    async fn readonly_rejects_writes() {
        let tmp = temp_db_path();
        let rw = SqliteBackend::open(&tmp).await.unwrap();
        rw.set("ctx", "{}").await.unwrap();
        drop(rw);

        let ro = SqliteBackend::open_readonly(&tmp).await.unwrap();
        assert_eq!(ro.get("ctx").await.unwrap().as_deref(), Some("{}"));

        let result = ro.set("ctx", "{\"b\":1}").await;
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("read-only"));
    }
}
