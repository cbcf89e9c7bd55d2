//! Directory-of-JSON-files backend.
//!
//! Each key maps to `<dir>/<key>.json`. Writes go to a sibling temp file that
//! is renamed into place, so readers see either the old or the new value.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use brandctx_shared::{ContextError, Result};
use tracing::debug;
use uuid::Uuid;

use crate::StorageBackend;

/// Stores one file per key under a root directory.
#[derive(Debug, Clone)]
pub struct FileBackend {
    dir: PathBuf,
}

impl FileBackend {
    /// Use `dir` as the root. The directory is created on first write.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Resolve the file for `key`, rejecting keys that could escape `dir`.
    fn path_for(&self, key: &str) -> Result<PathBuf> {
        let valid = !key.is_empty()
            && !key.starts_with('.')
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
        if !valid {
            return Err(ContextError::Storage(format!(
                "invalid storage key '{key}': use letters, digits, '-', '_' or '.'"
            )));
        }
        Ok(self.dir.join(format!("{key}.json")))
    }
}

#[async_trait]
impl StorageBackend for FileBackend {
    fn name(&self) -> &'static str {
        "file"
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        let path = self.path_for(key)?;
        match tokio::fs::read_to_string(&path).await {
            Ok(content) => {
                debug!(path = %path.display(), bytes = content.len(), "read value");
                Ok(Some(content))
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(ContextError::Storage(format!(
                "read {}: {e}",
                path.display()
            ))),
        }
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        let path = self.path_for(key)?;
        tokio::fs::create_dir_all(&self.dir).await.map_err(|e| {
            ContextError::Storage(format!("create {}: {e}", self.dir.display()))
        })?;

        let tmp = self.dir.join(format!(".{key}.{}.tmp", Uuid::now_v7()));
        if let Err(e) = tokio::fs::write(&tmp, value).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(ContextError::Storage(format!(
                "write {}: {e}",
                tmp.display()
            )));
        }
        if let Err(e) = tokio::fs::rename(&tmp, &path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(ContextError::Storage(format!(
                "replace {}: {e}",
                path.display()
            )));
        }

        debug!(path = %path.display(), bytes = value.len(), "wrote value");
        Ok(())
    }

    async fn clear(&self, key: &str) -> Result<()> {
        let path = self.path_for(key)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(ContextError::Storage(format!(
                "remove {}: {e}",
                path.display()
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_dir() -> PathBuf {
        std::env::temp_dir().join(format!("brandctx_files_{}", Uuid::now_v7()))
    }

    #[tokio::test]
    async fn missing_key_reads_as_absent() {
        let backend = FileBackend::new(temp_dir());
        assert!(backend.get("company-context").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn set_creates_dir_and_overwrites() {
        let dir = temp_dir();
        let backend = FileBackend::new(&dir);

        backend.set("company-context", "{\"v\":1}").await.expect("set");
        backend.set("company-context", "{\"v\":2}").await.expect("overwrite");

        assert_eq!(
            backend.get("company-context").await.unwrap().as_deref(),
            Some("{\"v\":2}")
        );
        assert!(dir.join("company-context.json").exists());

        // No temp files left behind.
        let leftovers = std::fs::read_dir(&dir)
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
            .count();
        assert_eq!(leftovers, 0);
    }

    #[tokio::test]
    async fn clear_is_idempotent() {
        let backend = FileBackend::new(temp_dir());
        backend.set("k", "{}").await.unwrap();
        backend.clear("k").await.expect("clear");
        backend.clear("k").await.expect("clear missing");
        assert!(backend.get("k").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn rejects_path_traversal_keys() {
        let backend = FileBackend::new(temp_dir());
        for key in ["../escape", "a/b", "", ".hidden"] {
            let result = backend.set(key, "{}").await;
            assert!(
                matches!(result, Err(ContextError::Storage(_))),
                "key {key:?} should be rejected"
            );
        }
    }
}
