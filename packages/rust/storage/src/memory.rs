//! In-process backend. Nothing survives the process.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use brandctx_shared::{ContextError, Result};

use crate::StorageBackend;

/// A `HashMap` behind a mutex, with an optional per-value byte quota.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    entries: Mutex<HashMap<String, String>>,
    quota_bytes: Option<usize>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject any write whose value is larger than `bytes`, the way browser
    /// storage rejects writes once its quota is exhausted.
    pub fn with_quota(bytes: usize) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            quota_bytes: Some(bytes),
        }
    }

    /// Seed a raw value, bypassing the quota.
    pub fn with_entry(self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(key.into(), value.into());
        self
    }

    fn entries(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, String>>> {
        self.entries
            .lock()
            .map_err(|_| ContextError::Storage("memory backend lock poisoned".into()))
    }
}

#[async_trait]
impl StorageBackend for MemoryBackend {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries()?.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        if let Some(quota) = self.quota_bytes {
            if value.len() > quota {
                return Err(ContextError::Storage(format!(
                    "quota exceeded: {} bytes over a {quota}-byte limit",
                    value.len()
                )));
            }
        }
        self.entries()?.insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn clear(&self, key: &str) -> Result<()> {
        self.entries()?.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn set_get_clear() {
        let backend = MemoryBackend::new();
        assert!(backend.get("k").await.unwrap().is_none());

        backend.set("k", "v1").await.unwrap();
        backend.set("k", "v2").await.unwrap();
        assert_eq!(backend.get("k").await.unwrap().as_deref(), Some("v2"));

        backend.clear("k").await.unwrap();
        assert!(backend.get("k").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn quota_rejects_large_writes_and_keeps_old_value() {
        let backend = MemoryBackend::with_quota(8).with_entry("k", "old");

        let err = backend.set("k", "way more than eight bytes").await.unwrap_err();
        assert!(err.to_string().contains("quota exceeded"));
        assert_eq!(backend.get("k").await.unwrap().as_deref(), Some("old"));

        backend.set("k", "short").await.expect("within quota");
    }

    #[test]
    fn with_entry_seeds_through_poisoned_lock() {
        let backend = MemoryBackend::new();
        let _ = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _held = backend.entries.lock().unwrap();
            panic!("poison the map");
        }));
        assert!(backend.entries.is_poisoned());

        let backend = backend.with_entry("k", "seeded");
        let entries = backend.entries.lock().unwrap_or_else(|p| p.into_inner());
        assert_eq!(entries.get("k").map(String::as_str), Some("seeded"));
    }
}
