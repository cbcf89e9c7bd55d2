//! The Context Store: sole owner and writer of the Context Document.
//!
//! A store is constructed explicitly around a [`StorageBackend`] and passed
//! by reference to every consumer. It keeps the authoritative in-memory
//! snapshot, persists every mutation before publishing it, and fans out each
//! committed document over its [`NotificationBus`].
//!
//! Commit protocol, shared by `save`, `update`, `apply_patch` and
//! `import_snapshot`:
//! 1. Stamp `metadata.updatedAt` (never earlier than the previous stamp)
//! 2. Validate and serialize
//! 3. Write to the backend; on failure nothing below happens
//! 4. Replace the in-memory snapshot
//! 5. Notify subscribers in registration order
//!
//! Commits are serialized by an async mutex, so notification order always
//! matches write order. `save` itself is whole-document last-writer-wins:
//! callers that build their next document from a stale `get_current()` will
//! overwrite edits committed in between. `update` runs its read-modify-write
//! inside the commit lock and does not have that race.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

use brandctx_shared::{AppConfig, ContextDocument, ContextError, DEFAULT_PROMPT_PLACEHOLDER, Result};
use brandctx_storage::{StorageBackend, open_backend};

use crate::bus::{DeliveryReport, NotificationBus, SubscriberResult, SubscriptionHandle};
use crate::completeness::{Completeness, completeness};
use crate::defaults;
use crate::prompt::render_prompt_context;
use crate::snapshot::{parse_snapshot, to_snapshot};

/// Default storage key for the Context Document.
pub const DEFAULT_STORAGE_KEY: &str = "company-context";

/// How a commit treats the incoming document's `createdAt`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CommitKind {
    /// Keep the current document's `createdAt`.
    Save,
    /// Explicit overwrite: keep the incoming `createdAt`.
    Import,
}

/// Owner of the current Context Document.
pub struct ContextStore {
    backend: Arc<dyn StorageBackend>,
    key: String,
    placeholder: String,
    current: RwLock<Option<Arc<ContextDocument>>>,
    bus: NotificationBus,
    commit_lock: Mutex<()>,
    disposed: AtomicBool,
}

impl ContextStore {
    /// Create a store over `backend`, persisting under `key`. No I/O happens
    /// until [`init`](Self::init) or [`load`](Self::load).
    pub fn new(backend: Arc<dyn StorageBackend>, key: impl Into<String>) -> Self {
        Self {
            backend,
            key: key.into(),
            placeholder: DEFAULT_PROMPT_PLACEHOLDER.to_string(),
            current: RwLock::new(None),
            bus: NotificationBus::new(),
            commit_lock: Mutex::new(()),
            disposed: AtomicBool::new(false),
        }
    }

    /// Override the text returned by [`get_prompt_context`](Self::get_prompt_context)
    /// while no document is loaded.
    pub fn with_placeholder(mut self, placeholder: impl Into<String>) -> Self {
        self.placeholder = placeholder.into();
        self
    }

    /// Open the configured backend and build a store around it.
    pub async fn from_config(config: &AppConfig) -> Result<Self> {
        let backend = open_backend(&config.storage).await?;
        Ok(Self::new(backend, config.storage.key.clone()).with_placeholder(config.prompt.placeholder.clone()))
    }

    /// The storage key this store persists under.
    pub fn key(&self) -> &str {
        &self.key
    }

    // -----------------------------------------------------------------------
    // Lifecycle
    // -----------------------------------------------------------------------

    /// Bring the store up: read whatever is persisted.
    ///
    /// A missing key leaves the store Absent. A corrupt value is returned as
    /// [`ContextError::Format`]; the store stays usable and Absent, and the
    /// caller decides whether to fall back to a fresh document.
    #[instrument(skip_all, fields(key = %self.key, backend = self.backend.name()))]
    pub async fn init(&self) -> Result<Option<Arc<ContextDocument>>> {
        let loaded = self.load().await?;
        info!(present = loaded.is_some(), "context store ready");
        Ok(loaded)
    }

    /// Tear the store down. Subscribers are dropped, the snapshot is
    /// released, and later suspending calls fail with
    /// [`ContextError::Disposed`]. Persisted data is untouched.
    pub fn dispose(&self) {
        {
            // Flag and snapshot change together so an in-flight commit either
            // lands before disposal or not at all.
            let mut current = self.write_current();
            if self.disposed.swap(true, Ordering::AcqRel) {
                return;
            }
            *current = None;
        }
        self.bus.clear();
        debug!(key = %self.key, "context store disposed");
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }

    fn ensure_live(&self) -> Result<()> {
        if self.is_disposed() {
            return Err(ContextError::Disposed);
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Reads
    // -----------------------------------------------------------------------

    /// The latest committed document, if any. Never suspends.
    pub fn get_current(&self) -> Option<Arc<ContextDocument>> {
        self.current
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Flattened text projection of the current document for AI calls.
    pub fn get_prompt_context(&self) -> String {
        render_prompt_context(self.get_current().as_deref(), &self.placeholder)
    }

    /// Onboarding completeness of the current document.
    pub fn completeness(&self) -> Result<Completeness> {
        let doc = self.get_current().ok_or(ContextError::NoDocument)?;
        Ok(completeness(&doc))
    }

    /// A fresh document built from `partial` over the defaults. Pure: the
    /// store is not touched until the result is passed to [`save`](Self::save).
    pub fn create_initial_document(&self, partial: &Value) -> Result<ContextDocument> {
        defaults::create_initial_document(partial)
    }

    // -----------------------------------------------------------------------
    // Notification bus
    // -----------------------------------------------------------------------

    /// Register a change listener. It is not called with the current document.
    pub fn subscribe<F>(&self, callback: F) -> SubscriptionHandle
    where
        F: Fn(Arc<ContextDocument>) -> SubscriberResult + Send + Sync + 'static,
    {
        self.bus.subscribe(callback)
    }

    /// Remove a listener. Safe to call more than once.
    pub fn unsubscribe(&self, handle: SubscriptionHandle) -> bool {
        self.bus.unsubscribe(handle)
    }

    pub fn subscriber_count(&self) -> usize {
        self.bus.len()
    }

    // -----------------------------------------------------------------------
    // Suspending operations
    // -----------------------------------------------------------------------

    /// Read the persisted document and make it current.
    ///
    /// Returns `Ok(None)` when nothing is stored; the in-memory snapshot is
    /// left as it was and no one is notified. On a format or storage error
    /// the snapshot is likewise unchanged.
    #[instrument(skip_all, fields(key = %self.key))]
    pub async fn load(&self) -> Result<Option<Arc<ContextDocument>>> {
        self.ensure_live()?;
        let _guard = self.commit_lock.lock().await;

        let Some(raw) = self.backend.get(&self.key).await? else {
            debug!("no persisted context document");
            return Ok(None);
        };

        let doc = match parse_snapshot(&raw) {
            Ok(doc) => Arc::new(doc),
            Err(e) => {
                warn!(error = %e, bytes = raw.len(), "persisted context document is unreadable");
                return Err(e);
            }
        };

        self.replace_current(&doc)?;
        let report = self.bus.notify(&doc);
        log_delivery("load", &doc, report);
        Ok(Some(doc))
    }

    /// Persist `doc` as the complete next document and publish it.
    ///
    /// `metadata.updatedAt` is stamped here. When a document is already
    /// current its `createdAt` is carried over.
    #[instrument(skip_all, fields(key = %self.key))]
    pub async fn save(&self, doc: ContextDocument) -> Result<Arc<ContextDocument>> {
        self.ensure_live()?;
        let _guard = self.commit_lock.lock().await;
        self.commit(doc, CommitKind::Save).await
    }

    /// Read-modify-write the current document under the commit lock.
    ///
    /// Fails with [`ContextError::NoDocument`] when nothing is loaded.
    #[instrument(skip_all, fields(key = %self.key))]
    pub async fn update<F>(&self, edit: F) -> Result<Arc<ContextDocument>>
    where
        F: FnOnce(&mut ContextDocument),
    {
        self.ensure_live()?;
        let _guard = self.commit_lock.lock().await;
        let mut doc = self
            .get_current()
            .ok_or(ContextError::NoDocument)?
            .as_ref()
            .clone();
        edit(&mut doc);
        self.commit(doc, CommitKind::Save).await
    }

    /// Deep-merge a partial JSON document over the current one and commit.
    ///
    /// Objects merge recursively, arrays and scalars replace, nulls are
    /// skipped and any `metadata` in the patch is ignored.
    #[instrument(skip_all, fields(key = %self.key))]
    pub async fn apply_patch(&self, patch: &Value) -> Result<Arc<ContextDocument>> {
        self.ensure_live()?;
        let _guard = self.commit_lock.lock().await;
        let current = self.get_current().ok_or(ContextError::NoDocument)?;
        let doc = defaults::merge_patch(&current, patch)?;
        self.commit(doc, CommitKind::Save).await
    }

    /// Canonical JSON of the current document, suitable for a `.json` download.
    pub fn export_snapshot(&self) -> Result<String> {
        let doc = self.get_current().ok_or(ContextError::NoDocument)?;
        to_snapshot(&doc)
    }

    /// Replace the current document with a previously exported snapshot.
    ///
    /// Parse failures leave the store untouched. A valid snapshot goes
    /// through the same commit path as [`save`](Self::save), except that its
    /// own `createdAt` is kept.
    #[instrument(skip_all, fields(key = %self.key, bytes = raw.len()))]
    pub async fn import_snapshot(&self, raw: &str) -> Result<Arc<ContextDocument>> {
        self.ensure_live()?;
        let doc = parse_snapshot(raw)?;
        let _guard = self.commit_lock.lock().await;
        self.commit(doc, CommitKind::Import).await
    }

    /// Remove the persisted document and return to Absent. Subscribers are
    /// not notified since there is no document to deliver.
    #[instrument(skip_all, fields(key = %self.key))]
    pub async fn clear(&self) -> Result<()> {
        self.ensure_live()?;
        let _guard = self.commit_lock.lock().await;
        self.backend.clear(&self.key).await?;
        *self.write_current() = None;
        info!("context document cleared");
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    /// Steps 1-5 of the commit protocol. Caller holds `commit_lock`.
    async fn commit(&self, mut doc: ContextDocument, kind: CommitKind) -> Result<Arc<ContextDocument>> {
        let previous = self.get_current();

        if kind == CommitKind::Save {
            if let Some(prev) = &previous {
                doc.metadata.created_at = prev.metadata.created_at;
            }
        }
        doc.metadata.updated_at = next_stamp(
            Utc::now(),
            previous.as_ref().map(|p| p.metadata.updated_at),
            doc.metadata.created_at,
        );

        doc.validate()?;
        doc.metadata.compatible = true;
        let raw = to_snapshot(&doc)?;

        if let Err(e) = self.backend.set(&self.key, &raw).await {
            warn!(error = %e, backend = self.backend.name(), "context document write failed");
            return Err(e);
        }

        let doc = Arc::new(doc);
        self.replace_current(&doc)?;
        let report = self.bus.notify(&doc);
        log_delivery(
            match kind {
                CommitKind::Save => "save",
                CommitKind::Import => "import",
            },
            &doc,
            report,
        );
        Ok(doc)
    }

    /// Swap in `doc` unless the store was disposed while the caller was
    /// suspended on the backend.
    fn replace_current(&self, doc: &Arc<ContextDocument>) -> Result<()> {
        let mut current = self.write_current();
        if self.is_disposed() {
            debug!(key = %self.key, "store disposed mid-operation, snapshot not replaced");
            return Err(ContextError::Disposed);
        }
        *current = Some(Arc::clone(doc));
        Ok(())
    }

    fn write_current(&self) -> std::sync::RwLockWriteGuard<'_, Option<Arc<ContextDocument>>> {
        self.current
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// `now`, but never before the previous stamp or the creation time.
fn next_stamp(
    now: DateTime<Utc>,
    previous: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
) -> DateTime<Utc> {
    let floor = previous.map_or(created_at, |p| p.max(created_at));
    now.max(floor)
}

fn log_delivery(operation: &str, doc: &ContextDocument, report: DeliveryReport) {
    info!(
        operation,
        updated_at = %doc.metadata.updated_at,
        delivered = report.delivered,
        failed = report.failed,
        "context document committed"
    );
}

impl std::fmt::Debug for ContextStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContextStore")
            .field("backend", &self.backend.name())
            .field("key", &self.key)
            .field("present", &self.get_current().is_some())
            .field("subscribers", &self.bus.len())
            .field("disposed", &self.is_disposed())
            .finish()
    }
}
