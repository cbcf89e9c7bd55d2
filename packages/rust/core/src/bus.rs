//! Notification bus: ordered fan-out of the current document.
//!
//! Subscribers are invoked synchronously, in registration order, each inside
//! its own failure boundary. A subscriber that returns an error or panics is
//! logged and skipped; the remaining subscribers still receive the document.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::{error, trace, warn};

use brandctx_shared::ContextDocument;

/// Error type subscribers may return.
pub type SubscriberError = Box<dyn std::error::Error + Send + Sync>;

/// What a subscriber callback returns.
pub type SubscriberResult = std::result::Result<(), SubscriberError>;

type Callback = dyn Fn(Arc<ContextDocument>) -> SubscriberResult + Send + Sync;

/// Identifies one registration. Returned by [`NotificationBus::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionHandle(u64);

impl SubscriptionHandle {
    pub fn id(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for SubscriptionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

#[derive(Clone)]
struct Entry {
    handle: SubscriptionHandle,
    active: Arc<AtomicBool>,
    callback: Arc<Callback>,
}

/// Outcome of one delivery round.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeliveryReport {
    /// Subscribers whose callback returned `Ok`.
    pub delivered: usize,
    /// Subscribers whose callback returned `Err` or panicked.
    pub failed: usize,
}

/// Ordered subscriber list.
#[derive(Default)]
pub struct NotificationBus {
    next_id: AtomicU64,
    subscribers: Mutex<Vec<Entry>>,
}

impl NotificationBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `callback` at the end of the list.
    ///
    /// The callback is not invoked with the current document; call
    /// `get_current()` on the store when mounting.
    pub fn subscribe<F>(&self, callback: F) -> SubscriptionHandle
    where
        F: Fn(Arc<ContextDocument>) -> SubscriberResult + Send + Sync + 'static,
    {
        let handle = SubscriptionHandle(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.lock().push(Entry {
            handle,
            active: Arc::new(AtomicBool::new(true)),
            callback: Arc::new(callback),
        });
        trace!(%handle, "subscriber registered");
        handle
    }

    /// Remove the registration for `handle`. Returns `false` if it was
    /// already gone.
    pub fn unsubscribe(&self, handle: SubscriptionHandle) -> bool {
        let mut subscribers = self.lock();
        match subscribers.iter().position(|e| e.handle == handle) {
            Some(index) => {
                let entry = subscribers.remove(index);
                // A delivery round already in flight checks this flag.
                entry.active.store(false, Ordering::Release);
                trace!(%handle, "subscriber removed");
                true
            }
            None => false,
        }
    }

    /// Number of live registrations.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Drop every registration.
    pub fn clear(&self) {
        for entry in self.lock().drain(..) {
            entry.active.store(false, Ordering::Release);
        }
    }

    /// Deliver `doc` to every subscriber in registration order.
    ///
    /// The list is snapshotted first so callbacks may subscribe or
    /// unsubscribe without deadlocking. Subscribers added during the round
    /// are not called until the next one.
    pub fn notify(&self, doc: &Arc<ContextDocument>) -> DeliveryReport {
        let entries: Vec<Entry> = self.lock().clone();
        let mut report = DeliveryReport::default();

        for entry in entries {
            if !entry.active.load(Ordering::Acquire) {
                continue;
            }
            let callback = Arc::clone(&entry.callback);
            let doc = Arc::clone(doc);
            match catch_unwind(AssertUnwindSafe(move || callback(doc))) {
                Ok(Ok(())) => report.delivered += 1,
                Ok(Err(e)) => {
                    report.failed += 1;
                    warn!(handle = %entry.handle, error = %e, "subscriber returned an error");
                }
                Err(payload) => {
                    report.failed += 1;
                    error!(
                        handle = %entry.handle,
                        panic = panic_message(payload.as_ref()),
                        "subscriber panicked"
                    );
                }
            }
        }

        report
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Entry>> {
        // Callbacks never run under this lock, so poisoning only means a
        // panic elsewhere; the list itself is still consistent.
        self.subscribers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "non-string panic payload"
    }
}
