//! Core domain logic for brandctx.
//!
//! [`ContextStore`] owns the company Context Document: it loads and persists
//! it through a [`brandctx_storage::StorageBackend`], publishes every commit
//! over its [`NotificationBus`], and projects the document into plain text
//! for AI prompts. The remaining modules are the pure building blocks the
//! store is made of.

pub mod bus;
pub mod completeness;
pub mod defaults;
pub mod prompt;
pub mod snapshot;
pub mod store;

pub use bus::{DeliveryReport, NotificationBus, SubscriberError, SubscriberResult, SubscriptionHandle};
pub use completeness::{Completeness, SectionStatus};
pub use defaults::{create_initial_document, deep_merge, merge_patch};
pub use prompt::render_prompt_context;
pub use snapshot::{parse_snapshot, to_snapshot};
pub use store::{ContextStore, DEFAULT_STORAGE_KEY};
