//! Document creation and partial-update merging.
//!
//! Partial input is plain JSON shaped like the document. It is deep-merged
//! over the serialized defaults and deserialized back, so anything the caller
//! leaves out keeps its documented default.
//!
//! Merge rules:
//! - Objects are merged recursively (source overrides target per-key)
//! - Arrays and primitives are replaced entirely by source
//! - Null values in source are skipped (preserving target)

use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::debug;

use brandctx_shared::{ContextDocument, ContextError, Result};

/// Create a fresh document from `partial` merged over the defaults.
///
/// `metadata` in `partial` is ignored: the version is the current schema
/// version and both timestamps are `now`.
pub fn create_initial_document(partial: &Value) -> Result<ContextDocument> {
    create_initial_document_at(partial, Utc::now())
}

/// [`create_initial_document`] with an explicit clock reading.
pub fn create_initial_document_at(partial: &Value, now: DateTime<Utc>) -> Result<ContextDocument> {
    let defaults = serde_json::to_value(ContextDocument::with_defaults(now))?;
    let merged = deep_merge(defaults, sections_only(partial)?);
    let doc: ContextDocument = serde_json::from_value(merged)?;
    doc.validate()?;
    debug!(company = %doc.company.name, "created initial context document");
    Ok(doc)
}

/// Merge `patch` over `base`, keeping `base`'s metadata untouched.
pub fn merge_patch(base: &ContextDocument, patch: &Value) -> Result<ContextDocument> {
    let current = serde_json::to_value(base)?;
    let merged = deep_merge(current, sections_only(patch)?);
    let mut doc: ContextDocument = serde_json::from_value(merged)?;
    doc.metadata = base.metadata.clone();
    Ok(doc)
}

/// Recursive deep merge of two JSON values.
pub fn deep_merge(target: Value, source: Value) -> Value {
    match (target, source) {
        (Value::Object(mut target_map), Value::Object(source_map)) => {
            for (key, source_val) in source_map {
                if source_val.is_null() {
                    continue;
                }
                let merged = match target_map.remove(&key) {
                    Some(target_val) => deep_merge(target_val, source_val),
                    None => source_val,
                };
                target_map.insert(key, merged);
            }
            Value::Object(target_map)
        }
        (_, source) => source,
    }
}

/// Accept an object (or null) and drop any `metadata` key from it.
fn sections_only(partial: &Value) -> Result<Value> {
    match partial {
        Value::Null => Ok(Value::Object(serde_json::Map::new())),
        Value::Object(map) => {
            let mut map = map.clone();
            map.remove("metadata");
            Ok(Value::Object(map))
        }
        other => Err(ContextError::format(format!(
            "partial document must be a JSON object, got {}",
            json_kind(other)
        ))),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
