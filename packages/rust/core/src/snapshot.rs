//! Snapshot import/export: the canonical JSON form of a Context Document.
//!
//! The same encoding is used for persistence and for `.json` downloads, so a
//! file produced by [`to_snapshot`] can be fed straight back to
//! [`parse_snapshot`].

use tracing::debug;

use brandctx_shared::{
    CURRENT_DOCUMENT_VERSION, ContextDocument, ContextError, Result, is_compatible_version,
};

/// Serialize `doc` as pretty-printed JSON with a stable field order.
pub fn to_snapshot(doc: &ContextDocument) -> Result<String> {
    serde_json::to_string_pretty(doc)
        .map_err(|e| ContextError::format(format!("snapshot serialization failed: {e}")))
}

/// Parse and check a snapshot.
///
/// Fails with [`ContextError::Format`] on malformed JSON, a wrong shape, an
/// incompatible major schema version, or values that break document rules.
/// A compatible version is kept as written and the document is marked
/// `compatible`.
pub fn parse_snapshot(raw: &str) -> Result<ContextDocument> {
    let trimmed = raw.trim_start_matches('\u{feff}').trim();
    if trimmed.is_empty() {
        return Err(ContextError::format("snapshot is empty"));
    }

    let mut doc: ContextDocument = serde_json::from_str(trimmed)
        .map_err(|e| ContextError::format(format!("invalid snapshot: {e}")))?;

    if !is_compatible_version(&doc.metadata.version) {
        return Err(ContextError::format(format!(
            "unsupported schema version {} (expected {}.x)",
            doc.metadata.version,
            CURRENT_DOCUMENT_VERSION.split('.').next().unwrap_or("1")
        )));
    }
    if doc.metadata.version != CURRENT_DOCUMENT_VERSION {
        debug!(
            version = %doc.metadata.version,
            current = CURRENT_DOCUMENT_VERSION,
            "accepting snapshot from compatible schema version"
        );
    }
    doc.metadata.compatible = true;

    doc.validate().map_err(|e| match e {
        ContextError::Validation { message } => ContextError::format(message),
        other => other,
    })?;

    debug!(bytes = raw.len(), company = %doc.company.name, "parsed snapshot");
    Ok(doc)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn export_then_parse_preserves_document() {
        let mut doc = ContextDocument::with_defaults(Utc::now());
        doc.company.name = "Acme Corp".into();
        doc.brand_identity.value_propositions = vec!["Fast".into(), "Cheap".into()];

        let json = to_snapshot(&doc).unwrap();
        let parsed = parse_snapshot(&json).unwrap();
        assert_eq!(parsed, doc);
    }

    #[test]
    fn export_is_stable() {
        let doc = ContextDocument::with_defaults(Utc::now());
        assert_eq!(to_snapshot(&doc).unwrap(), to_snapshot(&doc).unwrap());
    }

    #[test]
    fn rejects_garbage() {
        for raw in ["", "   ", "not json", "{\"company\": 5}", "[]"] {
            let err = parse_snapshot(raw).unwrap_err();
            assert!(
                matches!(err, ContextError::Format { .. }),
                "{raw:?} should be a format error"
            );
        }
    }

    #[test]
    fn rejects_incompatible_major_version() {
        let mut doc = ContextDocument::with_defaults(Utc::now());
        doc.metadata.version = "2.0.0".into();
        let json = serde_json::to_string(&doc).unwrap();
        let err = parse_snapshot(&json).unwrap_err();
        assert!(err.to_string().contains("unsupported schema version 2.0.0"));
    }

    #[test]
    fn keeps_compatible_minor_version() {
        let mut doc = ContextDocument::with_defaults(Utc::now());
        doc.metadata.version = "1.4.2".into();
        doc.metadata.compatible = false;
        let json = serde_json::to_string(&doc).unwrap();

        let parsed = parse_snapshot(&json).unwrap();
        assert_eq!(parsed.metadata.version, "1.4.2");
        assert!(parsed.metadata.compatible);
    }

    #[test]
    fn rule_violations_surface_as_format_errors() {
        let mut doc = ContextDocument::with_defaults(Utc::now());
        doc.content_preferences.length_preferences.email_words = 0;
        let json = serde_json::to_string(&doc).unwrap();
        assert!(matches!(
            parse_snapshot(&json),
            Err(ContextError::Format { .. })
        ));
    }

    #[test]
    fn accepts_byte_order_mark() {
        let doc = ContextDocument::with_defaults(Utc::now());
        let json = format!("\u{feff}{}", to_snapshot(&doc).unwrap());
        assert!(parse_snapshot(&json).is_ok());
    }
}
