//! Shallow intelligence merge shared by both backends.

use crate::models::{Document, INTELLIGENCE_KEY, LAST_UPDATE_KEY};
use serde_json::Value;

/// Merges `patch` over `intelligence` and stamps `last_update`.
///
/// Keys in the patch overwrite keys of the same name; keys only present in
/// the existing document are kept. Nested objects are replaced, not merged.
/// A `last_update` key inside the patch is overwritten by `timestamp`.
pub fn merge_intelligence(intelligence: &mut Document, patch: &Document, timestamp: &str) {
    for (key, value) in patch {
        intelligence.insert(key.clone(), value.clone());
    }
    intelligence.insert(
        LAST_UPDATE_KEY.to_string(),
        Value::String(timestamp.to_string()),
    );
}

/// Applies an intelligence patch to a full customer record.
///
/// Creates the `intelligence` sub-document when absent, or when it is present
/// but not an object.
pub fn merge_into_record(record: &mut Document, patch: &Document, timestamp: &str) {
    let entry = record
        .entry(INTELLIGENCE_KEY)
        .or_insert_with(|| Value::Object(Document::new()));

    if !entry.is_object() {
        *entry = Value::Object(Document::new());
    }

    if let Value::Object(intelligence) = entry {
        merge_intelligence(intelligence, patch, timestamp);
    }
}

/// Reads the intelligence sub-document out of a stored JSON value.
///
/// `null` and non-object values read as empty.
#[must_use]
pub fn intelligence_from_value(value: Option<Value>) -> Document {
    match value {
        Some(Value::Object(map)) => map,
        _ => Document::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const TS: &str = "2024-05-01T09:30:00Z";

    fn doc(v: Value) -> Document {
        v.as_object().cloned().unwrap_or_default()
    }

    #[test]
    fn test_merge_preserves_untouched_keys() {
        let mut intel = doc(json!({"a": 1, "b": 2}));
        merge_intelligence(&mut intel, &doc(json!({"b": 3})), TS);
        assert_eq!(
            Value::Object(intel),
            json!({"a": 1, "b": 3, "last_update": TS})
        );
    }

    #[test]
    fn test_merge_is_shallow() {
        let mut intel = doc(json!({"profile": {"age": 30, "city": "Hanoi"}}));
        merge_intelligence(&mut intel, &doc(json!({"profile": {"age": 31}})), TS);
        assert_eq!(intel["profile"], json!({"age": 31}));
    }

    #[test]
    fn test_merge_overrides_patch_timestamp() {
        let mut intel = Document::new();
        merge_intelligence(&mut intel, &doc(json!({"last_update": "yesterday"})), TS);
        assert_eq!(intel["last_update"], json!(TS));
    }

    #[test]
    fn test_merge_into_record_creates_intelligence() {
        let mut record = doc(json!({"contact_info": {"facebook_id": "FB999"}}));
        merge_into_record(&mut record, &doc(json!({"tag": "vip"})), TS);
        assert_eq!(
            record["intelligence"],
            json!({"tag": "vip", "last_update": TS})
        );
        assert_eq!(record["contact_info"], json!({"facebook_id": "FB999"}));
    }

    #[test]
    fn test_merge_into_record_replaces_non_object() {
        let mut record = doc(json!({"intelligence": "legacy"}));
        merge_into_record(&mut record, &doc(json!({"tag": "vip"})), TS);
        assert_eq!(
            record["intelligence"],
            json!({"tag": "vip", "last_update": TS})
        );
    }

    #[test]
    fn test_intelligence_from_value() {
        assert!(intelligence_from_value(None).is_empty());
        assert!(intelligence_from_value(Some(Value::Null)).is_empty());
        assert_eq!(intelligence_from_value(Some(json!({"a": 1}))).len(), 1);
    }
}
