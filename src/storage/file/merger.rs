//! Record Merger for the file backend.

use super::layout::{read_document, write_document};
use crate::Result;
use crate::models::Document;
use crate::storage::merge::merge_into_record;
use std::path::Path;

/// Applies intelligence patches to profile documents on disk.
///
/// Read-modify-write without locking: two concurrent writers to the same
/// profile race and the later write wins. A failed write leaves the previous
/// file in place.
#[derive(Debug, Clone, Copy, Default)]
pub struct RecordMerger;

impl RecordMerger {
    /// Creates a merger.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Merges `patch` into the profile at `path`.
    ///
    /// Returns `true` only if both the read and the write succeeded.
    pub fn merge_intelligence(&self, path: &Path, patch: &Document) -> bool {
        match self.try_merge_intelligence(path, patch) {
            Ok(_) => true,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Intelligence merge failed");
                false
            },
        }
    }

    /// Merges `patch` into the profile at `path`, returning the updated record.
    ///
    /// # Errors
    ///
    /// Returns an error if the profile cannot be read, parsed or written.
    pub fn try_merge_intelligence(&self, path: &Path, patch: &Document) -> Result<Document> {
        let mut record = read_document(path)?;
        merge_into_record(&mut record, patch, &crate::iso_timestamp());
        write_document(path, &record)?;
        Ok(record)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::{Value, json};
    use std::fs;
    use tempfile::TempDir;

    fn doc(v: Value) -> Document {
        v.as_object().cloned().unwrap()
    }

    #[test]
    fn test_merge_creates_intelligence() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("profile_CUST-1.json");
        fs::write(&path, r#"{"contact_info": {"facebook_id": "FB999"}}"#).unwrap();

        assert!(RecordMerger::new().merge_intelligence(&path, &doc(json!({"tag": "vip"}))));

        let record = read_document(&path).unwrap();
        assert_eq!(record["intelligence"]["tag"], json!("vip"));
        let ts = record["intelligence"]["last_update"].as_str().unwrap();
        assert!(chrono::DateTime::parse_from_rfc3339(ts).is_ok());
        assert_eq!(record["contact_info"]["facebook_id"], json!("FB999"));
    }

    #[test]
    fn test_merge_missing_file_fails() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("profile_missing.json");
        assert!(!RecordMerger::new().merge_intelligence(&path, &Document::new()));
        assert!(!path.exists());
    }

    #[test]
    fn test_merge_unparseable_file_left_unchanged() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("profile_CUST-1.json");
        fs::write(&path, "{broken").unwrap();

        assert!(!RecordMerger::new().merge_intelligence(&path, &doc(json!({"a": 1}))));
        assert_eq!(fs::read_to_string(&path).unwrap(), "{broken");
    }

    #[test]
    fn test_merge_twice_same_result_except_timestamp() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("profile_CUST-1.json");
        fs::write(&path, r#"{"intelligence": {"a": 1, "b": 2}}"#).unwrap();
        let merger = RecordMerger::new();
        let patch = doc(json!({"b": 3}));

        let mut first = merger.try_merge_intelligence(&path, &patch).unwrap();
        let mut second = merger.try_merge_intelligence(&path, &patch).unwrap();
        for record in [&mut first, &mut second] {
            record["intelligence"]
                .as_object_mut()
                .unwrap()
                .remove("last_update");
        }
        assert_eq!(first, second);
        assert_eq!(first["intelligence"], json!({"a": 1, "b": 3}));
    }
}
