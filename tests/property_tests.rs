//! Property-based tests for merging and identifier resolution.
//!
//! Uses proptest to verify invariants across random inputs:
//! - Merging the same patch twice is idempotent (timestamp aside)
//! - Keys absent from the patch survive a merge
//! - `MSG-` prefixed identifiers resolve like their stripped form
//! - Direct matches are never shadowed by a colliding social ID

// Property tests use expect/unwrap for simplicity - panics are acceptable in tests
#![allow(clippy::expect_used, clippy::unwrap_used)]

use crmstore::models::{CustomerId, Document, LAST_UPDATE_KEY};
use crmstore::storage::merge::{merge_intelligence, merge_into_record};
use crmstore::storage::{IdentifierResolver, RecordSpace, ResolveTier};
use proptest::prelude::*;
use serde_json::{Value, json};
use std::fs;
use tempfile::TempDir;

fn scalar() -> impl Strategy<Value = Value> {
    prop_oneof![
        any::<i64>().prop_map(Value::from),
        any::<bool>().prop_map(Value::from),
        "[a-z ]{0,12}".prop_map(Value::from),
        Just(Value::Null),
    ]
}

fn document() -> impl Strategy<Value = Document> {
    prop::collection::btree_map("[a-z]{1,6}", scalar(), 0..8)
        .prop_map(|map| map.into_iter().collect())
}

fn write_profile(root: &std::path::Path, dir: &str, social_id: &str) {
    let path = root.join(dir).join(format!("profile_{dir}.json"));
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, json!({"contact_info": {"facebook_id": social_id}}).to_string()).unwrap();
}

proptest! {
    /// Property: applying the same patch twice equals applying it once.
    #[test]
    fn prop_merge_idempotent(existing in document(), patch in document()) {
        let mut once = existing.clone();
        merge_intelligence(&mut once, &patch, "2024-01-01T00:00:00Z");

        let mut twice = once.clone();
        merge_intelligence(&mut twice, &patch, "2024-01-02T00:00:00Z");

        once.remove(LAST_UPDATE_KEY);
        twice.remove(LAST_UPDATE_KEY);
        prop_assert_eq!(once, twice);
    }

    /// Property: every key is either patched or preserved.
    #[test]
    fn prop_merge_preserves_unpatched_keys(existing in document(), patch in document()) {
        let mut merged = existing.clone();
        merge_intelligence(&mut merged, &patch, "2024-01-01T00:00:00Z");

        for (key, value) in &existing {
            if key != LAST_UPDATE_KEY && !patch.contains_key(key) {
                prop_assert_eq!(merged.get(key), Some(value));
            }
        }
        for (key, value) in &patch {
            if key != LAST_UPDATE_KEY {
                prop_assert_eq!(merged.get(key), Some(value));
            }
        }
        prop_assert_eq!(
            merged.get(LAST_UPDATE_KEY),
            Some(&Value::from("2024-01-01T00:00:00Z"))
        );
    }

    /// Property: merging into a record leaves non-intelligence fields intact.
    #[test]
    fn prop_record_fields_untouched(record in document(), patch in document()) {
        let mut merged = record.clone();
        merge_into_record(&mut merged, &patch, "2024-01-01T00:00:00Z");

        for (key, value) in &record {
            if key != "intelligence" {
                prop_assert_eq!(merged.get(key), Some(value));
            }
        }
        prop_assert!(merged["intelligence"].is_object());
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    /// Property: `MSG-<id>` and `<id>` resolve to the same profile.
    #[test]
    fn prop_msg_prefix_equivalent(social in "[0-9]{3,12}", others in 0usize..4) {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("customer");
        for i in 0..others {
            write_profile(&root, &format!("OTHER-{i}"), &format!("X{i}"));
        }
        write_profile(&root, "TARGET", &social);

        let resolver = IdentifierResolver::new(RecordSpace::new(&root));
        let plain = resolver.resolve(&CustomerId::new(social.clone())).unwrap().unwrap();
        let prefixed = resolver
            .resolve(&CustomerId::new(format!("MSG-{social}")))
            .unwrap()
            .unwrap();

        prop_assert_eq!(&plain.path, &prefixed.path);
        prop_assert!(plain.path.starts_with(root.join("TARGET")));
    }

    /// Property: a canonical directory wins over any profile claiming its id.
    #[test]
    fn prop_direct_match_wins(id in "[A-Z]{2}-[0-9]{1,6}") {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("customer");
        write_profile(&root, "0-DECOY", &id);
        write_profile(&root, &id, "unrelated");

        let resolver = IdentifierResolver::new(RecordSpace::new(&root)).with_alias_index();
        let found = resolver.resolve(&CustomerId::new(id.clone())).unwrap().unwrap();
        prop_assert_eq!(found.tier, ResolveTier::Direct);
        prop_assert!(found.path.starts_with(root.join(&id)));
    }
}
