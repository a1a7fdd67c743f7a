//! File backend integration tests.
//!
//! Runs the entity adapters in file mode against a temporary record space:
//! - Identifier resolution (direct match, social-ID scan, `MSG-` aliases)
//! - Intelligence merges
//! - Chat history replacement and reads
//! - Task creation as a non-persisting stub

// Integration tests use expect/unwrap for simplicity - panics are acceptable in tests
#![allow(clippy::expect_used, clippy::unwrap_used, clippy::panic)]

use chrono::NaiveDateTime;
use crmstore::observability::EventBus;
use crmstore::storage::ResolveTier;
use crmstore::{
    AdapterConfig, BackendKind, BackendSelector, Document, NewTask, OutcomeStatus,
    PersistenceAdapter, TaskPriority,
};
use serde_json::{Value, json};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

// ============================================================================
// Test Helpers
// ============================================================================

fn record_space() -> (TempDir, PathBuf) {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let root = dir.path().join("customer");
    fs::create_dir_all(&root).unwrap();
    (dir, root)
}

fn file_adapter(root: &Path) -> PersistenceAdapter {
    file_adapter_with(AdapterConfig::new().with_data_dir(root))
}

fn file_adapter_with(config: AdapterConfig) -> PersistenceAdapter {
    PersistenceAdapter::with_parts(config, Arc::new(BackendSelector::file()), EventBus::new(64))
}

fn write_json(path: &Path, value: &Value) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, serde_json::to_string_pretty(value).unwrap()).unwrap();
}

fn read_json(path: &Path) -> Value {
    serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap()
}

fn write_profile(root: &Path, dir: &str, profile: &Value) -> PathBuf {
    let path = root.join(dir).join(format!("profile_{dir}.json"));
    write_json(&path, profile);
    path
}

fn patch(value: &Value) -> Document {
    value.as_object().cloned().expect("patch must be an object")
}

fn count_files(dir: &Path) -> usize {
    fs::read_dir(dir)
        .unwrap()
        .map(|entry| {
            let path = entry.unwrap().path();
            if path.is_dir() { count_files(&path) } else { 1 }
        })
        .sum()
}

fn assert_iso_seconds(ts: &str) {
    NaiveDateTime::parse_from_str(ts, "%Y-%m-%dT%H:%M:%SZ")
        .unwrap_or_else(|e| panic!("'{ts}' is not an ISO-8601 UTC timestamp: {e}"));
}

// ============================================================================
// Intelligence updates
// ============================================================================

#[test]
fn test_update_by_social_id_updates_matching_profile() {
    let (_dir, root) = record_space();
    let profile = write_profile(
        &root,
        "CUST-1",
        &json!({"customer_id": "CUST-1", "contact_info": {"facebook_id": "FB999"}}),
    );
    let adapter = file_adapter(&root);

    assert!(adapter
        .customers()
        .update_customer_intelligence("FB999", &patch(&json!({"tag": "vip"}))));

    let stored = read_json(&profile);
    assert_eq!(stored["intelligence"]["tag"], "vip");
    assert_iso_seconds(stored["intelligence"]["last_update"].as_str().unwrap());
    assert_eq!(stored["intelligence"].as_object().unwrap().len(), 2);
    assert_eq!(stored["contact_info"]["facebook_id"], "FB999");
}

#[test]
fn test_merge_preserves_existing_keys() {
    let (_dir, root) = record_space();
    let profile = write_profile(
        &root,
        "CUST-2",
        &json!({"intelligence": {"a": 1, "b": 2}, "notes": ["keep"]}),
    );
    let adapter = file_adapter(&root);

    assert!(adapter
        .customers()
        .update_customer_intelligence("CUST-2", &patch(&json!({"b": 3}))));

    let stored = read_json(&profile);
    assert_eq!(stored["intelligence"]["a"], 1);
    assert_eq!(stored["intelligence"]["b"], 3);
    assert!(stored["intelligence"]["last_update"].is_string());
    assert_eq!(stored["notes"], json!(["keep"]));
}

#[test]
fn test_repeated_patch_is_idempotent() {
    let (_dir, root) = record_space();
    let profile = write_profile(&root, "CUST-3", &json!({"intelligence": {"a": 1}}));
    let adapter = file_adapter(&root);
    let p = patch(&json!({"stage": "qualified", "score": 7}));

    assert!(adapter.customers().update_customer_intelligence("CUST-3", &p));
    let mut first = read_json(&profile);
    assert!(adapter.customers().update_customer_intelligence("CUST-3", &p));
    let mut second = read_json(&profile);

    first["intelligence"].as_object_mut().unwrap().remove("last_update");
    second["intelligence"].as_object_mut().unwrap().remove("last_update");
    assert_eq!(first, second);
}

#[test]
fn test_update_unknown_identifier_returns_false() {
    let (_dir, root) = record_space();
    write_profile(&root, "CUST-1", &json!({"contact_info": {"facebook_id": "FB999"}}));
    let adapter = file_adapter(&root);

    let outcome = adapter
        .customers()
        .update_customer_intelligence_outcome(&"FB000".into(), &patch(&json!({"tag": "x"})));
    assert!(!outcome.is_success());
    assert_eq!(outcome.status, OutcomeStatus::NotFound);
    assert_eq!(outcome.served_by, BackendKind::File);
}

#[test]
fn test_missing_record_space_is_not_found() {
    let dir = TempDir::new().unwrap();
    let adapter = file_adapter(&dir.path().join("does-not-exist"));

    assert!(!adapter
        .customers()
        .update_customer_intelligence("FB999", &patch(&json!({"tag": "vip"}))));
    assert!(adapter.customers().resolve("FB999").unwrap().is_none());
    assert!(adapter.customers().list_customers().is_empty());
}

#[test]
fn test_corrupt_profile_does_not_abort_scan() {
    let (_dir, root) = record_space();
    fs::create_dir_all(root.join("AAA")).unwrap();
    fs::write(root.join("AAA").join("profile_AAA.json"), "{ not json").unwrap();
    fs::create_dir_all(root.join("BBB")).unwrap();
    let target = write_profile(&root, "CCC", &json!({"facebook_id": "FB42"}));
    let adapter = file_adapter(&root);

    let found = adapter.customers().resolve("FB42").unwrap().unwrap();
    assert_eq!(found.path, target);
    assert_eq!(found.tier, ResolveTier::Scan);
}

// ============================================================================
// Identifier resolution
// ============================================================================

#[test]
fn test_direct_match_wins_over_decoy() {
    let (_dir, root) = record_space();
    let canonical = write_profile(&root, "CUST-1", &json!({"name": "real"}));
    // Sorts before CUST-1 and claims its id as social id.
    let decoy = write_profile(
        &root,
        "A-DECOY",
        &json!({"name": "decoy", "contact_info": {"facebook_id": "CUST-1"}}),
    );
    let decoy_before = fs::read_to_string(&decoy).unwrap();
    let adapter = file_adapter(&root);

    let found = adapter.customers().resolve("CUST-1").unwrap().unwrap();
    assert_eq!(found.path, canonical);
    assert_eq!(found.tier, ResolveTier::Direct);

    assert!(adapter
        .customers()
        .update_customer_intelligence("CUST-1", &patch(&json!({"tag": "vip"}))));
    assert_eq!(read_json(&canonical)["intelligence"]["tag"], "vip");
    assert_eq!(fs::read_to_string(&decoy).unwrap(), decoy_before);
}

#[test]
fn test_canonical_id_with_dot_or_at_is_direct() {
    let (_dir, root) = record_space();
    let dotted = write_profile(&root, "cust.1", &json!({}));
    let email = write_profile(&root, "a@b.com", &json!({}));
    let adapter = file_adapter(&root);

    assert!(adapter
        .customers()
        .update_customer_intelligence("cust.1", &patch(&json!({"tag": "vip"}))));
    assert!(adapter
        .customers()
        .update_customer_intelligence("a@b.com", &patch(&json!({"tag": "lead"}))));

    assert_eq!(read_json(&dotted)["intelligence"]["tag"], "vip");
    assert_eq!(read_json(&email)["intelligence"]["tag"], "lead");
}

#[test]
fn test_msg_prefix_resolves_same_record() {
    let (_dir, root) = record_space();
    let target = write_profile(&root, "CUST-9", &json!({"contact_info": {"facebook_id": "555"}}));
    let adapter = file_adapter(&root);

    let plain = adapter.customers().resolve("555").unwrap().unwrap();
    let prefixed = adapter.customers().resolve("MSG-555").unwrap().unwrap();
    assert_eq!(plain.path, target);
    assert_eq!(prefixed.path, target);
}

#[test]
fn test_top_level_social_id_fallback() {
    let (_dir, root) = record_space();
    let target = write_profile(&root, "CUST-4", &json!({"contact_info": {}, "facebook_id": "FB4"}));
    let adapter = file_adapter(&root);

    assert_eq!(adapter.customers().resolve("FB4").unwrap().unwrap().path, target);
}

#[test]
fn test_alias_index_tracks_external_edits() {
    let (_dir, root) = record_space();
    let first = write_profile(&root, "CUST-1", &json!({"facebook_id": "FB1"}));
    let adapter = file_adapter_with(
        AdapterConfig::new()
            .with_data_dir(&root)
            .with_alias_index(true),
    );

    let found = adapter.customers().resolve("FB1").unwrap().unwrap();
    assert_eq!(found.path, first);
    assert_eq!(found.tier, ResolveTier::Index);

    // Another process moves the alias to a different profile.
    write_json(&first, &json!({"facebook_id": "FB-OTHER"}));
    let second = write_profile(&root, "CUST-2", &json!({"facebook_id": "FB1"}));

    let found = adapter.customers().resolve("FB1").unwrap().unwrap();
    assert_eq!(found.path, second);
}

// ============================================================================
// Customers
// ============================================================================

#[test]
fn test_upsert_then_get_and_list() {
    let (_dir, root) = record_space();
    let adapter = file_adapter(&root);

    let doc = patch(&json!({"customer_id": "CUST-7", "name": "Somchai", "contact_info": {"facebook_id": "FB7"}}));
    assert!(adapter.customers().upsert_customer(&doc));
    assert!(root.join("CUST-7").join("profile_CUST-7.json").is_file());

    let by_social = adapter.customers().get_customer("FB7").unwrap();
    assert_eq!(by_social["name"], "Somchai");
    assert_eq!(adapter.customers().list_customers().len(), 1);

    let missing_id = patch(&json!({"name": "nobody"}));
    assert!(!adapter.customers().upsert_customer(&missing_id));
}

// ============================================================================
// Chat history
// ============================================================================

#[test]
fn test_save_chat_replaces_messages() {
    let (_dir, root) = record_space();
    write_profile(&root, "CUST-1", &json!({}));
    let conv = root.join("CUST-1").join("chathistory").join("conv_t_100.json");
    write_json(
        &conv,
        &json!({"id": "t_100", "messages": {"data": [{"message": "old"}]}, "participants": ["a"]}),
    );
    let adapter = file_adapter(&root);

    let messages = vec![json!({"message": "newest"}), json!({"message": "older"})];
    assert!(adapter.chats().save_chat_messages("t_100", &messages));

    let stored = read_json(&conv);
    assert_eq!(stored["messages"]["data"], json!(messages));
    assert_eq!(stored["participants"], json!(["a"]));
    assert_iso_seconds(stored["updated_time"].as_str().unwrap());

    let loaded = adapter.chats().load_chat_messages("t_100").unwrap();
    assert_eq!(loaded, vec![json!({"message": "older"}), json!({"message": "newest"})]);
}

#[test]
fn test_save_chat_unknown_conversation_creates_nothing() {
    let (_dir, root) = record_space();
    write_profile(&root, "CUST-1", &json!({}));
    fs::create_dir_all(root.join("CUST-1").join("chathistory")).unwrap();
    let before = count_files(&root);
    let adapter = file_adapter(&root);

    let outcome = adapter
        .chats()
        .save_chat_messages_outcome(&"t_missing".into(), &[json!({"message": "hi"})]);
    assert!(!outcome.is_success());
    assert_eq!(outcome.status, OutcomeStatus::NotFound);
    assert_eq!(count_files(&root), before);
    assert!(adapter.chats().load_chat_messages("t_missing").is_none());
}

#[test]
fn test_legacy_conversation_file_name_is_read_only() {
    let (_dir, root) = record_space();
    let conv = root.join("CUST-1").join("chathistory").join("conv_t_200.json");
    write_json(&conv, &json!({"messages": {"data": [{"message": "keep"}]}}));
    let adapter = file_adapter(&root);

    assert_eq!(
        adapter.chats().load_chat_messages("200").unwrap(),
        vec![json!({"message": "keep"})]
    );
    assert!(!adapter.chats().save_chat_messages("200", &[json!({"message": "x"})]));
    assert_eq!(read_json(&conv)["messages"]["data"][0]["message"], "keep");
}

#[test]
fn test_save_chat_ignores_other_conversation_with_legacy_name() {
    let (_dir, root) = record_space();
    let other = root.join("A").join("chathistory").join("conv_t_100.json");
    let target = root.join("B").join("chathistory").join("conv_100.json");
    write_json(&other, &json!({"messages": {"data": [{"id": "keep"}]}}));
    write_json(&target, &json!({"messages": {"data": []}}));
    let adapter = file_adapter(&root);

    assert!(adapter.chats().save_chat_messages("100", &[json!({"id": "new"})]));
    assert_eq!(read_json(&target)["messages"]["data"], json!([{"id": "new"}]));
    assert_eq!(read_json(&other)["messages"]["data"], json!([{"id": "keep"}]));
}

// ============================================================================
// Tasks and marketing
// ============================================================================

#[test]
fn test_create_task_in_file_mode_is_simulated() {
    let (_dir, root) = record_space();
    write_profile(&root, "CUST-1", &json!({}));
    let before = count_files(&root);
    let adapter = file_adapter(&root);

    let task = NewTask::new("CUST-1", "Call back", "Asked for a quote")
        .with_priority(TaskPriority::High);
    let outcome = adapter.tasks().create_task_outcome(&task);

    assert!(outcome.is_success());
    assert_eq!(outcome.status, OutcomeStatus::Simulated);
    assert_eq!(count_files(&root), before);
    assert!(adapter.tasks().create_task(&task));
}

#[test]
fn test_marketing_upserts_unsupported_in_file_mode() {
    let (_dir, root) = record_space();
    let adapter = file_adapter(&root);

    let outcome = adapter
        .marketing()
        .upsert_ad_daily_metrics_outcome(&[]);
    assert_eq!(outcome.status, OutcomeStatus::Unsupported);
    assert!(!adapter.marketing().upsert_marketing_data(&crmstore::MarketingBundle::default()));
}
