//! File-backed chat history.
//!
//! Conversations live at `<root>/<customer>/chathistory/conv_<id>.json`. The
//! owning customer is not known from the conversation ID, so every customer's
//! chat history is searched. No cache is kept.

use super::layout::{CHAT_HISTORY_DIR, RecordSpace, is_safe_segment, read_document, write_document};
use crate::models::{ConversationId, Document};
use crate::Result;
use serde_json::{Value, json};
use std::path::PathBuf;

/// Chat history stored in conversation documents.
#[derive(Debug, Clone)]
pub struct FileChatStore {
    space: RecordSpace,
}

impl FileChatStore {
    /// Creates a chat store over a record space.
    #[must_use]
    pub const fn new(space: RecordSpace) -> Self {
        Self { space }
    }

    /// Locates `conv_<id>.json` in any customer's chat history.
    ///
    /// Customers are searched in name order and the first hit wins. Only the
    /// exact name matches; this is the lookup used for writes.
    ///
    /// # Errors
    ///
    /// Returns an error if the record space root exists but cannot be listed.
    pub fn find_conversation(&self, id: &ConversationId) -> Result<Option<PathBuf>> {
        self.find_named(id, &RecordSpace::conversation_file_name(id))
    }

    /// Locates a conversation for reading.
    ///
    /// Falls back to the legacy `conv_t_<id>.json` only after no customer
    /// holds `conv_<id>.json`.
    ///
    /// # Errors
    ///
    /// Returns an error if the record space root exists but cannot be listed.
    pub fn find_conversation_for_read(&self, id: &ConversationId) -> Result<Option<PathBuf>> {
        if let Some(path) = self.find_conversation(id)? {
            return Ok(Some(path));
        }
        self.find_named(id, &RecordSpace::legacy_conversation_file_name(id))
    }

    fn find_named(&self, id: &ConversationId, file_name: &str) -> Result<Option<PathBuf>> {
        if !is_safe_segment(id.as_str()) || !self.space.exists() {
            return Ok(None);
        }

        Ok(self
            .space
            .entries()?
            .into_iter()
            .map(|entry| entry.join(CHAT_HISTORY_DIR).join(file_name))
            .find(|path| path.is_file()))
    }

    /// Replaces the conversation's messages and stamps `updated_time`.
    ///
    /// Returns `Ok(false)` if no conversation file exists; no file is created.
    ///
    /// # Errors
    ///
    /// Returns an error if the conversation file cannot be read or written.
    pub fn save_messages(&self, id: &ConversationId, messages: &[Value]) -> Result<bool> {
        let Some(path) = self.find_conversation(id)? else {
            tracing::debug!(conversation_id = %id, "Conversation not found in record space");
            return Ok(false);
        };

        let mut conversation = read_document(&path)?;
        conversation.insert("messages".to_string(), json!({ "data": messages }));
        conversation.insert(
            "updated_time".to_string(),
            Value::String(crate::iso_timestamp()),
        );
        write_document(&path, &conversation)?;
        Ok(true)
    }

    /// Loads the conversation's messages, oldest first.
    ///
    /// Messages are stored newest first in the platform's `{ "data": [...] }`
    /// envelope; a bare array is accepted too.
    ///
    /// # Errors
    ///
    /// Returns an error if the conversation file cannot be read.
    pub fn load_messages(&self, id: &ConversationId) -> Result<Option<Vec<Value>>> {
        let Some(path) = self.find_conversation_for_read(id)? else {
            return Ok(None);
        };
        let conversation = read_document(&path)?;
        Ok(Some(messages_oldest_first(&conversation)))
    }
}

fn messages_oldest_first(conversation: &Document) -> Vec<Value> {
    let stored = match conversation.get("messages") {
        Some(Value::Object(envelope)) => envelope.get("data").and_then(Value::as_array),
        Some(Value::Array(list)) => Some(list),
        _ => None,
    };
    stored
        .map(|list| list.iter().rev().cloned().collect())
        .unwrap_or_default()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    fn write_conversation(root: &Path, customer: &str, file: &str, body: &Value) -> PathBuf {
        let dir = root.join(customer).join(CHAT_HISTORY_DIR);
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join(file);
        fs::write(&path, serde_json::to_string(body).unwrap()).unwrap();
        path
    }

    #[test]
    fn test_save_replaces_messages() {
        let dir = TempDir::new().unwrap();
        let path = write_conversation(
            dir.path(),
            "CUST-1",
            "conv_t_100.json",
            &json!({"id": "t_100", "messages": {"data": [{"id": "old"}]}, "snippet": "hi"}),
        );
        let store = FileChatStore::new(RecordSpace::new(dir.path()));

        let saved = store
            .save_messages(&ConversationId::new("t_100"), &[json!({"id": "m2"}), json!({"id": "m1"})])
            .unwrap();
        assert!(saved);

        let conv = read_document(&path).unwrap();
        assert_eq!(conv["messages"], json!({"data": [{"id": "m2"}, {"id": "m1"}]}));
        assert_eq!(conv["snippet"], json!("hi"));
        assert!(conv["updated_time"].is_string());
    }

    #[test]
    fn test_legacy_name_is_read_only() {
        let dir = TempDir::new().unwrap();
        let path = write_conversation(
            dir.path(),
            "CUST-1",
            "conv_t_100.json",
            &json!({"messages": {"data": [{"id": "keep"}]}}),
        );
        let store = FileChatStore::new(RecordSpace::new(dir.path()));
        let id = ConversationId::new("100");

        assert_eq!(store.find_conversation_for_read(&id).unwrap(), Some(path.clone()));
        assert!(store.find_conversation(&id).unwrap().is_none());
        assert!(!store.save_messages(&id, &[json!({"id": "new"})]).unwrap());
        assert_eq!(
            read_document(&path).unwrap()["messages"],
            json!({"data": [{"id": "keep"}]})
        );
    }

    #[test]
    fn test_exact_name_wins_over_earlier_legacy_name() {
        let dir = TempDir::new().unwrap();
        let other = write_conversation(
            dir.path(),
            "A",
            "conv_t_100.json",
            &json!({"messages": {"data": [{"id": "keep"}]}}),
        );
        let target = write_conversation(
            dir.path(),
            "B",
            "conv_100.json",
            &json!({"messages": {"data": []}}),
        );
        let store = FileChatStore::new(RecordSpace::new(dir.path()));
        let id = ConversationId::new("100");

        assert!(store.save_messages(&id, &[json!({"id": "new"})]).unwrap());
        assert_eq!(
            read_document(&target).unwrap()["messages"],
            json!({"data": [{"id": "new"}]})
        );
        assert_eq!(
            read_document(&other).unwrap()["messages"],
            json!({"data": [{"id": "keep"}]})
        );
        assert_eq!(store.find_conversation_for_read(&id).unwrap(), Some(target));
    }

    #[test]
    fn test_unknown_conversation_creates_nothing() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("CUST-1").join(CHAT_HISTORY_DIR)).unwrap();
        let store = FileChatStore::new(RecordSpace::new(dir.path()));

        let saved = store
            .save_messages(&ConversationId::new("t_404"), &[json!({"id": "m1"})])
            .unwrap();
        assert!(!saved);

        let files = fs::read_dir(dir.path().join("CUST-1").join(CHAT_HISTORY_DIR))
            .unwrap()
            .count();
        assert_eq!(files, 0);
    }

    #[test]
    fn test_unsafe_id_not_found() {
        let dir = TempDir::new().unwrap();
        let store = FileChatStore::new(RecordSpace::new(dir.path()));
        assert!(store.find_conversation(&ConversationId::new("../x")).unwrap().is_none());
    }

    #[test]
    fn test_load_messages_oldest_first() {
        let dir = TempDir::new().unwrap();
        write_conversation(
            dir.path(),
            "CUST-1",
            "conv_t_1.json",
            &json!({"messages": {"data": [{"id": "newest"}, {"id": "oldest"}]}}),
        );
        let store = FileChatStore::new(RecordSpace::new(dir.path()));

        let messages = store.load_messages(&ConversationId::new("t_1")).unwrap().unwrap();
        assert_eq!(messages, vec![json!({"id": "oldest"}), json!({"id": "newest"})]);
        assert!(store.load_messages(&ConversationId::new("t_2")).unwrap().is_none());
    }
}
