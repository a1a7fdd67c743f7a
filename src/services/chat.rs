//! Chat adapter.
//!
//! The relational path only upserts the conversation's last-updated marker;
//! message bodies are persisted by the file backend alone.

use super::dispatch::{Dispatcher, Outcome, Served};
use crate::models::{ConversationId, EntityKind};
use crate::storage::FileChatStore;
use serde_json::Value;
use std::sync::Arc;
use tracing::instrument;

/// Chat history operations.
#[derive(Debug, Clone)]
pub struct ChatAdapter {
    dispatcher: Arc<Dispatcher>,
    files: FileChatStore,
}

impl ChatAdapter {
    /// Creates a chat adapter.
    #[must_use]
    pub const fn new(dispatcher: Arc<Dispatcher>, files: FileChatStore) -> Self {
        Self { dispatcher, files }
    }

    /// Replaces a conversation's messages.
    ///
    /// In file mode an unknown conversation returns `false` and no file is
    /// created.
    pub fn save_chat_messages(&self, id: impl Into<ConversationId>, messages: &[Value]) -> bool {
        self.save_chat_messages_outcome(&id.into(), messages)
            .is_success()
    }

    /// Replaces a conversation's messages, reporting which backend served the call.
    #[instrument(skip(self, messages), fields(conversation_id = %id, messages = messages.len()))]
    pub fn save_chat_messages_outcome(&self, id: &ConversationId, messages: &[Value]) -> Outcome {
        self.dispatcher.dispatch(
            EntityKind::Conversation,
            "save_chat_messages",
            |store| {
                store.touch_conversation(id, &crate::iso_timestamp())?;
                Ok(Served::Applied(()))
            },
            || {
                Ok(if self.files.save_messages(id, messages)? {
                    Served::Applied(())
                } else {
                    Served::NotFound
                })
            },
        )
    }

    /// Loads a conversation's messages, oldest first.
    pub fn load_chat_messages(&self, id: impl Into<ConversationId>) -> Option<Vec<Value>> {
        self.load_chat_messages_outcome(&id.into()).into_value()
    }

    /// Loads a conversation's messages, reporting which backend served the call.
    #[instrument(skip(self), fields(conversation_id = %id))]
    pub fn load_chat_messages_outcome(&self, id: &ConversationId) -> Outcome<Vec<Value>> {
        self.dispatcher
            .file_only(EntityKind::Conversation, "load_chat_messages", || {
                Ok(self
                    .files
                    .load_messages(id)?
                    .map_or(Served::NotFound, Served::Applied))
            })
    }
}
