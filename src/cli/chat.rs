//! Chat commands.

use super::{CommandOutput, read_json_arg};
use crate::models::ConversationId;
use crate::services::PersistenceAdapter;
use anyhow::{Result, bail};
use serde_json::Value;

pub fn save(adapter: &PersistenceAdapter, id: &str, messages: &str) -> Result<CommandOutput> {
    let Value::Array(messages) = read_json_arg(messages)? else {
        bail!("--messages must be a JSON array");
    };
    let outcome = adapter
        .chats()
        .save_chat_messages_outcome(&ConversationId::new(id), &messages);
    Ok(CommandOutput::from_outcome(outcome, "saved"))
}

pub fn load(adapter: &PersistenceAdapter, id: &str) -> CommandOutput {
    let outcome = adapter
        .chats()
        .load_chat_messages_outcome(&ConversationId::new(id));
    CommandOutput::from_outcome(outcome, "messages")
}
