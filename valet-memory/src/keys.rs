//! Key construction helpers.
//!
//! Keys follow the convention `<namespace>:<agent-or-entity-id>:<qualifier>`
//! so that prefix listing groups related entries.

use valet_core::{AgentId, MessageId};

/// Key for a raw message record.
pub fn message_key(message_id: &MessageId) -> String {
    format!("message:{}", message_id)
}

/// Key for the router's record of a delivered message.
pub fn routed_key(message_id: &MessageId) -> String {
    format!("routed:{}", message_id)
}

/// Key for an agent-scoped record.
pub fn agent_key(agent_id: &AgentId, qualifier: &str) -> String {
    format!("agent:{}:{}", agent_id, qualifier)
}

/// Key for a message an agent has accepted into its inbox.
pub fn inbox_key(agent_id: &AgentId, message_id: &MessageId) -> String {
    format!("msg:{}:{}", agent_id, message_id)
}

/// Key for a turn within a conversation.
pub fn conversation_key(conversation_id: &str, message_id: &MessageId) -> String {
    format!("conversation:{}:{}", conversation_id, message_id)
}

/// Key for a personal task.
pub fn task_key(task_id: &str) -> String {
    format!("personal_task:{}", task_id)
}

/// Key for a cached research finding.
pub fn research_key(agent_id: &AgentId, message_id: &MessageId) -> String {
    format!("research:{}:{}", agent_id, message_id)
}
