//! Message protocol types.
//!
//! The `Message` is the immutable unit of communication between agents and
//! the orchestrator. Construction happens through the builder-style `with_*`
//! methods; once routed, a message is never mutated.

use crate::identity::{new_message_id, AgentId, MessageId, Timestamp};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

// ============================================================================
// MESSAGE TYPE
// ============================================================================

/// Type of agent message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MessageType {
    /// Ask an agent to perform work, usually answered with a Response
    Request,
    /// Ask an agent for information it already holds
    Query,
    /// Imperative instruction, answered with a Report
    Command,
    /// Fire-and-forget signal, never answered
    Notification,
    /// Terminal reply to a Request or Query
    Response,
    /// Terminal reply to a Command
    Report,
    /// Terminal failure reply
    Error,
}

impl MessageType {
    /// Convert to database string representation.
    pub fn as_db_str(&self) -> &'static str {
        match self {
            MessageType::Request => "Request",
            MessageType::Query => "Query",
            MessageType::Command => "Command",
            MessageType::Notification => "Notification",
            MessageType::Response => "Response",
            MessageType::Report => "Report",
            MessageType::Error => "Error",
        }
    }

    /// Parse from database string representation.
    pub fn from_db_str(s: &str) -> Result<Self, MessageTypeParseError> {
        match s.to_lowercase().as_str() {
            "request" => Ok(MessageType::Request),
            "query" => Ok(MessageType::Query),
            "command" => Ok(MessageType::Command),
            "notification" => Ok(MessageType::Notification),
            "response" => Ok(MessageType::Response),
            "report" => Ok(MessageType::Report),
            "error" => Ok(MessageType::Error),
            _ => Err(MessageTypeParseError(s.to_string())),
        }
    }

    /// Whether a message of this type owes the sender a terminal reply.
    ///
    /// Response, Report and Error are themselves terminal; Notification is
    /// fire-and-forget.
    pub fn expects_reply(&self) -> bool {
        matches!(
            self,
            MessageType::Request | MessageType::Query | MessageType::Command
        )
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_db_str())
    }
}

impl FromStr for MessageType {
    type Err = MessageTypeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_db_str(s)
    }
}

/// Error when parsing an invalid message type string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageTypeParseError(pub String);

impl fmt::Display for MessageTypeParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Invalid message type: {}", self.0)
    }
}

impl std::error::Error for MessageTypeParseError {}

// ============================================================================
// MESSAGE PRIORITY
// ============================================================================

/// Priority level for messages.
///
/// Advisory only: used for display and sorting, never for preemption.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum MessagePriority {
    /// Low priority - can be delayed
    Low,
    /// Normal priority
    #[default]
    Medium,
    /// High priority - should be processed soon
    High,
    /// Critical - must be processed immediately
    Critical,
}

impl MessagePriority {
    /// Convert to database string representation.
    pub fn as_db_str(&self) -> &'static str {
        match self {
            MessagePriority::Low => "Low",
            MessagePriority::Medium => "Medium",
            MessagePriority::High => "High",
            MessagePriority::Critical => "Critical",
        }
    }

    /// Parse from database string representation.
    pub fn from_db_str(s: &str) -> Result<Self, MessagePriorityParseError> {
        match s.to_lowercase().as_str() {
            "low" => Ok(MessagePriority::Low),
            "medium" => Ok(MessagePriority::Medium),
            "high" => Ok(MessagePriority::High),
            "critical" => Ok(MessagePriority::Critical),
            _ => Err(MessagePriorityParseError(s.to_string())),
        }
    }
}

impl fmt::Display for MessagePriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_db_str())
    }
}

impl FromStr for MessagePriority {
    type Err = MessagePriorityParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_db_str(s)
    }
}

/// Error when parsing an invalid message priority string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessagePriorityParseError(pub String);

impl fmt::Display for MessagePriorityParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Invalid message priority: {}", self.0)
    }
}

impl std::error::Error for MessagePriorityParseError {}

// ============================================================================
// MESSAGE CONTEXT
// ============================================================================

/// Correlation context carried by a message.
///
/// The well-known fields are typed so a typo cannot silently drop context;
/// `extra` is the escape hatch for forward compatibility.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct MessageContext {
    /// Conversation this message belongs to
    pub conversation_id: Option<String>,
    /// Session this message belongs to
    pub session_id: Option<String>,
    /// User on whose behalf the message was created
    pub user_id: Option<String>,
    /// Open bag for keys not yet promoted to typed fields
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub extra: HashMap<String, serde_json::Value>,
}

impl MessageContext {
    /// Create an empty context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the conversation id.
    pub fn with_conversation(mut self, conversation_id: impl Into<String>) -> Self {
        self.conversation_id = Some(conversation_id.into());
        self
    }

    /// Set the session id.
    pub fn with_session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    /// Set the user id.
    pub fn with_user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    /// Attach an extra key/value pair.
    pub fn with_extra(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.extra.insert(key.into(), value);
        self
    }

    /// Whether no context at all is attached.
    pub fn is_empty(&self) -> bool {
        self.conversation_id.is_none()
            && self.session_id.is_none()
            && self.user_id.is_none()
            && self.extra.is_empty()
    }

    /// Render the known fields as `key=value` lines for prompt assembly.
    pub fn describe(&self) -> Vec<String> {
        let mut lines = Vec::new();
        if let Some(ref c) = self.conversation_id {
            lines.push(format!("conversation={}", c));
        }
        if let Some(ref s) = self.session_id {
            lines.push(format!("session={}", s));
        }
        if let Some(ref u) = self.user_id {
            lines.push(format!("user={}", u));
        }
        for (key, value) in &self.extra {
            lines.push(format!("{}={}", key, value));
        }
        lines
    }
}

// ============================================================================
// MESSAGE
// ============================================================================

/// A message between agents.
///
/// Immutable once constructed; replies reference the original through
/// `reply_to` rather than mutating it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Unique identifier for this message
    pub message_id: MessageId,
    /// Agent sending the message
    pub from: AgentId,
    /// Recipients; fan-out delivery, must be non-empty to route
    pub to: Vec<AgentId>,
    /// Type of message
    pub message_type: MessageType,
    /// Free-text payload
    pub content: String,
    /// Message priority (advisory)
    pub priority: MessagePriority,
    /// When the message was created
    pub created_at: Timestamp,
    /// Correlation context
    #[serde(default)]
    pub context: MessageContext,
    /// Message this one replies to, if any
    pub reply_to: Option<MessageId>,
    /// Whether the sender expects a correlated Response routed back
    pub requires_ack: bool,
}

impl Message {
    /// Create a new message to a single recipient.
    pub fn new(
        from: impl Into<AgentId>,
        to: impl Into<AgentId>,
        message_type: MessageType,
        content: impl Into<String>,
    ) -> Self {
        Self::fan_out(from, vec![to.into()], message_type, content)
    }

    /// Create a new message to multiple recipients.
    pub fn fan_out(
        from: impl Into<AgentId>,
        to: Vec<AgentId>,
        message_type: MessageType,
        content: impl Into<String>,
    ) -> Self {
        Self {
            message_id: new_message_id(),
            from: from.into(),
            to,
            message_type,
            content: content.into(),
            priority: MessagePriority::Medium,
            created_at: Utc::now(),
            context: MessageContext::default(),
            reply_to: None,
            requires_ack: false,
        }
    }

    /// Set priority.
    pub fn with_priority(mut self, priority: MessagePriority) -> Self {
        self.priority = priority;
        self
    }

    /// Set correlation context.
    pub fn with_context(mut self, context: MessageContext) -> Self {
        self.context = context;
        self
    }

    /// Mark this message as a reply to another.
    pub fn with_reply_to(mut self, original: MessageId) -> Self {
        self.reply_to = Some(original);
        self
    }

    /// Request a correlated Response be routed back.
    pub fn with_ack(mut self) -> Self {
        self.requires_ack = true;
        self
    }

    /// Build a Response correlated to this message, addressed to its sender.
    ///
    /// The reply inherits the original context so correlation data survives
    /// the round trip.
    pub fn response_to(&self, from: impl Into<AgentId>, content: impl Into<String>) -> Self {
        self.reply(from, MessageType::Response, content)
    }

    /// Build a Report correlated to this message, addressed to its sender.
    pub fn report_to(&self, from: impl Into<AgentId>, content: impl Into<String>) -> Self {
        self.reply(from, MessageType::Report, content)
    }

    /// Build an Error correlated to this message, addressed to its sender.
    pub fn error_to(&self, from: impl Into<AgentId>, content: impl Into<String>) -> Self {
        self.reply(from, MessageType::Error, content)
    }

    fn reply(
        &self,
        from: impl Into<AgentId>,
        message_type: MessageType,
        content: impl Into<String>,
    ) -> Self {
        Message::new(from, self.from.clone(), message_type, content)
            .with_context(self.context.clone())
            .with_reply_to(self.message_id)
    }

    /// Whether this message is addressed to the given agent.
    pub fn is_for(&self, agent_id: &AgentId) -> bool {
        self.to.iter().any(|id| id == agent_id)
    }
}

// ============================================================================
// TESTS
// ============================================================================
