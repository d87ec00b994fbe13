//! Error types for VALET operations

use crate::identity::{AgentId, MessageId};
use thiserror::Error;

/// Router and registry errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RouterError {
    #[error("Agent already registered: {agent_id}")]
    DuplicateAgent { agent_id: AgentId },

    #[error("Unknown recipient: {agent_id}")]
    UnknownRecipient { agent_id: AgentId },

    #[error("Message {message_id} has no recipients")]
    EmptyRecipients { message_id: MessageId },

    #[error("Inbound queue full for {agent_id} (capacity {capacity})")]
    QueueFull { agent_id: AgentId, capacity: usize },

    #[error("Router is not running")]
    Unavailable,
}

/// Agent lifecycle and handler errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AgentError {
    #[error("Agent already running: {agent_id}")]
    AlreadyRunning { agent_id: AgentId },

    #[error("Agent not initialized: {agent_id}")]
    NotInitialized { agent_id: AgentId },

    #[error("Handler failed in {agent_id}: {reason}")]
    HandlerFailed { agent_id: AgentId, reason: String },

    #[error("No reply to message {message_id} within the deadline")]
    ReplyTimeout { message_id: MessageId },
}

/// Memory store errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum MemoryError {
    #[error("Key not found: {key}")]
    NotFound { key: String },

    #[error("Memory IO failed: {reason}")]
    Io { reason: String },

    #[error("Serialization failed: {reason}")]
    Serialization { reason: String },
}

/// LLM provider errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LlmError {
    #[error("No LLM provider configured")]
    ProviderNotConfigured,

    #[error("Request to {provider} failed with status {status}: {message}")]
    RequestFailed {
        provider: String,
        status: i32,
        message: String,
    },

    #[error("Rate limited by {provider}, retry after {retry_after_ms}ms")]
    RateLimited {
        provider: String,
        retry_after_ms: i64,
    },

    #[error("Invalid response from {provider}: {reason}")]
    InvalidResponse { provider: String, reason: String },
}

/// Configuration errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing required configuration field: {field}")]
    MissingRequired { field: String },

    #[error("Invalid value for {field}: {value} - {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },
}

/// Master error type for all VALET errors.
#[derive(Debug, Clone, Error)]
pub enum ValetError {
    #[error("Router error: {0}")]
    Router(#[from] RouterError),

    #[error("Agent error: {0}")]
    Agent(#[from] AgentError),

    #[error("Memory error: {0}")]
    Memory(#[from] MemoryError),

    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
}

/// Result type alias for VALET operations.
pub type ValetResult<T> = Result<T, ValetError>;

// ============================================================================
// TESTS
// ============================================================================
