//! VALET Core - Data Contracts
//!
//! Pure data types shared by every other crate in the workspace: identity,
//! the message protocol, agent state, health snapshots, configuration, and
//! the error taxonomy. No runtime behavior lives here.

pub mod config;
pub mod error;
pub mod health;
pub mod identity;
pub mod message;
pub mod state;

pub use config::{LlmConfig, OrchestratorConfig, ServiceConfig};
pub use error::{
    AgentError, ConfigError, LlmError, MemoryError, RouterError, ValetError, ValetResult,
};
pub use health::{HealthStatus, SystemHealth};
pub use identity::{new_message_id, AgentId, MessageId, Timestamp};
pub use message::{
    Message, MessageContext, MessagePriority, MessagePriorityParseError, MessageType,
    MessageTypeParseError,
};
pub use state::{AgentState, AgentStatus, AgentType, AgentTypeParseError, WORKLOAD_STEP};
