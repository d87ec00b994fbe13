//! Events broadcast by the orchestrator.

use valet_core::{AgentId, AgentType, HealthStatus, MessageId};

/// Observable router activity.
///
/// Delivered over a bounded broadcast channel. Slow subscribers lose the
/// oldest events rather than stalling the router.
#[derive(Debug, Clone, PartialEq)]
pub enum RouterEvent {
    /// An agent joined the registry
    AgentRegistered {
        agent_id: AgentId,
        agent_type: AgentType,
    },
    /// An agent left the registry
    AgentUnregistered { agent_id: AgentId },
    /// A message passed validation and was fanned out
    MessageRouted {
        message_id: MessageId,
        from: AgentId,
        recipients: usize,
    },
    /// Delivery to one recipient failed; other recipients are unaffected
    DeliveryFailed {
        message_id: MessageId,
        agent_id: AgentId,
        reason: String,
    },
    /// Aggregate health moved between statuses
    HealthChanged {
        previous: HealthStatus,
        current: HealthStatus,
    },
}
