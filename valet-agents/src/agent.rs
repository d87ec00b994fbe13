//! The trait every agent in the system implements.

use async_trait::async_trait;
use valet_core::{AgentId, AgentState, AgentType, Message, MessageType, ValetResult};
use valet_orchestrator::AgentEndpoint;

/// Contract between an agent and the rest of the system.
///
/// Inbound delivery happens through the `AgentEndpoint` registered with the
/// orchestrator; `send_message` is the outbound path. Lifecycle is
/// `initialize` then `start` then eventually `stop`.
#[async_trait]
pub trait Agent: Send + Sync {
    /// Unique identifier; doubles as the routing address.
    fn id(&self) -> &AgentId;

    /// Role of the agent.
    fn agent_type(&self) -> AgentType;

    /// Human-readable display name.
    fn name(&self) -> &str;

    /// One-line description of what the agent does.
    fn description(&self) -> &str;

    /// Capabilities advertised to the coordinator.
    fn capabilities(&self) -> &[String];

    /// Whether the agent meaningfully processes this message type.
    ///
    /// Terminal reply types are accepted by the loop too (protocol
    /// totality), but only acknowledged generically.
    fn can_handle(&self, message_type: MessageType) -> bool {
        message_type.expects_reply() || message_type == MessageType::Notification
    }

    /// Record the agent in shared memory and move it to `Starting`.
    async fn initialize(&self) -> ValetResult<()>;

    /// Spawn the message loop and move the agent to `Idle`.
    async fn start(&self) -> ValetResult<()>;

    /// Stop the message loop, dropping queued messages. Idempotent.
    async fn stop(&self);

    /// Deep clone of the current agent state.
    async fn state(&self) -> AgentState;

    /// Send a message out through the orchestrator.
    async fn send_message(&self, message: Message) -> ValetResult<()>;

    /// Registration handle for the orchestrator.
    fn endpoint(&self) -> AgentEndpoint;
}
