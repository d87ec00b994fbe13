//! Registration handle an agent hands to the orchestrator.

use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use valet_core::{AgentId, AgentState, AgentStatus, AgentType, Message};

/// An agent's registration handle.
///
/// Holds the sending half of the agent's inbox and a shared view of its
/// state. The orchestrator never talks to an agent any other way, which is
/// what keeps the dependency between the two crates one-directional.
#[derive(Debug, Clone)]
pub struct AgentEndpoint {
    /// Identity of the agent behind this endpoint
    pub agent_id: AgentId,
    /// Role of the agent, for logging and introspection
    pub agent_type: AgentType,
    /// Sending half of the agent's bounded inbox
    pub sender: mpsc::Sender<Message>,
    /// Shared view of the agent's mutable state
    pub state: Arc<Mutex<AgentState>>,
}

impl AgentEndpoint {
    /// Create an endpoint from an agent's identity, inbox sender and state.
    pub fn new(
        agent_id: AgentId,
        agent_type: AgentType,
        sender: mpsc::Sender<Message>,
        state: Arc<Mutex<AgentState>>,
    ) -> Self {
        Self {
            agent_id,
            agent_type,
            sender,
            state,
        }
    }

    /// Current lifecycle status of the agent.
    pub async fn status(&self) -> AgentStatus {
        self.state.lock().await.status
    }

    /// Deep clone of the agent's current state.
    pub async fn state_snapshot(&self) -> AgentState {
        self.state.lock().await.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_status_reads_shared_state() {
        let (tx, _rx) = mpsc::channel(4);
        let state = Arc::new(Mutex::new(AgentState::new(vec!["chat".to_string()])));
        let endpoint = AgentEndpoint::new(
            AgentId::new("conversation"),
            AgentType::Conversation,
            tx,
            Arc::clone(&state),
        );

        assert_eq!(endpoint.status().await, AgentStatus::Offline);

        state.lock().await.status = AgentStatus::Idle;
        assert_eq!(endpoint.status().await, AgentStatus::Idle);

        let snapshot = endpoint.state_snapshot().await;
        assert!(snapshot.has_capability("chat"));
    }
}
