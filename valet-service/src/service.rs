//! The assistant service: orchestrator, agents, and the user gateway wired
//! into one process.

use crate::gateway::Gateway;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::time::timeout;
use valet_agents::{
    Agent, AgentConfig, ConversationAgent, CoordinatorAgent, ResearchAgent, TaskManagerAgent,
};
use valet_core::{
    AgentError, AgentId, AgentType, Message, MessageContext, MessageType, ServiceConfig,
    SystemHealth, ValetResult,
};
use valet_llm::LanguageModel;
use valet_memory::MemoryStore;
use valet_orchestrator::Orchestrator;

/// Default agent ids, also the routing addresses.
const CONVERSATION_ID: &str = "conversation";
const COORDINATOR_ID: &str = "coordinator";
const TASK_MANAGER_ID: &str = "task-manager";
const RESEARCH_ID: &str = "research";

/// A running assistant: the composition root of the whole system.
///
/// Owns the orchestrator, the four standard agents, and the gateway through
/// which user text enters and correlated replies leave. `process_message`
/// is the single user-facing operation.
pub struct AssistantService {
    config: ServiceConfig,
    orchestrator: Arc<Orchestrator>,
    agents: Mutex<Vec<Arc<dyn Agent>>>,
    gateway: Gateway,
    front_door: AgentId,
}

impl AssistantService {
    /// Build and start the full agent system.
    ///
    /// Sequencing: orchestrator first, then the gateway endpoint, then each
    /// agent through the hot-add path (initialize, register, start).
    pub async fn start(
        config: ServiceConfig,
        store: Arc<dyn MemoryStore>,
        language_model: Arc<dyn LanguageModel>,
    ) -> ValetResult<Self> {
        config.validate()?;

        let orchestrator = Arc::new(Orchestrator::new(
            config.orchestrator.clone(),
            store.clone(),
        ));
        orchestrator.start().await?;

        let gateway = Gateway::spawn(config.orchestrator.message_queue_size);
        orchestrator.register_agent(gateway.endpoint()).await?;

        let service = Self {
            config,
            orchestrator: orchestrator.clone(),
            agents: Mutex::new(Vec::new()),
            gateway,
            front_door: AgentId::new(CONVERSATION_ID),
        };

        let agent_config = |id: &str, agent_type| {
            AgentConfig::new(
                id,
                agent_type,
                language_model.clone(),
                store.clone(),
                orchestrator.clone(),
            )
        };

        service
            .add_agent(Arc::new(ConversationAgent::new(agent_config(
                CONVERSATION_ID,
                AgentType::Conversation,
            ))))
            .await?;
        service
            .add_agent(Arc::new(CoordinatorAgent::new(agent_config(
                COORDINATOR_ID,
                AgentType::Coordinator,
            ))))
            .await?;
        service
            .add_agent(Arc::new(TaskManagerAgent::new(agent_config(
                TASK_MANAGER_ID,
                AgentType::Task,
            ))))
            .await?;
        service
            .add_agent(Arc::new(ResearchAgent::new(agent_config(
                RESEARCH_ID,
                AgentType::Research,
            ))))
            .await?;

        tracing::info!("Assistant service started");
        Ok(service)
    }

    /// Send user text to the conversation agent and await the correlated
    /// reply.
    ///
    /// An `Error` reply surfaces as `AgentError::HandlerFailed`; exceeding
    /// `reply_timeout` abandons the wait and returns `ReplyTimeout`.
    pub async fn process_message(
        &self,
        user_id: &str,
        conversation_id: &str,
        text: &str,
    ) -> ValetResult<String> {
        let context = MessageContext::new()
            .with_conversation(conversation_id)
            .with_user(user_id);
        let request = Message::new(
            self.gateway.agent_id().clone(),
            self.front_door.clone(),
            MessageType::Request,
            text,
        )
        .with_context(context)
        .with_ack();
        let message_id = request.message_id;

        let reply_rx = self.gateway.register_pending(message_id).await;
        if let Err(e) = self.orchestrator.route_message(request).await {
            self.gateway.abandon(&message_id).await;
            return Err(e);
        }

        let reply = match timeout(self.config.reply_timeout, reply_rx).await {
            Ok(Ok(reply)) => reply,
            // Closed channel means the gateway shut down mid-wait.
            Ok(Err(_)) | Err(_) => {
                self.gateway.abandon(&message_id).await;
                tracing::warn!(message_id = %message_id, "Gave up waiting for a reply");
                return Err(AgentError::ReplyTimeout { message_id }.into());
            }
        };

        match reply.message_type {
            MessageType::Error => Err(AgentError::HandlerFailed {
                agent_id: reply.from,
                reason: reply.content,
            }
            .into()),
            _ => Ok(reply.content),
        }
    }

    /// Bring one more agent into the running system.
    ///
    /// Initialize, register, start; the agent receives messages the moment
    /// registration lands, queued until its loop runs.
    pub async fn add_agent(&self, agent: Arc<dyn Agent>) -> ValetResult<()> {
        agent.initialize().await?;
        self.orchestrator.register_agent(agent.endpoint()).await?;
        agent.start().await?;

        tracing::info!(agent_id = %agent.id(), "Agent added to service");
        self.agents.lock().await.push(agent);
        Ok(())
    }

    /// Aggregate health of everything registered.
    pub async fn system_health(&self) -> SystemHealth {
        self.orchestrator.system_health().await
    }

    /// The router, for callers composing their own agents.
    pub fn orchestrator(&self) -> &Arc<Orchestrator> {
        &self.orchestrator
    }

    /// Stop agents, then the router, then the gateway. Idempotent.
    pub async fn shutdown(&self) {
        let agents: Vec<Arc<dyn Agent>> = self.agents.lock().await.drain(..).collect();
        for agent in agents {
            agent.stop().await;
        }

        self.orchestrator.stop().await;
        self.gateway.stop().await;
        tracing::info!("Assistant service stopped");
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use valet_core::{HealthStatus, LlmError, ValetError};
    use valet_test_utils::{InMemoryStore, MockLanguageModel};

    async fn service_with(model: Arc<MockLanguageModel>) -> (AssistantService, Arc<InMemoryStore>) {
        let store = Arc::new(InMemoryStore::new());
        let config = ServiceConfig {
            reply_timeout: Duration::from_secs(2),
            ..Default::default()
        };
        let service = AssistantService::start(config, store.clone(), model)
            .await
            .unwrap();
        (service, store)
    }

    #[tokio::test]
    async fn test_process_message_round_trip() {
        let model = Arc::new(MockLanguageModel::new().enqueue_response("hello alice"));
        let (service, _store) = service_with(model).await;

        let answer = service
            .process_message("alice", "c-1", "hi there")
            .await
            .unwrap();
        assert_eq!(answer, "hello alice");

        service.shutdown().await;
    }

    #[tokio::test]
    async fn test_process_message_records_the_conversation() {
        let model = Arc::new(MockLanguageModel::new().enqueue_response("noted"));
        let (service, store) = service_with(model).await;

        service
            .process_message("alice", "c-9", "remember the milk")
            .await
            .unwrap();

        let turns = store.list("conversation:c-9:", 16).await.unwrap();
        assert_eq!(turns.len(), 1);
        let turn = store.get(&turns[0]).await.unwrap();
        assert_eq!(turn.value["content"], "remember the milk");
        assert_eq!(turn.value["reply"], "noted");

        service.shutdown().await;
    }

    #[tokio::test]
    async fn test_error_reply_surfaces_as_handler_failed() {
        let model = Arc::new(
            MockLanguageModel::new()
                .enqueue_failure(ValetError::Llm(LlmError::ProviderNotConfigured)),
        );
        let (service, _store) = service_with(model).await;

        let err = service
            .process_message("alice", "c-1", "hi")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ValetError::Agent(AgentError::HandlerFailed { ref agent_id, .. })
                if agent_id == &AgentId::new("conversation")
        ));

        service.shutdown().await;
    }

    #[tokio::test]
    async fn test_reply_timeout_when_no_reply_arrives() {
        let model = Arc::new(MockLanguageModel::new());
        let store = Arc::new(InMemoryStore::new());
        let config = ServiceConfig {
            reply_timeout: Duration::from_millis(100),
            ..Default::default()
        };
        let service = AssistantService::start(config, store, model).await.unwrap();

        // Stop the agents without unregistering them: the request is
        // accepted for routing but no reply can ever arrive.
        for agent in service.agents.lock().await.iter() {
            agent.stop().await;
        }

        let err = service
            .process_message("alice", "c-1", "hi")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ValetError::Agent(AgentError::ReplyTimeout { .. })
        ));

        service.shutdown().await;
    }

    #[tokio::test]
    async fn test_hot_added_agent_receives_work() {
        let model = Arc::new(MockLanguageModel::new().enqueue_response("observed"));
        let (service, store) = service_with(model.clone()).await;

        let extra = Arc::new(ResearchAgent::new(AgentConfig::new(
            "research-2",
            AgentType::Research,
            model.clone(),
            store.clone(),
            service.orchestrator().clone(),
        )));
        service.add_agent(extra).await.unwrap();

        let request = Message::new("user", "research-2", MessageType::Request, "look at this");
        service.orchestrator().route_message(request).await.unwrap();

        for _ in 0..100 {
            if !store.list("research:research-2:", 4).await.unwrap().is_empty() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        let cached = store.list("research:research-2:", 4).await.unwrap();
        assert_eq!(cached.len(), 1);

        service.shutdown().await;
    }

    #[tokio::test]
    async fn test_health_reflects_running_agents() {
        let model = Arc::new(MockLanguageModel::new());
        let (service, _store) = service_with(model).await;

        let health = service.system_health().await;
        // Gateway plus the four standard agents.
        assert_eq!(health.registered_agents, 5);
        assert_eq!(health.status, HealthStatus::Online);

        service.shutdown().await;
    }

    #[tokio::test]
    async fn test_shutdown_is_idempotent() {
        let model = Arc::new(MockLanguageModel::new());
        let (service, _store) = service_with(model).await;

        service.shutdown().await;
        service.shutdown().await;

        let err = service.process_message("alice", "c-1", "hi").await;
        assert!(err.is_err());
    }
}
