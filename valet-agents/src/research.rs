//! Research agent: answers investigative requests and caches its findings.
//!
//! Requests and commands both flow through the tool-augmented prompt
//! pipeline. Every finding is cached under `research:<agent>:<message-id>`
//! so later queries can ground on it through memory search.

use crate::base::{AgentContext, BaseAgent, Behavior};
use crate::config::AgentConfig;
use async_trait::async_trait;
use chrono::Utc;
use valet_core::{Message, ValetResult};
use valet_memory::keys;

/// Research agent: the runtime with research behavior plugged in.
pub type ResearchAgent = BaseAgent<ResearchBehavior>;

impl ResearchAgent {
    /// Build a research agent, filling in role defaults the caller left
    /// unset.
    pub fn new(mut config: AgentConfig) -> Self {
        if config.description.is_empty() {
            config.description = "Investigates questions and caches findings".to_string();
        }
        if config.capabilities.is_empty() {
            config.capabilities = vec!["research".to_string()];
        }
        BaseAgent::with_behavior(config, ResearchBehavior::new())
    }
}

/// Domain logic for the research agent.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResearchBehavior;

impl ResearchBehavior {
    /// Create the behavior.
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Behavior for ResearchBehavior {
    /// Commands are treated exactly like requests: the model investigates
    /// with its tools.
    async fn handle_command(&self, ctx: &AgentContext, message: &Message) -> ValetResult<String> {
        ctx.answer_request(message).await
    }

    /// Cache the finding for later grounding.
    async fn record_exchange(&self, ctx: &AgentContext, message: &Message, reply: &str) {
        let record = serde_json::json!({
            "query": message.content,
            "findings": reply,
            "cached_at": Utc::now(),
        });
        let key = keys::research_key(&ctx.agent_id, &message.message_id);
        if let Err(e) = ctx.store.store(&key, record).await {
            tracing::warn!(
                agent_id = %ctx.agent_id,
                message_id = %message.message_id,
                error = %e,
                "Failed to cache research finding"
            );
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::Agent;
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::sync::{mpsc, Mutex};
    use tokio::time::timeout;
    use valet_core::{
        AgentId, AgentState, AgentStatus, AgentType, MessageType, OrchestratorConfig,
    };
    use valet_llm::Tool;
    use valet_memory::MemoryStore;
    use valet_orchestrator::{AgentEndpoint, Orchestrator};
    use valet_test_utils::{InMemoryStore, MockLanguageModel, StubTool};

    struct Harness {
        orchestrator: Arc<Orchestrator>,
        store: Arc<InMemoryStore>,
        user_rx: mpsc::Receiver<Message>,
    }

    async fn harness() -> Harness {
        let store = Arc::new(InMemoryStore::new());
        let orchestrator = Arc::new(Orchestrator::new(
            OrchestratorConfig::default(),
            store.clone(),
        ));

        let (user_tx, user_rx) = mpsc::channel(16);
        let mut user_state = AgentState::new(vec![]);
        user_state.status = AgentStatus::Idle;
        orchestrator
            .register_agent(AgentEndpoint::new(
                AgentId::new("user"),
                AgentType::Gateway,
                user_tx,
                Arc::new(Mutex::new(user_state)),
            ))
            .await
            .unwrap();

        Harness {
            orchestrator,
            store,
            user_rx,
        }
    }

    async fn spawn_agent(
        harness: &Harness,
        model: Arc<MockLanguageModel>,
        tools: Vec<Arc<dyn Tool>>,
    ) -> ResearchAgent {
        let agent = ResearchAgent::new(
            AgentConfig::new(
                "research",
                AgentType::Research,
                model,
                harness.store.clone(),
                harness.orchestrator.clone(),
            )
            .with_tools(tools),
        );
        agent.initialize().await.unwrap();
        harness
            .orchestrator
            .register_agent(agent.endpoint())
            .await
            .unwrap();
        agent.start().await.unwrap();
        agent
    }

    async fn next_reply(harness: &mut Harness) -> Message {
        timeout(Duration::from_secs(1), harness.user_rx.recv())
            .await
            .unwrap()
            .unwrap()
    }

    #[tokio::test]
    async fn test_role_defaults() {
        let harness = harness().await;
        let agent = ResearchAgent::new(AgentConfig::new(
            "research",
            AgentType::Research,
            Arc::new(MockLanguageModel::new()),
            harness.store.clone(),
            harness.orchestrator.clone(),
        ));

        assert_eq!(agent.capabilities(), ["research".to_string()]);
    }

    #[tokio::test]
    async fn test_request_answer_is_cached_as_a_finding() {
        let mut harness = harness().await;
        let model =
            Arc::new(MockLanguageModel::new().enqueue_response("Lisbon is sunny in June"));
        let agent = spawn_agent(&harness, model, Vec::new()).await;

        let request = Message::new(
            "user",
            "research",
            MessageType::Request,
            "look up the weather in Lisbon in June",
        )
        .with_ack();
        let cache_key = keys::research_key(&AgentId::new("research"), &request.message_id);
        harness.orchestrator.route_message(request).await.unwrap();

        let reply = next_reply(&mut harness).await;
        assert_eq!(reply.message_type, MessageType::Response);
        assert_eq!(reply.content, "Lisbon is sunny in June");

        let cached = harness.store.get(&cache_key).await.unwrap();
        assert_eq!(cached.value["query"], "look up the weather in Lisbon in June");
        assert_eq!(cached.value["findings"], "Lisbon is sunny in June");

        agent.stop().await;
    }

    #[tokio::test]
    async fn test_command_runs_through_the_tooled_pipeline() {
        let mut harness = harness().await;
        let model = Arc::new(MockLanguageModel::new().enqueue_response("found three options"));
        let tools: Vec<Arc<dyn Tool>> =
            vec![Arc::new(StubTool::new("web_search", "Search the web"))];
        let agent = spawn_agent(&harness, model.clone(), tools).await;

        let command = Message::new(
            "user",
            "research",
            MessageType::Command,
            "research flights to Lisbon",
        )
        .with_ack();
        harness.orchestrator.route_message(command).await.unwrap();

        let report = next_reply(&mut harness).await;
        assert_eq!(report.message_type, MessageType::Report);
        assert_eq!(report.content, "found three options");

        let prompts = model.prompts();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].contains("research flights to Lisbon"));
        assert!(prompts[0].contains("web_search"));

        agent.stop().await;
    }

    #[tokio::test]
    async fn test_cached_findings_ground_later_queries() {
        let mut harness = harness().await;
        let model = Arc::new(
            MockLanguageModel::new()
                .enqueue_response("TAP flies direct from Boston")
                .enqueue_response("Yes, TAP has a direct route"),
        );
        let agent = spawn_agent(&harness, model.clone(), Vec::new()).await;

        let request = Message::new(
            "user",
            "research",
            MessageType::Request,
            "find direct flights from Boston to Lisbon",
        )
        .with_ack();
        harness.orchestrator.route_message(request).await.unwrap();
        next_reply(&mut harness).await;

        let query = Message::new(
            "user",
            "research",
            MessageType::Query,
            "direct flights Boston",
        )
        .with_ack();
        harness.orchestrator.route_message(query).await.unwrap();

        let reply = next_reply(&mut harness).await;
        assert_eq!(reply.content, "Yes, TAP has a direct route");

        let prompts = model.prompts();
        assert_eq!(prompts.len(), 2);
        assert!(prompts[1].contains("TAP flies direct from Boston"));

        agent.stop().await;
    }
}
