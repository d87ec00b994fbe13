//! Conversational agent: the assistant's front door.
//!
//! Requests flow through the default prompt pipeline; what this behavior adds
//! is a durable transcript. Every successful exchange that carries a
//! conversation id is written under `conversation:<id>:<message-id>`, and the
//! summarize command replays that transcript through the model.

use crate::base::{AgentContext, BaseAgent, Behavior};
use crate::config::AgentConfig;
use async_trait::async_trait;
use chrono::Utc;
use valet_core::{Message, ValetResult};
use valet_llm::PromptBuilder;
use valet_memory::keys;

/// How many transcript keys a summary scans before windowing.
const TURN_SCAN_LIMIT: usize = 256;

/// Conversation agent: the runtime with conversational behavior plugged in.
pub type ConversationAgent = BaseAgent<ConversationBehavior>;

impl ConversationAgent {
    /// Build a conversation agent, filling in role defaults the caller left
    /// unset.
    pub fn new(mut config: AgentConfig) -> Self {
        if config.description.is_empty() {
            config.description = "Handles user dialogue and conversation summaries".to_string();
        }
        if config.capabilities.is_empty() {
            config.capabilities = vec!["chat".to_string()];
        }
        BaseAgent::with_behavior(config, ConversationBehavior::new())
    }
}

/// Domain logic for the conversation agent.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConversationBehavior;

impl ConversationBehavior {
    /// Create the behavior.
    pub fn new() -> Self {
        Self
    }

    /// Load the recorded turns of one conversation, oldest first.
    ///
    /// Message ids are UUIDv7, so lexicographic key order is creation order.
    async fn transcript(&self, ctx: &AgentContext, conversation_id: &str) -> ValetResult<Vec<String>> {
        let prefix = format!("conversation:{}:", conversation_id);
        let keys = ctx.store.list(&prefix, TURN_SCAN_LIMIT).await?;
        let entries = ctx.store.get_multiple(&keys).await?;

        let mut lines = Vec::new();
        for key in &keys {
            let Some(entry) = entries.get(key) else {
                continue;
            };
            let from = entry
                .value
                .get("from")
                .and_then(|v| v.as_str())
                .unwrap_or("unknown");
            let content = entry
                .value
                .get("content")
                .and_then(|v| v.as_str())
                .unwrap_or_default();
            lines.push(format!("{}: {}", from, content));
            if let Some(reply) = entry.value.get("reply").and_then(|v| v.as_str()) {
                lines.push(format!("{}: {}", ctx.agent_id, reply));
            }
        }
        Ok(lines)
    }
}

#[async_trait]
impl Behavior for ConversationBehavior {
    /// Commands ask for a summary of the conversation named in the context.
    async fn handle_command(&self, ctx: &AgentContext, message: &Message) -> ValetResult<String> {
        let Some(conversation_id) = message.context.conversation_id.as_deref() else {
            return Ok("No conversation attached; nothing to summarize".to_string());
        };

        let turns = self.transcript(ctx, conversation_id).await?;
        if turns.is_empty() {
            return Ok(format!(
                "No recorded turns for conversation {}",
                conversation_id
            ));
        }

        let prompt = PromptBuilder::new()
            .identity(&ctx.agent_id, ctx.agent_type)
            .context(&message.context)
            .history(&turns, ctx.memory_window)
            .content("Summarize this conversation in a few sentences.")
            .build();

        ctx.language_model.query(&prompt).await
    }

    /// Persist the turn when the exchange belongs to a conversation.
    async fn record_exchange(&self, ctx: &AgentContext, message: &Message, reply: &str) {
        let Some(conversation_id) = message.context.conversation_id.as_deref() else {
            return;
        };

        let turn = serde_json::json!({
            "from": message.from,
            "content": message.content,
            "reply": reply,
            "recorded_at": Utc::now(),
        });
        let key = keys::conversation_key(conversation_id, &message.message_id);
        if let Err(e) = ctx.store.store(&key, turn).await {
            tracing::warn!(
                agent_id = %ctx.agent_id,
                conversation_id,
                error = %e,
                "Failed to store conversation turn"
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
        AgentId, AgentState, AgentStatus, AgentType, MessageContext, MessageType,
        OrchestratorConfig,
    };
    use valet_memory::MemoryStore;
    use valet_orchestrator::{AgentEndpoint, Orchestrator};
    use valet_test_utils::{InMemoryStore, MockLanguageModel};

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

    async fn spawn_agent(harness: &Harness, model: Arc<MockLanguageModel>) -> ConversationAgent {
        let agent = ConversationAgent::new(AgentConfig::new(
            "conversation",
            AgentType::Conversation,
            model,
            harness.store.clone(),
            harness.orchestrator.clone(),
        ));
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
        let agent = ConversationAgent::new(AgentConfig::new(
            "conversation",
            AgentType::Conversation,
            Arc::new(MockLanguageModel::new()),
            harness.store.clone(),
            harness.orchestrator.clone(),
        ));

        assert_eq!(agent.capabilities(), ["chat".to_string()]);
        assert!(!agent.description().is_empty());
    }

    #[tokio::test]
    async fn test_exchange_records_conversation_turn() {
        let mut harness = harness().await;
        let model = Arc::new(MockLanguageModel::new().enqueue_response("nice to meet you"));
        let agent = spawn_agent(&harness, model).await;

        let request = Message::new("user", "conversation", MessageType::Request, "hello!")
            .with_context(MessageContext::new().with_conversation("c-1"))
            .with_ack();
        let turn_key = keys::conversation_key("c-1", &request.message_id);
        harness.orchestrator.route_message(request).await.unwrap();

        let reply = next_reply(&mut harness).await;
        assert_eq!(reply.content, "nice to meet you");

        let record = harness.store.get(&turn_key).await.unwrap();
        assert_eq!(record.value["from"], "user");
        assert_eq!(record.value["content"], "hello!");
        assert_eq!(record.value["reply"], "nice to meet you");

        agent.stop().await;
    }

    #[tokio::test]
    async fn test_exchange_without_conversation_id_is_not_recorded() {
        let mut harness = harness().await;
        let model = Arc::new(MockLanguageModel::new().enqueue_response("hi"));
        let agent = spawn_agent(&harness, model).await;

        let request =
            Message::new("user", "conversation", MessageType::Request, "hello").with_ack();
        harness.orchestrator.route_message(request).await.unwrap();
        next_reply(&mut harness).await;

        let turns = harness.store.list("conversation:", 16).await.unwrap();
        assert!(turns.is_empty());

        agent.stop().await;
    }

    #[tokio::test]
    async fn test_summarize_replays_transcript() {
        let mut harness = harness().await;
        let model = Arc::new(
            MockLanguageModel::new()
                .enqueue_response("I can help plan the trip")
                .enqueue_response("You talked about planning a trip to Lisbon"),
        );
        let agent = spawn_agent(&harness, model.clone()).await;
        let context = MessageContext::new().with_conversation("c-7");

        let turn = Message::new(
            "user",
            "conversation",
            MessageType::Request,
            "help me plan a trip to Lisbon",
        )
        .with_context(context.clone())
        .with_ack();
        harness.orchestrator.route_message(turn).await.unwrap();
        next_reply(&mut harness).await;

        let summarize = Message::new("user", "conversation", MessageType::Command, "summarize")
            .with_context(context)
            .with_ack();
        harness.orchestrator.route_message(summarize).await.unwrap();

        let report = next_reply(&mut harness).await;
        assert_eq!(report.message_type, MessageType::Report);
        assert_eq!(report.content, "You talked about planning a trip to Lisbon");

        let prompts = model.prompts();
        assert_eq!(prompts.len(), 2);
        assert!(prompts[1].contains("plan a trip to Lisbon"));
        assert!(prompts[1].contains("I can help plan the trip"));

        agent.stop().await;
    }

    #[tokio::test]
    async fn test_summarize_without_conversation_reports_plainly() {
        let mut harness = harness().await;
        let model = Arc::new(MockLanguageModel::new());
        let agent = spawn_agent(&harness, model.clone()).await;

        let summarize =
            Message::new("user", "conversation", MessageType::Command, "summarize").with_ack();
        harness.orchestrator.route_message(summarize).await.unwrap();

        let report = next_reply(&mut harness).await;
        assert_eq!(report.message_type, MessageType::Report);
        assert!(report.content.contains("nothing to summarize"));
        assert_eq!(model.call_count(), 0);

        agent.stop().await;
    }

    #[tokio::test]
    async fn test_summarize_empty_transcript_skips_the_model() {
        let mut harness = harness().await;
        let model = Arc::new(MockLanguageModel::new());
        let agent = spawn_agent(&harness, model.clone()).await;

        let summarize = Message::new("user", "conversation", MessageType::Command, "summarize")
            .with_context(MessageContext::new().with_conversation("c-empty"))
            .with_ack();
        harness.orchestrator.route_message(summarize).await.unwrap();

        let report = next_reply(&mut harness).await;
        assert!(report.content.contains("No recorded turns"));
        assert_eq!(model.call_count(), 0);

        agent.stop().await;
    }
}
