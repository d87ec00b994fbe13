//! VALET Test Utilities
//!
//! Centralized test infrastructure for the VALET workspace:
//! - A scripted `MockLanguageModel` for exercising agents without a server
//! - Proptest generators for the message protocol types
//! - Fixture builders for common message shapes

// Re-export the in-memory store; most tests want it alongside the mock model.
pub use valet_memory::InMemoryStore;

// Re-export core types for convenience
pub use valet_core::{
    AgentId, AgentState, AgentStatus, AgentType, Message, MessageContext, MessagePriority,
    MessageType, ValetError, ValetResult,
};

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;
use valet_llm::{LanguageModel, Tool};

// ============================================================================
// MOCK LANGUAGE MODEL
// ============================================================================

/// Scripted language model.
///
/// Responses and failures are dequeued in the order they were enqueued; once
/// the script runs dry every call returns the fallback reply. All prompts are
/// recorded for assertion.
pub struct MockLanguageModel {
    script: Mutex<VecDeque<ValetResult<String>>>,
    fallback: String,
    prompts: Mutex<Vec<String>>,
}

impl MockLanguageModel {
    /// Create a mock that answers every prompt with `"ok"`.
    pub fn new() -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            fallback: "ok".to_string(),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Replace the fallback reply used once the script is exhausted.
    pub fn with_fallback(mut self, reply: impl Into<String>) -> Self {
        self.fallback = reply.into();
        self
    }

    /// Enqueue a successful reply.
    pub fn enqueue_response(self, reply: impl Into<String>) -> Self {
        self.lock_script().push_back(Ok(reply.into()));
        self
    }

    /// Enqueue a failure.
    pub fn enqueue_failure(self, error: ValetError) -> Self {
        self.lock_script().push_back(Err(error));
        self
    }

    /// Every prompt the mock has seen, in call order.
    pub fn prompts(&self) -> Vec<String> {
        self.lock_prompts().clone()
    }

    /// Number of calls made so far.
    pub fn call_count(&self) -> usize {
        self.lock_prompts().len()
    }

    fn lock_script(&self) -> std::sync::MutexGuard<'_, VecDeque<ValetResult<String>>> {
        self.script.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn lock_prompts(&self) -> std::sync::MutexGuard<'_, Vec<String>> {
        self.prompts.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for MockLanguageModel {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MockLanguageModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockLanguageModel")
            .field("fallback", &self.fallback)
            .field("calls", &self.call_count())
            .finish()
    }
}

#[async_trait]
impl LanguageModel for MockLanguageModel {
    async fn query(&self, prompt: &str) -> ValetResult<String> {
        self.lock_prompts().push(prompt.to_string());
        match self.lock_script().pop_front() {
            Some(scripted) => scripted,
            None => Ok(self.fallback.clone()),
        }
    }
}

// ============================================================================
// MOCK TOOL
// ============================================================================

/// A tool stub that only advertises itself; prompts render its catalog entry.
#[derive(Debug, Clone)]
pub struct StubTool {
    name: String,
    description: String,
}

impl StubTool {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
        }
    }
}

impl Tool for StubTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn parameters(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "query": { "type": "string" }
            }
        })
    }
}

// ============================================================================
// FIXTURES
// ============================================================================

pub mod fixtures {
    use valet_core::{Message, MessageContext, MessageType};

    /// A context with all three well-known correlation fields set.
    pub fn sample_context() -> MessageContext {
        MessageContext::new()
            .with_conversation("conv-1")
            .with_session("sess-1")
            .with_user("alice")
    }

    /// A user request that expects a correlated response.
    pub fn acked_request(to: &str, content: &str) -> Message {
        Message::new("user", to, MessageType::Request, content)
            .with_context(sample_context())
            .with_ack()
    }

    /// A fire-and-forget notification.
    pub fn notification(to: &str, content: &str) -> Message {
        Message::new("user", to, MessageType::Notification, content)
    }

    /// A command that expects a report back.
    pub fn command(to: &str, content: &str) -> Message {
        Message::new("user", to, MessageType::Command, content)
            .with_context(sample_context())
            .with_ack()
    }
}

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

pub mod generators {
    use proptest::prelude::*;
    use valet_core::{
        AgentId, AgentStatus, AgentType, Message, MessageContext, MessagePriority, MessageType,
    };

    pub fn arb_agent_id() -> impl Strategy<Value = AgentId> {
        "[a-z][a-z0-9-]{0,15}".prop_map(AgentId::new)
    }

    pub fn arb_message_type() -> impl Strategy<Value = MessageType> {
        prop_oneof![
            Just(MessageType::Request),
            Just(MessageType::Query),
            Just(MessageType::Command),
            Just(MessageType::Notification),
            Just(MessageType::Response),
            Just(MessageType::Report),
            Just(MessageType::Error),
        ]
    }

    pub fn arb_priority() -> impl Strategy<Value = MessagePriority> {
        prop_oneof![
            Just(MessagePriority::Low),
            Just(MessagePriority::Medium),
            Just(MessagePriority::High),
            Just(MessagePriority::Critical),
        ]
    }

    pub fn arb_agent_status() -> impl Strategy<Value = AgentStatus> {
        prop_oneof![
            Just(AgentStatus::Offline),
            Just(AgentStatus::Starting),
            Just(AgentStatus::Idle),
            Just(AgentStatus::Busy),
        ]
    }

    pub fn arb_agent_type() -> impl Strategy<Value = AgentType> {
        prop_oneof![
            Just(AgentType::Conversation),
            Just(AgentType::Coordinator),
            Just(AgentType::Task),
            Just(AgentType::Research),
            Just(AgentType::Gateway),
        ]
    }

    pub fn arb_context() -> impl Strategy<Value = MessageContext> {
        (
            proptest::option::of("[a-z0-9-]{1,12}"),
            proptest::option::of("[a-z0-9-]{1,12}"),
            proptest::option::of("[a-z0-9-]{1,12}"),
        )
            .prop_map(|(conversation, session, user)| {
                let mut context = MessageContext::new();
                if let Some(conversation) = conversation {
                    context = context.with_conversation(conversation);
                }
                if let Some(session) = session {
                    context = context.with_session(session);
                }
                if let Some(user) = user {
                    context = context.with_user(user);
                }
                context
            })
    }

    pub fn arb_message() -> impl Strategy<Value = Message> {
        (
            arb_agent_id(),
            proptest::collection::vec(arb_agent_id(), 1..4),
            arb_message_type(),
            "[a-zA-Z0-9 ]{0,40}",
            arb_priority(),
            arb_context(),
            any::<bool>(),
        )
            .prop_map(|(from, to, message_type, content, priority, context, ack)| {
                let message = Message::fan_out(from, to, message_type, content)
                    .with_priority(priority)
                    .with_context(context);
                if ack {
                    message.with_ack()
                } else {
                    message
                }
            })
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use valet_core::LlmError;

    #[tokio::test]
    async fn test_mock_plays_script_then_falls_back() {
        let model = MockLanguageModel::new()
            .with_fallback("done")
            .enqueue_response("first")
            .enqueue_failure(ValetError::Llm(LlmError::ProviderNotConfigured));

        assert_eq!(model.query("a").await.unwrap(), "first");
        assert!(model.query("b").await.is_err());
        assert_eq!(model.query("c").await.unwrap(), "done");

        assert_eq!(model.call_count(), 3);
        assert_eq!(model.prompts(), vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn test_stub_tool_renders_in_catalog() {
        let model = MockLanguageModel::new();
        let tools: Vec<std::sync::Arc<dyn Tool>> =
            vec![std::sync::Arc::new(StubTool::new("web_search", "Search the web"))];

        model.query_with_tools("find me a recipe", &tools).await.unwrap();

        let prompts = model.prompts();
        assert!(prompts[0].contains("web_search"));
        assert!(prompts[0].contains("Search the web"));
    }

    #[test]
    fn test_fixtures_shape() {
        let request = fixtures::acked_request("conversation", "hello");
        assert!(request.requires_ack);
        assert_eq!(request.context.user_id.as_deref(), Some("alice"));

        let note = fixtures::notification("research", "fyi");
        assert!(!note.requires_ack);
        assert_eq!(note.message_type, MessageType::Notification);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(50))]

        /// Property: generated messages survive a serde round trip.
        #[test]
        fn prop_generated_messages_round_trip(message in generators::arb_message()) {
            let json = serde_json::to_string(&message).unwrap();
            let back: Message = serde_json::from_str(&json).unwrap();
            prop_assert_eq!(message, back);
        }
    }
}
