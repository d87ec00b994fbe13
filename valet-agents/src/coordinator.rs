//! Coordinator agent: classifies commands and hands them to the owner.
//!
//! The coordinator never does domain work itself. A Command is classified,
//! mapped to a capability, and forwarded to the least-loaded running agent
//! that advertises it; the Report back to the caller says where the work
//! went. Requests still answer through the default prompt pipeline so the
//! coordinator can hold a conversation about the system.

use crate::base::{AgentContext, BaseAgent, Behavior};
use crate::classifier::{IntentClassifier, KeywordClassifier};
use crate::config::AgentConfig;
use async_trait::async_trait;
use std::sync::Arc;
use valet_core::{Message, MessageType, ValetResult};

/// Coordinator agent: the runtime with delegation behavior plugged in.
pub type CoordinatorAgent = BaseAgent<CoordinatorBehavior>;

impl CoordinatorAgent {
    /// Build a coordinator with the keyword classifier and role defaults.
    pub fn new(mut config: AgentConfig) -> Self {
        if config.description.is_empty() {
            config.description = "Routes work to whichever agent owns it".to_string();
        }
        if config.capabilities.is_empty() {
            config.capabilities = vec!["coordination".to_string()];
        }
        BaseAgent::with_behavior(config, CoordinatorBehavior::new())
    }
}

/// Domain logic for the coordinator agent.
pub struct CoordinatorBehavior {
    classifier: Arc<dyn IntentClassifier>,
}

impl CoordinatorBehavior {
    /// Create the behavior with the keyword classifier.
    pub fn new() -> Self {
        Self::with_classifier(Arc::new(KeywordClassifier::new()))
    }

    /// Create the behavior with a custom classifier.
    pub fn with_classifier(classifier: Arc<dyn IntentClassifier>) -> Self {
        Self { classifier }
    }
}

impl Default for CoordinatorBehavior {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Behavior for CoordinatorBehavior {
    /// Classify the command and forward it to a capable agent.
    async fn handle_command(&self, ctx: &AgentContext, message: &Message) -> ValetResult<String> {
        let intent = self.classifier.classify(&message.content);

        let Some(capability) = intent.capability() else {
            tracing::debug!(
                agent_id = %ctx.agent_id,
                intent = %intent,
                "No capability mapped for intent"
            );
            return Ok(format!("No delegation target for intent {}", intent));
        };

        let Some(target) = ctx.orchestrator.find_agent_with_capability(capability).await else {
            return Ok(format!("No running agent offers {}", capability));
        };

        // The forwarded command keeps the original context so the owner sees
        // the same conversation and user. Its report comes back here, not to
        // the original caller.
        let forwarded = Message::new(
            ctx.agent_id.clone(),
            target.clone(),
            MessageType::Command,
            message.content.clone(),
        )
        .with_context(message.context.clone())
        .with_priority(message.priority)
        .with_ack();
        ctx.route(forwarded).await?;

        tracing::info!(
            agent_id = %ctx.agent_id,
            intent = %intent,
            target = %target,
            "Delegated command"
        );
        Ok(format!("Delegated {} to {}", intent, target))
    }
}

// ============================================================================
// TESTS
// ============================================================================
