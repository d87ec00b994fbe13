//! Prompt assembly for agent model calls.

use valet_core::{AgentId, AgentType, MessageContext};

/// Builder assembling the text prompt an agent sends to the model.
///
/// Sections render in a fixed order: identity, context, recent history,
/// then the message content itself. Empty sections are skipped.
#[derive(Debug, Clone, Default)]
pub struct PromptBuilder {
    identity: Option<String>,
    context_lines: Vec<String>,
    history: Vec<String>,
    content: Option<String>,
}

impl PromptBuilder {
    /// Create an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// State who is asking.
    pub fn identity(mut self, agent_id: &AgentId, agent_type: AgentType) -> Self {
        self.identity = Some(format!(
            "You are {}, a {} agent in a personal assistant system.",
            agent_id,
            agent_type.as_db_str().to_lowercase()
        ));
        self
    }

    /// Attach the known context fields of the message being handled.
    pub fn context(mut self, context: &MessageContext) -> Self {
        self.context_lines = context.describe();
        self
    }

    /// Attach a bounded window of recent history lines, newest last.
    ///
    /// Only the final `window` lines are kept so prompts stay small no
    /// matter how much history the caller has accumulated.
    pub fn history(mut self, lines: &[String], window: usize) -> Self {
        let start = lines.len().saturating_sub(window);
        self.history = lines[start..].to_vec();
        self
    }

    /// Set the message content the model should respond to.
    pub fn content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }

    /// Render the prompt.
    pub fn build(self) -> String {
        let mut sections: Vec<String> = Vec::new();

        if let Some(identity) = self.identity {
            sections.push(identity);
        }

        if !self.context_lines.is_empty() {
            sections.push(format!("Context:\n{}", self.context_lines.join("\n")));
        }

        if !self.history.is_empty() {
            let lines: Vec<String> = self.history.iter().map(|l| format!("- {}", l)).collect();
            sections.push(format!("Recent activity:\n{}", lines.join("\n")));
        }

        if let Some(content) = self.content {
            sections.push(format!("Message:\n{}", content));
        }

        sections.join("\n\n")
    }
}

// ============================================================================
// TESTS
// ============================================================================
