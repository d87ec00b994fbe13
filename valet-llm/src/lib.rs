//! VALET LLM - Language Model Boundary
//!
//! Provider-agnostic traits for text completion plus the client for a
//! locally hosted OpenAI-compatible endpoint. Agents talk to the model
//! through `LanguageModel` and never see HTTP.

pub mod prompt;
pub mod providers;

pub use prompt::PromptBuilder;
pub use providers::LocalCompletionClient;

use ::async_trait::async_trait;
use std::sync::Arc;
use valet_core::ValetResult;

// ============================================================================
// LANGUAGE MODEL TRAIT
// ============================================================================

/// Text completion boundary.
///
/// Implementations must be thread-safe (Send + Sync) since a single model
/// client is shared by every agent.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Complete a prompt and return the model's text.
    async fn query(&self, prompt: &str) -> ValetResult<String>;

    /// Complete a prompt with a textual tool catalogue appended.
    ///
    /// The wire format is plain text, not structured tool calls; the model
    /// is told what tools exist and answers in prose.
    async fn query_with_tools(
        &self,
        prompt: &str,
        tools: &[Arc<dyn Tool>],
    ) -> ValetResult<String> {
        if tools.is_empty() {
            return self.query(prompt).await;
        }
        let prompt = format!("{}\n\n{}", prompt, render_tool_catalog(tools));
        self.query(&prompt).await
    }
}

// ============================================================================
// TOOL TRAIT
// ============================================================================

/// A capability an agent can advertise to the model.
pub trait Tool: Send + Sync {
    /// Short identifier, e.g. `"web_search"`.
    fn name(&self) -> &str;

    /// One-line human-readable description.
    fn description(&self) -> &str;

    /// JSON-schema-shaped parameter description.
    fn parameters(&self) -> serde_json::Value;
}

/// Render the textual tool catalogue appended to prompts.
pub fn render_tool_catalog(tools: &[Arc<dyn Tool>]) -> String {
    let mut catalog = String::from("Available tools:");
    for tool in tools {
        catalog.push_str(&format!(
            "\n- {}: {}\n  parameters: {}",
            tool.name(),
            tool.description(),
            tool.parameters()
        ));
    }
    catalog
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct SearchTool;

    impl Tool for SearchTool {
        fn name(&self) -> &str {
            "web_search"
        }

        fn description(&self) -> &str {
            "Search the web for current information"
        }

        fn parameters(&self) -> serde_json::Value {
            json!({"type": "object", "properties": {"query": {"type": "string"}}})
        }
    }

    struct EchoModel;

    #[async_trait]
    impl LanguageModel for EchoModel {
        async fn query(&self, prompt: &str) -> ValetResult<String> {
            Ok(prompt.to_string())
        }
    }

    #[test]
    fn test_render_tool_catalog_lists_every_tool() {
        let tools: Vec<Arc<dyn Tool>> = vec![Arc::new(SearchTool)];
        let catalog = render_tool_catalog(&tools);

        assert!(catalog.starts_with("Available tools:"));
        assert!(catalog.contains("web_search"));
        assert!(catalog.contains("Search the web"));
        assert!(catalog.contains("\"query\""));
    }

    #[tokio::test]
    async fn test_query_with_tools_appends_catalog() {
        let model = EchoModel;
        let tools: Vec<Arc<dyn Tool>> = vec![Arc::new(SearchTool)];

        let seen = model.query_with_tools("find rust news", &tools).await.unwrap();
        assert!(seen.starts_with("find rust news"));
        assert!(seen.contains("Available tools:"));
        assert!(seen.contains("web_search"));
    }

    #[tokio::test]
    async fn test_query_with_no_tools_leaves_prompt_untouched() {
        let model = EchoModel;
        let seen = model.query_with_tools("plain prompt", &[]).await.unwrap();
        assert_eq!(seen, "plain prompt");
    }
}
