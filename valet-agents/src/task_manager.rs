//! Personal task agent: add, list, and complete tasks held in memory.
//!
//! Tasks live under `personal_task:<id>` with UUIDv7 ids, so a prefix listing
//! returns them in creation order. Completion matches free text against open
//! task descriptions by word overlap rather than asking the model.

use crate::base::{AgentContext, BaseAgent, Behavior};
use crate::classifier::{Intent, IntentClassifier, KeywordClassifier};
use crate::config::AgentConfig;
use async_trait::async_trait;
use chrono::Utc;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;
use std::sync::Arc;
use valet_core::{new_message_id, Message, ValetResult};
use valet_memory::keys;

/// How many task keys a listing scans.
const TASK_SCAN_LIMIT: usize = 256;

/// Leading instruction words stripped off a new task description.
static TASK_PREAMBLE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^\s*(please\s+)?((add|create)\s+(a\s+)?(new\s+)?(task|todo|reminder)\s*(to|:)?|remind\s+me\s+to|remember\s+to)\s*")
        .expect("Invalid preamble regex")
});

/// Words too common to count toward a completion match.
static MATCH_STOPWORDS: &[&str] = &[
    "a", "an", "the", "my", "i", "im", "i'm", "to", "with", "of", "task", "todo", "complete",
    "completed", "done", "finish", "finished", "mark", "check", "off",
];

/// Task manager agent: the runtime with personal-task behavior plugged in.
pub type TaskManagerAgent = BaseAgent<TaskManagerBehavior>;

impl TaskManagerAgent {
    /// Build a task manager with the keyword classifier and role defaults.
    pub fn new(mut config: AgentConfig) -> Self {
        if config.description.is_empty() {
            config.description = "Keeps the user's personal task list".to_string();
        }
        if config.capabilities.is_empty() {
            config.capabilities = vec!["tasks".to_string()];
        }
        BaseAgent::with_behavior(config, TaskManagerBehavior::new())
    }
}

/// One stored personal task, as read back from memory.
#[derive(Debug, Clone)]
struct StoredTask {
    key: String,
    value: serde_json::Value,
    description: String,
    completed: bool,
}

/// Domain logic for the task manager agent.
pub struct TaskManagerBehavior {
    classifier: Arc<dyn IntentClassifier>,
}

impl TaskManagerBehavior {
    /// Create the behavior with the keyword classifier.
    pub fn new() -> Self {
        Self::with_classifier(Arc::new(KeywordClassifier::new()))
    }

    /// Create the behavior with a custom classifier.
    pub fn with_classifier(classifier: Arc<dyn IntentClassifier>) -> Self {
        Self { classifier }
    }

    async fn add_task(&self, ctx: &AgentContext, content: &str) -> ValetResult<String> {
        let description = TASK_PREAMBLE.replace(content, "").trim().to_string();
        let description = if description.is_empty() {
            content.trim().to_string()
        } else {
            description
        };

        let task_id = new_message_id();
        let record = serde_json::json!({
            "id": task_id,
            "description": description,
            "completed": false,
            "created_at": Utc::now(),
        });
        ctx.store
            .store(&keys::task_key(&task_id.to_string()), record)
            .await?;

        tracing::info!(agent_id = %ctx.agent_id, task_id = %task_id, "Task added");
        Ok(format!("Added task: {}", description))
    }

    async fn list_tasks(&self, ctx: &AgentContext) -> ValetResult<String> {
        let tasks = self.load_tasks(ctx).await?;
        if tasks.is_empty() {
            return Ok("No personal tasks yet".to_string());
        }

        let lines: Vec<String> = tasks
            .iter()
            .map(|task| {
                let mark = if task.completed { "x" } else { " " };
                format!("[{}] {}", mark, task.description)
            })
            .collect();
        Ok(lines.join("\n"))
    }

    async fn complete_task(&self, ctx: &AgentContext, content: &str) -> ValetResult<String> {
        let tasks = self.load_tasks(ctx).await?;
        let wanted = significant_words(content);

        let mut best: Option<(&StoredTask, usize)> = None;
        for task in tasks.iter().filter(|t| !t.completed) {
            let overlap = significant_words(&task.description)
                .intersection(&wanted)
                .count();
            if overlap == 0 {
                continue;
            }
            match best {
                Some((_, score)) if score >= overlap => {}
                _ => best = Some((task, overlap)),
            }
        }

        let Some((task, _)) = best else {
            return Ok("No open task matches that description".to_string());
        };

        let mut updated = task.value.clone();
        updated["completed"] = serde_json::Value::Bool(true);
        ctx.store.store(&task.key, updated).await?;

        tracing::info!(agent_id = %ctx.agent_id, key = %task.key, "Task completed");
        Ok(format!("Completed: {}", task.description))
    }

    /// Load every stored task in creation order.
    async fn load_tasks(&self, ctx: &AgentContext) -> ValetResult<Vec<StoredTask>> {
        let task_keys = ctx.store.list("personal_task:", TASK_SCAN_LIMIT).await?;
        let entries = ctx.store.get_multiple(&task_keys).await?;

        let mut tasks = Vec::new();
        for key in &task_keys {
            let Some(entry) = entries.get(key) else {
                continue;
            };
            let description = entry
                .value
                .get("description")
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .to_string();
            let completed = entry
                .value
                .get("completed")
                .and_then(|v| v.as_bool())
                .unwrap_or(false);
            tasks.push(StoredTask {
                key: key.clone(),
                value: entry.value.clone(),
                description,
                completed,
            });
        }
        Ok(tasks)
    }
}

impl Default for TaskManagerBehavior {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Behavior for TaskManagerBehavior {
    async fn handle_command(&self, ctx: &AgentContext, message: &Message) -> ValetResult<String> {
        match self.classifier.classify(&message.content) {
            Intent::AddTask => self.add_task(ctx, &message.content).await,
            Intent::ListTasks => self.list_tasks(ctx).await,
            Intent::CompleteTask => self.complete_task(ctx, &message.content).await,
            other => Ok(format!(
                "Task manager cannot handle a {} command",
                other
            )),
        }
    }
}

/// Lowercased words of the text, minus stopwords.
fn significant_words(text: &str) -> HashSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|word| !word.is_empty())
        .map(|word| word.to_lowercase())
        .filter(|word| !MATCH_STOPWORDS.contains(&word.as_str()))
        .collect()
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use valet_core::{AgentId, AgentType, MessageType, OrchestratorConfig};
    use valet_orchestrator::Orchestrator;
    use valet_test_utils::{InMemoryStore, MockLanguageModel};

    fn context() -> AgentContext {
        let store = Arc::new(InMemoryStore::new());
        let orchestrator = Arc::new(Orchestrator::new(
            OrchestratorConfig::default(),
            store.clone(),
        ));
        AgentContext {
            agent_id: AgentId::new("task-manager"),
            agent_type: AgentType::Task,
            tools: Vec::new(),
            language_model: Arc::new(MockLanguageModel::new()),
            store,
            orchestrator,
            memory_window: 10,
        }
    }

    fn command(content: &str) -> Message {
        Message::new("user", "task-manager", MessageType::Command, content)
    }

    async fn handle(behavior: &TaskManagerBehavior, ctx: &AgentContext, content: &str) -> String {
        behavior
            .handle_command(ctx, &command(content))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_add_strips_the_instruction_preamble() {
        let ctx = context();
        let behavior = TaskManagerBehavior::new();

        let report = handle(&behavior, &ctx, "add a task to buy milk").await;
        assert_eq!(report, "Added task: buy milk");

        let report = handle(&behavior, &ctx, "remind me to call mom").await;
        assert_eq!(report, "Added task: call mom");
    }

    #[tokio::test]
    async fn test_list_shows_open_and_done_tasks_in_order() {
        let ctx = context();
        let behavior = TaskManagerBehavior::new();

        handle(&behavior, &ctx, "add a task to buy milk").await;
        handle(&behavior, &ctx, "add a task to water the plants").await;
        handle(&behavior, &ctx, "I'm done with the milk").await;

        let listing = handle(&behavior, &ctx, "list my tasks").await;
        assert_eq!(listing, "[x] buy milk\n[ ] water the plants");
    }

    #[tokio::test]
    async fn test_list_when_empty() {
        let ctx = context();
        let behavior = TaskManagerBehavior::new();

        let listing = handle(&behavior, &ctx, "list my tasks").await;
        assert_eq!(listing, "No personal tasks yet");
    }

    #[tokio::test]
    async fn test_complete_picks_the_best_overlap() {
        let ctx = context();
        let behavior = TaskManagerBehavior::new();

        handle(&behavior, &ctx, "add a task to buy milk").await;
        handle(&behavior, &ctx, "add a task to buy concert tickets").await;

        let report = handle(&behavior, &ctx, "mark off buy concert tickets").await;
        assert_eq!(report, "Completed: buy concert tickets");

        let listing = handle(&behavior, &ctx, "list my tasks").await;
        assert_eq!(listing, "[ ] buy milk\n[x] buy concert tickets");
    }

    #[tokio::test]
    async fn test_complete_without_match_reports_plainly() {
        let ctx = context();
        let behavior = TaskManagerBehavior::new();

        handle(&behavior, &ctx, "add a task to buy milk").await;
        let report = handle(&behavior, &ctx, "I'm done with the taxes").await;
        assert_eq!(report, "No open task matches that description");
    }

    #[tokio::test]
    async fn test_completed_tasks_never_rematch() {
        let ctx = context();
        let behavior = TaskManagerBehavior::new();

        handle(&behavior, &ctx, "add a task to buy milk").await;
        handle(&behavior, &ctx, "I'm done with the milk").await;
        let report = handle(&behavior, &ctx, "I'm done with the milk").await;
        assert_eq!(report, "No open task matches that description");
    }

    #[tokio::test]
    async fn test_unrelated_command_is_refused() {
        let ctx = context();
        let behavior = TaskManagerBehavior::new();

        let report = handle(&behavior, &ctx, "summarize our chat").await;
        assert_eq!(report, "Task manager cannot handle a summarize command");
    }

    #[test]
    fn test_significant_words_drop_stopwords() {
        let words = significant_words("I'm done with the milk");
        assert!(words.contains("milk"));
        assert!(!words.contains("done"));
        assert!(!words.contains("the"));
    }
}
