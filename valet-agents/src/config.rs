//! Per-agent construction parameters.

use std::sync::Arc;
use valet_core::{AgentId, AgentType};
use valet_llm::{LanguageModel, Tool};
use valet_memory::MemoryStore;
use valet_orchestrator::Orchestrator;

/// Default number of history lines fed into a prompt.
pub const DEFAULT_MEMORY_WINDOW: usize = 10;

/// Everything a `BaseAgent` needs at construction time.
///
/// The shared services (model, store, orchestrator) arrive as `Arc`s so a
/// single instance of each backs every agent in the process.
#[derive(Clone)]
pub struct AgentConfig {
    /// Unique agent identifier; doubles as the routing address
    pub agent_id: AgentId,
    /// Role of the agent
    pub agent_type: AgentType,
    /// Human-readable display name
    pub name: String,
    /// One-line description of what the agent does
    pub description: String,
    /// Capabilities advertised to the coordinator
    pub capabilities: Vec<String>,
    /// Tools exposed to the model on Request handling
    pub tools: Vec<Arc<dyn Tool>>,
    /// Shared language model client
    pub language_model: Arc<dyn LanguageModel>,
    /// Shared memory store
    pub store: Arc<dyn MemoryStore>,
    /// Router used for every outbound message
    pub orchestrator: Arc<Orchestrator>,
    /// Inbox capacity
    pub queue_capacity: usize,
    /// How many history lines prompts may carry
    pub memory_window: usize,
}

impl AgentConfig {
    /// Create a config with defaults for the optional fields.
    ///
    /// The inbox capacity defaults to the orchestrator's configured message
    /// queue size so every agent in a system shares one sizing knob.
    pub fn new(
        agent_id: impl Into<AgentId>,
        agent_type: AgentType,
        language_model: Arc<dyn LanguageModel>,
        store: Arc<dyn MemoryStore>,
        orchestrator: Arc<Orchestrator>,
    ) -> Self {
        let agent_id = agent_id.into();
        let queue_capacity = orchestrator.message_queue_size();

        Self {
            name: agent_id.to_string(),
            description: String::new(),
            capabilities: Vec::new(),
            tools: Vec::new(),
            agent_id,
            agent_type,
            language_model,
            store,
            orchestrator,
            queue_capacity,
            memory_window: DEFAULT_MEMORY_WINDOW,
        }
    }

    /// Set the display name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Set the advertised capabilities.
    pub fn with_capabilities(mut self, capabilities: Vec<String>) -> Self {
        self.capabilities = capabilities;
        self
    }

    /// Set the tool list.
    pub fn with_tools(mut self, tools: Vec<Arc<dyn Tool>>) -> Self {
        self.tools = tools;
        self
    }

    /// Override the inbox capacity.
    pub fn with_queue_capacity(mut self, queue_capacity: usize) -> Self {
        self.queue_capacity = queue_capacity;
        self
    }

    /// Override the prompt history window.
    pub fn with_memory_window(mut self, memory_window: usize) -> Self {
        self.memory_window = memory_window;
        self
    }
}

impl std::fmt::Debug for AgentConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentConfig")
            .field("agent_id", &self.agent_id)
            .field("agent_type", &self.agent_type)
            .field("name", &self.name)
            .field("capabilities", &self.capabilities)
            .field("tools", &self.tools.len())
            .field("queue_capacity", &self.queue_capacity)
            .field("memory_window", &self.memory_window)
            .finish()
    }
}
