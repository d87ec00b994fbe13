//! Shared agent runtime: context, behavior seam, and the message loop.

use crate::agent::Agent;
use crate::config::AgentConfig;
use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;
use tokio::sync::{mpsc, watch, Mutex};
use tokio::task::JoinHandle;
use valet_core::{
    AgentError, AgentId, AgentState, AgentStatus, AgentType, Message, MessageType, ValetResult,
};
use valet_llm::{LanguageModel, PromptBuilder, Tool};
use valet_memory::{keys, MemoryStore};
use valet_orchestrator::{AgentEndpoint, Orchestrator};

/// How many inbox records a history lookup scans before windowing.
///
/// Anything past this is older than any reasonable prompt window.
const HISTORY_SCAN_LIMIT: usize = 256;

/// How many memory entries a Query pulls in as grounding.
const QUERY_TOP_K: usize = 5;

// ============================================================================
// AGENT CONTEXT
// ============================================================================

/// The shared services a behavior works with.
///
/// One context per agent, shared between the lifecycle surface and the
/// message loop task.
pub struct AgentContext {
    /// Identity of the owning agent
    pub agent_id: AgentId,
    /// Role of the owning agent
    pub agent_type: AgentType,
    /// Tools exposed to the model on Request handling
    pub tools: Vec<Arc<dyn Tool>>,
    /// Shared language model client
    pub language_model: Arc<dyn LanguageModel>,
    /// Shared memory store
    pub store: Arc<dyn MemoryStore>,
    /// Router used for every outbound message
    pub orchestrator: Arc<Orchestrator>,
    /// How many history lines prompts may carry
    pub memory_window: usize,
}

impl AgentContext {
    /// Send a message out through the orchestrator.
    pub async fn route(&self, message: Message) -> ValetResult<()> {
        self.orchestrator.route_message(message).await
    }

    /// Default Request handling: context prompt plus tools.
    pub async fn answer_request(&self, message: &Message) -> ValetResult<String> {
        let history = self.recent_activity().await;
        let prompt = PromptBuilder::new()
            .identity(&self.agent_id, self.agent_type)
            .context(&message.context)
            .history(&history, self.memory_window)
            .content(&message.content)
            .build();

        self.language_model.query_with_tools(&prompt, &self.tools).await
    }

    /// Default Query handling: memory search grounds a tool-free completion.
    pub async fn answer_query(&self, message: &Message) -> ValetResult<String> {
        let matches = self.store.search(&message.content, QUERY_TOP_K).await?;
        let grounding: Vec<String> = matches
            .iter()
            .map(|entry| format!("{}: {}", entry.key, entry.value))
            .collect();

        let prompt = PromptBuilder::new()
            .identity(&self.agent_id, self.agent_type)
            .context(&message.context)
            .history(&grounding, QUERY_TOP_K)
            .content(&message.content)
            .build();

        self.language_model.query(&prompt).await
    }

    /// Render the newest inbox records as history lines, oldest first.
    async fn recent_activity(&self) -> Vec<String> {
        let prefix = format!("msg:{}:", self.agent_id);
        let keys = match self.store.list(&prefix, HISTORY_SCAN_LIMIT).await {
            Ok(keys) => keys,
            Err(e) => {
                tracing::warn!(agent_id = %self.agent_id, error = %e, "History listing failed");
                return Vec::new();
            }
        };

        let start = keys.len().saturating_sub(self.memory_window);
        let wanted: Vec<String> = keys[start..].to_vec();
        let entries = match self.store.get_multiple(&wanted).await {
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!(agent_id = %self.agent_id, error = %e, "History fetch failed");
                return Vec::new();
            }
        };

        wanted
            .iter()
            .filter_map(|key| entries.get(key))
            .map(|entry| {
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
                format!("{}: {}", from, content)
            })
            .collect()
    }
}

// ============================================================================
// BEHAVIOR
// ============================================================================

/// The domain half of an agent.
///
/// `BaseAgent` owns the queue, lifecycle and dispatch; a behavior supplies
/// what the agent actually does with Commands, and may override Request
/// handling or record exchanges it cares about.
#[async_trait]
pub trait Behavior: Send + Sync + 'static {
    /// Handle a Command; the returned text becomes the Report content.
    async fn handle_command(&self, ctx: &AgentContext, message: &Message) -> ValetResult<String>;

    /// Handle a Request; the returned text becomes the Response content.
    async fn handle_request(&self, ctx: &AgentContext, message: &Message) -> ValetResult<String> {
        ctx.answer_request(message).await
    }

    /// Hook invoked after a successful exchange, before the reply is routed.
    async fn record_exchange(&self, _ctx: &AgentContext, _message: &Message, _reply: &str) {}
}

// ============================================================================
// BASE AGENT
// ============================================================================

/// Generic agent runtime parameterized by a behavior.
///
/// Owns the bounded inbox, the stop signal, and the state machine
/// `Offline → Starting → Idle ⇄ Busy → Offline`. The message loop is
/// strictly serial: the next message is not dequeued until the current
/// handler returns.
pub struct BaseAgent<B: Behavior> {
    name: String,
    description: String,
    capabilities: Vec<String>,
    ctx: Arc<AgentContext>,
    behavior: Arc<B>,
    state: Arc<Mutex<AgentState>>,
    sender: mpsc::Sender<Message>,
    inbox: Mutex<Option<mpsc::Receiver<Message>>>,
    stop_signal: watch::Sender<bool>,
    loop_handle: Mutex<Option<JoinHandle<()>>>,
}

impl<B: Behavior> BaseAgent<B> {
    /// Assemble an agent from its config and behavior.
    pub fn with_behavior(config: AgentConfig, behavior: B) -> Self {
        let (sender, receiver) = mpsc::channel(config.queue_capacity.max(1));
        let state = Arc::new(Mutex::new(AgentState::new(config.capabilities.clone())));
        let (stop_signal, _) = watch::channel(false);

        let ctx = Arc::new(AgentContext {
            agent_id: config.agent_id,
            agent_type: config.agent_type,
            tools: config.tools,
            language_model: config.language_model,
            store: config.store,
            orchestrator: config.orchestrator,
            memory_window: config.memory_window,
        });

        Self {
            name: config.name,
            description: config.description,
            capabilities: config.capabilities,
            ctx,
            behavior: Arc::new(behavior),
            state,
            sender,
            inbox: Mutex::new(Some(receiver)),
            stop_signal,
            loop_handle: Mutex::new(None),
        }
    }

    /// The context shared with the behavior; exposed for composition.
    pub fn context(&self) -> &Arc<AgentContext> {
        &self.ctx
    }
}

#[async_trait]
impl<B: Behavior> Agent for BaseAgent<B> {
    fn id(&self) -> &AgentId {
        &self.ctx.agent_id
    }

    fn agent_type(&self) -> AgentType {
        self.ctx.agent_type
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn capabilities(&self) -> &[String] {
        &self.capabilities
    }

    async fn initialize(&self) -> ValetResult<()> {
        {
            let mut state = self.state.lock().await;
            if state.status.is_running() {
                return Err(AgentError::AlreadyRunning {
                    agent_id: self.ctx.agent_id.clone(),
                }
                .into());
            }
            state.status = AgentStatus::Starting;
            state.touch();
        }

        let record = serde_json::json!({
            "name": self.name,
            "agent_type": self.ctx.agent_type.as_db_str(),
            "capabilities": self.capabilities,
            "initialized_at": Utc::now(),
        });
        let key = keys::agent_key(&self.ctx.agent_id, "init");
        if let Err(e) = self.ctx.store.store(&key, record).await {
            tracing::warn!(
                agent_id = %self.ctx.agent_id,
                error = %e,
                "Failed to store init record"
            );
        }

        tracing::info!(
            agent_id = %self.ctx.agent_id,
            agent_type = %self.ctx.agent_type,
            "Agent initialized"
        );
        Ok(())
    }

    async fn start(&self) -> ValetResult<()> {
        {
            let state = self.state.lock().await;
            if !state.status.can_start() {
                return Err(AgentError::AlreadyRunning {
                    agent_id: self.ctx.agent_id.clone(),
                }
                .into());
            }
        }

        // The inbox moves into the loop exactly once; after a stop the
        // agent cannot be restarted.
        let receiver = match self.inbox.lock().await.take() {
            Some(receiver) => receiver,
            None => {
                return Err(AgentError::NotInitialized {
                    agent_id: self.ctx.agent_id.clone(),
                }
                .into());
            }
        };

        let _ = self.stop_signal.send(false);
        let stop_rx = self.stop_signal.subscribe();

        {
            let mut state = self.state.lock().await;
            state.status = AgentStatus::Idle;
            state.touch();
        }

        let handle = tokio::spawn(message_loop(
            Arc::clone(&self.ctx),
            Arc::clone(&self.behavior),
            Arc::clone(&self.state),
            receiver,
            stop_rx,
        ));
        *self.loop_handle.lock().await = Some(handle);

        tracing::info!(agent_id = %self.ctx.agent_id, "Agent started");
        Ok(())
    }

    async fn stop(&self) {
        let _ = self.stop_signal.send(true);

        let handle = self.loop_handle.lock().await.take();
        if let Some(handle) = handle {
            let _ = handle.await;
        }

        let mut state = self.state.lock().await;
        if state.status != AgentStatus::Offline {
            state.status = AgentStatus::Offline;
            state.current_task.clear();
            state.touch();
            tracing::info!(agent_id = %self.ctx.agent_id, "Agent stopped");
        }
    }

    async fn state(&self) -> AgentState {
        self.state.lock().await.clone()
    }

    async fn send_message(&self, message: Message) -> ValetResult<()> {
        self.ctx.route(message).await
    }

    fn endpoint(&self) -> AgentEndpoint {
        AgentEndpoint::new(
            self.ctx.agent_id.clone(),
            self.ctx.agent_type,
            self.sender.clone(),
            Arc::clone(&self.state),
        )
    }
}

// ============================================================================
// MESSAGE LOOP
// ============================================================================

async fn message_loop<B: Behavior>(
    ctx: Arc<AgentContext>,
    behavior: Arc<B>,
    state: Arc<Mutex<AgentState>>,
    mut receiver: mpsc::Receiver<Message>,
    mut stop_rx: watch::Receiver<bool>,
) {
    loop {
        tokio::select! {
            changed = stop_rx.changed() => {
                match changed {
                    Ok(()) => {
                        if *stop_rx.borrow() {
                            tracing::debug!(agent_id = %ctx.agent_id, "Message loop stopping");
                            break;
                        }
                    }
                    Err(_) => break,
                }
            }

            received = receiver.recv() => {
                match received {
                    Some(message) => {
                        handle_message(&ctx, behavior.as_ref(), &state, message).await;
                    }
                    None => break,
                }
            }
        }
    }
}

async fn handle_message<B: Behavior>(
    ctx: &AgentContext,
    behavior: &B,
    state: &Mutex<AgentState>,
    message: Message,
) {
    record_inbox(ctx, &message).await;

    let task = match message.message_type {
        MessageType::Command => message.content.clone(),
        other => format!("{} from {}", other, message.from),
    };
    state.lock().await.begin_work(task);

    tracing::debug!(
        agent_id = %ctx.agent_id,
        message_id = %message.message_id,
        message_type = %message.message_type,
        "Handling message"
    );

    match dispatch(ctx, behavior, &message).await {
        Ok(Some(content)) if message.requires_ack => {
            let reply = match message.message_type {
                MessageType::Command => message.report_to(ctx.agent_id.clone(), content),
                _ => message.response_to(ctx.agent_id.clone(), content),
            };
            if let Err(e) = ctx.route(reply).await {
                tracing::warn!(agent_id = %ctx.agent_id, error = %e, "Failed to route reply");
            }
        }
        Ok(_) => {}
        Err(e) => {
            tracing::error!(
                agent_id = %ctx.agent_id,
                message_id = %message.message_id,
                error = %e,
                "Handler failed"
            );
            // Errors go back regardless of requires_ack so the sender is
            // never left waiting on a failure.
            let reply = message.error_to(ctx.agent_id.clone(), e.to_string());
            if let Err(e) = ctx.route(reply).await {
                tracing::warn!(agent_id = %ctx.agent_id, error = %e, "Failed to route error reply");
            }
        }
    }

    state.lock().await.finish_work();
}

async fn dispatch<B: Behavior>(
    ctx: &AgentContext,
    behavior: &B,
    message: &Message,
) -> ValetResult<Option<String>> {
    let content = match message.message_type {
        MessageType::Request => behavior.handle_request(ctx, message).await?,
        MessageType::Query => ctx.answer_query(message).await?,
        MessageType::Command => behavior.handle_command(ctx, message).await?,
        MessageType::Notification => return Ok(None),
        other => {
            tracing::debug!(
                agent_id = %ctx.agent_id,
                message_type = %other,
                "Acknowledging unexpected message type"
            );
            return Ok(Some(format!("Acknowledged {}", other)));
        }
    };

    behavior.record_exchange(ctx, message, &content).await;
    Ok(Some(content))
}

async fn record_inbox(ctx: &AgentContext, message: &Message) {
    let value = match serde_json::to_value(message) {
        Ok(value) => value,
        Err(e) => {
            tracing::warn!(
                agent_id = %ctx.agent_id,
                message_id = %message.message_id,
                error = %e,
                "Failed to serialize inbox record"
            );
            return;
        }
    };

    let key = keys::inbox_key(&ctx.agent_id, &message.message_id);
    if let Err(e) = ctx.store.store(&key, value).await {
        tracing::warn!(
            agent_id = %ctx.agent_id,
            message_id = %message.message_id,
            error = %e,
            "Failed to store inbox record"
        );
    }
}

// ============================================================================
// TESTS
// ============================================================================
