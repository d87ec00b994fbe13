//! Agent registry, message routing and the health poller.

use crate::endpoint::AgentEndpoint;
use crate::events::RouterEvent;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{broadcast, watch, Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use valet_core::{
    AgentId, HealthStatus, Message, OrchestratorConfig, RouterError, SystemHealth, ValetResult,
};
use valet_memory::{keys, MemoryStore};

// ============================================================================
// ORCHESTRATOR
// ============================================================================

/// Central router every message in the system passes through.
///
/// Owns the registry of `AgentEndpoint`s, validates and fans out messages,
/// keeps routing counters, and broadcasts `RouterEvent`s. Health is computed
/// on demand from the registry and polled periodically in the background.
pub struct Orchestrator {
    config: OrchestratorConfig,
    store: Arc<dyn MemoryStore>,
    registry: RwLock<HashMap<AgentId, AgentEndpoint>>,
    events: broadcast::Sender<RouterEvent>,
    running: AtomicBool,
    messages_routed: AtomicU64,
    delivery_failures: AtomicU64,
    poller: Mutex<Option<PollerHandle>>,
}

struct PollerHandle {
    shutdown: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl Orchestrator {
    /// Create a router over the given shared memory store.
    ///
    /// The router accepts messages immediately; `start` only adds the
    /// background health poller.
    pub fn new(config: OrchestratorConfig, store: Arc<dyn MemoryStore>) -> Self {
        let (events, _) = broadcast::channel(config.event_queue_size.max(1));

        Self {
            config,
            store,
            registry: RwLock::new(HashMap::new()),
            events,
            running: AtomicBool::new(true),
            messages_routed: AtomicU64::new(0),
            delivery_failures: AtomicU64::new(0),
            poller: Mutex::new(None),
        }
    }

    /// The queue capacity agents should size their inboxes to.
    pub fn message_queue_size(&self) -> usize {
        self.config.message_queue_size
    }

    /// Subscribe to router events.
    ///
    /// The channel is bounded; a subscriber that falls behind loses the
    /// oldest events rather than blocking the router.
    pub fn subscribe(&self) -> broadcast::Receiver<RouterEvent> {
        self.events.subscribe()
    }

    // ------------------------------------------------------------------------
    // REGISTRY
    // ------------------------------------------------------------------------

    /// Add an agent to the registry.
    ///
    /// Fails with `RouterError::DuplicateAgent` when the id is already
    /// registered; the existing registration is untouched.
    pub async fn register_agent(&self, endpoint: AgentEndpoint) -> ValetResult<()> {
        let mut registry = self.registry.write().await;
        if registry.contains_key(&endpoint.agent_id) {
            return Err(RouterError::DuplicateAgent {
                agent_id: endpoint.agent_id.clone(),
            }
            .into());
        }

        tracing::info!(
            agent_id = %endpoint.agent_id,
            agent_type = %endpoint.agent_type,
            "Agent registered"
        );
        self.emit(RouterEvent::AgentRegistered {
            agent_id: endpoint.agent_id.clone(),
            agent_type: endpoint.agent_type,
        });
        registry.insert(endpoint.agent_id.clone(), endpoint);
        Ok(())
    }

    /// Remove an agent from the registry.
    ///
    /// Takes effect immediately: subsequent messages naming the agent fail
    /// validation with `UnknownRecipient`.
    pub async fn unregister_agent(&self, agent_id: &AgentId) -> ValetResult<()> {
        let removed = self.registry.write().await.remove(agent_id);
        if removed.is_none() {
            return Err(RouterError::UnknownRecipient {
                agent_id: agent_id.clone(),
            }
            .into());
        }

        tracing::info!(agent_id = %agent_id, "Agent unregistered");
        self.emit(RouterEvent::AgentUnregistered {
            agent_id: agent_id.clone(),
        });
        Ok(())
    }

    /// Find a running agent advertising the given capability.
    ///
    /// When several qualify, the least loaded wins.
    pub async fn find_agent_with_capability(&self, capability: &str) -> Option<AgentId> {
        let registry = self.registry.read().await;
        let mut best: Option<(AgentId, i32)> = None;

        for endpoint in registry.values() {
            let state = endpoint.state_snapshot().await;
            if !state.status.is_running() || !state.has_capability(capability) {
                continue;
            }
            match best {
                Some((_, workload)) if workload <= state.workload => {}
                _ => best = Some((endpoint.agent_id.clone(), state.workload)),
            }
        }

        best.map(|(agent_id, _)| agent_id)
    }

    // ------------------------------------------------------------------------
    // ROUTING
    // ------------------------------------------------------------------------

    /// Validate and deliver a message to every recipient's inbox.
    ///
    /// All recipients are validated against the registry before anything is
    /// delivered, so an unknown recipient never causes a partial fan-out.
    /// Delivery itself is best effort per recipient: a full inbox is counted,
    /// reported as a `DeliveryFailed` event, and the first such failure is
    /// returned after every recipient has been attempted.
    pub async fn route_message(&self, message: Message) -> ValetResult<()> {
        if !self.running.load(Ordering::SeqCst) {
            return Err(RouterError::Unavailable.into());
        }
        if message.to.is_empty() {
            return Err(RouterError::EmptyRecipients {
                message_id: message.message_id,
            }
            .into());
        }

        let registry = self.registry.read().await;
        for recipient in &message.to {
            if !registry.contains_key(recipient) {
                return Err(RouterError::UnknownRecipient {
                    agent_id: recipient.clone(),
                }
                .into());
            }
        }

        self.record_routed(&message).await;
        self.messages_routed.fetch_add(1, Ordering::Relaxed);
        self.emit(RouterEvent::MessageRouted {
            message_id: message.message_id,
            from: message.from.clone(),
            recipients: message.to.len(),
        });
        tracing::debug!(
            message_id = %message.message_id,
            from = %message.from,
            message_type = %message.message_type,
            recipients = message.to.len(),
            "Routing message"
        );

        let mut first_failure: Option<RouterError> = None;

        for recipient in &message.to {
            // Validated above while the same read guard is held.
            let endpoint = match registry.get(recipient) {
                Some(endpoint) => endpoint,
                None => continue,
            };

            match endpoint.sender.try_send(message.clone()) {
                Ok(()) => {}
                Err(TrySendError::Full(_)) => {
                    let capacity = endpoint.sender.max_capacity();
                    self.delivery_failures.fetch_add(1, Ordering::Relaxed);
                    tracing::warn!(
                        message_id = %message.message_id,
                        agent_id = %recipient,
                        capacity,
                        "Recipient inbox full, dropping delivery"
                    );
                    self.emit(RouterEvent::DeliveryFailed {
                        message_id: message.message_id,
                        agent_id: recipient.clone(),
                        reason: format!("Inbox full (capacity {})", capacity),
                    });
                    if first_failure.is_none() {
                        first_failure = Some(RouterError::QueueFull {
                            agent_id: recipient.clone(),
                            capacity,
                        });
                    }
                }
                Err(TrySendError::Closed(_)) => {
                    // Registered but stopped; the registry entry is stale
                    // until the owner unregisters it.
                    self.delivery_failures.fetch_add(1, Ordering::Relaxed);
                    tracing::warn!(
                        message_id = %message.message_id,
                        agent_id = %recipient,
                        "Recipient inbox closed, dropping delivery"
                    );
                    self.emit(RouterEvent::DeliveryFailed {
                        message_id: message.message_id,
                        agent_id: recipient.clone(),
                        reason: "Inbox closed".to_string(),
                    });
                }
            }
        }

        match first_failure {
            Some(err) => Err(err.into()),
            None => Ok(()),
        }
    }

    /// Best-effort record of the routing decision in shared memory.
    async fn record_routed(&self, message: &Message) {
        let value = match serde_json::to_value(message) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(
                    message_id = %message.message_id,
                    error = %e,
                    "Failed to serialize message for routing record"
                );
                return;
            }
        };

        let key = keys::routed_key(&message.message_id);
        if let Err(e) = self.store.store(&key, value).await {
            tracing::warn!(
                message_id = %message.message_id,
                error = %e,
                "Failed to store routing record"
            );
        }
    }

    // ------------------------------------------------------------------------
    // HEALTH
    // ------------------------------------------------------------------------

    /// Compute an aggregate health snapshot from the current registry.
    pub async fn system_health(&self) -> SystemHealth {
        let registry = self.registry.read().await;
        let mut statuses = Vec::with_capacity(registry.len());
        for endpoint in registry.values() {
            statuses.push(endpoint.status().await);
        }

        SystemHealth::aggregate(
            &statuses,
            self.messages_routed.load(Ordering::Relaxed),
            self.delivery_failures.load(Ordering::Relaxed),
        )
    }

    // ------------------------------------------------------------------------
    // LIFECYCLE
    // ------------------------------------------------------------------------

    /// Start the background health poller.
    ///
    /// Calling again while the poller is running is a no-op; calling after
    /// `stop` fails with `RouterError::Unavailable`.
    pub async fn start(self: &Arc<Self>) -> ValetResult<()> {
        if !self.running.load(Ordering::SeqCst) {
            return Err(RouterError::Unavailable.into());
        }

        let mut poller = self.poller.lock().await;
        if poller.is_some() {
            return Ok(());
        }

        let (shutdown, shutdown_rx) = watch::channel(false);
        let handle = tokio::spawn(health_poll_task(Arc::clone(self), shutdown_rx));
        *poller = Some(PollerHandle { shutdown, handle });

        tracing::info!(
            interval_secs = self.config.health_check_interval.as_secs(),
            "Orchestrator started"
        );
        Ok(())
    }

    /// Stop routing and join the health poller. Idempotent.
    pub async fn stop(&self) {
        if self.running.swap(false, Ordering::SeqCst) {
            tracing::info!(
                messages_routed = self.messages_routed.load(Ordering::Relaxed),
                delivery_failures = self.delivery_failures.load(Ordering::Relaxed),
                "Orchestrator stopping"
            );
        }

        let poller = self.poller.lock().await.take();
        if let Some(PollerHandle { shutdown, handle }) = poller {
            let _ = shutdown.send(true);
            let _ = handle.await;
        }
    }

    fn emit(&self, event: RouterEvent) {
        // No subscribers is fine; events are observability, not control flow.
        let _ = self.events.send(event);
    }
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("running", &self.running.load(Ordering::SeqCst))
            .field(
                "messages_routed",
                &self.messages_routed.load(Ordering::Relaxed),
            )
            .field(
                "delivery_failures",
                &self.delivery_failures.load(Ordering::Relaxed),
            )
            .finish()
    }
}

// ============================================================================
// HEALTH POLLER
// ============================================================================

/// Background task that periodically samples aggregate health.
///
/// Logs every transition and emits `HealthChanged`. Runs until the shutdown
/// signal flips to true.
async fn health_poll_task(orchestrator: Arc<Orchestrator>, mut shutdown_rx: watch::Receiver<bool>) {
    let mut tick = interval(orchestrator.config.health_check_interval);
    tick.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let mut last_status: Option<HealthStatus> = None;

    tracing::info!(
        interval_secs = orchestrator.config.health_check_interval.as_secs(),
        "Health poller started"
    );

    loop {
        tokio::select! {
            _ = shutdown_rx.changed() => {
                if *shutdown_rx.borrow() {
                    tracing::info!("Health poller shutting down");
                    break;
                }
            }

            _ = tick.tick() => {
                let health = orchestrator.system_health().await;
                match last_status {
                    Some(previous) if previous != health.status => {
                        tracing::warn!(
                            previous = %previous,
                            current = %health.status,
                            registered_agents = health.registered_agents,
                            "System health changed"
                        );
                        orchestrator.emit(RouterEvent::HealthChanged {
                            previous,
                            current: health.status,
                        });
                    }
                    None => {
                        tracing::info!(
                            status = %health.status,
                            registered_agents = health.registered_agents,
                            "System health observed"
                        );
                    }
                    _ => {
                        tracing::trace!(status = %health.status, "System health unchanged");
                    }
                }
                last_status = Some(health.status);
            }
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
