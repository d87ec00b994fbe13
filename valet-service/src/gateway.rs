//! The user gateway: a pseudo-agent that turns routed replies into futures.
//!
//! The gateway registers an ordinary `AgentEndpoint` under the id `"user"`,
//! so agents address the user exactly like any other peer. A background task
//! drains that queue and completes the oneshot channel registered for the
//! reply's `reply_to` id. Replies nobody is waiting for are logged and
//! dropped.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, watch, Mutex};
use tokio::task::JoinHandle;
use valet_core::{AgentId, AgentState, AgentStatus, AgentType, Message, MessageId};
use valet_orchestrator::AgentEndpoint;

type PendingReplies = Arc<Mutex<HashMap<MessageId, oneshot::Sender<Message>>>>;

/// Inbound edge of the service; owns the `"user"` endpoint.
pub(crate) struct Gateway {
    agent_id: AgentId,
    sender: mpsc::Sender<Message>,
    state: Arc<Mutex<AgentState>>,
    pending: PendingReplies,
    shutdown: watch::Sender<bool>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl Gateway {
    /// Spawn the correlation task and return the gateway handle.
    pub(crate) fn spawn(queue_capacity: usize) -> Self {
        let agent_id = AgentId::new("user");
        let (sender, receiver) = mpsc::channel(queue_capacity.max(1));
        let pending: PendingReplies = Arc::new(Mutex::new(HashMap::new()));

        let mut state = AgentState::new(Vec::new());
        state.status = AgentStatus::Idle;
        let state = Arc::new(Mutex::new(state));

        let (shutdown, shutdown_rx) = watch::channel(false);
        let task = tokio::spawn(correlation_loop(
            agent_id.clone(),
            receiver,
            Arc::clone(&pending),
            shutdown_rx,
        ));

        Self {
            agent_id,
            sender,
            state,
            pending,
            shutdown,
            task: Mutex::new(Some(task)),
        }
    }

    pub(crate) fn agent_id(&self) -> &AgentId {
        &self.agent_id
    }

    /// Registration handle for the orchestrator.
    pub(crate) fn endpoint(&self) -> AgentEndpoint {
        AgentEndpoint::new(
            self.agent_id.clone(),
            AgentType::Gateway,
            self.sender.clone(),
            Arc::clone(&self.state),
        )
    }

    /// Register interest in the reply to `message_id`.
    pub(crate) async fn register_pending(
        &self,
        message_id: MessageId,
    ) -> oneshot::Receiver<Message> {
        let (tx, rx) = oneshot::channel();
        self.pending.lock().await.insert(message_id, tx);
        rx
    }

    /// Give up on a reply; a late arrival will be dropped as uncorrelated.
    pub(crate) async fn abandon(&self, message_id: &MessageId) {
        self.pending.lock().await.remove(message_id);
    }

    /// Stop the correlation task and drop all pending waits. Idempotent.
    pub(crate) async fn stop(&self) {
        let _ = self.shutdown.send(true);

        let task = self.task.lock().await.take();
        if let Some(task) = task {
            let _ = task.await;
        }

        self.pending.lock().await.clear();
        self.state.lock().await.status = AgentStatus::Offline;
    }
}

async fn correlation_loop(
    agent_id: AgentId,
    mut receiver: mpsc::Receiver<Message>,
    pending: PendingReplies,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    loop {
        tokio::select! {
            changed = shutdown_rx.changed() => {
                match changed {
                    Ok(()) => {
                        if *shutdown_rx.borrow() {
                            tracing::debug!(agent_id = %agent_id, "Gateway stopping");
                            break;
                        }
                    }
                    Err(_) => break,
                }
            }

            received = receiver.recv() => {
                match received {
                    Some(message) => deliver(&agent_id, &pending, message).await,
                    None => break,
                }
            }
        }
    }
}

async fn deliver(agent_id: &AgentId, pending: &PendingReplies, message: Message) {
    let Some(reply_to) = message.reply_to else {
        tracing::debug!(
            agent_id = %agent_id,
            message_id = %message.message_id,
            message_type = %message.message_type,
            "Dropping unsolicited message at gateway"
        );
        return;
    };

    let waiter = pending.lock().await.remove(&reply_to);
    match waiter {
        // The receiver may have timed out between lookup and send; either
        // way the reply is consumed here.
        Some(tx) => {
            let _ = tx.send(message);
        }
        None => {
            tracing::debug!(
                agent_id = %agent_id,
                reply_to = %reply_to,
                "Dropping reply nobody is waiting for"
            );
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
