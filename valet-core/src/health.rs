//! System health snapshot types.
//!
//! Health is computed on demand by the orchestrator from its registry and
//! never persisted.

use crate::identity::Timestamp;
use crate::state::AgentStatus;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Overall health status for the running system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    /// All registered agents are running
    Online,
    /// Some agents are offline but the system is serving
    Degraded,
    /// No agents are registered, or none is running
    Offline,
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            HealthStatus::Online => "online",
            HealthStatus::Degraded => "degraded",
            HealthStatus::Offline => "offline",
        };
        write!(f, "{}", s)
    }
}

/// Point-in-time snapshot of aggregate system health.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemHealth {
    /// Overall status
    pub status: HealthStatus,
    /// Number of registered agents
    pub registered_agents: usize,
    /// Count of agents per lifecycle status (keyed by status db string)
    pub agent_counts: HashMap<String, usize>,
    /// Total messages routed since startup
    pub messages_routed: u64,
    /// Total per-recipient delivery failures since startup
    pub delivery_failures: u64,
    /// When the snapshot was taken
    pub checked_at: Timestamp,
}

impl SystemHealth {
    /// Aggregate a snapshot from per-agent statuses and routing counters.
    pub fn aggregate(
        statuses: &[AgentStatus],
        messages_routed: u64,
        delivery_failures: u64,
    ) -> Self {
        let mut agent_counts: HashMap<String, usize> = HashMap::new();
        for status in statuses {
            *agent_counts.entry(status.as_db_str().to_string()).or_insert(0) += 1;
        }

        // Starting counts as healthy: the agent is on its way up, not lost.
        let healthy = statuses
            .iter()
            .filter(|s| s.is_running() || **s == AgentStatus::Starting)
            .count();
        let status = if statuses.is_empty() || healthy == 0 {
            HealthStatus::Offline
        } else if healthy == statuses.len() {
            HealthStatus::Online
        } else {
            HealthStatus::Degraded
        };

        Self {
            status,
            registered_agents: statuses.len(),
            agent_counts,
            messages_routed,
            delivery_failures,
            checked_at: Utc::now(),
        }
    }

    /// Count of agents currently in the given status.
    pub fn count_of(&self, status: AgentStatus) -> usize {
        self.agent_counts
            .get(status.as_db_str())
            .copied()
            .unwrap_or(0)
    }
}
