//! Agent state and lifecycle types.

use crate::identity::Timestamp;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// Workload delta applied while a handler runs.
///
/// A crude load indicator, not a concurrency counter: each agent handles one
/// message at a time, so workload moves in steps of this size.
pub const WORKLOAD_STEP: i32 = 10;

/// Maximum workload value.
pub const WORKLOAD_MAX: i32 = 100;

// ============================================================================
// AGENT TYPE
// ============================================================================

/// Role of an agent in the system.
///
/// Informational only: used for logging and introspection, never for routing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AgentType {
    /// Chat handling
    Conversation,
    /// Work distribution across agents
    Coordinator,
    /// Personal task management
    Task,
    /// Research and information gathering
    Research,
    /// Pseudo-agent fronting an external caller
    Gateway,
}

impl AgentType {
    /// Convert to database string representation.
    pub fn as_db_str(&self) -> &'static str {
        match self {
            AgentType::Conversation => "Conversation",
            AgentType::Coordinator => "Coordinator",
            AgentType::Task => "Task",
            AgentType::Research => "Research",
            AgentType::Gateway => "Gateway",
        }
    }

    /// Parse from database string representation.
    pub fn from_db_str(s: &str) -> Result<Self, AgentTypeParseError> {
        match s.to_lowercase().as_str() {
            "conversation" => Ok(AgentType::Conversation),
            "coordinator" => Ok(AgentType::Coordinator),
            "task" => Ok(AgentType::Task),
            "research" => Ok(AgentType::Research),
            "gateway" => Ok(AgentType::Gateway),
            _ => Err(AgentTypeParseError(s.to_string())),
        }
    }
}

impl fmt::Display for AgentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_db_str())
    }
}

impl FromStr for AgentType {
    type Err = AgentTypeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_db_str(s)
    }
}

/// Error when parsing an invalid agent type string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentTypeParseError(pub String);

impl fmt::Display for AgentTypeParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Invalid agent type: {}", self.0)
    }
}

impl std::error::Error for AgentTypeParseError {}

// ============================================================================
// AGENT STATUS
// ============================================================================

/// Agent lifecycle status.
///
/// Transitions: `Offline → Starting → Idle ⇄ Busy → Offline`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum AgentStatus {
    /// Not running; initial and terminal state
    #[default]
    Offline,
    /// Initialized, message loop not yet running
    Starting,
    /// Running and waiting for messages
    Idle,
    /// Running a message handler
    Busy,
}

impl AgentStatus {
    /// Convert to database string representation.
    pub fn as_db_str(&self) -> &'static str {
        match self {
            AgentStatus::Offline => "Offline",
            AgentStatus::Starting => "Starting",
            AgentStatus::Idle => "Idle",
            AgentStatus::Busy => "Busy",
        }
    }

    /// Whether an agent in this status may accept `start`.
    pub fn can_start(&self) -> bool {
        matches!(self, AgentStatus::Offline | AgentStatus::Starting)
    }

    /// Whether the agent is running (loop alive).
    pub fn is_running(&self) -> bool {
        matches!(self, AgentStatus::Idle | AgentStatus::Busy)
    }
}

impl fmt::Display for AgentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_db_str())
    }
}

// ============================================================================
// AGENT STATE
// ============================================================================

/// Mutable per-agent record.
///
/// Owned exclusively by its agent behind a lock; external readers get a
/// deep clone so internal maps are never shared.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentState {
    /// Current lifecycle status
    pub status: AgentStatus,
    /// Free-text description of in-flight work; empty when idle
    pub current_task: String,
    /// Clamped 0-100 busyness indicator
    pub workload: i32,
    /// Ordered capability strings
    pub capabilities: Vec<String>,
    /// Last time this agent did anything observable
    pub last_activity: Timestamp,
    /// Open metadata bag
    pub metadata: HashMap<String, serde_json::Value>,
}

impl AgentState {
    /// Create a fresh offline state with the given capabilities.
    pub fn new(capabilities: Vec<String>) -> Self {
        Self {
            status: AgentStatus::Offline,
            current_task: String::new(),
            workload: 0,
            capabilities,
            last_activity: Utc::now(),
            metadata: HashMap::new(),
        }
    }

    /// Enter a handler: mark busy and bump workload, clamped to the maximum.
    pub fn begin_work(&mut self, task: impl Into<String>) {
        self.status = AgentStatus::Busy;
        self.current_task = task.into();
        self.workload = (self.workload + WORKLOAD_STEP).min(WORKLOAD_MAX);
        self.touch();
    }

    /// Leave a handler: return to idle and release workload, clamped to zero.
    pub fn finish_work(&mut self) {
        self.status = AgentStatus::Idle;
        self.current_task.clear();
        self.workload = (self.workload - WORKLOAD_STEP).max(0);
        self.touch();
    }

    /// Update the last-activity timestamp.
    pub fn touch(&mut self) {
        self.last_activity = Utc::now();
    }

    /// Whether the agent advertises the given capability.
    pub fn has_capability(&self, capability: &str) -> bool {
        self.capabilities.iter().any(|c| c == capability)
    }
}

// ============================================================================
// TESTS
// ============================================================================


#[cfg(test)]
mod property_tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// Property: workload stays within 0..=100 under any begin/finish
        /// interleaving, and a balanced pair restores the prior value.
        #[test]
        fn prop_workload_bounded(ops in prop::collection::vec(any::<bool>(), 0..200)) {
            let mut state = AgentState::new(vec![]);
            for begin in ops {
                if begin {
                    state.begin_work("w");
                } else {
                    state.finish_work();
                }
                prop_assert!(state.workload >= 0);
                prop_assert!(state.workload <= WORKLOAD_MAX);
            }
        }

        /// Property: begin then finish returns workload to its prior value
        /// whenever the prior value is below the clamp ceiling.
        #[test]
        fn prop_workload_balanced_round_trip(start in 0..(WORKLOAD_MAX - WORKLOAD_STEP)) {
            let mut state = AgentState::new(vec![]);
            state.workload = start;
            state.begin_work("w");
            state.finish_work();
            prop_assert_eq!(state.workload, start);
        }
    }
}
