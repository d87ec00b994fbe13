//! VALET Orchestrator - Central Message Router
//!
//! The orchestrator owns the agent registry and every message moves through
//! it. Agents hand it an `AgentEndpoint` at registration time; from then on
//! the orchestrator validates recipients, fans messages out to agent inboxes,
//! records routing decisions in shared memory, and broadcasts `RouterEvent`s
//! for observers. A background poller watches aggregate health.

pub mod endpoint;
pub mod events;
pub mod router;

pub use endpoint::AgentEndpoint;
pub use events::RouterEvent;
pub use router::Orchestrator;
