//! VALET Service - Composition Root
//!
//! Wires the memory store, the language model client, the orchestrator and
//! the four standard agents into one `AssistantService`. User text enters
//! through `process_message`, which correlates the eventual reply back to
//! the caller through the gateway pseudo-agent.

mod gateway;
pub mod service;
pub mod telemetry;

pub use service::AssistantService;
pub use telemetry::init_tracing;
