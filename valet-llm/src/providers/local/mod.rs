//! Locally hosted OpenAI-compatible completion provider.

pub mod client;
pub mod types;

pub use client::LocalCompletionClient;
