//! Completion provider implementations.
//!
//! Contains the client for a locally hosted OpenAI-compatible endpoint.
//! Remote providers would slot in beside it behind the same trait.

pub mod local;

pub use local::LocalCompletionClient;

use valet_core::{LlmError, ValetError};

pub(crate) fn request_failed(
    provider: &str,
    status: i32,
    message: impl Into<String>,
) -> ValetError {
    ValetError::Llm(LlmError::RequestFailed {
        provider: provider.to_string(),
        status,
        message: message.into(),
    })
}

pub(crate) fn rate_limited(provider: &str, retry_after_ms: i64) -> ValetError {
    ValetError::Llm(LlmError::RateLimited {
        provider: provider.to_string(),
        retry_after_ms,
    })
}

pub(crate) fn invalid_response(provider: &str, reason: impl Into<String>) -> ValetError {
    ValetError::Llm(LlmError::InvalidResponse {
        provider: provider.to_string(),
        reason: reason.into(),
    })
}
