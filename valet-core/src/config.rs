//! Configuration types

use crate::error::{ConfigError, ValetError, ValetResult};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Router and registry configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    /// Capacity of each agent's bounded inbound queue
    pub message_queue_size: usize,
    /// Capacity of the router event broadcast channel
    pub event_queue_size: usize,
    /// How often the background health poller samples the registry
    pub health_check_interval: Duration,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            message_queue_size: 100,
            event_queue_size: 256,
            health_check_interval: Duration::from_secs(30),
        }
    }
}

impl OrchestratorConfig {
    /// Create from environment variables with fallback to defaults.
    ///
    /// Environment variables:
    /// - `VALET_MESSAGE_QUEUE_SIZE`: Inbound queue capacity per agent (default: 100)
    /// - `VALET_EVENT_QUEUE_SIZE`: Router event channel capacity (default: 256)
    /// - `VALET_HEALTH_CHECK_INTERVAL_SECS`: Health poll interval in seconds (default: 30)
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            message_queue_size: std::env::var("VALET_MESSAGE_QUEUE_SIZE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.message_queue_size),
            event_queue_size: std::env::var("VALET_EVENT_QUEUE_SIZE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.event_queue_size),
            health_check_interval: std::env::var("VALET_HEALTH_CHECK_INTERVAL_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.health_check_interval),
        }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> ValetResult<()> {
        if self.message_queue_size == 0 {
            return Err(ValetError::Config(ConfigError::InvalidValue {
                field: "message_queue_size".to_string(),
                value: self.message_queue_size.to_string(),
                reason: "message_queue_size must be greater than 0".to_string(),
            }));
        }

        if self.event_queue_size == 0 {
            return Err(ValetError::Config(ConfigError::InvalidValue {
                field: "event_queue_size".to_string(),
                value: self.event_queue_size.to_string(),
                reason: "event_queue_size must be greater than 0".to_string(),
            }));
        }

        if self.health_check_interval.is_zero() {
            return Err(ValetError::Config(ConfigError::InvalidValue {
                field: "health_check_interval".to_string(),
                value: format!("{:?}", self.health_check_interval),
                reason: "health_check_interval must be positive".to_string(),
            }));
        }

        Ok(())
    }
}

/// Local completion endpoint configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Base URL of the OpenAI-compatible completion server
    pub base_url: String,
    /// Model name sent in the request body
    pub model: String,
    /// Sampling temperature
    pub temperature: f32,
    /// Completion token cap per request
    pub max_tokens: u32,
    /// Client-side rate limit
    pub requests_per_minute: u32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            model: "local-model".to_string(),
            temperature: 0.7,
            max_tokens: 512,
            requests_per_minute: 60,
        }
    }
}

impl LlmConfig {
    /// Create from environment variables with fallback to defaults.
    ///
    /// Environment variables:
    /// - `VALET_LLM_BASE_URL`: Completion server base URL (default: http://localhost:8000)
    /// - `VALET_LLM_MODEL`: Model name (default: local-model)
    /// - `VALET_LLM_TEMPERATURE`: Sampling temperature (default: 0.7)
    /// - `VALET_LLM_MAX_TOKENS`: Completion token cap (default: 512)
    /// - `VALET_LLM_REQUESTS_PER_MINUTE`: Client-side rate limit (default: 60)
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            base_url: std::env::var("VALET_LLM_BASE_URL").unwrap_or(defaults.base_url),
            model: std::env::var("VALET_LLM_MODEL").unwrap_or(defaults.model),
            temperature: std::env::var("VALET_LLM_TEMPERATURE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.temperature),
            max_tokens: std::env::var("VALET_LLM_MAX_TOKENS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.max_tokens),
            requests_per_minute: std::env::var("VALET_LLM_REQUESTS_PER_MINUTE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.requests_per_minute),
        }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> ValetResult<()> {
        if self.base_url.is_empty() {
            return Err(ValetError::Config(ConfigError::MissingRequired {
                field: "base_url".to_string(),
            }));
        }

        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err(ValetError::Config(ConfigError::InvalidValue {
                field: "base_url".to_string(),
                value: self.base_url.clone(),
                reason: "base_url must be an http or https URL".to_string(),
            }));
        }

        if self.model.is_empty() {
            return Err(ValetError::Config(ConfigError::MissingRequired {
                field: "model".to_string(),
            }));
        }

        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(ValetError::Config(ConfigError::InvalidValue {
                field: "temperature".to_string(),
                value: self.temperature.to_string(),
                reason: "temperature must be between 0.0 and 2.0".to_string(),
            }));
        }

        if self.max_tokens == 0 {
            return Err(ValetError::Config(ConfigError::InvalidValue {
                field: "max_tokens".to_string(),
                value: self.max_tokens.to_string(),
                reason: "max_tokens must be greater than 0".to_string(),
            }));
        }

        if self.requests_per_minute == 0 {
            return Err(ValetError::Config(ConfigError::InvalidValue {
                field: "requests_per_minute".to_string(),
                value: self.requests_per_minute.to_string(),
                reason: "requests_per_minute must be greater than 0".to_string(),
            }));
        }

        Ok(())
    }
}

/// Top-level service configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceConfig {
    pub orchestrator: OrchestratorConfig,
    pub llm: LlmConfig,
    /// How long the gateway waits for a correlated reply
    pub reply_timeout: Duration,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            orchestrator: OrchestratorConfig::default(),
            llm: LlmConfig::default(),
            reply_timeout: Duration::from_secs(30),
        }
    }
}

impl ServiceConfig {
    /// Create from environment variables with fallback to defaults.
    ///
    /// Composes [`OrchestratorConfig::from_env`] and [`LlmConfig::from_env`];
    /// `VALET_REPLY_TIMEOUT_SECS` sets the gateway reply timeout (default: 30).
    pub fn from_env() -> Self {
        Self {
            orchestrator: OrchestratorConfig::from_env(),
            llm: LlmConfig::from_env(),
            reply_timeout: std::env::var("VALET_REPLY_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(Duration::from_secs(30)),
        }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> ValetResult<()> {
        self.orchestrator.validate()?;
        self.llm.validate()?;

        if self.reply_timeout.is_zero() {
            return Err(ValetError::Config(ConfigError::InvalidValue {
                field: "reply_timeout".to_string(),
                value: format!("{:?}", self.reply_timeout),
                reason: "reply_timeout must be positive".to_string(),
            }));
        }

        Ok(())
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_orchestrator_defaults_valid() {
        let config = OrchestratorConfig::default();
        assert_eq!(config.message_queue_size, 100);
        assert_eq!(config.event_queue_size, 256);
        assert_eq!(config.health_check_interval, Duration::from_secs(30));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_orchestrator_rejects_zero_queue() {
        let config = OrchestratorConfig {
            message_queue_size: 0,
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert!(matches!(
            err,
            ValetError::Config(ConfigError::InvalidValue { ref field, .. })
                if field == "message_queue_size"
        ));
    }

    #[test]
    fn test_llm_defaults_valid() {
        let config = LlmConfig::default();
        assert_eq!(config.base_url, "http://localhost:8000");
        assert_eq!(config.requests_per_minute, 60);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_llm_rejects_bad_base_url() {
        let config = LlmConfig {
            base_url: "localhost:8000".to_string(),
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert!(matches!(
            err,
            ValetError::Config(ConfigError::InvalidValue { ref field, .. })
                if field == "base_url"
        ));
    }

    #[test]
    fn test_llm_rejects_out_of_range_temperature() {
        let config = LlmConfig {
            temperature: 3.5,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_service_defaults_valid() {
        let config = ServiceConfig::default();
        assert_eq!(config.reply_timeout, Duration::from_secs(30));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_service_from_env_uses_defaults_without_vars() {
        let config = ServiceConfig::from_env();
        assert_eq!(config.orchestrator.message_queue_size, 100);
        assert_eq!(config.reply_timeout, Duration::from_secs(30));
        assert!(config.validate().is_ok());
    }
}
