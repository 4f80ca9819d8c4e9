//! Error types for ROUTEWISE operations
//!
//! Business outcomes such as "no eligible agent" or "low confidence" are
//! decision states, not errors. Only configuration, upstream I/O and the
//! explicit override entry point raise.

use crate::{AgentId, TicketId};
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid value for {field}: {value} - {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Incompatible options: {option_a} and {option_b}")]
    IncompatibleOptions { option_a: String, option_b: String },

    #[error("Failed to parse configuration: {reason}")]
    Parse { reason: String },

    #[error("Failed to read configuration from {path}: {reason}")]
    Io { path: String, reason: String },
}

/// Upstream synchronization errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SyncError {
    #[error("Rate limited during {context} after {attempts} attempts (retry hint: {retry_after_ms:?}ms)")]
    RateLimited {
        context: String,
        attempts: u32,
        retry_after_ms: Option<u64>,
    },

    #[error("Request during {context} failed with status {status}: {message}")]
    RequestFailed {
        context: String,
        status: u16,
        message: String,
    },

    #[error("Transport error during {context}: {reason}")]
    Transport { context: String, reason: String },

    #[error("Invalid response during {context}: {reason}")]
    InvalidResponse { context: String, reason: String },
}

/// Decision engine errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EngineError {
    #[error("Agent not found: {agent_id}")]
    AgentNotFound { agent_id: AgentId },

    #[error("Ticket not found: {ticket_id}")]
    TicketNotFound { ticket_id: TicketId },

    #[error("Invalid override for ticket {ticket_id}: {reason}")]
    InvalidOverride { ticket_id: TicketId, reason: String },
}

/// Master error type for all ROUTEWISE errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RoutewiseError {
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("Sync error: {0}")]
    Sync(#[from] SyncError),

    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),
}

impl RoutewiseError {
    /// True when the error is an exhausted rate limit from upstream.
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, RoutewiseError::Sync(SyncError::RateLimited { .. }))
    }
}

/// Result type alias for ROUTEWISE operations.
pub type RoutewiseResult<T> = Result<T, RoutewiseError>;

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_display_invalid_value() {
        let err = ConfigError::InvalidValue {
            field: "thresholds.suggest".to_string(),
            value: "0.9".to_string(),
            reason: "must be below auto_assign".to_string(),
        };
        let msg = format!("{}", err);
        assert!(msg.contains("thresholds.suggest"));
        assert!(msg.contains("must be below auto_assign"));
    }

    #[test]
    fn test_sync_error_display_rate_limited() {
        let err = SyncError::RateLimited {
            context: "list_agents".to_string(),
            attempts: 6,
            retry_after_ms: Some(2000),
        };
        let msg = format!("{}", err);
        assert!(msg.contains("list_agents"));
        assert!(msg.contains("6 attempts"));
    }

    #[test]
    fn test_engine_error_display_agent_not_found() {
        let err = EngineError::AgentNotFound {
            agent_id: AgentId::new("agent-7"),
        };
        assert_eq!(format!("{}", err), "Agent not found: agent-7");
    }

    #[test]
    fn test_routewise_error_from_variants() {
        let err: RoutewiseError = SyncError::RateLimited {
            context: "get_ticket".to_string(),
            attempts: 1,
            retry_after_ms: None,
        }
        .into();
        assert!(err.is_rate_limited());

        let err: RoutewiseError = ConfigError::Parse {
            reason: "bad toml".to_string(),
        }
        .into();
        assert!(!err.is_rate_limited());
        assert!(matches!(err, RoutewiseError::Config(_)));
    }
}
