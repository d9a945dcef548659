//! Error types for parley-agent.

use parley_core::CoreError;
use thiserror::Error;

/// Result type for agent operations.
pub type Result<T> = std::result::Result<T, AgentError>;

/// Errors that end a negotiation session before it starts.
///
/// Nothing a turn does produces one of these; per-turn problems degrade to a
/// fallback and surface as [`crate::Warning`]s instead.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AgentError {
    /// Session configuration is out of range or unreadable.
    #[error("invalid configuration: {reason}")]
    Configuration {
        /// Description of why the configuration is invalid.
        reason: String,
    },

    /// The negotiation domain or ranking has an unsupported shape.
    #[error("unsupported domain: {0}")]
    Domain(#[from] CoreError),
}

impl AgentError {
    pub(crate) fn config(reason: impl Into<String>) -> Self {
        Self::Configuration {
            reason: reason.into(),
        }
    }
}
