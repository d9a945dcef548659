//! Session configuration.
//!
//! Every section has defaults, so an empty JSON object is a complete
//! configuration:
//!
//! ```rust
//! use parley_agent::SessionConfig;
//!
//! let config = SessionConfig::from_json(r#"{"seed": 7, "search": {"candidates": 50}}"#).unwrap();
//! assert_eq!(config.seed, Some(7));
//! assert_eq!(config.search.candidates, 50);
//! assert_eq!(config.search.elite_capacity, 100);
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::annealing::AnnealingConfig;
use crate::concession::ConcessionConfig;
use crate::deadline::DeadlineConfig;
use crate::error::{AgentError, Result};
use crate::index::IndexConfig;
use crate::opponent::OpponentConfig;
use crate::search::SearchConfig;

/// All tunables of one negotiation session.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Seed of the session PRNG; `None` seeds from entropy.
    pub seed: Option<u64>,
    /// Concession schedule and acceptance thresholds.
    pub concession: ConcessionConfig,
    /// Elite Nash-bid search.
    pub search: SearchConfig,
    /// Annealing refinement.
    pub annealing: AnnealingConfig,
    /// Opponent modelling.
    pub opponent: OpponentConfig,
    /// Outcome-space index.
    pub index: IndexConfig,
    /// Deadline prediction.
    pub deadline: DeadlineConfig,
}

impl SessionConfig {
    /// Parses a configuration from JSON. Missing fields take their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::Configuration`] if the JSON is malformed.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| AgentError::config(format!("malformed JSON: {e}")))
    }

    /// Loads a configuration from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::Configuration`] if the file cannot be read or parsed.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .map_err(|e| AgentError::config(format!("cannot read {}: {e}", path.display())))?;
        Self::from_json(&contents)
    }

    /// Serializes the configuration as pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::Configuration`] if serialization fails.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| AgentError::config(format!("cannot serialize: {e}")))
    }

    /// Checks every section.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::Configuration`] naming the first bad field.
    pub fn validate(&self) -> Result<()> {
        self.concession.validate()?;
        self.search.validate()?;
        self.annealing.validate()?;

        if self.opponent.weight_window == Some(0) {
            return Err(AgentError::config("opponent.weight_window must be greater than 0"));
        }
        if self.index.max_enumerated == 0 && self.index.sample_size == 0 {
            return Err(AgentError::config(
                "index.sample_size must be greater than 0 when enumeration is disabled",
            ));
        }
        if let Some(after) = self.deadline.estimate_after {
            if !(after > 0.0 && after <= 1.0) {
                return Err(AgentError::config(format!(
                    "deadline.estimate_after must be within (0, 1], got {after}"
                )));
            }
        }
        Ok(())
    }
}
