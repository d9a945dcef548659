//! Time-dependent concession schedule.
//!
//! The acceptable utility stays near the ceiling for most of the session and
//! collapses toward the reservation value only in the last stretch:
//!
//! ```text
//! acceptable(t) = max(reservation, log10(1 - t) / factor(t) + ceiling)
//! ```
//!
//! `factor(t)` is large (slow concession) early on. Past the late-phase
//! boundary it drops, and drops further when some opponent is measurably
//! rigid, so the agent yields faster against hard-headed opponents.

use serde::{Deserialize, Serialize};

use crate::error::{AgentError, Result};
use crate::opponent::HardHeadedness;

/// Concession schedule and acceptance thresholds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConcessionConfig {
    /// Floor below which nothing is offered or accepted voluntarily.
    pub reservation_value: f64,
    /// Fraction of the session during which the anchor bid is always offered.
    pub opening_window: f64,
    /// Acceptable utility at t = 0.
    pub ceiling: f64,
    /// Time from which the late conceding factors apply.
    pub late_phase_start: f64,
    /// Conceding factor before the late phase.
    pub early_factor: f64,
    /// Late-phase factor when some opponent is rigid.
    pub rigid_opponent_factor: f64,
    /// Late-phase factor otherwise.
    pub late_factor: f64,
    /// Window (in rounds) for measuring opponent hard-headedness.
    pub hardheaded_rounds: usize,
    /// Hard-headedness above which an opponent counts as rigid.
    pub hardheaded_threshold: f64,
    /// Utility that is always accepted during the endgame.
    pub must_accept_floor: f64,
    /// Number of rounds before the predicted deadline that form the endgame.
    pub endgame_rounds: u64,
    /// Time from which any valid standing offer is accepted.
    pub panic_time: Option<f64>,
}

impl Default for ConcessionConfig {
    fn default() -> Self {
        Self {
            reservation_value: 0.4,
            opening_window: 0.2,
            ceiling: 0.9,
            late_phase_start: 0.96,
            early_factor: 20.0,
            rigid_opponent_factor: 7.0,
            late_factor: 10.0,
            hardheaded_rounds: 40,
            hardheaded_threshold: 0.6,
            must_accept_floor: 0.5,
            endgame_rounds: 10,
            panic_time: None,
        }
    }
}

impl ConcessionConfig {
    /// Checks ranges.
    ///
    /// # Errors
    ///
    /// Returns [`crate::AgentError::Configuration`] naming the first bad field.
    pub fn validate(&self) -> Result<()> {
        let unit = [
            ("concession.reservation_value", self.reservation_value),
            ("concession.opening_window", self.opening_window),
            ("concession.ceiling", self.ceiling),
            ("concession.late_phase_start", self.late_phase_start),
            ("concession.hardheaded_threshold", self.hardheaded_threshold),
            ("concession.must_accept_floor", self.must_accept_floor),
        ];
        for (name, value) in unit {
            if !(0.0..=1.0).contains(&value) {
                return Err(AgentError::config(format!("{name} must be within [0, 1], got {value}")));
            }
        }

        let factors = [
            ("concession.early_factor", self.early_factor),
            ("concession.rigid_opponent_factor", self.rigid_opponent_factor),
            ("concession.late_factor", self.late_factor),
        ];
        for (name, value) in factors {
            if !(value.is_finite() && value > 0.0) {
                return Err(AgentError::config(format!("{name} must be positive, got {value}")));
            }
        }

        if let Some(panic) = self.panic_time {
            if !(0.0..=1.0).contains(&panic) {
                return Err(AgentError::config(format!(
                    "concession.panic_time must be within [0, 1], got {panic}"
                )));
            }
        }

        Ok(())
    }
}

/// Evaluates the concession schedule for a session.
#[derive(Debug, Clone, PartialEq)]
pub struct ConcessionStrategy {
    config: ConcessionConfig,
}

impl ConcessionStrategy {
    /// Creates the strategy.
    #[must_use]
    pub const fn new(config: ConcessionConfig) -> Self {
        Self { config }
    }

    /// Returns the settings.
    #[must_use]
    pub const fn config(&self) -> &ConcessionConfig {
        &self.config
    }

    /// Returns the reservation value.
    #[must_use]
    pub const fn reservation_value(&self) -> f64 {
        self.config.reservation_value
    }

    /// Conceding factor at time `t`. Larger means slower concession.
    ///
    /// `hard_headedness` is the largest value measured over all opponents;
    /// [`HardHeadedness::NotYetAvailable`] never counts as rigid.
    #[must_use]
    pub fn conceding_factor(&self, t: f64, hard_headedness: HardHeadedness) -> f64 {
        if t < self.config.late_phase_start {
            return self.config.early_factor;
        }
        match hard_headedness {
            HardHeadedness::Measured(value) if value > self.config.hardheaded_threshold => {
                self.config.rigid_opponent_factor
            }
            _ => self.config.late_factor,
        }
    }

    /// Lowest self-utility the agent offers or accepts at time `t`.
    ///
    /// Always at least the reservation value; `t` is clamped to [0, 1].
    #[must_use]
    pub fn acceptable_utility(&self, t: f64, hard_headedness: HardHeadedness) -> f64 {
        let t = t.clamp(0.0, 1.0);
        let factor = self.conceding_factor(t, hard_headedness);
        self.curve(t, factor)
    }

    /// The concession curve for a fixed factor.
    #[must_use]
    pub fn curve(&self, t: f64, factor: f64) -> f64 {
        let t = t.clamp(0.0, 1.0);
        let conceded = (1.0 - t).log10() / factor + self.config.ceiling;
        // log10(0) is -inf, so t = 1 lands exactly on the reservation value.
        conceded.max(self.config.reservation_value)
    }

    /// Returns true while the opening anchor must be offered.
    #[must_use]
    pub fn in_opening_window(&self, t: f64) -> bool {
        t < self.config.opening_window
    }

    /// Returns true during the final rounds before the predicted deadline.
    ///
    /// Without a prediction there is no endgame.
    #[must_use]
    pub fn is_endgame(&self, round: u64, predicted_total: Option<u64>) -> bool {
        predicted_total.is_some_and(|total| total.saturating_sub(round) < self.config.endgame_rounds)
    }

    /// Returns true once any standing offer should be taken.
    #[must_use]
    pub fn is_panic(&self, t: f64) -> bool {
        self.config.panic_time.is_some_and(|panic| t >= panic)
    }

    /// Decides whether a standing offer worth `standing` should be accepted.
    ///
    /// Accepts when it is at least as good as the bid about to be offered,
    /// when it beats `target`, when the endgame floor is cleared, or when the
    /// panic time has passed.
    #[must_use]
    pub fn should_accept(&self, standing: f64, next_offer: f64, target: f64, endgame: bool, t: f64) -> bool {
        standing >= next_offer
            || standing > target
            || (endgame && standing >= self.config.must_accept_floor)
            || self.is_panic(t)
    }
}
