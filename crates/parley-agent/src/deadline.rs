//! Deadline prediction in rounds.
//!
//! The protocol only reports normalized time. The endgame rule needs to know
//! how many rounds remain, which a [`DeadlineEstimator`] guesses from the
//! rounds played so far.

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Settings of the built-in [`RoundRateEstimator`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeadlineConfig {
    /// Time at which the round rate is sampled; `None` disables the estimator.
    pub estimate_after: Option<f64>,
}

/// Predicts the total number of rounds in the session.
pub trait DeadlineEstimator: std::fmt::Debug + Send {
    /// Returns the predicted total round count after `rounds` rounds at time `t`,
    /// or `None` while no prediction is available.
    fn predicted_total_rounds(&mut self, rounds: u64, t: f64) -> Option<u64>;
}

/// Extrapolates `rounds / t` once, at the first turn with `t ≥ estimate_after`.
///
/// The prediction is frozen after that turn.
#[derive(Debug, Clone, PartialEq)]
pub struct RoundRateEstimator {
    estimate_after: f64,
    prediction: Option<u64>,
}

impl RoundRateEstimator {
    /// Creates an estimator that samples at `estimate_after`.
    #[must_use]
    pub const fn new(estimate_after: f64) -> Self {
        Self {
            estimate_after,
            prediction: None,
        }
    }

    /// Returns the frozen prediction, if made.
    #[must_use]
    pub const fn prediction(&self) -> Option<u64> {
        self.prediction
    }
}

impl DeadlineEstimator for RoundRateEstimator {
    fn predicted_total_rounds(&mut self, rounds: u64, t: f64) -> Option<u64> {
        if self.prediction.is_none() && t >= self.estimate_after && t > 0.0 {
            let total = (rounds as f64 / t).ceil() as u64;
            let total = total.max(rounds);
            debug!(rounds, t, predicted_total = total, "deadline predicted");
            self.prediction = Some(total);
        }
        self.prediction
    }
}
