//! Simulated-annealing refinement toward fair, jointly good bids.
//!
//! Starting from the self-best bid, each step changes the value of one random
//! issue and scores the result with
//!
//! ```text
//! E(bid) = u · p + a / max(ε, |u − p|)
//! ```
//!
//! where `u` is the self-utility and `p` the product of every opponent's
//! predicted utility, each jittered by ±`jitter` to model estimation error.
//! Only moves that keep `u` above the concession target are considered.
//! Improving moves are always taken; worse ones with probability
//! `exp(ΔE / T)` for `T = T0 · α^k`.
//!
//! The search only runs once every opponent profile is statistically
//! reliable: on every issue the spread between the most and least frequent
//! value counts must reach a relative threshold.

use parley_core::{Bid, Domain, UtilityModel};
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{AgentError, Result};
use crate::opponent::{OpponentModel, OpponentProfile};

/// Settings of the annealing refinement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnnealingConfig {
    /// Whether annealing is attempted at all.
    pub enabled: bool,
    /// Session time from which annealing may run.
    pub start_time: f64,
    /// Iteration budget per turn.
    pub iterations: usize,
    /// Initial temperature `T0`.
    pub initial_temperature: f64,
    /// Geometric cooling ratio `α`.
    pub cooling: f64,
    /// Weight `a` of the fairness term.
    pub fairness_weight: f64,
    /// Lower bound `ε` on the utility gap in the fairness term.
    pub fairness_epsilon: f64,
    /// Relative jitter applied to predicted opponent utilities.
    pub jitter: f64,
    /// Minimum relative count spread per issue for a profile to be trusted.
    pub reliability_threshold: f64,
}

impl Default for AnnealingConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            start_time: 0.7,
            iterations: 4000,
            initial_temperature: 26.0,
            cooling: 0.1,
            fairness_weight: 0.3,
            fairness_epsilon: 0.01,
            jitter: 0.1,
            reliability_threshold: 0.2,
        }
    }
}

impl AnnealingConfig {
    /// Checks ranges.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::Configuration`] naming the first bad field.
    pub fn validate(&self) -> Result<()> {
        let unit = [
            ("annealing.start_time", self.start_time),
            ("annealing.cooling", self.cooling),
            ("annealing.jitter", self.jitter),
            ("annealing.reliability_threshold", self.reliability_threshold),
        ];
        for (name, value) in unit {
            if !(0.0..=1.0).contains(&value) {
                return Err(AgentError::config(format!("{name} must be within [0, 1], got {value}")));
            }
        }
        if !(self.initial_temperature.is_finite() && self.initial_temperature >= 0.0) {
            return Err(AgentError::config(format!(
                "annealing.initial_temperature must be non-negative, got {}",
                self.initial_temperature
            )));
        }
        if !(self.fairness_weight.is_finite() && self.fairness_weight >= 0.0) {
            return Err(AgentError::config(format!(
                "annealing.fairness_weight must be non-negative, got {}",
                self.fairness_weight
            )));
        }
        if !(self.fairness_epsilon.is_finite() && self.fairness_epsilon > 0.0) {
            return Err(AgentError::config(format!(
                "annealing.fairness_epsilon must be positive, got {}",
                self.fairness_epsilon
            )));
        }
        Ok(())
    }
}

/// Result of one annealing run.
#[derive(Debug, Clone, PartialEq)]
pub struct AnnealingOutcome {
    /// Best bid found.
    pub bid: Bid,
    /// Its self-utility.
    pub self_utility: f64,
    /// Its energy when it was found.
    pub energy: f64,
    /// Number of accepted moves.
    pub accepted_moves: usize,
    /// True if the best bid does not clear the target.
    pub exhausted: bool,
}

/// Annealing refinement for one session.
#[derive(Debug, Clone, PartialEq)]
pub struct AnnealingSearch {
    config: AnnealingConfig,
}

impl AnnealingSearch {
    /// Creates the search.
    #[must_use]
    pub const fn new(config: AnnealingConfig) -> Self {
        Self { config }
    }

    /// Returns the settings.
    #[must_use]
    pub const fn config(&self) -> &AnnealingConfig {
        &self.config
    }

    /// Returns true if `profile` has a usable count spread on every issue.
    ///
    /// Unobserved values count as zero; an issue with no observations at all
    /// is unreliable.
    #[must_use]
    pub fn is_reliable(&self, profile: &OpponentProfile, domain: &Domain) -> bool {
        domain.issues().iter().all(|issue| {
            let Some(counts) = profile.value_counts(&issue.id) else {
                return false;
            };
            let max = counts.values().copied().max().unwrap_or(0);
            let min = counts.values().copied().min().unwrap_or(0);
            max > 0 && (max - min) as f64 / max as f64 >= self.config.reliability_threshold
        })
    }

    /// Returns true if annealing should replace the elite search at time `t`.
    #[must_use]
    pub fn should_run(&self, t: f64, opponents: &OpponentModel) -> bool {
        self.config.enabled
            && t >= self.config.start_time
            && !opponents.is_empty()
            && opponents
                .profiles()
                .all(|profile| self.is_reliable(profile, opponents.domain()))
    }

    /// Runs the annealing budget and returns the best bid found.
    pub fn run<R: Rng + ?Sized>(
        &self,
        self_model: &UtilityModel,
        opponents: &OpponentModel,
        target: f64,
        rng: &mut R,
    ) -> AnnealingOutcome {
        let domain = opponents.domain();
        let mut current = self_model.best_bid(domain);
        let mut best_utility = self_model.utility(&current);
        let mut best_energy = self.energy(best_utility, self.perturbed(opponents, &current, rng));
        let mut best = current.clone();
        let mut accepted_moves = 0;

        for k in 0..self.config.iterations {
            let temperature = self.temperature(k);
            let current_utility = self_model.utility(&current);
            let current_energy =
                self.energy(current_utility, self.perturbed(opponents, &current, rng));

            let candidate = mutate(domain, &current, rng);
            let utility = self_model.utility(&candidate);
            let energy = self.energy(utility, self.perturbed(opponents, &candidate, rng));

            if utility <= target {
                continue;
            }

            let delta = energy - current_energy;
            let take = delta > 0.0
                || (temperature > 0.0 && (delta / temperature).exp() > rng.r#gen::<f64>());
            if take {
                accepted_moves += 1;
                if energy > best_energy {
                    best_energy = energy;
                    best_utility = utility;
                    best = candidate.clone();
                }
                current = candidate;
            }
        }

        debug!(
            accepted_moves,
            energy = best_energy,
            self_utility = best_utility,
            "annealing finished"
        );

        AnnealingOutcome {
            bid: best,
            self_utility: best_utility,
            energy: best_energy,
            accepted_moves,
            exhausted: best_utility <= target,
        }
    }

    /// `T0 · α^k`.
    #[must_use]
    pub fn temperature(&self, k: usize) -> f64 {
        let exponent = i32::try_from(k).unwrap_or(i32::MAX);
        self.config.initial_temperature * self.config.cooling.powi(exponent)
    }

    /// Joint-gain plus fairness energy for self-utility `u` and opponent term `p`.
    #[must_use]
    pub fn energy(&self, u: f64, p: f64) -> f64 {
        u * p + self.config.fairness_weight / (u - p).abs().max(self.config.fairness_epsilon)
    }

    fn perturbed<R: Rng + ?Sized>(&self, opponents: &OpponentModel, bid: &Bid, rng: &mut R) -> f64 {
        opponents
            .profiles()
            .map(|profile| {
                let predicted = profile.utility(bid);
                let sign = if rng.gen_bool(0.5) { 1.0 } else { -1.0 };
                predicted * (1.0 + sign * self.config.jitter)
            })
            .product()
    }
}

/// Replaces the value of one random issue with a random value of that issue.
fn mutate<R: Rng + ?Sized>(domain: &Domain, bid: &Bid, rng: &mut R) -> Bid {
    let issues = domain.issues();
    if issues.is_empty() {
        return bid.clone();
    }
    let issue = &issues[rng.gen_range(0..issues.len())];
    let values = issue.values();
    if values.is_empty() {
        return bid.clone();
    }
    let value = values[rng.gen_range(0..values.len())].clone();
    bid.with_value(&issue.id, value)
}
