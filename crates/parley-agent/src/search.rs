//! Nash-product bid search with an elite cache.
//!
//! Each non-opening turn the generator draws candidate bids above the current
//! target by rejection sampling against the [`BidIndex`], scores them by
//! `self_utility × Π opponent_utility`, and keeps the maximizer. Winners feed
//! an [`EliteCache`]; once the cache is full the generator offers one of its
//! top entries at random instead of the fresh winner.

use std::cmp::Ordering;

use parley_core::{Bid, UtilityModel};
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::elite::EliteCache;
use crate::error::{AgentError, Result};
use crate::index::{BidIndex, IndexedBid};
use crate::opponent::OpponentModel;

/// Settings of the elite Nash-bid search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Candidates sampled per turn.
    pub candidates: usize,
    /// Index lookups allowed per candidate before giving up on the target.
    pub max_attempts: usize,
    /// Elite cache capacity.
    pub elite_capacity: usize,
    /// Rounds between elite rescoring passes once the cache is full.
    pub rescore_interval: u64,
    /// Number of top elite entries an offer is drawn from.
    pub elite_top: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            candidates: 100,
            max_attempts: 1000,
            elite_capacity: 100,
            rescore_interval: 20,
            elite_top: 5,
        }
    }
}

impl SearchConfig {
    /// Checks that every bound is usable.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::Configuration`] for a zero bound.
    pub fn validate(&self) -> Result<()> {
        let bounds = [
            ("search.candidates", self.candidates),
            ("search.max_attempts", self.max_attempts),
            ("search.elite_capacity", self.elite_capacity),
            ("search.elite_top", self.elite_top),
        ];
        for (name, value) in bounds {
            if value == 0 {
                return Err(AgentError::config(format!("{name} must be greater than 0")));
            }
        }
        if self.rescore_interval == 0 {
            return Err(AgentError::config("search.rescore_interval must be greater than 0"));
        }
        Ok(())
    }
}

/// Where an offered bid came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProposalSource {
    /// The opening anchor.
    Opening,
    /// This turn's best fresh candidate.
    Fresh,
    /// Drawn from the top of the elite cache.
    Elite,
    /// Found by simulated annealing.
    Annealing,
    /// No search result; the self-best bid.
    Fallback,
}

/// A bid drawn by [`BidGenerator::acceptable_random_bid`].
#[derive(Debug, Clone, PartialEq)]
pub struct SampledBid {
    /// The bid.
    pub bid: Bid,
    /// Its self-utility.
    pub utility: f64,
    /// True if no lookup cleared the minimum and this is the best one seen.
    pub exhausted: bool,
}

/// The generator's choice for one turn.
#[derive(Debug, Clone, PartialEq)]
pub struct Proposal {
    /// Bid to offer.
    pub bid: Bid,
    /// Its self-utility.
    pub self_utility: f64,
    /// Its Nash score under the current opponent model.
    pub nash: f64,
    /// Where it came from.
    pub source: ProposalSource,
    /// True if some candidate could not be drawn above the target.
    pub exhausted: bool,
}

/// Per-session bid generator.
#[derive(Debug, Clone)]
pub struct BidGenerator {
    config: SearchConfig,
    elite: EliteCache,
}

impl BidGenerator {
    /// Creates a generator with an empty elite cache.
    #[must_use]
    pub fn new(config: SearchConfig) -> Self {
        let elite = EliteCache::new(config.elite_capacity);
        Self { config, elite }
    }

    /// Returns the elite cache.
    #[must_use]
    pub const fn elite(&self) -> &EliteCache {
        &self.elite
    }

    /// Returns the settings.
    #[must_use]
    pub const fn config(&self) -> &SearchConfig {
        &self.config
    }

    /// Draws a bid whose self-utility exceeds `min`.
    ///
    /// Each attempt draws `u ~ Uniform(min, 1)` and looks up the indexed bid
    /// nearest to `u`. After [`SearchConfig::max_attempts`] misses the
    /// highest-utility bid seen is returned with `exhausted` set. Returns
    /// `None` only for an empty index.
    pub fn acceptable_random_bid<R: Rng + ?Sized>(
        &self,
        index: &BidIndex,
        min: f64,
        rng: &mut R,
    ) -> Option<SampledBid> {
        let span = (1.0 - min).max(0.0);
        let mut best: Option<&IndexedBid> = None;

        for _ in 0..self.config.max_attempts {
            let draw = min + rng.r#gen::<f64>() * span;
            let entry = index.nearest_utility(draw)?;
            if entry.utility > min {
                return Some(SampledBid {
                    bid: entry.bid.clone(),
                    utility: entry.utility,
                    exhausted: false,
                });
            }
            if best.is_none_or(|current| entry.utility > current.utility) {
                best = Some(entry);
            }
        }

        best.or_else(|| index.best()).map(|entry| SampledBid {
            bid: entry.bid.clone(),
            utility: entry.utility,
            exhausted: true,
        })
    }

    /// Chooses this turn's offer for `target`.
    ///
    /// `round` is the 1-based turn counter used to schedule elite rescoring.
    /// Returns `None` only when nothing could be drawn at all.
    pub fn propose<R: Rng + ?Sized>(
        &mut self,
        round: u64,
        target: f64,
        self_model: &UtilityModel,
        index: &BidIndex,
        opponents: &OpponentModel,
        rng: &mut R,
    ) -> Option<Proposal> {
        let mut exhausted = false;
        let mut winner: Option<(SampledBid, f64)> = None;

        for _ in 0..self.config.candidates {
            let Some(sample) = self.acceptable_random_bid(index, target, rng) else {
                break;
            };
            exhausted |= sample.exhausted;
            let nash = sample.utility * opponents.utility_product(&sample.bid);
            let better = winner
                .as_ref()
                .is_none_or(|(current, current_nash)| {
                    rank(nash, &sample, *current_nash, current) == Ordering::Greater
                });
            if better {
                winner = Some((sample, nash));
            }
        }

        let (fresh, fresh_nash) = winner?;
        if exhausted {
            warn!(target, best_utility = fresh.utility, "no candidate cleared the target");
        }

        if self.elite.is_full() && round % self.config.rescore_interval == 0 {
            debug!(round, entries = self.elite.len(), "rescoring elite cache");
            self.elite
                .rescore(|bid| self_model.utility(bid) * opponents.utility_product(bid));
        }
        self.elite.insert(fresh.bid.clone(), fresh_nash);

        if self.elite.is_full() {
            if let Some(entry) = self.elite.pick_top(self.config.elite_top, rng) {
                return Some(Proposal {
                    self_utility: self_model.utility(&entry.bid),
                    bid: entry.bid.clone(),
                    nash: entry.nash,
                    source: ProposalSource::Elite,
                    exhausted,
                });
            }
        }

        Some(Proposal {
            bid: fresh.bid,
            self_utility: fresh.utility,
            nash: fresh_nash,
            source: ProposalSource::Fresh,
            exhausted,
        })
    }
}

/// Total order on candidates: Nash score, then self-utility, then the bid.
fn rank(nash: f64, sample: &SampledBid, other_nash: f64, other: &SampledBid) -> Ordering {
    nash.total_cmp(&other_nash)
        .then_with(|| sample.utility.total_cmp(&other.utility))
        .then_with(|| sample.bid.cmp(&other.bid))
}
