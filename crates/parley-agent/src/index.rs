//! Utility-sorted index over the outcome space.
//!
//! The index is built once per session from the self [`UtilityModel`] and
//! answers "which bid has a self-utility closest to `x`" with a binary search.
//! Small outcome spaces are enumerated exactly. Larger ones are represented by
//! a uniform random sample plus the model's best bid; lookups on a sampled
//! index are biased toward the regions the sample happened to cover densely.

use std::collections::BTreeSet;

use parley_core::{Bid, Domain, UtilityModel};
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Settings for building a [`BidIndex`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    /// Largest outcome space that is enumerated exactly.
    pub max_enumerated: u64,
    /// Number of random bids drawn when the space is too large to enumerate.
    pub sample_size: usize,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            max_enumerated: 200_000,
            sample_size: 20_000,
        }
    }
}

/// A bid together with its self-utility.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndexedBid {
    /// The bid.
    pub bid: Bid,
    /// Self-utility of the bid.
    pub utility: f64,
}

/// Bids of the outcome space sorted by ascending self-utility.
#[derive(Debug, Clone)]
pub struct BidIndex {
    entries: Vec<IndexedBid>,
    sampled: bool,
}

impl BidIndex {
    /// Builds the index for `domain` under `model`.
    ///
    /// `rng` is only drawn from when the outcome space exceeds
    /// [`IndexConfig::max_enumerated`].
    pub fn build<R: Rng + ?Sized>(
        domain: &Domain,
        model: &UtilityModel,
        config: &IndexConfig,
        rng: &mut R,
    ) -> Self {
        let size = domain.outcome_count();
        let enumerable = size.is_some_and(|count| count <= config.max_enumerated);

        let bids: Vec<Bid> = if enumerable {
            domain.outcomes().collect()
        } else {
            warn!(
                outcome_space = ?size,
                sample_size = config.sample_size,
                "outcome space too large to enumerate, indexing a random sample"
            );
            let mut sample: BTreeSet<Bid> = (0..config.sample_size)
                .map(|_| domain.random_bid(rng))
                .collect();
            sample.insert(model.best_bid(domain));
            sample.into_iter().collect()
        };

        let mut entries: Vec<IndexedBid> = bids
            .into_iter()
            .map(|bid| IndexedBid {
                utility: model.utility(&bid),
                bid,
            })
            .collect();
        entries.sort_by(|a, b| a.utility.total_cmp(&b.utility).then_with(|| a.bid.cmp(&b.bid)));

        debug!(entries = entries.len(), sampled = !enumerable, "bid index built");

        Self {
            entries,
            sampled: !enumerable,
        }
    }

    /// Returns the indexed bid whose utility is closest to `target`.
    ///
    /// Equidistant neighbours resolve to the higher-utility one, so the answer
    /// depends only on the index and `target`. Returns `None` only for an
    /// empty index.
    #[must_use]
    pub fn nearest_utility(&self, target: f64) -> Option<&IndexedBid> {
        let split = self.entries.partition_point(|entry| entry.utility < target);
        let above = self.entries.get(split);
        let below = split.checked_sub(1).and_then(|i| self.entries.get(i));

        match (below, above) {
            (Some(low), Some(high)) => {
                if target - low.utility < high.utility - target {
                    Some(low)
                } else {
                    Some(high)
                }
            }
            (low, high) => high.or(low),
        }
    }

    /// Returns the highest-utility indexed bid.
    #[must_use]
    pub fn best(&self) -> Option<&IndexedBid> {
        self.entries.last()
    }

    /// Returns the lowest-utility indexed bid.
    #[must_use]
    pub fn worst(&self) -> Option<&IndexedBid> {
        self.entries.first()
    }

    /// Iterates entries in ascending utility order.
    pub fn iter(&self) -> impl Iterator<Item = &IndexedBid> {
        self.entries.iter()
    }

    /// Returns the number of indexed bids.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if nothing is indexed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns true if the index holds a sample rather than the whole space.
    #[must_use]
    pub const fn is_sampled(&self) -> bool {
        self.sampled
    }
}
