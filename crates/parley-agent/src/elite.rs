//! Bounded cache of the best bids found so far.
//!
//! Entries are kept in ascending Nash-score order. When the cache is full a
//! new bid only gets in by beating the current minimum, which is evicted.
//! Scores drift as the opponent model learns, so the owner periodically calls
//! [`EliteCache::rescore`].

use parley_core::Bid;
use rand::Rng;
use serde::Serialize;

/// One cached bid and its Nash score.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EliteEntry {
    /// The bid.
    pub bid: Bid,
    /// Self utility times every opponent's predicted utility.
    pub nash: f64,
}

/// What an insertion did to the cache.
#[derive(Debug, Clone, PartialEq)]
pub enum Insertion {
    /// Added without evicting anything.
    Inserted,
    /// Added after evicting the previous minimum.
    Replaced {
        /// The evicted entry.
        evicted: EliteEntry,
    },
    /// The bid was already cached; its score was raised.
    Updated,
    /// Not added: full and not better than the minimum, or a duplicate
    /// with a lower score.
    Rejected,
}

/// Fixed-capacity, ascending-sorted set of elite bids.
#[derive(Debug, Clone, PartialEq)]
pub struct EliteCache {
    capacity: usize,
    entries: Vec<EliteEntry>,
}

impl EliteCache {
    /// Creates an empty cache holding at most `capacity` bids.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: Vec::with_capacity(capacity),
        }
    }

    /// Offers `bid` with score `nash` to the cache.
    ///
    /// A bid already in the cache keeps the larger of its two scores.
    pub fn insert(&mut self, bid: Bid, nash: f64) -> Insertion {
        if let Some(position) = self.entries.iter().position(|entry| entry.bid == bid) {
            if nash.total_cmp(&self.entries[position].nash).is_gt() {
                self.entries.remove(position);
                self.place(EliteEntry { bid, nash });
                return Insertion::Updated;
            }
            return Insertion::Rejected;
        }

        if self.entries.len() < self.capacity {
            self.place(EliteEntry { bid, nash });
            return Insertion::Inserted;
        }

        match self.entries.first() {
            Some(min) if nash.total_cmp(&min.nash).is_gt() => {
                let evicted = self.entries.remove(0);
                self.place(EliteEntry { bid, nash });
                Insertion::Replaced { evicted }
            }
            _ => Insertion::Rejected,
        }
    }

    fn place(&mut self, entry: EliteEntry) {
        let at = self
            .entries
            .partition_point(|existing| Self::order(existing, &entry).is_lt());
        self.entries.insert(at, entry);
    }

    fn order(a: &EliteEntry, b: &EliteEntry) -> std::cmp::Ordering {
        a.nash.total_cmp(&b.nash).then_with(|| a.bid.cmp(&b.bid))
    }

    /// Recomputes every score with `score` and restores the sort order.
    pub fn rescore(&mut self, mut score: impl FnMut(&Bid) -> f64) {
        for entry in &mut self.entries {
            entry.nash = score(&entry.bid);
        }
        self.entries.sort_by(Self::order);
    }

    /// Iterates the `k` highest-scoring entries, best first.
    pub fn top(&self, k: usize) -> impl Iterator<Item = &EliteEntry> {
        self.entries.iter().rev().take(k)
    }

    /// Picks one of the `k` highest-scoring entries uniformly at random.
    pub fn pick_top<R: Rng + ?Sized>(&self, k: usize, rng: &mut R) -> Option<&EliteEntry> {
        let available = k.min(self.entries.len());
        if available == 0 {
            return None;
        }
        let offset = rng.gen_range(0..available);
        self.top(available).nth(offset)
    }

    /// Returns the highest-scoring entry.
    #[must_use]
    pub fn best(&self) -> Option<&EliteEntry> {
        self.entries.last()
    }

    /// Returns the lowest cached score.
    #[must_use]
    pub fn min_score(&self) -> Option<f64> {
        self.entries.first().map(|entry| entry.nash)
    }

    /// Iterates entries in ascending score order.
    pub fn iter(&self) -> impl Iterator<Item = &EliteEntry> {
        self.entries.iter()
    }

    /// Returns the number of cached bids.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the cache holds nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns true once the cache holds `capacity` bids.
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.entries.len() >= self.capacity
    }

    /// Returns the capacity.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }
}
