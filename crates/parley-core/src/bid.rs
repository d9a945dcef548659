//! Bids and ordinal bid rankings.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::domain::{Domain, IssueId, ValueId};
use crate::error::CoreError;

/// One fully-specified choice of value per issue.
///
/// Bids built through [`Domain::bid`] or [`Domain::outcomes`] are guaranteed
/// to cover every issue exactly once. Bids that arrive from elsewhere (for
/// example deserialized from a peer) can be checked with
/// [`Domain::validate_bid`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Bid {
    values: BTreeMap<IssueId, ValueId>,
}

impl Bid {
    pub(crate) fn from_values(values: BTreeMap<IssueId, ValueId>) -> Self {
        Self { values }
    }

    /// Returns the value chosen for `issue`.
    #[must_use]
    pub fn value(&self, issue: &IssueId) -> Option<&ValueId> {
        self.values.get(issue)
    }

    /// Iterates `(issue, value)` pairs in issue-identifier order.
    pub fn iter(&self) -> impl Iterator<Item = (&IssueId, &ValueId)> {
        self.values.iter()
    }

    /// Returns the number of issues covered.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns true if the bid covers no issue.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Returns a copy of this bid with `issue` set to `value`.
    #[must_use]
    pub fn with_value(&self, issue: &IssueId, value: ValueId) -> Self {
        let mut values = self.values.clone();
        values.insert(issue.clone(), value);
        Self { values }
    }

    /// Counts the issues on which two bids choose different values.
    #[must_use]
    pub fn differences(&self, other: &Self) -> usize {
        self.values
            .iter()
            .filter(|(issue, value)| other.value(issue) != Some(*value))
            .count()
    }
}

/// An externally supplied ordering of bids, least-preferred first.
///
/// Rankings may repeat bids and are usually far shorter than the outcome space.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BidRanking {
    bids: Vec<Bid>,
}

impl BidRanking {
    /// Creates a ranking from bids in ascending preference order.
    #[must_use]
    pub fn new(bids: Vec<Bid>) -> Self {
        Self { bids }
    }

    /// Returns the bids, least-preferred first.
    #[must_use]
    pub fn bids(&self) -> &[Bid] {
        &self.bids
    }

    /// Returns the number of ranked bids, duplicates included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bids.len()
    }

    /// Returns true if nothing is ranked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bids.is_empty()
    }

    /// Returns the most preferred bid.
    #[must_use]
    pub fn best(&self) -> Option<&Bid> {
        self.bids.last()
    }

    /// Returns the least preferred bid.
    #[must_use]
    pub fn worst(&self) -> Option<&Bid> {
        self.bids.first()
    }

    /// Checks every ranked bid against `domain`.
    ///
    /// # Errors
    ///
    /// Returns the first [`CoreError`] found.
    pub fn validate(&self, domain: &Domain) -> Result<(), CoreError> {
        self.bids.iter().try_for_each(|bid| domain.validate_bid(bid))
    }
}
