//! Per-opponent preference learning from observed offers.
//!
//! Every opponent gets an [`OpponentProfile`] on first contact. The profile
//! keeps the append-only history of bids the opponent offered and recomputes
//! a [`UtilityModel`] from it after each observation, using the
//! [`OpponentEstimator`] chosen for the session.
//!
//! - [`OpponentModel`] — the table of profiles for one session
//! - [`OpponentProfile`] — history, value counts and derived model of one opponent
//! - [`HardHeadedness`] — how rarely an opponent has moved recently

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use parley_core::{Bid, CoreError, Domain, IssueId, UtilityModel, ValueId};
use serde::{Deserialize, Serialize};
use tracing::debug;

mod estimator;


pub use estimator::OpponentEstimator;

/// Opaque identity of a negotiation opponent, as supplied by the protocol.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OpponentId(Arc<str>);

impl OpponentId {
    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for OpponentId {
    fn from(value: &str) -> Self {
        Self(Arc::from(value))
    }
}

impl From<String> for OpponentId {
    fn from(value: String) -> Self {
        Self(Arc::from(value))
    }
}

impl fmt::Display for OpponentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// How rarely an opponent changed its offered values over a recent window.
///
/// `Measured(1.0)` means no issue changed at all; `Measured(0.0)` means every
/// issue changed every round. `NotYetAvailable` is "no opinion" and must never
/// be read as zero.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HardHeadedness {
    /// Not enough history to say anything.
    NotYetAvailable,
    /// Measured value in [0, 1].
    Measured(f64),
}

impl HardHeadedness {
    /// Returns the measured value, if any.
    #[must_use]
    pub const fn value(self) -> Option<f64> {
        match self {
            Self::NotYetAvailable => None,
            Self::Measured(value) => Some(value),
        }
    }

    /// Returns true if a value was measured.
    #[must_use]
    pub const fn is_available(self) -> bool {
        matches!(self, Self::Measured(_))
    }
}

/// Settings of the opponent model.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OpponentConfig {
    /// Estimation variant used for every opponent of the session.
    pub estimator: OpponentEstimator,
    /// Trailing window (in bids) for issue-weight change counting; `None` uses the whole history.
    pub weight_window: Option<usize>,
}

/// Everything learned about one opponent.
#[derive(Debug, Clone, PartialEq)]
pub struct OpponentProfile {
    id: OpponentId,
    history: Vec<Bid>,
    counts: BTreeMap<IssueId, BTreeMap<ValueId, usize>>,
    model: UtilityModel,
}

impl OpponentProfile {
    fn new(id: OpponentId, domain: &Domain) -> Self {
        let counts = domain
            .issues()
            .iter()
            .map(|issue| {
                let values = issue.values().iter().map(|value| (value.clone(), 0)).collect();
                (issue.id.clone(), values)
            })
            .collect();

        Self {
            id,
            history: Vec::new(),
            counts,
            model: UtilityModel::uniform(domain),
        }
    }

    fn observe(&mut self, bid: Bid, domain: &Domain, config: &OpponentConfig) {
        for (issue, value) in bid.iter() {
            if let Some(count) = self
                .counts
                .get_mut(issue)
                .and_then(|values| values.get_mut(value))
            {
                *count += 1;
            }
        }
        self.history.push(bid);
        self.model = config
            .estimator
            .estimate(domain, &self.history, &self.counts, config.weight_window);
    }

    /// Returns the opponent identity.
    #[must_use]
    pub const fn id(&self) -> &OpponentId {
        &self.id
    }

    /// Returns every observed bid, oldest first.
    #[must_use]
    pub fn history(&self) -> &[Bid] {
        &self.history
    }

    /// Returns the most recent observed bid.
    #[must_use]
    pub fn last_bid(&self) -> Option<&Bid> {
        self.history.last()
    }

    /// Returns the derived utility model.
    #[must_use]
    pub const fn model(&self) -> &UtilityModel {
        &self.model
    }

    /// Predicted opponent utility of `bid`, in [0, 1]. Unseen values contribute 0.
    #[must_use]
    pub fn utility(&self, bid: &Bid) -> f64 {
        self.model.utility(bid)
    }

    /// Returns how often each value of `issue` was offered, zero counts included.
    #[must_use]
    pub fn value_counts(&self, issue: &IssueId) -> Option<&BTreeMap<ValueId, usize>> {
        self.counts.get(issue)
    }

    /// Measures hard-headedness over the trailing `rounds` rounds.
    ///
    /// Counts value changes between consecutive bids of the trailing
    /// `min(rounds + 1, |history|)` bids and returns
    /// `1 − changes / (issues × transitions)`. Returns
    /// [`HardHeadedness::NotYetAvailable`] when the history is shorter than
    /// `rounds` or the window holds no transition.
    #[must_use]
    pub fn hard_headedness(&self, rounds: usize) -> HardHeadedness {
        if rounds == 0 || self.history.len() < rounds {
            return HardHeadedness::NotYetAvailable;
        }

        let window_len = (rounds + 1).min(self.history.len());
        let transitions = window_len - 1;
        if transitions == 0 || self.counts.is_empty() {
            return HardHeadedness::NotYetAvailable;
        }

        let window = &self.history[self.history.len() - window_len..];
        let changes: usize = change_counts(self.counts.keys(), window).values().sum();
        let possible = (self.counts.len() * transitions) as f64;

        HardHeadedness::Measured(1.0 - changes as f64 / possible)
    }
}

/// Counts, per issue, how many consecutive bids in `window` differ on it.
pub(crate) fn change_counts<'a>(
    issues: impl Iterator<Item = &'a IssueId>,
    window: &[Bid],
) -> BTreeMap<IssueId, usize> {
    issues
        .map(|issue| {
            let changes = window
                .windows(2)
                .filter(|pair| pair[0].value(issue) != pair[1].value(issue))
                .count();
            (issue.clone(), changes)
        })
        .collect()
}

/// Opponent profiles of one negotiation session.
#[derive(Debug, Clone)]
pub struct OpponentModel {
    domain: Domain,
    config: OpponentConfig,
    profiles: BTreeMap<OpponentId, OpponentProfile>,
}

impl OpponentModel {
    /// Creates an empty model over `domain`.
    #[must_use]
    pub fn new(domain: Domain, config: OpponentConfig) -> Self {
        Self {
            domain,
            config,
            profiles: BTreeMap::new(),
        }
    }

    /// Records that `opponent` offered `bid` and refreshes its profile.
    ///
    /// The profile is created on first contact.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError`] if `bid` does not belong to the domain; the
    /// profile is left untouched.
    pub fn observe(&mut self, opponent: OpponentId, bid: Bid) -> Result<&OpponentProfile, CoreError> {
        self.domain.validate_bid(&bid)?;

        let domain = &self.domain;
        let config = &self.config;
        let profile = self.profiles.entry(opponent.clone()).or_insert_with(|| {
            debug!(opponent = %opponent, "first contact with opponent");
            OpponentProfile::new(opponent, domain)
        });
        profile.observe(bid, domain, config);
        Ok(&*profile)
    }

    /// Returns the profile of `opponent`.
    #[must_use]
    pub fn profile(&self, opponent: &OpponentId) -> Option<&OpponentProfile> {
        self.profiles.get(opponent)
    }

    /// Iterates profiles in opponent-identifier order.
    pub fn profiles(&self) -> impl Iterator<Item = &OpponentProfile> {
        self.profiles.values()
    }

    /// Returns the number of opponents seen so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    /// Returns true if no opponent has been seen.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }

    /// Predicted utility of `bid` for `opponent`; `None` for unknown opponents.
    #[must_use]
    pub fn utility(&self, opponent: &OpponentId, bid: &Bid) -> Option<f64> {
        self.profiles.get(opponent).map(|profile| profile.utility(bid))
    }

    /// Hard-headedness of `opponent`; unknown opponents have none yet.
    #[must_use]
    pub fn hard_headedness(&self, opponent: &OpponentId, rounds: usize) -> HardHeadedness {
        self.profiles
            .get(opponent)
            .map_or(HardHeadedness::NotYetAvailable, |profile| {
                profile.hard_headedness(rounds)
            })
    }

    /// The largest measured hard-headedness over all opponents.
    #[must_use]
    pub fn max_hard_headedness(&self, rounds: usize) -> HardHeadedness {
        self.profiles
            .values()
            .filter_map(|profile| profile.hard_headedness(rounds).value())
            .reduce(f64::max)
            .map_or(HardHeadedness::NotYetAvailable, HardHeadedness::Measured)
    }

    /// Product of every opponent's predicted utility of `bid`; 1 with no opponents.
    #[must_use]
    pub fn utility_product(&self, bid: &Bid) -> f64 {
        self.profiles
            .values()
            .map(|profile| profile.utility(bid))
            .product()
    }

    /// Returns the domain the model was built over.
    #[must_use]
    pub const fn domain(&self) -> &Domain {
        &self.domain
    }
}
