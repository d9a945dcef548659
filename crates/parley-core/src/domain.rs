//! Negotiation domains: issues and their discrete candidate values.
//!
//! Issue and value identifiers are opaque tokens supplied by whoever loads the
//! domain. They are only compared and hashed, never interpreted.

use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::sync::Arc;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::bid::Bid;
use crate::error::CoreError;

/// Stable identifier of a negotiation issue.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IssueId(Arc<str>);

impl IssueId {
    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for IssueId {
    fn from(value: &str) -> Self {
        Self(Arc::from(value))
    }
}

impl From<String> for IssueId {
    fn from(value: String) -> Self {
        Self(Arc::from(value))
    }
}

impl fmt::Display for IssueId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Stable identifier of one candidate value of an issue.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ValueId(Arc<str>);

impl ValueId {
    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ValueId {
    fn from(value: &str) -> Self {
        Self(Arc::from(value))
    }
}

impl From<String> for ValueId {
    fn from(value: String) -> Self {
        Self(Arc::from(value))
    }
}

impl fmt::Display for ValueId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Shape of an issue's value space.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum IssueKind {
    /// An ordered set of discrete candidate values.
    Discrete {
        /// Candidate values in declaration order.
        values: Vec<ValueId>,
    },
    /// A real-valued range. Declared so loaders can describe it, rejected by [`Domain::new`].
    Continuous {
        /// Lower bound.
        low: f64,
        /// Upper bound.
        high: f64,
    },
}

/// A negotiable dimension.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Issue {
    /// Issue identifier.
    pub id: IssueId,
    /// Value space of the issue.
    #[serde(flatten)]
    pub kind: IssueKind,
}

impl Issue {
    /// Creates a discrete issue.
    pub fn discrete<V>(id: impl Into<IssueId>, values: impl IntoIterator<Item = V>) -> Self
    where
        V: Into<ValueId>,
    {
        Self {
            id: id.into(),
            kind: IssueKind::Discrete {
                values: values.into_iter().map(Into::into).collect(),
            },
        }
    }

    /// Creates a continuous issue.
    pub fn continuous(id: impl Into<IssueId>, low: f64, high: f64) -> Self {
        Self {
            id: id.into(),
            kind: IssueKind::Continuous { low, high },
        }
    }

    /// Returns the candidate values, empty for continuous issues.
    #[must_use]
    pub fn values(&self) -> &[ValueId] {
        match &self.kind {
            IssueKind::Discrete { values } => values,
            IssueKind::Continuous { .. } => &[],
        }
    }

    /// Returns true if `value` is one of this issue's candidates.
    #[must_use]
    pub fn contains(&self, value: &ValueId) -> bool {
        self.values().contains(value)
    }
}

/// An immutable, validated set of discrete issues.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Issue>", into = "Vec<Issue>")]
pub struct Domain {
    issues: Vec<Issue>,
}

impl Domain {
    /// Creates a domain from issues in declaration order.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError`] if there are no issues, an issue is continuous or
    /// empty, or identifiers repeat.
    pub fn new(issues: Vec<Issue>) -> Result<Self, CoreError> {
        if issues.is_empty() {
            return Err(CoreError::EmptyDomain);
        }

        let mut seen = HashSet::with_capacity(issues.len());
        for issue in &issues {
            if !seen.insert(issue.id.clone()) {
                return Err(CoreError::DuplicateIssue {
                    issue: issue.id.to_string(),
                });
            }

            let values = match &issue.kind {
                IssueKind::Discrete { values } => values,
                IssueKind::Continuous { .. } => {
                    return Err(CoreError::UnsupportedIssue {
                        issue: issue.id.to_string(),
                    });
                }
            };

            if values.is_empty() {
                return Err(CoreError::EmptyIssue {
                    issue: issue.id.to_string(),
                });
            }

            let mut seen_values = HashSet::with_capacity(values.len());
            for value in values {
                if !seen_values.insert(value) {
                    return Err(CoreError::DuplicateValue {
                        issue: issue.id.to_string(),
                        value: value.to_string(),
                    });
                }
            }
        }

        Ok(Self { issues })
    }

    /// Returns the issues in declaration order.
    #[must_use]
    pub fn issues(&self) -> &[Issue] {
        &self.issues
    }

    /// Looks up an issue by identifier.
    #[must_use]
    pub fn issue(&self, id: &IssueId) -> Option<&Issue> {
        self.issues.iter().find(|issue| &issue.id == id)
    }

    /// Returns the number of issues.
    #[must_use]
    pub fn len(&self) -> usize {
        self.issues.len()
    }

    /// Always false for a validated domain; provided for API symmetry.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }

    /// Returns the size of the outcome space, or `None` if it overflows `u64`.
    #[must_use]
    pub fn outcome_count(&self) -> Option<u64> {
        self.issues
            .iter()
            .try_fold(1u64, |acc, issue| acc.checked_mul(issue.values().len() as u64))
    }

    /// Builds a bid from `(issue, value)` pairs, checking it against the domain.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError`] for unknown issues or values, or if an issue is
    /// left without a value.
    pub fn bid<I, K, V>(&self, pairs: I) -> Result<Bid, CoreError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<IssueId>,
        V: Into<ValueId>,
    {
        let values: BTreeMap<IssueId, ValueId> = pairs
            .into_iter()
            .map(|(issue, value)| (issue.into(), value.into()))
            .collect();
        let bid = Bid::from_values(values);
        self.validate_bid(&bid)?;
        Ok(bid)
    }

    /// Checks that `bid` assigns exactly one known value to every issue.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError`] describing the first problem found.
    pub fn validate_bid(&self, bid: &Bid) -> Result<(), CoreError> {
        for (issue_id, value) in bid.iter() {
            let issue = self.issue(issue_id).ok_or_else(|| CoreError::UnknownIssue {
                issue: issue_id.to_string(),
            })?;
            if !issue.contains(value) {
                return Err(CoreError::UnknownValue {
                    issue: issue_id.to_string(),
                    value: value.to_string(),
                });
            }
        }

        if let Some(missing) = self.issues.iter().find(|issue| bid.value(&issue.id).is_none()) {
            return Err(CoreError::IncompleteBid {
                issue: missing.id.to_string(),
            });
        }

        Ok(())
    }

    /// Enumerates every bid of the outcome space in odometer order.
    #[must_use]
    pub fn outcomes(&self) -> Outcomes<'_> {
        Outcomes {
            domain: self,
            cursor: Some(vec![0; self.issues.len()]),
        }
    }

    /// Draws a bid with every value chosen uniformly at random.
    pub fn random_bid<R: Rng + ?Sized>(&self, rng: &mut R) -> Bid {
        let values = self
            .issues
            .iter()
            .map(|issue| {
                let candidates = issue.values();
                let pick = rng.gen_range(0..candidates.len());
                (issue.id.clone(), candidates[pick].clone())
            })
            .collect();
        Bid::from_values(values)
    }

    fn bid_at(&self, cursor: &[usize]) -> Bid {
        let values = self
            .issues
            .iter()
            .zip(cursor)
            .map(|(issue, &index)| (issue.id.clone(), issue.values()[index].clone()))
            .collect();
        Bid::from_values(values)
    }
}

impl TryFrom<Vec<Issue>> for Domain {
    type Error = CoreError;

    fn try_from(issues: Vec<Issue>) -> Result<Self, Self::Error> {
        Self::new(issues)
    }
}

impl From<Domain> for Vec<Issue> {
    fn from(domain: Domain) -> Self {
        domain.issues
    }
}

/// Iterator over every bid of a [`Domain`].
#[derive(Debug, Clone)]
pub struct Outcomes<'a> {
    domain: &'a Domain,
    cursor: Option<Vec<usize>>,
}

impl Iterator for Outcomes<'_> {
    type Item = Bid;

    fn next(&mut self) -> Option<Bid> {
        let mut cursor = self.cursor.take()?;
        let bid = self.domain.bid_at(&cursor);

        // Advance the last issue first; wrap-around on the first issue ends the walk.
        let mut position = cursor.len();
        while position > 0 {
            position -= 1;
            cursor[position] += 1;
            if cursor[position] < self.domain.issues[position].values().len() {
                self.cursor = Some(cursor);
                break;
            }
            cursor[position] = 0;
        }

        Some(bid)
    }
}
