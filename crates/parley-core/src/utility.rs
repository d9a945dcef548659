//! Additive utility models.
//!
//! A [`UtilityModel`] assigns every issue a weight (weights sum to 1) and every
//! value a score in [0, 1] whose per-issue maximum is 1. The utility of a bid
//! is the weighted sum of the scores of its values.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::bid::Bid;
use crate::domain::{Domain, IssueId, ValueId};

/// Weight and value scores of a single issue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IssueEvaluator {
    weight: f64,
    scores: BTreeMap<ValueId, f64>,
}

impl IssueEvaluator {
    /// Returns the issue weight.
    #[must_use]
    pub const fn weight(&self) -> f64 {
        self.weight
    }

    /// Returns the score of `value`; values without a score count as 0.
    #[must_use]
    pub fn score(&self, value: &ValueId) -> f64 {
        self.scores.get(value).copied().unwrap_or(0.0)
    }

    /// Returns the largest value score of this issue.
    #[must_use]
    pub fn max_score(&self) -> f64 {
        self.scores.values().copied().fold(0.0, f64::max)
    }
}

/// Additive scoring function over the issues of a domain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UtilityModel {
    issues: BTreeMap<IssueId, IssueEvaluator>,
}

impl UtilityModel {
    /// Builds a model from unnormalized weights and scores.
    ///
    /// Weights are divided by their sum; when nothing positive is given every
    /// issue gets `1 / N`. Each issue's scores are divided by that issue's
    /// largest score, so the best value scores exactly 1 unless every score of
    /// the issue is 0. Negative and non-finite inputs count as 0, and values
    /// unknown to `domain` are dropped.
    #[must_use]
    pub fn from_parts(
        domain: &Domain,
        weights: &BTreeMap<IssueId, f64>,
        scores: &BTreeMap<IssueId, BTreeMap<ValueId, f64>>,
    ) -> Self {
        let raw_weights: Vec<f64> = domain
            .issues()
            .iter()
            .map(|issue| sanitize(weights.get(&issue.id).copied().unwrap_or(0.0)))
            .collect();
        let total: f64 = raw_weights.iter().sum();
        let uniform = 1.0 / domain.len() as f64;

        let issues = domain
            .issues()
            .iter()
            .zip(raw_weights)
            .map(|(issue, raw)| {
                let weight = if total > 0.0 { raw / total } else { uniform };

                let raw_scores: BTreeMap<ValueId, f64> = scores
                    .get(&issue.id)
                    .into_iter()
                    .flatten()
                    .filter(|(value, _)| issue.contains(value))
                    .map(|(value, score)| (value.clone(), sanitize(*score)))
                    .collect();
                let max = raw_scores.values().copied().fold(0.0, f64::max);
                let divisor = if max > 0.0 { max } else { 1.0 };
                let scores = raw_scores
                    .into_iter()
                    .map(|(value, score)| (value, score / divisor))
                    .collect();

                (issue.id.clone(), IssueEvaluator { weight, scores })
            })
            .collect();

        Self { issues }
    }

    /// Uniform weights and zero scores: every bid has utility 0.
    #[must_use]
    pub fn uniform(domain: &Domain) -> Self {
        Self::from_parts(domain, &BTreeMap::new(), &BTreeMap::new())
    }

    /// Returns the utility of `bid` in [0, 1].
    ///
    /// Issues the bid does not cover, and values without a score, contribute 0.
    #[must_use]
    pub fn utility(&self, bid: &Bid) -> f64 {
        let total: f64 = self
            .issues
            .iter()
            .filter_map(|(issue, evaluator)| {
                bid.value(issue)
                    .map(|value| evaluator.weight * evaluator.score(value))
            })
            .sum();
        total.clamp(0.0, 1.0)
    }

    /// Returns the weight of `issue`, 0 for unknown issues.
    #[must_use]
    pub fn weight(&self, issue: &IssueId) -> f64 {
        self.issues.get(issue).map_or(0.0, IssueEvaluator::weight)
    }

    /// Returns the score of `value` for `issue`, 0 when absent.
    #[must_use]
    pub fn score(&self, issue: &IssueId, value: &ValueId) -> f64 {
        self.issues
            .get(issue)
            .map_or(0.0, |evaluator| evaluator.score(value))
    }

    /// Returns the evaluator of `issue`.
    #[must_use]
    pub fn evaluator(&self, issue: &IssueId) -> Option<&IssueEvaluator> {
        self.issues.get(issue)
    }

    /// Iterates evaluators in issue-identifier order.
    pub fn evaluators(&self) -> impl Iterator<Item = (&IssueId, &IssueEvaluator)> {
        self.issues.iter()
    }

    /// Returns true if every score is 0, i.e. the model cannot tell bids apart.
    #[must_use]
    pub fn is_flat(&self) -> bool {
        self.issues
            .values()
            .all(|evaluator| evaluator.max_score() == 0.0)
    }

    /// Returns the bid maximizing this model over `domain`.
    ///
    /// The model is additive, so picking the best-scoring value of every issue
    /// is exact. Ties go to the value declared first.
    #[must_use]
    pub fn best_bid(&self, domain: &Domain) -> Bid {
        self.extreme_bid(domain, |candidate, current| candidate > current)
    }

    /// Returns the bid minimizing this model over `domain`.
    #[must_use]
    pub fn worst_bid(&self, domain: &Domain) -> Bid {
        self.extreme_bid(domain, |candidate, current| candidate < current)
    }

    fn extreme_bid(&self, domain: &Domain, better: impl Fn(f64, f64) -> bool) -> Bid {
        let values = domain
            .issues()
            .iter()
            .filter_map(|issue| {
                let mut candidates = issue.values().iter();
                let first = candidates.next()?;
                let mut chosen = (first, self.score(&issue.id, first));
                for value in candidates {
                    let score = self.score(&issue.id, value);
                    if better(score, chosen.1) {
                        chosen = (value, score);
                    }
                }
                Some((issue.id.clone(), chosen.0.clone()))
            })
            .collect();
        Bid::from_values(values)
    }
}

fn sanitize(raw: f64) -> f64 {
    if raw.is_finite() && raw > 0.0 { raw } else { 0.0 }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Issue;
    use proptest::prelude::*;

    fn domain() -> Domain {
        Domain::new(vec![
            Issue::discrete("colour", ["red", "green", "blue"]),
            Issue::discrete("size", ["s", "l"]),
        ])
        .unwrap()
    }

    fn scores(entries: &[(&str, &[(&str, f64)])]) -> BTreeMap<IssueId, BTreeMap<ValueId, f64>> {
        entries
            .iter()
            .map(|(issue, values)| {
                (
                    IssueId::from(*issue),
                    values
                        .iter()
                        .map(|(value, score)| (ValueId::from(*value), *score))
                        .collect(),
                )
            })
            .collect()
    }

    #[test]
    fn from_parts_normalizes_weights_and_scores() {
        let domain = domain();
        let weights: BTreeMap<IssueId, f64> =
            [("colour".into(), 3.0), ("size".into(), 1.0)].into_iter().collect();
        let scores = scores(&[
            ("colour", &[("red", 4.0), ("green", 2.0)]),
            ("size", &[("s", 1.0), ("l", 5.0)]),
        ]);
        let model = UtilityModel::from_parts(&domain, &weights, &scores);

        assert!((model.weight(&"colour".into()) - 0.75).abs() < 1e-12);
        assert!((model.weight(&"size".into()) - 0.25).abs() < 1e-12);
        assert_eq!(model.score(&"colour".into(), &"red".into()), 1.0);
        assert_eq!(model.score(&"colour".into(), &"green".into()), 0.5);
        assert_eq!(model.score(&"colour".into(), &"blue".into()), 0.0);
        assert_eq!(model.score(&"size".into(), &"l".into()), 1.0);

        let bid = domain.bid([("colour", "green"), ("size", "l")]).unwrap();
        assert!((model.utility(&bid) - (0.75 * 0.5 + 0.25)).abs() < 1e-12);
    }

    #[test]
    fn from_parts_falls_back_to_uniform_weights() {
        let domain = domain();
        let model = UtilityModel::from_parts(&domain, &BTreeMap::new(), &BTreeMap::new());
        assert_eq!(model.weight(&"colour".into()), 0.5);
        assert_eq!(model.weight(&"size".into()), 0.5);
        assert!(model.is_flat());
    }

    #[test]
    fn uniform_model_scores_every_bid_zero() {
        let domain = domain();
        let model = UtilityModel::uniform(&domain);
        for bid in domain.outcomes() {
            assert_eq!(model.utility(&bid), 0.0);
        }
    }

    #[test]
    fn best_and_worst_bid_are_extremes() {
        let domain = domain();
        let weights: BTreeMap<IssueId, f64> =
            [("colour".into(), 1.0), ("size".into(), 1.0)].into_iter().collect();
        let scores = scores(&[
            ("colour", &[("red", 1.0), ("green", 3.0), ("blue", 2.0)]),
            ("size", &[("s", 2.0), ("l", 1.0)]),
        ]);
        let model = UtilityModel::from_parts(&domain, &weights, &scores);

        let best = model.best_bid(&domain);
        let worst = model.worst_bid(&domain);
        for bid in domain.outcomes() {
            assert!(model.utility(&bid) <= model.utility(&best));
            assert!(model.utility(&bid) >= model.utility(&worst));
        }
        assert_eq!(best.value(&"colour".into()), Some(&ValueId::from("green")));
        assert_eq!(worst.value(&"size".into()), Some(&ValueId::from("l")));
    }

    #[test]
    fn unknown_values_are_dropped() {
        let domain = domain();
        let scores = scores(&[("colour", &[("purple", 9.0), ("red", 1.0)])]);
        let model = UtilityModel::from_parts(&domain, &BTreeMap::new(), &scores);
        assert_eq!(model.score(&"colour".into(), &"red".into()), 1.0);
        assert_eq!(model.score(&"colour".into(), &"purple".into()), 0.0);
    }

    proptest! {
        #[test]
        fn utility_is_bounded_and_weights_sum_to_one(
            w_colour in -1.0f64..10.0,
            w_size in -1.0f64..10.0,
            red in 0.0f64..10.0,
            green in 0.0f64..10.0,
            small in 0.0f64..10.0,
        ) {
            let domain = domain();
            let weights: BTreeMap<IssueId, f64> =
                [("colour".into(), w_colour), ("size".into(), w_size)].into_iter().collect();
            let scores = scores(&[
                ("colour", &[("red", red), ("green", green)]),
                ("size", &[("s", small)]),
            ]);
            let model = UtilityModel::from_parts(&domain, &weights, &scores);

            let sum: f64 = model.evaluators().map(|(_, e)| e.weight()).sum();
            prop_assert!((sum - 1.0).abs() < 1e-9);
            for bid in domain.outcomes() {
                let u = model.utility(&bid);
                prop_assert!((0.0..=1.0).contains(&u));
            }
        }
    }
}
