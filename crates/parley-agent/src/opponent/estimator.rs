//! The two interchangeable opponent estimators.
//!
//! Both turn an opponent's bid history into a [`UtilityModel`]. A session picks
//! one at construction time and uses it for every opponent.

use std::collections::BTreeMap;

use parley_core::{Bid, Domain, IssueId, UtilityModel, ValueId};
use serde::{Deserialize, Serialize};

use super::change_counts;

/// Estimation variant for opponent preferences.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OpponentEstimator {
    /// Issues the opponent changes less often weigh more; value scores are
    /// `count / max_count` per issue.
    #[default]
    FrequencyRatio,
    /// Issues and values are ranked by observed frequency and weighted by rank.
    RankBased,
}

impl OpponentEstimator {
    /// Builds a model from the full history and its per-value counts.
    pub(crate) fn estimate(
        self,
        domain: &Domain,
        history: &[Bid],
        counts: &BTreeMap<IssueId, BTreeMap<ValueId, usize>>,
        weight_window: Option<usize>,
    ) -> UtilityModel {
        match self {
            Self::FrequencyRatio => frequency_ratio(domain, history, counts, weight_window),
            Self::RankBased => rank_based(domain, counts),
        }
    }
}

fn frequency_ratio(
    domain: &Domain,
    history: &[Bid],
    counts: &BTreeMap<IssueId, BTreeMap<ValueId, usize>>,
    weight_window: Option<usize>,
) -> UtilityModel {
    let window_len = weight_window.map_or(history.len(), |w| w.min(history.len()));
    let window = &history[history.len() - window_len..];
    let changes = change_counts(domain.issues().iter().map(|issue| &issue.id), window);

    let issue_count = domain.len() as f64;
    let weights: BTreeMap<IssueId, f64> = if window.is_empty() {
        BTreeMap::new()
    } else {
        changes
            .into_iter()
            .map(|(issue, changed)| {
                let steady = window.len().saturating_sub(changed + 1) as f64;
                (issue, 1.0 / issue_count + steady / 10.0)
            })
            .collect()
    };

    let scores = counts
        .iter()
        .map(|(issue, values)| {
            let values = values
                .iter()
                .map(|(value, &count)| (value.clone(), count as f64))
                .collect();
            (issue.clone(), values)
        })
        .collect();

    UtilityModel::from_parts(domain, &weights, &scores)
}

fn rank_based(
    domain: &Domain,
    counts: &BTreeMap<IssueId, BTreeMap<ValueId, usize>>,
) -> UtilityModel {
    let max_count = |issue: &IssueId| {
        counts
            .get(issue)
            .and_then(|values| values.values().copied().max())
            .unwrap_or(0)
    };

    // Stable sort keeps declaration order among issues with equal peaks.
    let mut ranked: Vec<&IssueId> = domain.issues().iter().map(|issue| &issue.id).collect();
    ranked.sort_by_key(|issue| std::cmp::Reverse(max_count(*issue)));

    let n = ranked.len() as f64;
    let weights: BTreeMap<IssueId, f64> = ranked
        .into_iter()
        .enumerate()
        .map(|(position, issue)| {
            let rank_points = n - position as f64;
            (issue.clone(), 2.0 * rank_points / (n * (n + 1.0)))
        })
        .collect();

    let scores = counts
        .iter()
        .map(|(issue, values)| {
            let observed: Vec<usize> = values.values().copied().filter(|&c| c > 0).collect();
            let ranks = values
                .iter()
                .filter(|&(_, &count)| count > 0)
                .map(|(value, &count)| {
                    let below = observed.iter().filter(|&&other| other < count).count();
                    (value.clone(), (below + 1) as f64)
                })
                .collect();
            (issue.clone(), ranks)
        })
        .collect();

    UtilityModel::from_parts(domain, &weights, &scores)
}
