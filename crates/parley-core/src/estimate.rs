//! Self-preference estimation from an ordinal bid ranking.
//!
//! The ranking carries no cardinal utilities. Each ranked bid is awarded
//! points equal to its position (0 for the least preferred, then 1, 2, …;
//! repeated bids still advance the counter) and every `(issue, value)` pair in
//! the bid accumulates those points. Per issue the accumulated points are
//! scaled so the best value scores 1, and issue weights are proportional to the
//! best value's raw points ("normalize by max value").

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::bid::BidRanking;
use crate::domain::{Domain, IssueId, ValueId};
use crate::error::CoreError;
use crate::utility::UtilityModel;

/// Quality of an estimated model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum EstimateStatus {
    /// The ranking carried enough signal to build the model.
    Complete,
    /// The ranking carried no usable signal; the model is the uniform, all-zero fallback.
    Degraded {
        /// Why the estimate fell back.
        reason: String,
    },
}

impl EstimateStatus {
    /// Returns true for [`EstimateStatus::Degraded`].
    #[must_use]
    pub const fn is_degraded(&self) -> bool {
        matches!(self, Self::Degraded { .. })
    }
}

/// The agent's own utility model together with its estimation status.
#[derive(Debug, Clone, PartialEq)]
pub struct SelfEstimate {
    /// Estimated model.
    pub model: UtilityModel,
    /// Whether the model is trustworthy.
    pub status: EstimateStatus,
}

/// Estimates the agent's own utility model from `ranking`.
///
/// An empty ranking, or one whose points are all zero (a single bid), yields
/// the uniform fallback flagged as [`EstimateStatus::Degraded`].
///
/// # Errors
///
/// Returns [`CoreError`] if a ranked bid does not belong to `domain`.
pub fn estimate_self_model(domain: &Domain, ranking: &BidRanking) -> Result<SelfEstimate, CoreError> {
    ranking.validate(domain)?;

    if ranking.is_empty() {
        warn!("bid ranking is empty, falling back to a flat self model");
        return Ok(degraded(domain, "bid ranking is empty"));
    }

    let mut raw: BTreeMap<IssueId, BTreeMap<ValueId, f64>> = BTreeMap::new();
    for (position, bid) in ranking.bids().iter().enumerate() {
        let points = position as f64;
        for (issue, value) in bid.iter() {
            *raw.entry(issue.clone())
                .or_default()
                .entry(value.clone())
                .or_insert(0.0) += points;
        }
    }

    let weights: BTreeMap<IssueId, f64> = raw
        .iter()
        .map(|(issue, values)| (issue.clone(), values.values().copied().fold(0.0, f64::max)))
        .collect();

    if weights.values().all(|&max| max <= 0.0) {
        warn!(
            ranked = ranking.len(),
            "bid ranking carries no preference signal, falling back to a flat self model"
        );
        return Ok(degraded(domain, "bid ranking carries no preference signal"));
    }

    let model = UtilityModel::from_parts(domain, &weights, &raw);
    debug!(
        ranked = ranking.len(),
        issues = domain.len(),
        "estimated self model from bid ranking"
    );

    Ok(SelfEstimate {
        model,
        status: EstimateStatus::Complete,
    })
}

fn degraded(domain: &Domain, reason: &str) -> SelfEstimate {
    SelfEstimate {
        model: UtilityModel::uniform(domain),
        status: EstimateStatus::Degraded {
            reason: reason.to_string(),
        },
    }
}
