//! The per-session negotiation agent.
//!
//! [`NegotiationAgent`] owns every piece of session state: the self model, the
//! opponent table, the outcome index, the elite cache and the PRNG. The
//! protocol drives it with three calls:
//!
//! - [`NegotiationAgent::on_opponent_offer`] after each opponent offer
//! - [`NegotiationAgent::on_opponent_accept`] when an opponent accepts a bid
//! - [`NegotiationAgent::choose_action`] when it is the agent's turn
//!
//! A turn never fails. Degraded inputs fall back to a documented default and
//! are reported as [`Warning`]s on the returned [`Decision`].

use parley_core::{
    estimate_self_model, Bid, BidRanking, Domain, EstimateStatus, Issue, UtilityModel,
};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::annealing::AnnealingSearch;
use crate::concession::ConcessionStrategy;
use crate::config::SessionConfig;
use crate::deadline::{DeadlineEstimator, RoundRateEstimator};
use crate::elite::EliteCache;
use crate::error::{AgentError, Result};
use crate::index::BidIndex;
use crate::opponent::{OpponentId, OpponentModel};
use crate::search::{BidGenerator, ProposalSource};

/// What the agent does on its turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", content = "bid", rename_all = "snake_case")]
pub enum Action {
    /// Accept the standing offer.
    Accept(Bid),
    /// Put a new offer on the table.
    Offer(Bid),
}

impl Action {
    /// Returns the bid accepted or offered.
    #[must_use]
    pub const fn bid(&self) -> &Bid {
        match self {
            Self::Accept(bid) | Self::Offer(bid) => bid,
        }
    }

    /// Returns true for [`Action::Accept`].
    #[must_use]
    pub const fn is_accept(&self) -> bool {
        matches!(self, Self::Accept(_))
    }
}

/// A non-fatal problem encountered while deciding.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Warning {
    /// The self model was built from too little preference signal.
    DegradedModel {
        /// Why the model is degraded.
        reason: String,
    },
    /// A bounded search hit its cap without reaching the target.
    SearchExhausted {
        /// Utility the search aimed above.
        target: f64,
        /// Self-utility of the bid used instead.
        best_utility: f64,
    },
}

/// Outcome of one turn.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Decision {
    /// The action to send.
    pub action: Action,
    /// Problems met on the way; empty on a clean turn.
    pub warnings: Vec<Warning>,
}

/// Decision core of one negotiation session.
#[derive(Debug)]
pub struct NegotiationAgent {
    domain: Domain,
    config: SessionConfig,
    self_model: UtilityModel,
    estimate_status: EstimateStatus,
    opening_bid: Bid,
    index: BidIndex,
    concession: ConcessionStrategy,
    opponents: OpponentModel,
    generator: BidGenerator,
    annealing: AnnealingSearch,
    deadline: Option<Box<dyn DeadlineEstimator>>,
    rng: StdRng,
    round: u64,
    time: f64,
}

impl NegotiationAgent {
    /// Sets up a session.
    ///
    /// `reservation_value` overrides `config.concession.reservation_value`.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::Domain`] for an empty domain, continuous or empty
    /// issues, or a ranking with bids outside the domain, and
    /// [`AgentError::Configuration`] for out-of-range settings.
    pub fn init(
        issues: Vec<Issue>,
        ranking: &BidRanking,
        reservation_value: f64,
        mut config: SessionConfig,
    ) -> Result<Self> {
        if !(0.0..=1.0).contains(&reservation_value) {
            return Err(AgentError::config(format!(
                "reservation value must be within [0, 1], got {reservation_value}"
            )));
        }
        config.concession.reservation_value = reservation_value;
        config.validate()?;

        let domain = Domain::new(issues)?;
        let estimate = estimate_self_model(&domain, ranking)?;
        let mut rng = config
            .seed
            .map_or_else(StdRng::from_entropy, StdRng::seed_from_u64);
        let index = BidIndex::build(&domain, &estimate.model, &config.index, &mut rng);
        let opening_bid = ranking
            .best()
            .cloned()
            .unwrap_or_else(|| estimate.model.best_bid(&domain));

        info!(
            issues = domain.len(),
            ranking = ranking.len(),
            outcome_space = ?domain.outcome_count(),
            indexed = index.len(),
            sampled = index.is_sampled(),
            estimator = ?config.opponent.estimator,
            "negotiation session initialized"
        );

        let deadline = config
            .deadline
            .estimate_after
            .map(|after| Box::new(RoundRateEstimator::new(after)) as Box<dyn DeadlineEstimator>);

        Ok(Self {
            opponents: OpponentModel::new(domain.clone(), config.opponent.clone()),
            concession: ConcessionStrategy::new(config.concession.clone()),
            generator: BidGenerator::new(config.search.clone()),
            annealing: AnnealingSearch::new(config.annealing.clone()),
            domain,
            self_model: estimate.model,
            estimate_status: estimate.status,
            opening_bid,
            index,
            deadline,
            rng,
            round: 0,
            time: 0.0,
            config,
        })
    }

    /// Installs a deadline estimator, replacing the configured one.
    #[must_use]
    pub fn with_deadline_estimator(mut self, estimator: impl DeadlineEstimator + 'static) -> Self {
        self.deadline = Some(Box::new(estimator));
        self
    }

    /// Static identifier of this agent.
    #[must_use]
    pub const fn describe(&self) -> &'static str {
        "parley: ranking-estimated self model, frequency opponent model, elite Nash-bid search"
    }

    /// Records an offer made by `opponent`.
    ///
    /// Bids outside the domain are logged and ignored.
    pub fn on_opponent_offer(&mut self, opponent: OpponentId, bid: Bid, t: f64) {
        self.record(opponent, bid, t, "offer");
    }

    /// Records that `opponent` accepted `bid`; counted as if it had offered it.
    pub fn on_opponent_accept(&mut self, opponent: OpponentId, bid: Bid, t: f64) {
        self.record(opponent, bid, t, "accept");
    }

    fn record(&mut self, opponent: OpponentId, bid: Bid, t: f64, kind: &'static str) {
        let label = opponent.to_string();
        match self.opponents.observe(opponent, bid) {
            Ok(profile) => debug!(
                opponent = %label,
                kind,
                t,
                observed = profile.history().len(),
                "opponent bid recorded"
            ),
            Err(error) => warn!(opponent = %label, kind, %error, "ignoring bid outside the domain"),
        }
    }

    /// Decides this turn's action at time `t`.
    ///
    /// `standing` is the offer currently on the table, if any.
    pub fn choose_action(&mut self, t: f64, standing: Option<&Bid>) -> Decision {
        let t = self.advance_time(t);
        self.round += 1;
        let mut warnings = Vec::new();

        if let EstimateStatus::Degraded { reason } = &self.estimate_status {
            warnings.push(Warning::DegradedModel {
                reason: reason.clone(),
            });
        }

        let predicted_total = self
            .deadline
            .as_mut()
            .and_then(|estimator| estimator.predicted_total_rounds(self.round, t));
        if self.concession.in_opening_window(t) {
            debug!(
                round = self.round,
                t,
                source = ?ProposalSource::Opening,
                "turn evaluated"
            );
            return Decision {
                action: Action::Offer(self.opening_bid.clone()),
                warnings,
            };
        }

        let endgame = self.concession.is_endgame(self.round, predicted_total);
        let rigidity = self
            .opponents
            .max_hard_headedness(self.config.concession.hardheaded_rounds);
        let target = self.concession.acceptable_utility(t, rigidity);
        let (offer, offer_utility, source) = self.propose(t, target, &mut warnings);

        debug!(
            round = self.round,
            t,
            target,
            offer_utility,
            ?source,
            endgame,
            "turn evaluated"
        );

        if let Some(standing) = standing {
            match self.domain.validate_bid(standing) {
                Ok(()) => {
                    let utility = self.self_model.utility(standing);
                    if self
                        .concession
                        .should_accept(utility, offer_utility, target, endgame, t)
                    {
                        info!(round = self.round, t, utility, target, "accepting standing offer");
                        return Decision {
                            action: Action::Accept(standing.clone()),
                            warnings,
                        };
                    }
                }
                Err(error) => warn!(%error, "standing offer is outside the domain"),
            }
        }

        Decision {
            action: Action::Offer(offer),
            warnings,
        }
    }

    fn propose(
        &mut self,
        t: f64,
        target: f64,
        warnings: &mut Vec<Warning>,
    ) -> (Bid, f64, ProposalSource) {
        if self.annealing.should_run(t, &self.opponents) {
            let outcome = self
                .annealing
                .run(&self.self_model, &self.opponents, target, &mut self.rng);
            if outcome.exhausted {
                warnings.push(Warning::SearchExhausted {
                    target,
                    best_utility: outcome.self_utility,
                });
            }
            return (outcome.bid, outcome.self_utility, ProposalSource::Annealing);
        }

        let proposal = self.generator.propose(
            self.round,
            target,
            &self.self_model,
            &self.index,
            &self.opponents,
            &mut self.rng,
        );
        match proposal {
            Some(proposal) => {
                if proposal.exhausted {
                    warnings.push(Warning::SearchExhausted {
                        target,
                        best_utility: proposal.self_utility,
                    });
                }
                (proposal.bid, proposal.self_utility, proposal.source)
            }
            None => {
                let bid = self.self_model.best_bid(&self.domain);
                let utility = self.self_model.utility(&bid);
                warn!(target, "bid search produced nothing, offering self-best bid");
                warnings.push(Warning::SearchExhausted {
                    target,
                    best_utility: utility,
                });
                (bid, utility, ProposalSource::Fallback)
            }
        }
    }

    /// Clamps `t` to [0, 1] and keeps it from moving backwards.
    fn advance_time(&mut self, t: f64) -> f64 {
        if !t.is_finite() {
            warn!(t, last = self.time, "non-finite time, reusing last value");
            return self.time;
        }
        let t = t.clamp(0.0, 1.0);
        if t < self.time {
            warn!(t, last = self.time, "time moved backwards, reusing last value");
            return self.time;
        }
        self.time = t;
        t
    }

    /// Returns the negotiation domain.
    #[must_use]
    pub const fn domain(&self) -> &Domain {
        &self.domain
    }

    /// Returns the session configuration in effect.
    #[must_use]
    pub const fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Returns the self utility model.
    #[must_use]
    pub const fn self_model(&self) -> &UtilityModel {
        &self.self_model
    }

    /// Returns whether the self model is complete or degraded.
    #[must_use]
    pub const fn estimate_status(&self) -> &EstimateStatus {
        &self.estimate_status
    }

    /// Returns the opening anchor bid.
    ///
    /// This is the top of the supplied ranking when there is one, otherwise
    /// the best bid under the estimated model. A ranked anchor may score below
    /// the model's maximum and below the concession target.
    #[must_use]
    pub const fn opening_bid(&self) -> &Bid {
        &self.opening_bid
    }

    /// Returns the opponent table.
    #[must_use]
    pub const fn opponents(&self) -> &OpponentModel {
        &self.opponents
    }

    /// Returns the outcome index.
    #[must_use]
    pub const fn index(&self) -> &BidIndex {
        &self.index
    }

    /// Returns the elite cache.
    #[must_use]
    pub const fn elite(&self) -> &EliteCache {
        self.generator.elite()
    }

    /// Returns the number of turns decided so far.
    #[must_use]
    pub const fn round(&self) -> u64 {
        self.round
    }

    /// Returns the latest time seen by [`NegotiationAgent::choose_action`].
    #[must_use]
    pub const fn time(&self) -> f64 {
        self.time
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::opponent::HardHeadedness;

    fn issues() -> Vec<Issue> {
        vec![
            Issue::discrete("A", ["0", "1", "2"]),
            Issue::discrete("B", ["0", "1", "2"]),
            Issue::discrete("C", ["0", "1", "2"]),
        ]
    }

    fn domain() -> Domain {
        Domain::new(issues()).unwrap()
    }

    fn bid(a: &str, b: &str, c: &str) -> Bid {
        domain().bid([("A", a), ("B", b), ("C", c)]).unwrap()
    }

    fn ranking() -> BidRanking {
        BidRanking::new(vec![
            bid("0", "0", "0"),
            bid("1", "0", "0"),
            bid("1", "1", "0"),
            bid("1", "1", "1"),
            bid("2", "1", "1"),
            bid("2", "2", "1"),
            bid("2", "2", "2"),
        ])
    }

    fn seeded() -> SessionConfig {
        SessionConfig {
            seed: Some(17),
            ..SessionConfig::default()
        }
    }

    fn agent() -> NegotiationAgent {
        NegotiationAgent::init(issues(), &ranking(), 0.4, seeded()).unwrap()
    }

    #[test]
    fn init_rejects_bad_reservation_value() {
        let err = NegotiationAgent::init(issues(), &ranking(), 1.5, seeded()).unwrap_err();
        assert!(matches!(err, AgentError::Configuration { .. }));
    }

    #[test]
    fn init_rejects_continuous_issues() {
        let issues = vec![Issue::discrete("A", ["0"]), Issue::continuous("price", 0.0, 1.0)];
        let err = NegotiationAgent::init(issues, &BidRanking::default(), 0.4, seeded()).unwrap_err();
        assert!(matches!(err, AgentError::Domain(_)));
    }

    #[test]
    fn init_rejects_empty_domain() {
        let err = NegotiationAgent::init(Vec::new(), &BidRanking::default(), 0.4, seeded())
            .unwrap_err();
        assert!(matches!(err, AgentError::Domain(_)));
    }

    #[test]
    fn reservation_value_overrides_config() {
        let agent = NegotiationAgent::init(issues(), &ranking(), 0.25, seeded()).unwrap();
        assert_eq!(agent.config().concession.reservation_value, 0.25);
    }

    #[test]
    fn opening_window_offers_top_of_ranking() {
        let mut agent = agent();
        let decision = agent.choose_action(0.05, None);
        assert_eq!(decision.action, Action::Offer(bid("2", "2", "2")));
        assert!(decision.warnings.is_empty());
        assert_eq!(agent.round(), 1);
    }

    #[test]
    fn empty_ranking_opens_with_model_best_and_warns() {
        let mut agent =
            NegotiationAgent::init(issues(), &BidRanking::default(), 0.4, seeded()).unwrap();
        assert!(agent.estimate_status().is_degraded());

        let decision = agent.choose_action(0.0, None);
        assert!(matches!(decision.action, Action::Offer(_)));
        assert!(decision
            .warnings
            .iter()
            .any(|w| matches!(w, Warning::DegradedModel { .. })));
    }

    #[test]
    fn degraded_model_still_produces_offers_later() {
        let mut agent =
            NegotiationAgent::init(issues(), &BidRanking::default(), 0.4, seeded()).unwrap();
        let decision = agent.choose_action(0.5, None);
        assert!(matches!(decision.action, Action::Offer(_)));
        assert!(decision
            .warnings
            .iter()
            .any(|w| matches!(w, Warning::SearchExhausted { .. })));
    }

    #[test]
    fn accepts_offer_at_least_as_good_as_own() {
        let mut agent = agent();
        let best = agent.index().best().unwrap().bid.clone();
        let decision = agent.choose_action(0.2, Some(&best));
        assert_eq!(decision.action, Action::Accept(best));
    }

    #[test]
    fn opening_window_never_accepts() {
        let mut agent = agent();
        let best = agent.index().best().unwrap().bid.clone();
        for (t, standing) in [(0.0, best.clone()), (0.05, best), (0.15, bid("2", "2", "2"))] {
            let decision = agent.choose_action(t, Some(&standing));
            assert_eq!(decision.action, Action::Offer(bid("2", "2", "2")), "t={t}");
        }
    }

    #[test]
    fn rejects_poor_offer_early() {
        let mut agent = agent();
        let decision = agent.choose_action(0.3, Some(&bid("0", "0", "0")));
        assert!(!decision.action.is_accept());
        let offered = agent.self_model().utility(decision.action.bid());
        assert!(offered > agent.self_model().utility(&bid("0", "0", "0")));
    }

    #[test]
    fn offers_clear_the_concession_target() {
        let mut agent = agent();
        for step in 0..50 {
            let t = 0.2 + f64::from(step) * 0.015;
            let decision = agent.choose_action(t, None);
            let target = agent
                .concession
                .acceptable_utility(agent.time(), HardHeadedness::NotYetAvailable);
            let utility = agent.self_model().utility(decision.action.bid());
            assert!(utility > target - 1e-9, "offer {utility} below target {target} at t={t}");
        }
    }

    #[test]
    fn panic_time_accepts_anything_valid() {
        let mut config = seeded();
        config.concession.panic_time = Some(0.99);
        let mut agent = NegotiationAgent::init(issues(), &ranking(), 0.4, config).unwrap();
        let decision = agent.choose_action(0.995, Some(&bid("0", "0", "0")));
        assert!(decision.action.is_accept());
    }

    #[test]
    fn foreign_standing_offer_is_never_accepted() {
        let mut config = seeded();
        config.concession.panic_time = Some(0.0);
        let mut agent = NegotiationAgent::init(issues(), &ranking(), 0.4, config).unwrap();
        let other = Domain::new(vec![Issue::discrete("Z", ["1"])]).unwrap();
        let foreign = other.bid([("Z", "1")]).unwrap();

        let decision = agent.choose_action(0.5, Some(&foreign));
        assert!(matches!(decision.action, Action::Offer(_)));
    }

    #[test]
    fn time_never_moves_backwards() {
        let mut agent = agent();
        agent.choose_action(0.6, None);
        agent.choose_action(0.3, None);
        assert_eq!(agent.time(), 0.6);
        agent.choose_action(f64::NAN, None);
        assert_eq!(agent.time(), 0.6);
        agent.choose_action(3.0, None);
        assert_eq!(agent.time(), 1.0);
    }

    #[test]
    fn offers_and_accepts_feed_the_opponent_model() {
        let mut agent = agent();
        agent.on_opponent_offer("rival".into(), bid("0", "1", "2"), 0.1);
        agent.on_opponent_accept("rival".into(), bid("0", "1", "2"), 0.2);

        let profile = agent.opponents().profile(&"rival".into()).unwrap();
        assert_eq!(profile.history().len(), 2);
    }

    #[test]
    fn foreign_opponent_bid_is_ignored() {
        let mut agent = agent();
        let other = Domain::new(vec![Issue::discrete("Z", ["1"])]).unwrap();
        agent.on_opponent_offer("rival".into(), other.bid([("Z", "1")]).unwrap(), 0.1);
        assert!(agent.opponents().is_empty());
    }

    #[test]
    fn endgame_accepts_above_must_accept_floor() {
        #[derive(Debug)]
        struct FixedDeadline(u64);

        impl DeadlineEstimator for FixedDeadline {
            fn predicted_total_rounds(&mut self, _rounds: u64, _t: f64) -> Option<u64> {
                Some(self.0)
            }
        }

        let standing = bid("1", "1", "1");
        let mut late = agent().with_deadline_estimator(FixedDeadline(1));
        let mut early = agent().with_deadline_estimator(FixedDeadline(1000));

        let utility = late.self_model().utility(&standing);
        assert!(utility >= 0.5 && utility < 0.85, "fixture utility {utility}");

        assert!(late.choose_action(0.5, Some(&standing)).action.is_accept());
        assert!(!early.choose_action(0.5, Some(&standing)).action.is_accept());
    }

    #[test]
    fn seeded_sessions_are_reproducible() {
        let run = || {
            let mut agent = agent();
            let mut actions = Vec::new();
            for step in 0..40 {
                let t = f64::from(step) / 40.0;
                agent.on_opponent_offer("rival".into(), bid("0", "2", "1"), t);
                actions.push(agent.choose_action(t, Some(&bid("0", "2", "1"))).action);
            }
            actions
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn decision_serializes_with_tags() {
        let decision = Decision {
            action: Action::Offer(bid("0", "1", "2")),
            warnings: vec![Warning::DegradedModel {
                reason: "empty ranking".to_string(),
            }],
        };
        let json = serde_json::to_value(&decision).unwrap();
        assert_eq!(json["action"]["action"], "offer");
        assert_eq!(json["action"]["bid"]["A"], "0");
        assert_eq!(json["warnings"][0]["kind"], "degraded_model");
    }

    #[test]
    fn describe_is_static() {
        assert!(agent().describe().starts_with("parley"));
    }
}
