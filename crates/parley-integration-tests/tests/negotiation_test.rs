//! Integration tests for complete negotiation sessions.
//!
//! Drives several agents against each other under a simple alternating-offers
//! protocol:
//! 1. Each agent estimates its own model from a partial ranking
//! 2. Agents take turns to offer or accept the standing offer
//! 3. Offers and acceptances are reported to every other agent
//! 4. The session ends when all other parties accept an offer

use parley_agent::{
    Action, Decision, NegotiationAgent, OpponentEstimator, OpponentId, SessionConfig, Warning,
};
use parley_core::{Bid, BidRanking, Domain, Issue};

// ============================================================================
// Helper Functions
// ============================================================================

const VALUES: [&str; 4] = ["0", "1", "2", "3"];

fn issues() -> Vec<Issue> {
    (0..4)
        .map(|i| Issue::discrete(format!("issue{i}"), VALUES))
        .collect()
}

fn domain() -> Domain {
    Domain::new(issues()).unwrap()
}

/// Linear preference used to generate rankings; never shown to the agents.
#[derive(Clone, Copy)]
struct Hidden {
    weights: [f64; 4],
    prefers_high: bool,
}

impl Hidden {
    fn utility(self, bid: &Bid) -> f64 {
        bid.iter()
            .zip(self.weights)
            .map(|((_, value), weight)| {
                let level = value.as_str().parse::<f64>().unwrap() / 3.0;
                let level = if self.prefers_high { level } else { 1.0 - level };
                weight * level
            })
            .sum()
    }

    /// Every `stride`-th outcome in ascending hidden utility, always keeping the best.
    fn ranking(self, domain: &Domain, stride: usize) -> BidRanking {
        let mut scored: Vec<(f64, Bid)> = domain
            .outcomes()
            .map(|bid| (self.utility(&bid), bid))
            .collect();
        scored.sort_by(|a, b| a.0.total_cmp(&b.0).then_with(|| a.1.cmp(&b.1)));
        let mut bids: Vec<Bid> = scored
            .into_iter()
            .rev()
            .step_by(stride)
            .map(|(_, bid)| bid)
            .collect();
        bids.reverse();
        BidRanking::new(bids)
    }
}

const BUYER: Hidden = Hidden {
    weights: [0.4, 0.3, 0.2, 0.1],
    prefers_high: true,
};
const SELLER: Hidden = Hidden {
    weights: [0.1, 0.2, 0.3, 0.4],
    prefers_high: false,
};
const BROKER: Hidden = Hidden {
    weights: [0.25, 0.25, 0.25, 0.25],
    prefers_high: true,
};

fn config(seed: u64) -> SessionConfig {
    let mut config = SessionConfig {
        seed: Some(seed),
        ..SessionConfig::default()
    };
    config.concession.panic_time = Some(0.98);
    config.search.candidates = 20;
    config.search.elite_capacity = 10;
    config
}

struct Party {
    id: OpponentId,
    agent: NegotiationAgent,
}

fn party(name: &str, hidden: Hidden, config: SessionConfig) -> Party {
    let d = domain();
    let ranking = hidden.ranking(&d, 7);
    Party {
        id: OpponentId::from(name),
        agent: NegotiationAgent::init(issues(), &ranking, 0.4, config).unwrap(),
    }
}

#[derive(Debug, Clone, PartialEq)]
struct Transcript {
    turns: Vec<(usize, f64, Decision)>,
    agreement: Option<(Bid, f64)>,
}

/// Runs an alternating-offers session over `steps` turns.
///
/// An offer becomes the agreement once every other party has accepted it.
fn run_session(parties: &mut [Party], steps: u32) -> Transcript {
    let mut standing: Option<Bid> = None;
    let mut acceptances = 0;
    let mut turns = Vec::new();

    for step in 0..steps {
        let t = f64::from(step) / f64::from(steps);
        let actor = step as usize % parties.len();
        let decision = parties[actor].agent.choose_action(t, standing.as_ref());
        turns.push((actor, t, decision.clone()));

        let actor_id = parties[actor].id.clone();
        match decision.action {
            Action::Offer(bid) => {
                for (i, other) in parties.iter_mut().enumerate() {
                    if i != actor {
                        other.agent.on_opponent_offer(actor_id.clone(), bid.clone(), t);
                    }
                }
                standing = Some(bid);
                acceptances = 0;
            }
            Action::Accept(bid) => {
                for (i, other) in parties.iter_mut().enumerate() {
                    if i != actor {
                        other.agent.on_opponent_accept(actor_id.clone(), bid.clone(), t);
                    }
                }
                acceptances += 1;
                if acceptances == parties.len() - 1 {
                    return Transcript {
                        turns,
                        agreement: Some((bid, t)),
                    };
                }
            }
        }
    }

    Transcript {
        turns,
        agreement: None,
    }
}

// ============================================================================
// Bilateral Sessions
// ============================================================================

#[test]
fn bilateral_session_reaches_agreement() {
    let mut parties = vec![
        party("buyer", BUYER, config(1)),
        party("seller", SELLER, config(2)),
    ];
    let transcript = run_session(&mut parties, 400);

    let (bid, t) = transcript.agreement.expect("agreement before the deadline");
    assert!(t < 1.0);
    assert!(domain().validate_bid(&bid).is_ok());
}

#[test]
fn accepted_offers_respect_reservation_or_panic() {
    let mut parties = vec![
        party("buyer", BUYER, config(3)),
        party("seller", SELLER, config(4)),
    ];
    let transcript = run_session(&mut parties, 400);

    for (actor, t, decision) in &transcript.turns {
        if let Action::Accept(bid) = &decision.action {
            let utility = parties[*actor].agent.self_model().utility(bid);
            assert!(
                utility >= 0.4 - 1e-9 || *t >= 0.98,
                "accepted {utility} at t={t}"
            );
        }
    }
}

#[test]
fn offers_after_opening_clear_reservation_value() {
    let mut parties = vec![
        party("buyer", BUYER, config(5)),
        party("seller", SELLER, config(6)),
    ];
    let transcript = run_session(&mut parties, 400);

    for (actor, t, decision) in &transcript.turns {
        if *t < 0.2 {
            continue;
        }
        if let Action::Offer(bid) = &decision.action {
            let utility = parties[*actor].agent.self_model().utility(bid);
            assert!(utility > 0.4, "offered {utility} at t={t}");
        }
    }
}

#[test]
fn opening_offers_are_the_ranking_anchor() {
    let mut parties = vec![
        party("buyer", BUYER, config(7)),
        party("seller", SELLER, config(8)),
    ];
    let anchors: Vec<Bid> = parties
        .iter()
        .map(|p| p.agent.opening_bid().clone())
        .collect();
    let transcript = run_session(&mut parties, 400);

    for (actor, t, decision) in &transcript.turns {
        if *t >= 0.2 {
            break;
        }
        assert_eq!(decision.action, Action::Offer(anchors[*actor].clone()), "t={t}");
    }
    assert_eq!(anchors[0], BUYER.ranking(&domain(), 7).best().unwrap().clone());
}

#[test]
fn opponents_learn_each_other() {
    let mut parties = vec![
        party("buyer", BUYER, config(9)),
        party("seller", SELLER, config(10)),
    ];
    run_session(&mut parties, 400);

    let buyer_view = parties[0].agent.opponents();
    let seller = buyer_view.profile(&"seller".into()).unwrap();
    assert!(!seller.history().is_empty());

    // The seller anchors on low values; the buyer's model should rank an
    // all-low bid above an all-high one for the seller.
    let d = domain();
    let low = d.outcomes().next().unwrap();
    let high = d.outcomes().last().unwrap();
    assert!(seller.utility(&low) > seller.utility(&high));
}

#[test]
fn seeded_sessions_are_reproducible() {
    let run = || {
        let mut parties = vec![
            party("buyer", BUYER, config(11)),
            party("seller", SELLER, config(12)),
        ];
        run_session(&mut parties, 300)
    };
    assert_eq!(run(), run());
}

#[test]
fn rank_based_estimator_session() {
    let mut ranked = config(13);
    ranked.opponent.estimator = OpponentEstimator::RankBased;
    let mut parties = vec![
        party("buyer", BUYER, ranked.clone()),
        party("seller", SELLER, ranked),
    ];
    let transcript = run_session(&mut parties, 400);
    assert!(transcript.agreement.is_some());
}

#[test]
fn annealing_session() {
    let mut annealed = config(14);
    annealed.annealing.enabled = true;
    annealed.annealing.start_time = 0.5;
    annealed.annealing.iterations = 300;
    let mut parties = vec![
        party("buyer", BUYER, annealed.clone()),
        party("seller", SELLER, annealed),
    ];
    let transcript = run_session(&mut parties, 400);

    let (bid, _) = transcript.agreement.expect("agreement before the deadline");
    assert!(domain().validate_bid(&bid).is_ok());
}

#[test]
fn deadline_estimation_session() {
    let mut estimating = config(15);
    estimating.deadline.estimate_after = Some(0.5);
    estimating.concession.panic_time = None;
    estimating.concession.must_accept_floor = 0.0;
    let mut parties = vec![
        party("buyer", BUYER, estimating.clone()),
        party("seller", SELLER, estimating),
    ];
    let transcript = run_session(&mut parties, 400);

    // With no panic time, the endgame floor guarantees a deal.
    let (_, t) = transcript.agreement.expect("agreement before the deadline");
    assert!(t < 1.0);
    for party in &parties {
        assert!(party.agent.round() > 0);
    }
}

// ============================================================================
// Multilateral Sessions
// ============================================================================

#[test]
fn multilateral_session_reaches_agreement() {
    let mut parties = vec![
        party("buyer", BUYER, config(21)),
        party("seller", SELLER, config(22)),
        party("broker", BROKER, config(23)),
    ];
    let transcript = run_session(&mut parties, 600);

    let (bid, _) = transcript.agreement.expect("agreement before the deadline");
    assert!(domain().validate_bid(&bid).is_ok());
    for party in &parties {
        assert_eq!(party.agent.opponents().len(), 2);
    }
}

#[test]
fn multilateral_sessions_are_reproducible() {
    let run = || {
        let mut parties = vec![
            party("buyer", BUYER, config(31)),
            party("seller", SELLER, config(32)),
            party("broker", BROKER, config(33)),
        ];
        run_session(&mut parties, 300)
    };
    assert_eq!(run(), run());
}

// ============================================================================
// Degraded Inputs
// ============================================================================

#[test]
fn agent_without_ranking_still_negotiates() {
    let mut blind = Party {
        id: OpponentId::from("blind"),
        agent: NegotiationAgent::init(issues(), &BidRanking::default(), 0.4, config(41)).unwrap(),
    };
    let decision = blind.agent.choose_action(0.5, None);

    assert!(matches!(decision.action, Action::Offer(_)));
    assert!(decision
        .warnings
        .iter()
        .any(|w| matches!(w, Warning::DegradedModel { .. })));

    let mut parties = vec![blind, party("seller", SELLER, config(42))];
    let transcript = run_session(&mut parties, 200);
    assert!(transcript.agreement.is_some());
}

#[test]
fn decisions_serialize_to_json() {
    let mut buyer = party("buyer", BUYER, config(51));
    let decision = buyer.agent.choose_action(0.0, None);
    let json = serde_json::to_value(&decision).unwrap();

    assert_eq!(json["action"]["action"], "offer");
    assert!(json["action"]["bid"].is_object());
    assert_eq!(json["warnings"].as_array().map(Vec::len), Some(0));
}
