//! # parley-agent
//!
//! Per-session decision core of the Parley negotiation agent.
//!
//! This crate provides:
//!
//! - **Opponent modelling** — [`OpponentModel`] learns each opponent's
//!   preferences from its offers, with a frequency-ratio or rank-based
//!   [`OpponentEstimator`], and measures its [`HardHeadedness`]
//! - **Outcome index** — [`BidIndex`] answers "bid closest to utility `x`"
//! - **Concession** — [`ConcessionStrategy`] maps session time to the lowest
//!   acceptable self-utility
//! - **Bid search** — [`BidGenerator`] with an [`EliteCache`] scored by the
//!   Nash product, and an optional [`AnnealingSearch`] refinement
//! - **Session** — [`NegotiationAgent`], configured by [`SessionConfig`]
//!
//! ## Example
//!
//! ```rust
//! use parley_agent::{Action, NegotiationAgent, SessionConfig};
//! use parley_core::{BidRanking, Domain, Issue};
//!
//! let issues = vec![
//!     Issue::discrete("price", ["high", "mid", "low"]),
//!     Issue::discrete("delivery", ["slow", "fast"]),
//! ];
//! let domain = Domain::new(issues.clone()).unwrap();
//! let ranking = BidRanking::new(vec![
//!     domain.bid([("price", "high"), ("delivery", "slow")]).unwrap(),
//!     domain.bid([("price", "mid"), ("delivery", "slow")]).unwrap(),
//!     domain.bid([("price", "low"), ("delivery", "fast")]).unwrap(),
//! ]);
//!
//! let config = SessionConfig { seed: Some(1), ..SessionConfig::default() };
//! let mut agent = NegotiationAgent::init(issues, &ranking, 0.4, config).unwrap();
//!
//! let decision = agent.choose_action(0.0, None);
//! assert_eq!(decision.action, Action::Offer(ranking.best().unwrap().clone()));
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod agent;
pub mod annealing;
pub mod concession;
pub mod config;
pub mod deadline;
pub mod elite;
pub mod error;
pub mod index;
pub mod opponent;
pub mod search;

pub use error::{AgentError, Result};

// Re-exports for convenience
pub use agent::{Action, Decision, NegotiationAgent, Warning};
pub use annealing::{AnnealingConfig, AnnealingOutcome, AnnealingSearch};
pub use concession::{ConcessionConfig, ConcessionStrategy};
pub use config::SessionConfig;
pub use deadline::{DeadlineConfig, DeadlineEstimator, RoundRateEstimator};
pub use elite::{EliteCache, EliteEntry, Insertion};
pub use index::{BidIndex, IndexConfig, IndexedBid};
pub use opponent::{
    HardHeadedness, OpponentConfig, OpponentEstimator, OpponentId, OpponentModel, OpponentProfile,
};
pub use search::{BidGenerator, Proposal, ProposalSource, SampledBid, SearchConfig};
