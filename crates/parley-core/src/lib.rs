//! # parley-core
//!
//! Preference primitives for the Parley negotiation agent.
//!
//! This crate provides:
//!
//! - [`Domain`] — the fixed set of discrete negotiation issues
//! - [`Bid`] — one value chosen for every issue of a domain
//! - [`BidRanking`] — an ordinal preference signal, least-preferred first
//! - [`UtilityModel`] — an additive weighted scoring function over issues
//! - [`estimate_self_model`] — builds the agent's own [`UtilityModel`] from a ranking
//!
//! ## Example
//!
//! ```rust
//! use parley_core::{estimate_self_model, BidRanking, Domain, Issue};
//!
//! let domain = Domain::new(vec![
//!     Issue::discrete("price", ["low", "high"]),
//!     Issue::discrete("delivery", ["slow", "fast"]),
//! ])
//! .unwrap();
//!
//! let ranking = BidRanking::new(vec![
//!     domain.bid([("price", "low"), ("delivery", "slow")]).unwrap(),
//!     domain.bid([("price", "high"), ("delivery", "slow")]).unwrap(),
//!     domain.bid([("price", "high"), ("delivery", "fast")]).unwrap(),
//! ]);
//!
//! let estimate = estimate_self_model(&domain, &ranking).unwrap();
//! let best = ranking.best().unwrap();
//! assert!(estimate.model.utility(best) > 0.9);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod bid;
pub mod domain;
pub mod error;
pub mod estimate;
pub mod utility;

pub use bid::{Bid, BidRanking};
pub use domain::{Domain, Issue, IssueId, IssueKind, Outcomes, ValueId};
pub use error::CoreError;
pub use estimate::{estimate_self_model, EstimateStatus, SelfEstimate};
pub use utility::{IssueEvaluator, UtilityModel};
