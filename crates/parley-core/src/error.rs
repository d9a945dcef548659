//! Error types for parley-core.

use thiserror::Error;

/// Errors raised while describing a negotiation domain or building bids in it.
///
/// Every variant describes an unsupported or malformed domain shape and is
/// fatal for the session that hits it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    /// The domain declares no issues.
    #[error("domain has no issues")]
    EmptyDomain,

    /// An issue declares no candidate values.
    #[error("issue '{issue}' has no values")]
    EmptyIssue {
        /// Issue without values.
        issue: String,
    },

    /// The same issue identifier appears twice.
    #[error("duplicate issue '{issue}'")]
    DuplicateIssue {
        /// Repeated issue identifier.
        issue: String,
    },

    /// The same value identifier appears twice within one issue.
    #[error("duplicate value '{value}' in issue '{issue}'")]
    DuplicateValue {
        /// Issue holding the repeated value.
        issue: String,
        /// Repeated value identifier.
        value: String,
    },

    /// The issue is continuous; only discrete issues are supported.
    #[error("issue '{issue}' is continuous; only discrete issues are supported")]
    UnsupportedIssue {
        /// Continuous issue identifier.
        issue: String,
    },

    /// A bid names an issue the domain does not declare.
    #[error("unknown issue '{issue}'")]
    UnknownIssue {
        /// Unknown issue identifier.
        issue: String,
    },

    /// A bid names a value the issue does not declare.
    #[error("unknown value '{value}' for issue '{issue}'")]
    UnknownValue {
        /// Issue the value was given for.
        issue: String,
        /// Unknown value identifier.
        value: String,
    },

    /// A bid leaves an issue without a value.
    #[error("bid has no value for issue '{issue}'")]
    IncompleteBid {
        /// First issue missing from the bid.
        issue: String,
    },
}
