//! Integration test crate for the Parley negotiation agent.
//!
//! This crate exists solely to run integration tests that span the Parley crates.
//! It has no public API - all functionality is in the test modules.

#![forbid(unsafe_code)]
