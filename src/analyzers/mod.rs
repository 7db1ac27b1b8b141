//! No-show aggregation and correlation.
//!
//! Groups cleaned appointments by a key, computes per-group no-show rates
//! and their deviation from the overall rate, correlates record attributes
//! with the outcome, and assembles everything into a [`types::Report`].

pub mod aggregate;
pub mod analyzer;
pub mod correlation;
pub mod summary;
pub mod types;
pub mod utility;
