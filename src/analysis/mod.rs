//! Rating analysis.
//!
//! Derives the per-entry averages from raw submissions.

pub mod aggregator;

pub use aggregator::*;
