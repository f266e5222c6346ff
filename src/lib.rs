//! RateBot - peer rating engine for community chat bots.
//!
//! Members submit named content, rate it on four sub-scores, and query the
//! running averages. All state lives in one JSON document.

pub mod analysis;
pub mod cli;
pub mod config;
pub mod error;
pub mod models;
pub mod notify;
pub mod ratings;
pub mod report;
pub mod store;

pub use error::{RatingError, Result};
