//! Presentation views over the rating book.

pub mod generator;

pub use generator::*;
