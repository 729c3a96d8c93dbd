//! Analysis stages between discovery and output.
//!
//! Runs are deduplicated, ordered with the natural comparator, and split
//! into prefix groups here.

pub mod aggregator;
pub mod natural;

pub use aggregator::*;
pub use natural::SortMode;
