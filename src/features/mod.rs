//! Derived team statistics
//!
//! Computed from the canonical dataset after every merge.

pub mod strength;

pub use strength::{compute, StrengthCalculator};
