//! Decimal Weight Module
//!
//! Exact fixed-point arithmetic for vote weights, quorum thresholds and
//! reported averages. Never binary floating point.

pub mod weight;

pub use weight::{div_round_half_up, Decimal, DECIMALS, MAX_WHOLE_UNITS, SCALE};
