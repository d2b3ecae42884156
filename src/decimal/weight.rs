//! Fixed-point decimal quantities for vote weights and quorum thresholds.
//!
//! Values are stored as raw units (u128) scaled by 10^7, which matches the
//! smallest on-chain asset unit. Addition is checked and exact.

use crate::core::{Error, Result};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Number of fractional digits carried by every `Decimal`.
pub const DECIMALS: u32 = 7;

/// Raw units per whole unit.
pub const SCALE: u128 = 10u128.pow(DECIMALS);

/// Largest whole-unit value accepted for a vote weight or quorum.
///
/// Summing weights at this cap still leaves room for more than 10^13 votes
/// before a u128 aggregate overflows.
pub const MAX_WHOLE_UNITS: u128 = 1_000_000_000_000_000_000;

/// A non-negative fixed-point decimal with 7 fractional digits.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Decimal(u128);

impl Decimal {
    pub const ZERO: Self = Self(0);

    /// Construct from raw units (1 raw = 10^-7).
    pub fn from_raw(raw: u128) -> Self {
        Self(raw)
    }

    /// Construct from a whole number of units.
    pub fn from_units(units: u64) -> Self {
        Self(units as u128 * SCALE)
    }

    pub fn raw(&self) -> u128 {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    pub fn checked_add(self, other: Self) -> Option<Self> {
        self.0.checked_add(other.0).map(Self)
    }

    /// Sum every value, or `None` if the total does not fit.
    pub fn checked_sum(values: impl IntoIterator<Item = Decimal>) -> Option<Self> {
        values
            .into_iter()
            .try_fold(Decimal::ZERO, |total, value| total.checked_add(value))
    }

    /// Parse a decimal string, rejecting zero and values above
    /// `MAX_WHOLE_UNITS`.
    ///
    /// Vote weights and quorum thresholds must both be strictly positive.
    pub fn parse_positive(s: &str) -> Result<Self> {
        let value: Decimal = s.parse()?;
        if value.is_zero() {
            return Err(Error::InvalidWeight(format!("'{}' must be greater than zero", s)));
        }
        if value.0 > MAX_WHOLE_UNITS * SCALE {
            return Err(Error::InvalidWeight(format!(
                "'{}' exceeds the maximum of {} units",
                s, MAX_WHOLE_UNITS
            )));
        }
        Ok(value)
    }

    /// Mean of `total` over `count` items, rounded half-up to `digits`
    /// fractional digits. Zero items yield zero.
    pub fn average(total: Decimal, count: u64, digits: u32) -> Decimal {
        if count == 0 {
            return Decimal::ZERO;
        }
        let step = rounding_step(digits);
        let steps = div_round_half_up(total.0, count as u128 * step);
        Decimal(steps * step)
    }

    /// `numerator / denominator` as a decimal, rounded half-up to `digits`
    /// fractional digits. A zero denominator yields zero.
    pub fn ratio(numerator: u64, denominator: u64, digits: u32) -> Decimal {
        if denominator == 0 {
            return Decimal::ZERO;
        }
        let step = rounding_step(digits);
        let steps = div_round_half_up(numerator as u128 * SCALE, denominator as u128 * step);
        Decimal(steps * step)
    }

    /// Render with exactly `digits` fractional digits (truncating any finer
    /// digits, which `average`/`ratio` results never carry).
    pub fn to_fixed(&self, digits: u32) -> String {
        let digits = digits.min(DECIMALS);
        let whole = self.0 / SCALE;
        if digits == 0 {
            return whole.to_string();
        }
        let frac = (self.0 % SCALE) / 10u128.pow(DECIMALS - digits);
        format!("{}.{:0width$}", whole, frac, width = digits as usize)
    }
}

/// Raw units per step when rounding to `digits` fractional digits.
fn rounding_step(digits: u32) -> u128 {
    10u128.pow(DECIMALS - digits.min(DECIMALS))
}

/// Integer division rounding half-up.
///
/// This is the single rounding rule used wherever weights are averaged or
/// ratios are reported.
pub fn div_round_half_up(numerator: u128, denominator: u128) -> u128 {
    let quotient = numerator / denominator;
    let remainder = numerator % denominator;
    if remainder >= denominator - remainder {
        quotient + 1
    } else {
        quotient
    }
}

impl FromStr for Decimal {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = |reason: &str| Error::InvalidWeight(format!("'{}': {}", s, reason));
        let trimmed = s.trim();

        if trimmed.is_empty() {
            return Err(invalid("empty value"));
        }
        if trimmed.starts_with('-') {
            return Err(invalid("negative values are not allowed"));
        }

        let (whole, frac) = match trimmed.split_once('.') {
            Some((w, f)) => (w, f),
            None => (trimmed, ""),
        };

        if whole.is_empty() || !whole.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid("malformed integer part"));
        }
        if trimmed.contains('.') && (frac.is_empty() || !frac.bytes().all(|b| b.is_ascii_digit())) {
            return Err(invalid("malformed fractional part"));
        }
        if frac.len() > DECIMALS as usize {
            return Err(invalid("more than 7 fractional digits"));
        }

        let whole: u128 = whole.parse().map_err(|_| invalid("value out of range"))?;
        let frac_raw: u128 = if frac.is_empty() {
            0
        } else {
            let padded = format!("{:0<width$}", frac, width = DECIMALS as usize);
            padded.parse().map_err(|_| invalid("malformed fractional part"))?
        };

        whole
            .checked_mul(SCALE)
            .and_then(|w| w.checked_add(frac_raw))
            .map(Decimal)
            .ok_or_else(|| invalid("value out of range"))
    }
}

impl fmt::Display for Decimal {
    /// Canonical form: no trailing fractional zeros, no dot for whole values.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let whole = self.0 / SCALE;
        let frac = self.0 % SCALE;
        if frac == 0 {
            return write!(f, "{}", whole);
        }
        let frac = format!("{:07}", frac);
        write!(f, "{}.{}", whole, frac.trim_end_matches('0'))
    }
}

impl Serialize for Decimal {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Decimal {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
