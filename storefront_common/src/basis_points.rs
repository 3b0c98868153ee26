use std::{fmt::Display, str::FromStr};

use serde::{Deserialize, Serialize};
use sqlx::Type;
use thiserror::Error;

use crate::Naira;

const BPS_PER_PERCENT: i64 = 100;
const BPS_PER_UNIT: i128 = 10_000;

//--------------------------------------     BasisPoints      ---------------------------------------------------------
/// A percentage rate expressed in basis points (1% == 100 bps). Commission and deposit rates use this type so that
/// applying a rate never involves floating point.
#[derive(Debug, Clone, Copy, Default, Type, PartialEq, Eq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[sqlx(transparent)]
pub struct BasisPoints(i64);

#[derive(Debug, Clone, Error)]
#[error("Invalid percentage rate: {0}")]
pub struct RateParseError(String);

impl BasisPoints {
    pub const fn new(bps: i64) -> Self {
        Self(bps)
    }

    pub const fn from_percent(percent: i64) -> Self {
        Self(percent * BPS_PER_PERCENT)
    }

    pub fn value(&self) -> i64 {
        self.0
    }

    /// Applies the rate to `amount`, rounding half away from zero to the nearest kobo.
    pub fn apply(&self, amount: Naira) -> Naira {
        let product = i128::from(amount.value()) * i128::from(self.0);
        let half = BPS_PER_UNIT / 2;
        let rounded = if product >= 0 { (product + half) / BPS_PER_UNIT } else { (product - half) / BPS_PER_UNIT };
        #[allow(clippy::cast_possible_truncation)]
        Naira::from(rounded as i64)
    }
}

impl Display for BasisPoints {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{:02}%", self.0 / BPS_PER_PERCENT, (self.0 % BPS_PER_PERCENT).abs())
    }
}

/// Parses a percentage such as `"2.5"`, `"10"` or `"4.1%"` into basis points. At most two decimal places are accepted,
/// since anything finer cannot be represented.
impl FromStr for BasisPoints {
    type Err = RateParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim().trim_end_matches('%').trim_end();
        let invalid = || RateParseError(format!("{s} is not a percentage with at most two decimal places"));
        let (whole, fraction) = trimmed.split_once('.').unwrap_or((trimmed, ""));
        let all_digits = |part: &str| part.bytes().all(|b| b.is_ascii_digit());
        if (whole.is_empty() && fraction.is_empty()) || !all_digits(whole) || !all_digits(fraction) || fraction.len() > 2 {
            return Err(invalid());
        }
        let whole = if whole.is_empty() { 0 } else { whole.parse::<i64>().map_err(|_| invalid())? };
        let fraction = match fraction.len() {
            0 => 0,
            1 => fraction.parse::<i64>().map_err(|_| invalid())? * 10,
            _ => fraction.parse::<i64>().map_err(|_| invalid())?,
        };
        let bps = whole.checked_mul(BPS_PER_PERCENT).and_then(|w| w.checked_add(fraction)).ok_or_else(invalid)?;
        if bps > 100 * BPS_PER_PERCENT {
            return Err(RateParseError(format!("{s} is not between 0 and 100")));
        }
        Ok(Self(bps))
    }
}
