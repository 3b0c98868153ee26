use std::{
    fmt::Display,
    iter::Sum,
    ops::{Add, AddAssign, Mul, Neg, Sub, SubAssign},
};

use serde::{Deserialize, Serialize};
use sqlx::Type;
use thiserror::Error;

use crate::op;

pub const NAIRA_CURRENCY_CODE: &str = "NGN";

const KOBO_PER_NAIRA: i64 = 100;

//--------------------------------------        Naira         ---------------------------------------------------------
/// A monetary amount, held as an integer number of kobo (1/100 of a naira).
///
/// Every figure the engine stores or derives uses this type, so allocation and commission arithmetic is exact to the
/// smallest currency unit.
#[derive(Debug, Clone, Copy, Default, Type, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[sqlx(transparent)]
pub struct Naira(i64);

op!(binary Naira, Add, add);
op!(binary Naira, Sub, sub);
op!(inplace Naira, AddAssign, add_assign);
op!(inplace Naira, SubAssign, sub_assign);
op!(unary Naira, Neg, neg);

impl Mul<i64> for Naira {
    type Output = Self;

    fn mul(self, rhs: i64) -> Self::Output {
        Self::from(self.value() * rhs)
    }
}

impl Sum for Naira {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), Add::add)
    }
}

#[derive(Debug, Clone, Error)]
#[error("Value cannot be represented in kobo: {0}")]
pub struct NairaConversionError(String);

impl From<i64> for Naira {
    fn from(kobo: i64) -> Self {
        Self(kobo)
    }
}

impl PartialEq for Naira {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl Eq for Naira {}

impl TryFrom<u64> for Naira {
    type Error = NairaConversionError;

    fn try_from(value: u64) -> Result<Self, Self::Error> {
        if value > i64::MAX as u64 {
            Err(NairaConversionError(format!("Value {value} is too large to convert to kobo")))
        } else {
            #[allow(clippy::cast_possible_wrap)]
            Ok(Self(value as i64))
        }
    }
}

impl Display for Naira {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        let kobo_per_naira = KOBO_PER_NAIRA.unsigned_abs();
        write!(f, "{sign}₦{}.{:02}", abs / kobo_per_naira, abs % kobo_per_naira)
    }
}

impl Naira {
    /// The amount in kobo
    pub fn value(&self) -> i64 {
        self.0
    }

    /// Converts whole naira to kobo, saturating at the limits of `i64`.
    pub fn from_naira(naira: i64) -> Self {
        Self(naira.saturating_mul(KOBO_PER_NAIRA))
    }

    pub fn zero() -> Self {
        Self(0)
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    pub fn is_positive(&self) -> bool {
        self.0 > 0
    }

    pub fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// `None` if the sum does not fit in kobo.
    pub fn checked_add(self, rhs: Self) -> Option<Self> {
        self.0.checked_add(rhs.0).map(Self)
    }

    /// `None` if the product does not fit in kobo.
    pub fn checked_mul(self, rhs: i64) -> Option<Self> {
        self.0.checked_mul(rhs).map(Self)
    }

    /// Sums `amounts`, or `None` if any partial sum overflows.
    pub fn checked_sum<I: IntoIterator<Item = Self>>(amounts: I) -> Option<Self> {
        amounts.into_iter().try_fold(Self::zero(), Self::checked_add)
    }
}
