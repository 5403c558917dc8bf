//! Exact rational arithmetic for ownership shares.
//!
//! Every share of the property is a [`Fraction`]: a numerator and a strictly
//! positive denominator kept in lowest terms. All construction paths go
//! through a single normalizing constructor, so two equal values always have
//! identical representations and derived equality/hashing is exact.
//!
//! Intermediate products are computed in `i128` and narrowed back to `i64`
//! after reduction. Arithmetic never rounds; a result that cannot be
//! represented fails with [`FractionError::Overflow`] instead.
//!
//! # Text form
//!
//! Fractions display and parse as `n/d`, or as a bare integer when the
//! denominator is 1 (`"3/8"`, `"1"`, `"0"`). Serde uses the same text form.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// Errors from constructing or combining fractions.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FractionError {
    /// The denominator was zero.
    #[error("invalid fraction {numerator}/0: denominator must be non-zero")]
    InvalidFraction { numerator: i128 },

    /// The exact result does not fit the representation.
    #[error("fraction arithmetic overflowed")]
    Overflow,

    /// The text was not of the form `n` or `n/d`.
    #[error("cannot parse '{raw}' as a fraction: expected 'n' or 'n/d'")]
    Parse { raw: String },
}

/// An exact rational number in lowest terms with a positive denominator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Fraction {
    numerator: i64,
    denominator: i64,
}

impl Fraction {
    /// The empty share.
    pub const ZERO: Self = Self {
        numerator: 0,
        denominator: 1,
    };

    /// The whole property.
    pub const ONE: Self = Self {
        numerator: 1,
        denominator: 1,
    };

    /// Construct `numerator / denominator`, reduced.
    ///
    /// # Errors
    ///
    /// Returns [`FractionError::InvalidFraction`] if `denominator` is zero.
    pub fn new(numerator: i64, denominator: i64) -> Result<Self, FractionError> {
        Self::from_wide(i128::from(numerator), i128::from(denominator))
    }

    /// The unit fraction `1 / n`, used for "divided among n".
    ///
    /// # Errors
    ///
    /// Returns [`FractionError::InvalidFraction`] when `n` is zero and
    /// [`FractionError::Overflow`] when `n` exceeds `i64::MAX`.
    pub fn unit(n: usize) -> Result<Self, FractionError> {
        let n = i64::try_from(n).map_err(|_| FractionError::Overflow)?;
        Self::new(1, n)
    }

    /// The integer `n` as a fraction.
    #[must_use]
    pub const fn whole(n: i64) -> Self {
        Self {
            numerator: n,
            denominator: 1,
        }
    }

    #[must_use]
    pub const fn numerator(self) -> i64 {
        self.numerator
    }

    #[must_use]
    pub const fn denominator(self) -> i64 {
        self.denominator
    }

    #[must_use]
    pub const fn is_zero(self) -> bool {
        self.numerator == 0
    }

    #[must_use]
    pub const fn is_positive(self) -> bool {
        self.numerator > 0
    }

    #[must_use]
    pub const fn is_negative(self) -> bool {
        self.numerator < 0
    }

    /// Exact sum.
    ///
    /// # Errors
    ///
    /// Returns [`FractionError::Overflow`] if the reduced result does not fit.
    pub fn checked_add(self, other: Self) -> Result<Self, FractionError> {
        let (a, b) = self.cross(other);
        let numerator = a.checked_add(b).ok_or(FractionError::Overflow)?;
        Self::from_wide(numerator, self.wide_denominator(other))
    }

    /// Exact difference.
    ///
    /// # Errors
    ///
    /// Returns [`FractionError::Overflow`] if the reduced result does not fit.
    pub fn checked_sub(self, other: Self) -> Result<Self, FractionError> {
        let (a, b) = self.cross(other);
        let numerator = a.checked_sub(b).ok_or(FractionError::Overflow)?;
        Self::from_wide(numerator, self.wide_denominator(other))
    }

    /// Exact product.
    ///
    /// # Errors
    ///
    /// Returns [`FractionError::Overflow`] if the reduced result does not fit.
    pub fn checked_mul(self, other: Self) -> Result<Self, FractionError> {
        let numerator = i128::from(self.numerator) * i128::from(other.numerator);
        Self::from_wide(numerator, self.wide_denominator(other))
    }

    /// This share divided evenly among `n` recipients: `self × 1/n`.
    ///
    /// # Errors
    ///
    /// Returns [`FractionError::InvalidFraction`] when `n` is zero.
    pub fn divided_among(self, n: usize) -> Result<Self, FractionError> {
        self.checked_mul(Self::unit(n)?)
    }

    /// `self / other`, used to express a recipient's share as a fraction of
    /// the source's share.
    ///
    /// # Errors
    ///
    /// Returns [`FractionError::InvalidFraction`] when `other` is zero.
    pub fn checked_div(self, other: Self) -> Result<Self, FractionError> {
        let numerator = i128::from(self.numerator) * i128::from(other.denominator);
        let denominator = i128::from(self.denominator) * i128::from(other.numerator);
        Self::from_wide(numerator, denominator)
    }

    /// Exact sum of every fraction yielded by `iter`.
    ///
    /// # Errors
    ///
    /// Returns [`FractionError::Overflow`] if any partial sum does not fit.
    pub fn checked_sum<I>(iter: I) -> Result<Self, FractionError>
    where
        I: IntoIterator<Item = Self>,
    {
        iter.into_iter()
            .try_fold(Self::ZERO, |acc, next| acc.checked_add(next))
    }

    fn cross(self, other: Self) -> (i128, i128) {
        (
            i128::from(self.numerator) * i128::from(other.denominator),
            i128::from(other.numerator) * i128::from(self.denominator),
        )
    }

    fn wide_denominator(self, other: Self) -> i128 {
        i128::from(self.denominator) * i128::from(other.denominator)
    }

    /// The single normalizing constructor: every value passes through here.
    fn from_wide(numerator: i128, denominator: i128) -> Result<Self, FractionError> {
        if denominator == 0 {
            return Err(FractionError::InvalidFraction { numerator });
        }
        if numerator == 0 {
            return Ok(Self::ZERO);
        }

        let divisor = gcd(numerator.unsigned_abs(), denominator.unsigned_abs());
        let divisor = i128::try_from(divisor).map_err(|_| FractionError::Overflow)?;
        let sign: i128 = if denominator < 0 { -1 } else { 1 };

        let numerator = (numerator / divisor)
            .checked_mul(sign)
            .ok_or(FractionError::Overflow)?;
        let denominator = (denominator / divisor)
            .checked_mul(sign)
            .ok_or(FractionError::Overflow)?;

        Ok(Self {
            numerator: i64::try_from(numerator).map_err(|_| FractionError::Overflow)?,
            denominator: i64::try_from(denominator).map_err(|_| FractionError::Overflow)?,
        })
    }
}

const fn gcd(mut a: u128, mut b: u128) -> u128 {
    while b != 0 {
        let r = a % b;
        a = b;
        b = r;
    }
    a
}

impl Default for Fraction {
    fn default() -> Self {
        Self::ZERO
    }
}

impl PartialOrd for Fraction {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Fraction {
    fn cmp(&self, other: &Self) -> Ordering {
        let (a, b) = self.cross(*other);
        a.cmp(&b)
    }
}

impl fmt::Display for Fraction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.denominator == 1 {
            write!(f, "{}", self.numerator)
        } else {
            write!(f, "{}/{}", self.numerator, self.denominator)
        }
    }
}

impl FromStr for Fraction {
    type Err = FractionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parse_err = || FractionError::Parse { raw: s.to_string() };
        let trimmed = s.trim();

        match trimmed.split_once('/') {
            Some((num, den)) => {
                let num: i64 = num.trim().parse().map_err(|_| parse_err())?;
                let den: i64 = den.trim().parse().map_err(|_| parse_err())?;
                Self::new(num, den)
            }
            None => {
                let whole: i64 = trimmed.parse().map_err(|_| parse_err())?;
                Ok(Self::whole(whole))
            }
        }
    }
}

impl Serialize for Fraction {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Fraction {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct FractionVisitor;

        impl serde::de::Visitor<'_> for FractionVisitor {
            type Value = Fraction;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a fraction such as \"3/8\" or an integer")
            }

            fn visit_str<E: serde::de::Error>(self, v: &str) -> Result<Fraction, E> {
                v.parse().map_err(E::custom)
            }

            fn visit_i64<E: serde::de::Error>(self, v: i64) -> Result<Fraction, E> {
                Ok(Fraction::whole(v))
            }

            fn visit_u64<E: serde::de::Error>(self, v: u64) -> Result<Fraction, E> {
                i64::try_from(v)
                    .map(Fraction::whole)
                    .map_err(|_| E::custom(FractionError::Overflow))
            }
        }

        deserializer.deserialize_any(FractionVisitor)
    }
}
