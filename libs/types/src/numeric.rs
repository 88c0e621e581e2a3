//! Fixed-point decimal types for metal quantities and prices
//!
//! Uses rust_decimal for deterministic arithmetic (no floating-point errors).
//! `Grams` is non-negative by construction, `Price` strictly positive.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Add;
use std::str::FromStr;
use thiserror::Error;

/// Errors raised when constructing numeric types
#[derive(Error, Debug, Clone, PartialEq)]
pub enum NumericError {
    #[error("Invalid decimal: {0}")]
    Parse(String),

    #[error("Quantity must be non-negative, got {0}")]
    Negative(Decimal),

    #[error("Price must be positive, got {0}")]
    NonPositive(Decimal),
}

/// A quantity of metal in grams
///
/// Invariant: value >= 0
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Grams(Decimal);

impl Grams {
    /// Create from a decimal
    ///
    /// # Panics
    /// Panics if the value is negative
    pub fn new(value: Decimal) -> Self {
        assert!(value >= Decimal::ZERO, "Grams must be non-negative");
        Self(value)
    }

    /// Try to create from a decimal, returning None if negative
    pub fn try_new(value: Decimal) -> Option<Self> {
        if value >= Decimal::ZERO {
            Some(Self(value))
        } else {
            None
        }
    }

    pub fn zero() -> Self {
        Self(Decimal::ZERO)
    }

    pub fn from_u64(value: u64) -> Self {
        Self(Decimal::from(value))
    }

    pub fn as_decimal(&self) -> Decimal {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Add, returning None if the sum leaves the decimal range
    pub fn checked_add(self, other: Grams) -> Option<Grams> {
        self.0.checked_add(other.0).map(Self)
    }

    /// Subtract, returning None if the result would be negative
    pub fn checked_sub(self, other: Grams) -> Option<Grams> {
        self.0.checked_sub(other.0).and_then(Self::try_new)
    }

    /// Multiply by a decimal factor, returning None on overflow or a
    /// negative product
    pub fn checked_mul(self, factor: Decimal) -> Option<Decimal> {
        self.0.checked_mul(factor)
    }

    /// Subtract, clamping at zero
    pub fn saturating_sub(self, other: Grams) -> Grams {
        self.checked_sub(other).unwrap_or_else(Grams::zero)
    }
}

/// Panics on decimal overflow. Use `checked_add` for externally supplied
/// quantities; plain `+` is for sums bounded by an existing total.
impl Add for Grams {
    type Output = Grams;

    fn add(self, rhs: Grams) -> Grams {
        Grams(self.0 + rhs.0)
    }
}

impl TryFrom<Decimal> for Grams {
    type Error = NumericError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Self::try_new(value).ok_or(NumericError::Negative(value))
    }
}

impl From<Grams> for Decimal {
    fn from(value: Grams) -> Self {
        value.0
    }
}

impl FromStr for Grams {
    type Err = NumericError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = Decimal::from_str(s).map_err(|e| NumericError::Parse(e.to_string()))?;
        Self::try_from(value)
    }
}

impl fmt::Display for Grams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Price per gram in the counter currency
///
/// Invariant: value > 0
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Price(Decimal);

impl Price {
    /// Create from a decimal
    ///
    /// # Panics
    /// Panics if the value is not positive
    pub fn new(value: Decimal) -> Self {
        assert!(value > Decimal::ZERO, "Price must be positive");
        Self(value)
    }

    pub fn try_new(value: Decimal) -> Option<Self> {
        if value > Decimal::ZERO {
            Some(Self(value))
        } else {
            None
        }
    }

    pub fn from_u64(value: u64) -> Self {
        Self::new(Decimal::from(value))
    }

    pub fn as_decimal(&self) -> Decimal {
        self.0
    }
}

impl TryFrom<Decimal> for Price {
    type Error = NumericError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Self::try_new(value).ok_or(NumericError::NonPositive(value))
    }
}

impl From<Price> for Decimal {
    fn from(value: Price) -> Self {
        value.0
    }
}

impl FromStr for Price {
    type Err = NumericError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = Decimal::from_str(s).map_err(|e| NumericError::Parse(e.to_string()))?;
        Self::try_from(value)
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
