//! TokenAmount - Fixed-point monetary amounts
//!
//! Amounts are stored as an integer count of the smallest unit with a fixed
//! scale of 6 decimal places (1.000000 = 1_000_000 units).

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Errors that can occur when converting amounts
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AmountError {
    #[error("Amount cannot be negative: {0}")]
    NegativeAmount(Decimal),

    #[error("Amount {0} has more than {max} decimal places", max = TokenAmount::DECIMALS)]
    TooPrecise(Decimal),

    #[error("Amount {0} does not fit in base units")]
    Overflow(Decimal),

    #[error("Invalid amount: {0}")]
    Invalid(String),
}

/// A non-negative fixed-point amount.
///
/// # Example
/// ```
/// use claim_core::TokenAmount;
/// use rust_decimal::Decimal;
///
/// let amount = TokenAmount::from_decimal(Decimal::new(10050, 2)).unwrap(); // 100.50
/// assert_eq!(amount.base_units(), 100_500_000);
/// assert_eq!(amount.to_string(), "100.500000");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TokenAmount(u64);

impl TokenAmount {
    /// Zero amount constant
    pub const ZERO: Self = Self(0);

    /// Number of decimal places
    pub const DECIMALS: u32 = 6;

    /// Base units per whole token
    pub const SCALE: u64 = 1_000_000;

    /// Create an amount from smallest units
    #[inline]
    pub const fn from_base_units(units: u64) -> Self {
        Self(units)
    }

    /// Create an amount from whole tokens
    pub fn from_whole(tokens: u64) -> Option<Self> {
        tokens.checked_mul(Self::SCALE).map(Self)
    }

    /// Convert a decimal value (e.g. `100.5`) into base units.
    pub fn from_decimal(value: Decimal) -> Result<Self, AmountError> {
        if value.is_sign_negative() && !value.is_zero() {
            return Err(AmountError::NegativeAmount(value));
        }
        if value.normalize().scale() > Self::DECIMALS {
            return Err(AmountError::TooPrecise(value));
        }

        value
            .checked_mul(Decimal::from(Self::SCALE))
            .and_then(|units| units.trunc().to_u64())
            .map(Self)
            .ok_or(AmountError::Overflow(value))
    }

    /// Get the raw number of smallest units
    #[inline]
    pub const fn base_units(&self) -> u64 {
        self.0
    }

    /// Decimal representation with the fixed scale
    pub fn to_decimal(&self) -> Decimal {
        Decimal::from_i128_with_scale(self.0 as i128, Self::DECIMALS)
    }

    #[inline]
    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    pub fn checked_add(&self, other: TokenAmount) -> Option<TokenAmount> {
        self.0.checked_add(other.0).map(Self)
    }

    /// Returns None if the result would be negative
    pub fn checked_sub(&self, other: TokenAmount) -> Option<TokenAmount> {
        self.0.checked_sub(other.0).map(Self)
    }
}

impl fmt::Display for TokenAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_decimal())
    }
}

impl FromStr for TokenAmount {
    type Err = AmountError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = Decimal::from_str(s.trim()).map_err(|e| AmountError::Invalid(e.to_string()))?;
        Self::from_decimal(value)
    }
}

impl From<TokenAmount> for u64 {
    fn from(amount: TokenAmount) -> Self {
        amount.0
    }
}
