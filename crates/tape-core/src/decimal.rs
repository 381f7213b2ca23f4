//! Precision-safe decimal types for trading.
//!
//! Uses `rust_decimal` for exact decimal arithmetic. Prices crossing
//! the broker boundary and all tick/offset arithmetic stay in
//! `Decimal`; `f64` is used only inside pixel-space coordinate math.

use crate::error::CoreError;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, Div, Mul, Neg, Sub};
use std::str::FromStr;

/// Price with exact decimal precision.
///
/// Wraps `Decimal` to provide type safety and prevent mixing
/// prices with quantities in calculations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Price(pub Decimal);

impl Price {
    pub const ZERO: Self = Self(Decimal::ZERO);

    #[inline]
    pub fn new(value: Decimal) -> Self {
        Self(value)
    }

    #[inline]
    pub fn inner(&self) -> Decimal {
        self.0
    }

    #[inline]
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    #[inline]
    pub fn is_positive(&self) -> bool {
        self.0.is_sign_positive() && !self.0.is_zero()
    }

    /// Snap to the nearest integer multiple of `tick_size`.
    ///
    /// Ties round away from zero (a price exactly between two ticks
    /// snaps upward), matching exchange display convention.
    #[inline]
    pub fn round_to_tick(&self, tick_size: Price) -> Self {
        if tick_size.is_zero() {
            return *self;
        }
        let ticks = (self.0 / tick_size.0).round();
        Self(ticks * tick_size.0)
    }

    /// Lossy conversion for pixel-space math.
    #[inline]
    pub fn to_f64(&self) -> f64 {
        self.0.to_f64().unwrap_or(0.0)
    }

    /// Build from a pixel-space value. Non-finite input maps to zero.
    #[inline]
    pub fn from_f64(value: f64) -> Self {
        Self(Decimal::from_f64(value).unwrap_or(Decimal::ZERO))
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Price {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.parse::<Decimal>()?))
    }
}

impl From<Decimal> for Price {
    fn from(d: Decimal) -> Self {
        Self(d)
    }
}

impl Add for Price {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0 + rhs.0)
    }
}

impl Sub for Price {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Self(self.0 - rhs.0)
    }
}

impl Mul<Decimal> for Price {
    type Output = Self;

    fn mul(self, rhs: Decimal) -> Self::Output {
        Self(self.0 * rhs)
    }
}

impl Div<Decimal> for Price {
    type Output = Self;

    fn div(self, rhs: Decimal) -> Self::Output {
        Self(self.0 / rhs)
    }
}

impl Neg for Price {
    type Output = Self;

    fn neg(self) -> Self::Output {
        Self(-self.0)
    }
}

/// Order/position quantity with exact decimal precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Qty(pub Decimal);

impl Qty {
    pub const ZERO: Self = Self(Decimal::ZERO);
    pub const ONE: Self = Self(Decimal::ONE);

    #[inline]
    pub fn new(value: Decimal) -> Self {
        Self(value)
    }

    #[inline]
    pub fn inner(&self) -> Decimal {
        self.0
    }

    #[inline]
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    #[inline]
    pub fn is_positive(&self) -> bool {
        self.0.is_sign_positive() && !self.0.is_zero()
    }

    /// Normalize a user-entered quantity: floor to a whole number of
    /// contracts with a minimum of one.
    pub fn normalize_contracts(value: Decimal) -> Self {
        let floored = value.floor();
        if floored < Decimal::ONE {
            Self::ONE
        } else {
            Self(floored)
        }
    }
}

impl fmt::Display for Qty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Qty {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.parse::<Decimal>()?))
    }
}

impl From<Decimal> for Qty {
    fn from(d: Decimal) -> Self {
        Self(d)
    }
}

impl Add for Qty {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0 + rhs.0)
    }
}

impl Sub for Qty {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Self(self.0 - rhs.0)
    }
}

impl Mul<Decimal> for Qty {
    type Output = Self;

    fn mul(self, rhs: Decimal) -> Self::Output {
        Self(self.0 * rhs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_round_to_tick_nearest() {
        let tick = Price::new(dec!(0.25));

        assert_eq!(Price::new(dec!(4500.10)).round_to_tick(tick).0, dec!(4500.00));
        assert_eq!(Price::new(dec!(4500.13)).round_to_tick(tick).0, dec!(4500.25));
        assert_eq!(Price::new(dec!(4500.25)).round_to_tick(tick).0, dec!(4500.25));
        // Exact midpoint snaps up
        assert_eq!(Price::new(dec!(4500.125)).round_to_tick(tick).0, dec!(4500.25));
    }

    #[test]
    fn test_round_to_tick_is_multiple() {
        let tick = Price::new(dec!(0.1));
        let snapped = Price::new(dec!(2345.6789)).round_to_tick(tick);
        let ticks = snapped.0 / tick.0;
        assert_eq!(ticks, ticks.round());
    }

    #[test]
    fn test_round_to_tick_zero_tick_passthrough() {
        let p = Price::new(dec!(123.456));
        assert_eq!(p.round_to_tick(Price::ZERO), p);
    }

    #[test]
    fn test_round_to_tick_negative_price() {
        let tick = Price::new(dec!(0.25));
        assert_eq!(Price::new(dec!(-1.13)).round_to_tick(tick).0, dec!(-1.25));
    }

    #[test]
    fn test_f64_boundary() {
        let p = Price::new(dec!(4512.75));
        assert_eq!(p.to_f64(), 4512.75);
        assert_eq!(Price::from_f64(4512.75), p);
        assert_eq!(Price::from_f64(f64::NAN), Price::ZERO);
    }

    #[test]
    fn test_normalize_contracts() {
        assert_eq!(Qty::normalize_contracts(dec!(3.7)).0, dec!(3));
        assert_eq!(Qty::normalize_contracts(dec!(0.2)).0, dec!(1));
        assert_eq!(Qty::normalize_contracts(dec!(-4)).0, dec!(1));
    }
}
