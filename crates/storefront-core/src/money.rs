//! # Money Module
//!
//! Provides the `Money` type for handling monetary values safely.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  The delivery service speaks JSON numbers:                              │
//! │    { "delivery_cost": 49.99 }                                           │
//! │                                                                         │
//! │  Summing those as floats drifts:                                        │
//! │    0.1 + 0.2 = 0.30000000000000004  ❌ WRONG!                           │
//! │                                                                         │
//! │  OUR SOLUTION: Integer Cents, converted ONCE at the wire boundary       │
//! │    49.99 ──► Money(4999) ──► all math in i64 ──► 49.99 on the way out   │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use storefront_core::money::Money;
//!
//! let subtotal = Money::from_cents(50_000); // $500.00
//! let shipping = Money::from_major_minor(50, 0);
//! assert_eq!((subtotal + shipping).cents(), 55_000);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, AddAssign, Mul, Sub, SubAssign};
use ts_rs::TS;

use crate::error::CoreError;
use crate::types::TaxRate;

// =============================================================================
// Money Type
// =============================================================================

/// Represents a monetary value in the smallest currency unit (cents for USD).
///
/// ## Where Money is Used
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │  LineItem.unit_price ──► Cart.subtotal ──┐                              │
/// │                                          ├──► PricingAggregator         │
/// │  DeliveryCostResult.delivery_cost ───────┘        │                     │
/// │                                                   ▼                     │
/// │                                  PricingBreakdown { tax, total }        │
/// │                                                   │                     │
/// │                                                   ▼                     │
/// │                                  handoff payload `amount`               │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from cents (the smallest currency unit).
    ///
    /// ## Example
    /// ```rust
    /// use storefront_core::money::Money;
    ///
    /// let price = Money::from_cents(1099); // Represents $10.99
    /// assert_eq!(price.cents(), 1099);
    /// ```
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Creates a Money value from major and minor units (dollars and cents).
    ///
    /// For negative amounts, only the major unit should be negative.
    /// `from_major_minor(-5, 50)` = -$5.50, not -$4.50
    #[inline]
    pub const fn from_major_minor(major: i64, minor: i64) -> Self {
        if major < 0 {
            Money(major * 100 - minor)
        } else {
            Money(major * 100 + minor)
        }
    }

    /// Converts a JSON "major unit" number (e.g. `49.99`) into Money.
    ///
    /// Only for the wire boundary. Rounds to the nearest cent and rejects
    /// NaN, infinities and values that do not fit in i64 cents.
    ///
    /// ```rust
    /// use storefront_core::money::Money;
    ///
    /// assert_eq!(Money::try_from_major_units(49.99).unwrap().cents(), 4999);
    /// assert!(Money::try_from_major_units(f64::NAN).is_err());
    /// ```
    pub fn try_from_major_units(value: f64) -> Result<Self, CoreError> {
        let cents = (value * 100.0).round();
        if !cents.is_finite() || cents.abs() >= i64::MAX as f64 {
            return Err(CoreError::InvalidAmount {
                reason: format!("{value} is not a representable amount"),
            });
        }
        Ok(Money(cents as i64))
    }

    /// Converts to a JSON "major unit" number. Wire boundary only.
    #[inline]
    pub fn to_major_units(&self) -> f64 {
        self.0 as f64 / 100.0
    }

    /// Returns the value in cents (smallest currency unit).
    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Returns the major unit (dollars) portion.
    #[inline]
    pub const fn dollars(&self) -> i64 {
        self.0 / 100
    }

    /// Returns the minor unit (cents) portion (always 0-99).
    #[inline]
    pub const fn cents_part(&self) -> i64 {
        (self.0 % 100).abs()
    }

    /// Returns zero money value.
    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    /// Checks if the value is zero.
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Checks if the value is positive (greater than zero).
    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    /// Checks if the value is negative (less than zero).
    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Calculates tax rounded to a whole currency unit (round half up).
    ///
    /// ## Rounding
    /// ```text
    /// ┌─────────────────────────────────────────────────────────────────────┐
    /// │  tax = round(amount × rate)   ← whole dollars                      │
    /// │                                                                     │
    /// │  $1200.00 × 9.75% = $117.000  →  $117                               │
    /// │  $ 550.00 × 9.75% = $ 53.625  →  $ 54                               │
    /// │  $  10.00 × 9.75% = $  0.975  →  $  1                               │
    /// │                                                                     │
    /// │  Integer math: cents × bps gives 1/1_000_000 of a dollar.           │
    /// │  Adding 500_000 before dividing rounds half up.                     │
    /// └─────────────────────────────────────────────────────────────────────┘
    /// ```
    ///
    /// ## Example
    /// ```rust
    /// use storefront_core::money::Money;
    /// use storefront_core::types::TaxRate;
    ///
    /// let taxable = Money::from_cents(55_000); // $550.00
    /// let tax = taxable.calculate_tax(TaxRate::from_bps(975));
    /// assert_eq!(tax.cents(), 5_400); // $54
    /// ```
    pub fn calculate_tax(&self, rate: TaxRate) -> Money {
        const MICRO_DOLLARS: i128 = 1_000_000;

        // Use i128 to prevent overflow on large amounts
        let scaled = self.0 as i128 * rate.bps() as i128;
        let whole = if scaled >= 0 {
            (scaled + MICRO_DOLLARS / 2) / MICRO_DOLLARS
        } else {
            (scaled - MICRO_DOLLARS / 2) / MICRO_DOLLARS
        };
        Money::from_cents((whole * 100) as i64)
    }

    /// Multiplies money by a quantity.
    ///
    /// ```rust
    /// use storefront_core::money::Money;
    ///
    /// let unit_price = Money::from_cents(299);
    /// assert_eq!(unit_price.multiply_quantity(3).cents(), 897);
    /// ```
    #[inline]
    pub const fn multiply_quantity(&self, qty: i64) -> Self {
        Money(self.0 * qty)
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Display shows money as `$1234.56` (no digit grouping).
///
/// ## Note
/// This is for logs and CLI output. The storefront formats for display itself.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(
            f,
            "{}${}.{:02}",
            sign,
            self.dollars().abs(),
            self.cents_part()
        )
    }
}

impl Default for Money {
    fn default() -> Self {
        Money::zero()
    }
}

impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Money(self.0 + other.0)
    }
}

impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0 - other.0)
    }
}

impl SubAssign for Money {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.0 -= other.0;
    }
}

impl Mul<i64> for Money {
    type Output = Self;

    #[inline]
    fn mul(self, qty: i64) -> Self {
        Money(self.0 * qty)
    }
}

impl std::iter::Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), Add::add)
    }
}

// =============================================================================
// Wire Format
// =============================================================================

/// Serde adapter that writes Money as a JSON number of major units.
///
/// The delivery service and the payment step both exchange plain numbers
/// (`"delivery_cost": 50`), so fields crossing the wire use
/// `#[serde(with = "storefront_core::money::major_units")]`.
pub mod major_units {
    use super::Money;
    use serde::{de::Error as _, Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(money: &Money, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_f64(money.to_major_units())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Money, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = f64::deserialize(deserializer)?;
        Money::try_from_major_units(value).map_err(D::Error::custom)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
