//! # Money Module
//!
//! Integer money plus the two kinds of discount the shop applies:
//! customer-tier rates and promotion codes.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  Lifetime spend is summed over every bill a customer ever paid.        │
//! │  With doubles, 0.1-style rounding noise accumulates and a customer     │
//! │  sitting exactly on a tier threshold can land a hair below it.         │
//! │                                                                         │
//! │  OUR SOLUTION: whole minor units (i64), integer rates                   │
//! │    tier discounts    basis points       (1 bps = 0.01%)                │
//! │    promotion rates   parts per trillion (12 decimal places)            │
//! │    200,000 × 10% = 20,000 exactly → 180,000                           │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Promotion Discount Encoding
//! A promotion stores a single number:
//! ```text
//!   0 <= value < 1   → percentage  (0.1  = 10% off the bill)
//!   value >= 1       → flat amount (50000 = 50,000 off, floored at zero)
//! ```
//!
//! ## Overflow
//! Line totals and bill totals go through [`Money::checked_multiply_quantity`]
//! and [`Money::checked_add`]. The operator impls saturate at the `i64`
//! bounds instead of wrapping.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul, Sub, SubAssign};
use ts_rs::TS;

/// Basis points in 100%.
const BPS_SCALE: i128 = 10_000;

/// Promotion rate units in 100%.
const RATE_SCALE: i128 = 1_000_000_000_000;

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in the smallest currency unit the shop prices in.
///
/// ## Where Money is Used
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │  Pricing.price ──► BillItem.unit_price ──► BillItem.line_total          │
/// │                                                  │                      │
/// │                              Σ line totals = raw bill total             │
/// │                                   │                      │              │
/// │                       points = raw / 100,000    promotion discount      │
/// │                                                          │              │
/// │                                                   tier discount         │
/// │                                                          │              │
/// │                                              adjusted bill total        │
/// │                                                          │              │
/// │                                Σ adjusted totals = lifetime spend       │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from minor units.
    ///
    /// ## Example
    /// ```rust
    /// use atelier_core::money::Money;
    ///
    /// let price = Money::from_minor(250_000);
    /// assert_eq!(price.minor(), 250_000);
    /// ```
    #[inline]
    pub const fn from_minor(amount: i64) -> Self {
        Money(amount)
    }

    /// Returns the value in minor units.
    #[inline]
    pub const fn minor(&self) -> i64 {
        self.0
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

    /// Checks if the value is negative (less than zero).
    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Multiplies a unit price by a line quantity.
    ///
    /// Returns `None` when the line total does not fit in an `i64`.
    ///
    /// ## Example
    /// ```rust
    /// use atelier_core::money::Money;
    ///
    /// let unit_price = Money::from_minor(50_000);
    /// assert_eq!(unit_price.checked_multiply_quantity(3), Some(Money::from_minor(150_000)));
    /// assert_eq!(Money::from_minor(i64::MAX).checked_multiply_quantity(2), None);
    /// ```
    #[inline]
    pub const fn checked_multiply_quantity(&self, qty: i64) -> Option<Self> {
        match self.0.checked_mul(qty) {
            Some(total) => Some(Money(total)),
            None => None,
        }
    }

    /// Adds `other`, or `None` on overflow.
    #[inline]
    pub const fn checked_add(&self, other: Money) -> Option<Self> {
        match self.0.checked_add(other.0) {
            Some(total) => Some(Money(total)),
            None => None,
        }
    }

    /// Returns the portion of this amount taken off by `rate`.
    ///
    /// Rounds half up: `(amount * bps + 5000) / 10000`.
    pub fn discount_amount(&self, rate: DiscountRate) -> Money {
        let off = (self.0 as i128 * rate.bps() as i128 + BPS_SCALE / 2) / BPS_SCALE;
        Money::from_minor(off as i64)
    }

    /// Applies a percentage discount and returns the discounted amount.
    ///
    /// ## Example
    /// ```rust
    /// use atelier_core::money::{DiscountRate, Money};
    ///
    /// let subtotal = Money::from_minor(200_000);
    /// let discounted = subtotal.apply_discount(DiscountRate::from_bps(1_000));
    /// assert_eq!(discounted.minor(), 180_000);
    /// ```
    pub fn apply_discount(&self, rate: DiscountRate) -> Money {
        *self - self.discount_amount(rate)
    }

    /// Subtracts `other`, flooring the result at zero.
    #[inline]
    pub fn saturating_sub(&self, other: Money) -> Money {
        Money(self.0.saturating_sub(other.0).max(0))
    }
}

// =============================================================================
// Discount Rate
// =============================================================================

/// A percentage discount in basis points (1 bps = 0.01%).
///
/// Customer tiers store their discount this way (`discount_bps`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct DiscountRate(u32);

impl DiscountRate {
    /// Creates a rate from basis points (1000 = 10%).
    #[inline]
    pub const fn from_bps(bps: u32) -> Self {
        DiscountRate(bps)
    }

    /// Returns the rate in basis points.
    #[inline]
    pub const fn bps(&self) -> u32 {
        self.0
    }

    /// Zero discount.
    #[inline]
    pub const fn zero() -> Self {
        DiscountRate(0)
    }
}

impl Default for DiscountRate {
    fn default() -> Self {
        DiscountRate::zero()
    }
}

// =============================================================================
// Promotion Rate
// =============================================================================

/// A promotion percentage in parts per trillion.
///
/// Promotions store a free-form fraction, so the rate keeps 12 decimal
/// places of it instead of rounding to basis points. `0.12345` stays
/// 12.345%.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PromotionRate(u64);

impl PromotionRate {
    /// Creates a rate from a fraction (0.1 = 10%).
    ///
    /// Returns `None` for values outside `[0, 1]` or NaN.
    ///
    /// ```rust
    /// use atelier_core::money::PromotionRate;
    ///
    /// assert_eq!(PromotionRate::from_fraction(0.1).map(|r| r.parts()), Some(100_000_000_000));
    /// assert!(PromotionRate::from_fraction(1.5).is_none());
    /// ```
    pub fn from_fraction(fraction: f64) -> Option<Self> {
        if !(0.0..=1.0).contains(&fraction) {
            return None;
        }
        Some(PromotionRate((fraction * RATE_SCALE as f64).round() as u64))
    }

    /// Returns the rate in parts per trillion.
    #[inline]
    pub const fn parts(&self) -> u64 {
        self.0
    }

    /// The amount this rate takes off `total`, rounded half up once.
    pub fn discount_on(&self, total: Money) -> Money {
        let off = (total.0 as i128 * self.0 as i128 + RATE_SCALE / 2) / RATE_SCALE;
        Money::from_minor(off as i64)
    }
}

// =============================================================================
// Promotion Discount
// =============================================================================

/// The decoded discount of a promotion code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum PromotionDiscount {
    /// Percentage off the bill total.
    Percentage(PromotionRate),
    /// Fixed amount off the bill total, never below zero.
    Flat(Money),
}

impl PromotionDiscount {
    /// Decodes the stored promotion value.
    ///
    /// ```rust
    /// use atelier_core::money::{Money, PromotionDiscount, PromotionRate};
    ///
    /// assert_eq!(
    ///     PromotionDiscount::from_value(0.1),
    ///     PromotionRate::from_fraction(0.1).map(PromotionDiscount::Percentage)
    /// );
    /// assert_eq!(
    ///     PromotionDiscount::from_value(50_000.0),
    ///     Some(PromotionDiscount::Flat(Money::from_minor(50_000)))
    /// );
    /// assert_eq!(PromotionDiscount::from_value(-1.0), None);
    /// ```
    pub fn from_value(value: f64) -> Option<Self> {
        if !value.is_finite() || value < 0.0 {
            return None;
        }
        if value < 1.0 {
            PromotionRate::from_fraction(value).map(PromotionDiscount::Percentage)
        } else {
            Some(PromotionDiscount::Flat(Money::from_minor(value.round() as i64)))
        }
    }

    /// Returns how much this promotion takes off `total`.
    ///
    /// A flat discount larger than the total only takes off the total.
    pub fn discount_on(&self, total: Money) -> Money {
        match self {
            PromotionDiscount::Percentage(rate) => rate.discount_on(total),
            PromotionDiscount::Flat(amount) => (*amount).min(total.max(Money::zero())),
        }
    }

    /// Applies the promotion to `total`.
    pub fn apply(&self, total: Money) -> Money {
        total.saturating_sub(self.discount_on(total))
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Shows the amount with thousands separators, e.g. `1,250,000`.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let digits = self.0.unsigned_abs().to_string();
        let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
        for (i, ch) in digits.chars().enumerate() {
            if i > 0 && (digits.len() - i) % 3 == 0 {
                grouped.push(',');
            }
            grouped.push(ch);
        }
        if self.0 < 0 {
            write!(f, "-{}", grouped)
        } else {
            write!(f, "{}", grouped)
        }
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
        Money(self.0.saturating_add(other.0))
    }
}

impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 = self.0.saturating_add(other.0);
    }
}

impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0.saturating_sub(other.0))
    }
}

impl SubAssign for Money {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.0 = self.0.saturating_sub(other.0);
    }
}

impl Mul<i64> for Money {
    type Output = Self;

    #[inline]
    fn mul(self, qty: i64) -> Self {
        Money(self.0.saturating_mul(qty))
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), |acc, m| acc + m)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
