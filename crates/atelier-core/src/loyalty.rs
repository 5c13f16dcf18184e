//! # Loyalty Rules
//!
//! Lifetime spend, tier selection and point accrual.
//!
//! ## Recalculation Pipeline
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  for each historical bill:                                              │
//! │      raw      = Σ unit_price × quantity                                 │
//! │      after_p  = raw - promotion(raw)          (if code still resolves)  │
//! │      adjusted = after_p - tier(after_p)       (customer's CURRENT tier) │
//! │                                                                         │
//! │  lifetime spend = Σ adjusted                                            │
//! │                                                                         │
//! │  candidates = thresholds where lifetime spend >= required_spend         │
//! │  selected   = candidate tier with the HIGHEST discount                  │
//! │               (not the highest threshold; ties keep the first           │
//! │                threshold in (required_spend, id) order)                 │
//! │                                                                         │
//! │  upgrade only if selected discount > current discount                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Points come from the raw total only:
//! `points = floor(raw / POINTS_DIVISOR)`.

use std::collections::HashMap;

use crate::error::{CoreError, CoreResult};
use crate::money::{DiscountRate, Money, PromotionDiscount};
use crate::types::{CustomerType, RequiredBill};

/// What one historical bill contributes to lifetime spend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BillSpend {
    pub raw_total: Money,
    /// The bill's promotion, when its code still resolves to a valid discount.
    pub promotion: Option<PromotionDiscount>,
}

/// Applies the promotion first, then the tier discount on what is left.
///
/// ```rust
/// use atelier_core::loyalty::adjusted_bill_total;
/// use atelier_core::money::{DiscountRate, Money, PromotionDiscount};
///
/// let promo = PromotionDiscount::from_value(0.1);
/// let total = adjusted_bill_total(Money::from_minor(200_000), promo, DiscountRate::from_bps(500));
/// // 200,000 → 180,000 → 171,000
/// assert_eq!(total.minor(), 171_000);
/// ```
pub fn adjusted_bill_total(
    raw_total: Money,
    promotion: Option<PromotionDiscount>,
    tier: DiscountRate,
) -> Money {
    let after_promotion = match promotion {
        Some(discount) => discount.apply(raw_total),
        None => raw_total,
    };
    after_promotion.apply_discount(tier)
}

/// Sums the adjusted totals of every bill at the given tier discount.
pub fn lifetime_spend(bills: &[BillSpend], tier: DiscountRate) -> Money {
    bills
        .iter()
        .map(|b| adjusted_bill_total(b.raw_total, b.promotion, tier))
        .sum()
}

/// Loyalty points earned by a raw (pre-discount) bill total.
///
/// A non-positive divisor earns nothing.
pub fn loyalty_points(raw_total: Money, divisor: i64) -> i64 {
    if divisor <= 0 || raw_total.minor() <= 0 {
        return 0;
    }
    raw_total.minor() / divisor
}

/// Picks the tier a customer with `spend` qualifies for.
///
/// Among thresholds with `spend >= required_spend` the tier with the highest
/// discount wins; on equal discounts the first threshold in
/// `(required_spend, id)` order is kept. Returns `Ok(None)` when no threshold
/// is met, including when no thresholds are configured at all.
///
/// ## Errors
/// - [`CoreError::TierNotFound`] when a threshold names an unknown tier,
///   even if that threshold is not met
pub fn select_tier<'a>(
    spend: Money,
    thresholds: &[RequiredBill],
    tiers: &'a HashMap<String, CustomerType>,
) -> CoreResult<Option<&'a CustomerType>> {
    let mut ordered: Vec<&RequiredBill> = thresholds.iter().collect();
    ordered.sort_by(|a, b| {
        a.required_spend
            .cmp(&b.required_spend)
            .then_with(|| a.id.cmp(&b.id))
    });

    let mut best: Option<&'a CustomerType> = None;
    for threshold in ordered {
        let tier = tiers
            .get(&threshold.customer_type_id)
            .ok_or_else(|| CoreError::TierNotFound(threshold.customer_type_id.clone()))?;

        if spend < threshold.required_spend() {
            continue;
        }

        match best {
            Some(current) if tier.discount_bps <= current.discount_bps => {}
            _ => best = Some(tier),
        }
    }

    Ok(best)
}

/// Returns the tier to move to, if any.
///
/// Only a strictly larger discount counts as an upgrade. Anything else keeps
/// the current tier, so repeated recalculation never flips a customer back.
pub fn tier_upgrade<'a>(
    current: &CustomerType,
    selected: Option<&'a CustomerType>,
) -> Option<&'a CustomerType> {
    selected.filter(|candidate| {
        candidate.id != current.id && candidate.discount_bps > current.discount_bps
    })
}
