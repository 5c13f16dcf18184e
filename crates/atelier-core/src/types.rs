//! # Domain Types
//!
//! Entities touched by checkout settlement.
//!
//! ## Type Map
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │   Staff ◄──── Bill ────► Customer ────► CustomerType ◄···· RequiredBill │
//! │   (owner)      │  ╲        points         discount_bps     (threshold,  │
//! │                │   ╲                                        logical    │
//! │           BillItem  promotion_code ···► Promotion            link)     │
//! │           (owned,   (free text)         discount, window,               │
//! │            cascade)                     quantity, enabled               │
//! │                │                                                        │
//! │                ▼                                                        │
//! │             Pricing (SKU): price, quantity ≥ 0, enabled                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Dual-Key Identity Pattern
//! Every entity has:
//! - `id`: UUID v4 - immutable, used for database relations
//! - Business code: (`code` on SKUs, promotions, customers and bills) - human-readable

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::{DiscountRate, Money, PromotionDiscount};

// =============================================================================
// Pricing (SKU)
// =============================================================================

/// A priced, sized, colored sellable unit.
///
/// `quantity` is owned by the stock ledger; nothing else writes it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Pricing {
    pub id: String,
    /// Unique SKU code, e.g. `TSHIRT-BLK-M`.
    pub code: String,
    pub product_name: String,
    pub size: Option<String>,
    pub color: Option<String>,
    /// Unit price in minor units (≥ 0).
    pub price: i64,
    /// Units on hand (never negative).
    pub quantity: i64,
    pub enabled: bool,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Pricing {
    #[inline]
    pub fn price(&self) -> Money {
        Money::from_minor(self.price)
    }
}

// =============================================================================
// Promotion
// =============================================================================

/// Outcome of checking a promotion against today's date, before redeeming.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedemptionCheck {
    /// One use can be consumed.
    Redeemable,
    /// `enabled = false`.
    Disabled,
    /// End day is strictly before today; the promotion must be disabled.
    Expired,
    /// Start day is after today.
    NotStarted,
    /// Enabled but no uses left.
    Exhausted,
}

/// A promotion code with a usage budget and optional date window.
///
/// ## Lifecycle
/// ```text
///   created (enabled) ──redeem──► quantity - 1 ──(quantity == 0)──► disabled
///          │                                                          ▲
///          └────────────── end_day < today on redeem ─────────────────┘
///   disabled is terminal
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Promotion {
    pub id: String,
    pub code: String,
    pub name: String,
    /// Raw stored discount: `< 1` is a fraction, `>= 1` is a flat amount.
    pub discount: f64,
    #[ts(as = "Option<String>")]
    pub start_day: Option<NaiveDate>,
    #[ts(as = "Option<String>")]
    pub end_day: Option<NaiveDate>,
    /// Remaining uses.
    pub quantity: i64,
    pub enabled: bool,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Promotion {
    /// Decoded discount, `None` when the stored value is negative or not finite.
    pub fn discount(&self) -> Option<PromotionDiscount> {
        PromotionDiscount::from_value(self.discount)
    }

    /// True when the end day is set and strictly before `today`.
    pub fn is_expired_on(&self, today: NaiveDate) -> bool {
        self.end_day.is_some_and(|end| end < today)
    }

    /// Evaluates the redemption rules for `today`.
    ///
    /// Disabled wins over everything, then expiry, then the start day,
    /// then the remaining budget.
    pub fn redemption_check(&self, today: NaiveDate) -> RedemptionCheck {
        if !self.enabled {
            RedemptionCheck::Disabled
        } else if self.is_expired_on(today) {
            RedemptionCheck::Expired
        } else if self.start_day.is_some_and(|start| start > today) {
            RedemptionCheck::NotStarted
        } else if self.quantity <= 0 {
            RedemptionCheck::Exhausted
        } else {
            RedemptionCheck::Redeemable
        }
    }
}

// =============================================================================
// Customer Tiers
// =============================================================================

/// A named discount bracket (CustomerType).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct CustomerType {
    pub id: String,
    pub name: String,
    /// Discount in basis points (0..=10000).
    pub discount_bps: u32,
}

impl CustomerType {
    #[inline]
    pub fn discount(&self) -> DiscountRate {
        DiscountRate::from_bps(self.discount_bps)
    }
}

/// Minimum lifetime spend to qualify for a tier.
///
/// Linked to its tier by `customer_type_id` only (no foreign key), so a
/// dangling threshold is possible and must be reported, not skipped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct RequiredBill {
    pub id: String,
    pub customer_type_id: String,
    pub required_spend: i64,
}

impl RequiredBill {
    #[inline]
    pub fn required_spend(&self) -> Money {
        Money::from_minor(self.required_spend)
    }
}

// =============================================================================
// Customer
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Customer {
    pub id: String,
    pub code: String,
    pub full_name: String,
    pub phone: Option<String>,
    /// Loyalty points (≥ 0).
    pub accumulated_points: i64,
    pub customer_type_id: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Staff
// =============================================================================

/// A staff account that can own bills.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Staff {
    pub id: String,
    pub username: String,
    pub display_name: String,
    pub is_active: bool,
}

/// The authenticated staff member performing a checkout.
///
/// Resolved by the caller's auth layer and passed in explicitly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct StaffPrincipal {
    pub staff_id: String,
    pub username: String,
}

impl StaffPrincipal {
    pub fn new(staff_id: impl Into<String>, username: impl Into<String>) -> Self {
        StaffPrincipal {
            staff_id: staff_id.into(),
            username: username.into(),
        }
    }
}

// =============================================================================
// Bill
// =============================================================================

/// A settled bill.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Bill {
    pub id: String,
    /// `HD-` + 6 digits, unique, immutable.
    pub code: String,
    #[ts(as = "String")]
    pub created_on: NaiveDate,
    pub staff_id: String,
    pub customer_id: String,
    /// Free text, not a foreign key.
    pub promotion_code: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

/// A line of a bill.
/// Uses snapshot pattern to freeze the SKU price at time of sale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct BillItem {
    pub id: String,
    pub bill_id: String,
    pub pricing_id: String,
    /// Unit price at time of sale (frozen).
    pub unit_price: i64,
    /// Quantity sold (> 0).
    pub quantity: i64,
    /// unit_price × quantity.
    pub line_total: i64,
    /// Order of the line within the bill.
    pub position: i64,
}

impl BillItem {
    #[inline]
    pub fn line_total(&self) -> Money {
        Money::from_minor(self.line_total)
    }
}

/// A bill together with its lines, in position order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct BillWithItems {
    pub bill: Bill,
    pub items: Vec<BillItem>,
}

impl BillWithItems {
    /// Σ(unit price × quantity) over the lines.
    pub fn raw_total(&self) -> Money {
        self.items.iter().map(BillItem::line_total).sum()
    }
}

// =============================================================================
// Checkout Requests & Results
// =============================================================================

/// One requested line of a checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct LineRequest {
    pub pricing_id: String,
    pub quantity: i64,
}

impl LineRequest {
    pub fn new(pricing_id: impl Into<String>, quantity: i64) -> Self {
        LineRequest {
            pricing_id: pricing_id.into(),
            quantity,
        }
    }
}

/// A customer moving from one tier to another.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TierChange {
    pub customer_id: String,
    pub from_tier_id: String,
    pub to_tier_id: String,
    pub to_tier_name: String,
    /// Discount-adjusted lifetime spend that triggered the change.
    pub lifetime_spend: i64,
}

/// What a successful settlement hands back to the checkout controller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SettlementReceipt {
    pub bill: Bill,
    pub items: Vec<BillItem>,
    /// Σ line totals before any discount.
    pub raw_total: i64,
    pub promotion_discount: i64,
    /// Tier discount at the customer's tier before this settlement.
    pub tier_discount: i64,
    pub payable_total: i64,
    pub points_added: i64,
    pub tier_change: Option<TierChange>,
}

impl SettlementReceipt {
    /// True when the settlement upgraded the customer's tier.
    pub fn tier_changed(&self) -> bool {
        self.tier_change.is_some()
    }
}

/// Result of voiding a bill.
///
/// Stock and points are given back; the tier and any redeemed promotion
/// are left as they are.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct VoidReceipt {
    pub bill_id: String,
    pub bill_code: String,
    /// Units returned to stock across all lines.
    pub units_released: i64,
    /// Points actually taken back (never more than the customer had).
    pub points_removed: i64,
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn promotion(enabled: bool, quantity: i64, start: Option<NaiveDate>, end: Option<NaiveDate>) -> Promotion {
        let now = Utc::now();
        Promotion {
            id: "p1".to_string(),
            code: "SALE10".to_string(),
            name: "Ten off".to_string(),
            discount: 0.1,
            start_day: start,
            end_day: end,
            quantity,
            enabled,
            created_at: now,
            updated_at: now,
        }
    }

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_redemption_check_order() {
        let today = day(2026, 3, 10);

        assert_eq!(
            promotion(true, 5, None, None).redemption_check(today),
            RedemptionCheck::Redeemable
        );
        assert_eq!(
            promotion(false, 5, None, Some(day(2026, 3, 1))).redemption_check(today),
            RedemptionCheck::Disabled
        );
        assert_eq!(
            promotion(true, 1, None, Some(day(2026, 3, 9))).redemption_check(today),
            RedemptionCheck::Expired
        );
        assert_eq!(
            promotion(true, 1, Some(day(2026, 3, 11)), None).redemption_check(today),
            RedemptionCheck::NotStarted
        );
        assert_eq!(
            promotion(true, 0, None, None).redemption_check(today),
            RedemptionCheck::Exhausted
        );
    }

    #[test]
    fn test_end_day_is_inclusive() {
        let today = day(2026, 3, 10);
        let promo = promotion(true, 1, Some(today), Some(today));
        assert!(!promo.is_expired_on(today));
        assert_eq!(promo.redemption_check(today), RedemptionCheck::Redeemable);
    }

    #[test]
    fn test_bill_raw_total() {
        let bill = Bill {
            id: "b1".to_string(),
            code: "HD-000001".to_string(),
            created_on: day(2026, 3, 10),
            staff_id: "s1".to_string(),
            customer_id: "c1".to_string(),
            promotion_code: None,
            created_at: Utc::now(),
        };
        let item = |price: i64, qty: i64, pos: i64| BillItem {
            id: format!("i{pos}"),
            bill_id: "b1".to_string(),
            pricing_id: format!("sku{pos}"),
            unit_price: price,
            quantity: qty,
            line_total: price * qty,
            position: pos,
        };
        let with_items = BillWithItems {
            bill,
            items: vec![item(50_000, 1, 0), item(60_000, 1, 1)],
        };
        assert_eq!(with_items.raw_total().minor(), 110_000);
    }
}
