//! # atelier-core: Pure Settlement Rules for the Atelier Back Office
//!
//! This crate holds the business rules behind checkout settlement and
//! customer loyalty, as pure functions with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     Atelier Back Office Architecture                    │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │              Checkout controller (outside workspace)            │   │
//! │  │     customer id, staff principal, (sku, qty)[], promo code      │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │           atelier-db (SettlementEngine, repositories)           │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │              ★ atelier-core (THIS CRATE) ★                      │   │
//! │  │                                                                 │   │
//! │  │   ┌──────────┐ ┌──────────┐ ┌──────────┐ ┌──────────────────┐  │   │
//! │  │   │  types   │ │  money   │ │   code   │ │     loyalty      │  │   │
//! │  │   │ Pricing  │ │  Money   │ │ BillCode │ │ lifetime spend   │  │   │
//! │  │   │ Promotion│ │ Discount │ │ HD-NNNNNN│ │ tier selection   │  │   │
//! │  │   └──────────┘ └──────────┘ └──────────┘ └──────────────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO RANDOMNESS • PURE FUNCTIONS        │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain entities (Pricing, Promotion, Customer, Bill, ...)
//! - [`money`] - Integer money and discount rates
//! - [`code`] - Bill code format (`HD-` + 6 digits)
//! - [`loyalty`] - Lifetime spend, tier selection, point accrual
//! - [`error`] - Domain error types
//! - [`validation`] - Checkout input validation
//!
//! ## Example Usage
//!
//! ```rust
//! use atelier_core::money::{DiscountRate, Money};
//! use atelier_core::loyalty::loyalty_points;
//!
//! let raw = Money::from_minor(110_000);
//! assert_eq!(loyalty_points(raw, atelier_core::POINTS_DIVISOR), 1);
//!
//! let tier = DiscountRate::from_bps(1_000); // 10%
//! assert_eq!(raw.apply_discount(tier).minor(), 99_000);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod code;
pub mod error;
pub mod loyalty;
pub mod money;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use code::BillCode;
pub use error::{CoreError, CoreResult, ValidationError};
pub use money::{DiscountRate, Money, PromotionDiscount, PromotionRate};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Raw spend (in minor units) that earns one loyalty point.
///
/// A bill of 110,000 earns 1 point; 99,999 earns none.
pub const POINTS_DIVISOR: i64 = 100_000;

/// Default ceiling on bill code draws before giving up.
pub const DEFAULT_BILL_CODE_ATTEMPTS: u32 = 32;

/// Maximum distinct lines in a single bill.
pub const MAX_BILL_LINES: usize = 100;

/// Maximum quantity of a single line.
pub const MAX_LINE_QUANTITY: i64 = 999;
