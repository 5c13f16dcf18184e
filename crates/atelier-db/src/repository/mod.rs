//! # Repository Module
//!
//! Database repository implementations for the settlement schema.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Two Ways In                                          │
//! │                                                                         │
//! │  Pool-backed (standalone reads / admin writes)                         │
//! │     db.customers().get_by_id(id)                                       │
//! │        └── acquires a pooled connection per call                       │
//! │                                                                         │
//! │  Connection-scoped (inside the settlement transaction)                 │
//! │     CustomerRepository::add_points_in(&mut *tx, id, points)            │
//! │        └── runs on the caller's connection, commits with the caller    │
//! │                                                                         │
//! │  Every `*_in` function takes `&mut SqliteConnection`, so it works      │
//! │  equally on a `Transaction` (`&mut *tx`) or a pooled connection.       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`PricingRepository`](pricing::PricingRepository) - SKU reads and inserts
//! - [`PromotionRepository`](promotion::PromotionRepository) - Promotion lookups
//! - [`CustomerRepository`](customer::CustomerRepository) - Points and tier reference
//! - [`TierRepository`](tier::TierRepository) - Tiers and spend thresholds
//! - [`StaffRepository`](staff::StaffRepository) - Bill owners
//! - [`BillRepository`](bill::BillRepository) - Bills and their items

pub mod bill;
pub mod customer;
pub mod pricing;
pub mod promotion;
pub mod staff;
pub mod tier;

/// Generates a new entity ID.
pub fn generate_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

// =============================================================================
// Test Fixtures
// =============================================================================
