//! # atelier-db: Persistence and Settlement for the Atelier Back Office
//!
//! SQLite storage (via sqlx) for SKUs, promotions, customers, tiers and bills,
//! plus the settlement engine that turns a checkout into a bill.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Atelier Settlement Data Flow                       │
//! │                                                                         │
//! │  Checkout controller (customer, staff principal, lines, promo code)    │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                   atelier-db (THIS CRATE)                       │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐   ┌───────────────┐   ┌──────────────────┐ │   │
//! │  │   │  settlement   │   │ repositories  │   │    Database      │ │   │
//! │  │   │               │   │               │   │   (pool.rs)      │ │   │
//! │  │   │ Engine        │──►│ Pricing       │──►│                  │ │   │
//! │  │   │ Ledger        │   │ Promotion     │   │ SqlitePool       │ │   │
//! │  │   │ Redeemer      │   │ Customer/Tier │   │ WAL, FKs on      │ │   │
//! │  │   │ Minter        │   │ Staff / Bill  │   │ migrations       │ │   │
//! │  │   │ Loyalty       │   │               │   │                  │ │   │
//! │  │   └───────────────┘   └───────────────┘   └──────────────────┘ │   │
//! │  │                                                                 │   │
//! │  │   rules (discounts, tiers, codes) come from atelier-core        │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite database (path from atelier.toml / ATELIER_DB_PATH)            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`config`] - Layered configuration (defaults, TOML, environment)
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - Repository implementations
//! - [`settlement`] - Settlement engine and its components
//!
//! ## Usage
//!
//! ```rust,ignore
//! use atelier_db::{AtelierConfig, Database, SettlementEngine, SettlementRequest};
//!
//! let config = AtelierConfig::load(None)?;
//! let db = Database::new(config.db_config()).await?;
//! let engine = SettlementEngine::new(&db, &config.settlement);
//!
//! let receipt = engine.settle(request).await?;
//! if let Some(change) = &receipt.tier_change {
//!     println!("upgraded to {}", change.to_tier_name);
//! }
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod config;
pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;
pub mod settlement;

// =============================================================================
// Re-exports
// =============================================================================

pub use config::{AtelierConfig, ConfigError, DatabaseSettings, SettlementSettings};
pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

// Repository re-exports for convenience
pub use repository::bill::BillRepository;
pub use repository::customer::CustomerRepository;
pub use repository::pricing::PricingRepository;
pub use repository::promotion::PromotionRepository;
pub use repository::staff::StaffRepository;
pub use repository::tier::TierRepository;

pub use settlement::{
    BillCodeMinter, CodeSource, ErrorCode, ErrorResponse, FailureClass, LoyaltyRecalculator,
    PromotionError, PromotionRedeemer, SettlementEngine, SettlementError, SettlementRequest,
    SettlementResult, StockLedger,
};
