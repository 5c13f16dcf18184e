//! # Settlement Module
//!
//! Checkout settlement and the components it runs inside one transaction.
//!
//! ## Components
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       SettlementEngine (engine.rs)                      │
//! │                                                                         │
//! │   ┌──────────────────┐ ┌────────────────┐ ┌──────────────────────────┐ │
//! │   │ PromotionRedeemer│ │  StockLedger   │ │     BillCodeMinter       │ │
//! │   │  one use per     │ │  conditional   │ │  HD-NNNNNN, bounded      │ │
//! │   │  checkout        │ │  decrement     │ │  retries                 │ │
//! │   └──────────────────┘ └────────────────┘ └──────────────────────────┘ │
//! │                                                                         │
//! │   ┌──────────────────────────────────────────────────────────────────┐ │
//! │   │ LoyaltyRecalculator: lifetime spend ──► tier upgrade             │ │
//! │   └──────────────────────────────────────────────────────────────────┘ │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Each component has a connection-scoped `*_in` form the engine calls on
//! its transaction, and a pool-backed form for standalone use.

pub mod engine;
pub mod error;
pub mod ledger;
pub mod loyalty;
pub mod minter;
pub mod redeemer;

pub use engine::{SettlementEngine, SettlementRequest};
pub use error::{
    ErrorCode, ErrorResponse, FailureClass, PromotionError, SettlementError, SettlementResult,
};
pub use ledger::StockLedger;
pub use loyalty::LoyaltyRecalculator;
pub use minter::{BillCodeMinter, CodeSource, ThreadRngSource};
pub use redeemer::PromotionRedeemer;
