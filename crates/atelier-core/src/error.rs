//! # Error Types
//!
//! Domain-specific error types for atelier-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  atelier-core errors (this file)                                       │
//! │  ├── CoreError        - Domain rule failures (tier table, codes)       │
//! │  └── ValidationError  - Checkout input failures                        │
//! │                                                                         │
//! │  atelier-db errors                                                     │
//! │  ├── DbError          - Database operation failures                    │
//! │  ├── PromotionError   - Redemption failures                            │
//! │  └── SettlementError  - What the checkout controller sees              │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → SettlementError → ErrorResponse   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// A threshold or customer points at a tier that does not exist.
    ///
    /// ## When This Occurs
    /// - `required_bills.customer_type_id` refers to a deleted tier
    /// - A customer row references an unknown tier
    #[error("Customer tier not found: {0}")]
    TierNotFound(String),

    /// A string is not a valid bill code (`HD-` followed by 6 digits).
    #[error("Invalid bill code '{0}': expected HD- followed by 6 digits")]
    InvalidBillCode(String),

    /// A bill code serial is outside 0..=999999.
    #[error("Bill code serial {0} is out of range")]
    SerialOutOfRange(u32),

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These errors occur when a checkout request doesn't meet requirements.
/// Raised before any database statement runs.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Invalid format (e.g., invalid UUID).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;
