//! # Settlement Errors
//!
//! Error types for checkout settlement and its components.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        SettlementError                                  │
//! │                                                                         │
//! │   Caller-fixable                      System                            │
//! │   ──────────────                      ──────                            │
//! │   InvalidItems ◄── ValidationError    CodeSpaceExhausted                │
//! │   InsufficientStock                   TierLookupFailure ◄── CoreError   │
//! │   SkuUnavailable                      Database ◄── DbError ◄── sqlx     │
//! │   PromotionUnavailable ◄── PromotionError   Internal ◄── CoreError      │
//! │   CustomerNotFound / StaffNotFound / BillNotFound                       │
//! │                                                                         │
//! │   Every variant aborts the settlement transaction.                      │
//! │   Only bill code collisions are retried internally.                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! [`SettlementError::to_response`] turns any of these into a serializable
//! [`ErrorResponse`] for the checkout controller.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::error;
use ts_rs::TS;

use crate::error::DbError;
use atelier_core::{CoreError, ValidationError};

// =============================================================================
// Promotion Error
// =============================================================================

/// Why a promotion code could not be redeemed.
#[derive(Debug, Error)]
pub enum PromotionError {
    /// No promotion has this code.
    #[error("Promotion not found: {0}")]
    NotFound(String),

    /// The promotion is disabled, not started yet, or has no uses left.
    #[error("Promotion is not available: {0}")]
    NotAvailable(String),

    /// The end day has passed. The promotion has been disabled.
    ///
    /// ## When This Occurs
    /// - First redemption attempt after `end_day`; no use is consumed
    #[error("Promotion {code} expired on {end_day}")]
    Expired { code: String, end_day: NaiveDate },

    #[error("Database error: {0}")]
    Database(#[from] DbError),
}

impl From<sqlx::Error> for PromotionError {
    fn from(err: sqlx::Error) -> Self {
        PromotionError::Database(err.into())
    }
}

// =============================================================================
// Settlement Error
// =============================================================================

/// Errors raised while settling or voiding a bill.
#[derive(Debug, Error)]
pub enum SettlementError {
    /// The item list is empty, too long, or has a bad line.
    #[error("Invalid items: {0}")]
    InvalidItems(#[from] ValidationError),

    /// A line asks for more units than are on hand.
    #[error("Insufficient stock for {pricing_id}: {available} available, {requested} requested")]
    InsufficientStock {
        pricing_id: String,
        available: i64,
        requested: i64,
    },

    /// The SKU does not exist or is disabled.
    #[error("SKU not available: {0}")]
    SkuUnavailable(String),

    #[error("Promotion unavailable: {0}")]
    PromotionUnavailable(PromotionError),

    /// Every bill code drawn was already taken.
    ///
    /// ## When This Occurs
    /// - The code space is close to full, or the random source is broken
    #[error("Bill code space exhausted after {attempts} attempts")]
    CodeSpaceExhausted { attempts: u32 },

    /// Tier data is inconsistent: a threshold or customer names a missing
    /// tier.
    #[error("Tier lookup failed: {0}")]
    TierLookupFailure(String),

    #[error("Customer not found: {0}")]
    CustomerNotFound(String),

    /// Unknown or inactive staff account.
    #[error("Staff not found or inactive: {0}")]
    StaffNotFound(String),

    #[error("Bill not found: {0}")]
    BillNotFound(String),

    #[error("Database error: {0}")]
    Database(#[from] DbError),

    /// A domain rule failed in a way no caller input explains, e.g. a
    /// stored bill code that does not parse.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<PromotionError> for SettlementError {
    fn from(err: PromotionError) -> Self {
        match err {
            PromotionError::Database(e) => SettlementError::Database(e),
            other => SettlementError::PromotionUnavailable(other),
        }
    }
}

impl From<sqlx::Error> for SettlementError {
    fn from(err: sqlx::Error) -> Self {
        SettlementError::Database(err.into())
    }
}

impl From<CoreError> for SettlementError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Validation(e) => SettlementError::InvalidItems(e),
            err @ CoreError::TierNotFound(_) => SettlementError::TierLookupFailure(err.to_string()),
            err @ (CoreError::InvalidBillCode(_) | CoreError::SerialOutOfRange(_)) => {
                SettlementError::Internal(err.to_string())
            }
        }
    }
}

/// Who has to act to get past an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum FailureClass {
    /// The request can be fixed and retried (stock, promotion, items).
    Caller,
    /// Needs an operator (data integrity, code space, database).
    System,
}

/// Machine-readable error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[ts(export)]
pub enum ErrorCode {
    InvalidItems,
    InsufficientStock,
    SkuUnavailable,
    PromotionUnavailable,
    CodeSpaceExhausted,
    TierLookupFailure,
    CustomerNotFound,
    StaffNotFound,
    BillNotFound,
    DatabaseError,
    InternalError,
}

/// Serializable error for the checkout controller.
///
/// ## Usage in Frontend
/// ```typescript
/// if (err.class === 'caller') {
///   showToast(err.message);        // e.g. INSUFFICIENT_STOCK
/// } else {
///   reportIncident(err.code);      // e.g. TIER_LOOKUP_FAILURE
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ErrorResponse {
    pub code: ErrorCode,
    pub class: FailureClass,
    pub message: String,
}

impl SettlementError {
    pub fn code(&self) -> ErrorCode {
        match self {
            SettlementError::InvalidItems(_) => ErrorCode::InvalidItems,
            SettlementError::InsufficientStock { .. } => ErrorCode::InsufficientStock,
            SettlementError::SkuUnavailable(_) => ErrorCode::SkuUnavailable,
            SettlementError::PromotionUnavailable(_) => ErrorCode::PromotionUnavailable,
            SettlementError::CodeSpaceExhausted { .. } => ErrorCode::CodeSpaceExhausted,
            SettlementError::TierLookupFailure(_) => ErrorCode::TierLookupFailure,
            SettlementError::CustomerNotFound(_) => ErrorCode::CustomerNotFound,
            SettlementError::StaffNotFound(_) => ErrorCode::StaffNotFound,
            SettlementError::BillNotFound(_) => ErrorCode::BillNotFound,
            SettlementError::Database(_) => ErrorCode::DatabaseError,
            SettlementError::Internal(_) => ErrorCode::InternalError,
        }
    }

    pub fn class(&self) -> FailureClass {
        match self {
            SettlementError::CodeSpaceExhausted { .. }
            | SettlementError::TierLookupFailure(_)
            | SettlementError::Database(_)
            | SettlementError::Internal(_) => FailureClass::System,
            _ => FailureClass::Caller,
        }
    }

    /// Builds the controller-facing response.
    ///
    /// Database details are logged, not returned.
    pub fn to_response(&self) -> ErrorResponse {
        let message = match self {
            SettlementError::Database(e) => {
                error!("Settlement database failure: {}", e);
                "Database operation failed".to_string()
            }
            other => other.to_string(),
        };

        ErrorResponse {
            code: self.code(),
            class: self.class(),
            message,
        }
    }
}

/// Result type for settlement operations.
pub type SettlementResult<T> = Result<T, SettlementError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_promotion_error_wrapping() {
        let err: SettlementError = PromotionError::NotFound("SALE".to_string()).into();
        assert!(matches!(err, SettlementError::PromotionUnavailable(_)));
        assert_eq!(err.class(), FailureClass::Caller);

        let err: SettlementError = PromotionError::Database(DbError::PoolExhausted).into();
        assert!(matches!(err, SettlementError::Database(_)));
        assert_eq!(err.class(), FailureClass::System);
    }

    #[test]
    fn test_core_error_mapping() {
        let err: SettlementError = CoreError::TierNotFound("gold".to_string()).into();
        assert_eq!(err.code(), ErrorCode::TierLookupFailure);
        assert_eq!(err.class(), FailureClass::System);

        let err: SettlementError = CoreError::InvalidBillCode("HD-12".to_string()).into();
        assert!(matches!(err, SettlementError::Internal(_)));
        assert_eq!(err.code(), ErrorCode::InternalError);
        assert_eq!(err.class(), FailureClass::System);

        let err: SettlementError = CoreError::SerialOutOfRange(1_000_000).into();
        assert_eq!(err.code(), ErrorCode::InternalError);

        let err: SettlementError = CoreError::Validation(ValidationError::Required {
            field: "items".to_string(),
        })
        .into();
        assert_eq!(err.code(), ErrorCode::InvalidItems);
    }

    #[test]
    fn test_response_serialization() {
        let err = SettlementError::InsufficientStock {
            pricing_id: "sku-1".to_string(),
            available: 2,
            requested: 3,
        };
        let json = serde_json::to_value(err.to_response()).unwrap();
        assert_eq!(json["code"], "INSUFFICIENT_STOCK");
        assert_eq!(json["class"], "caller");
        assert_eq!(
            json["message"],
            "Insufficient stock for sku-1: 2 available, 3 requested"
        );

        let hidden = SettlementError::Database(DbError::QueryFailed("secret".to_string()));
        let response = hidden.to_response();
        assert_eq!(response.class, FailureClass::System);
        assert!(!response.message.contains("secret"));
    }
}
