//! # Validation Module
//!
//! Checkout input validation, run before any database statement.
//!
//! ## Validation Layers
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Layer 1: THIS MODULE                                                  │
//! │  ├── items non-empty, bounded                                          │
//! │  └── every quantity > 0                                                │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: Settlement transaction                                       │
//! │  └── conditional UPDATEs (stock >= qty, promotion budget > 0)          │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  ├── CHECK (quantity >= 0), CHECK (accumulated_points >= 0)            │
//! │  ├── UNIQUE (bills.code)                                               │
//! │  └── Foreign key constraints                                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use crate::error::ValidationError;
use crate::types::LineRequest;
use crate::{MAX_BILL_LINES, MAX_LINE_QUANTITY};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Validates a line quantity.
///
/// ## Rules
/// - Must be positive (> 0)
/// - Must not exceed MAX_LINE_QUANTITY (999)
pub fn validate_quantity(field: &str, qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: field.to_string(),
        });
    }

    if qty > MAX_LINE_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 1,
            max: MAX_LINE_QUANTITY,
        });
    }

    Ok(())
}

/// Validates a required identifier is present.
pub fn validate_id(field: &str, id: &str) -> ValidationResult<()> {
    if id.trim().is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }
    Ok(())
}

/// Validates the lines of a checkout request.
///
/// ## User Workflow
/// ```text
/// settle(customer, staff, items, promo)
///      │
///      ▼
/// validate_items(items) ← THIS FUNCTION
///      │
///      ├── empty?            → "items is required"
///      ├── > 100 lines?      → "items must be between 1 and 100"
///      ├── blank pricing id? → "items[i].pricing_id is required"
///      ├── quantity <= 0?    → "items[i].quantity must be positive"
///      │
///      └── OK → open the settlement transaction
/// ```
pub fn validate_items(items: &[LineRequest]) -> ValidationResult<()> {
    if items.is_empty() {
        return Err(ValidationError::Required {
            field: "items".to_string(),
        });
    }

    if items.len() > MAX_BILL_LINES {
        return Err(ValidationError::OutOfRange {
            field: "items".to_string(),
            min: 1,
            max: MAX_BILL_LINES as i64,
        });
    }

    for (i, line) in items.iter().enumerate() {
        validate_id(&format!("items[{i}].pricing_id"), &line.pricing_id)?;
        validate_quantity(&format!("items[{i}].quantity"), line.quantity)?;
    }

    Ok(())
}
