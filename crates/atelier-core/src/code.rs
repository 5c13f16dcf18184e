//! # Bill Codes
//!
//! Human-readable bill identifiers of the fixed shape `HD-` + 6 digits.
//!
//! ```text
//!   serial 42      → HD-000042
//!   serial 999999  → HD-999999
//!   code space     = 10^6 codes
//! ```
//!
//! Drawing serials is the minter's job (atelier-db); this module only
//! owns the format.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{CoreError, CoreResult};

/// Prefix shared by every bill code.
pub const BILL_CODE_PREFIX: &str = "HD-";

/// Number of digits after the prefix.
pub const BILL_CODE_DIGITS: usize = 6;

/// Exclusive upper bound on serials (10^6).
pub const BILL_CODE_SPACE: u32 = 1_000_000;

/// A validated bill code.
///
/// Serialized as its plain string form; deserializing rejects malformed codes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct BillCode(String);

impl BillCode {
    /// Formats a serial in `0..1_000_000` as a bill code.
    ///
    /// ```rust
    /// use atelier_core::BillCode;
    ///
    /// assert_eq!(BillCode::from_serial(42).unwrap().as_str(), "HD-000042");
    /// assert!(BillCode::from_serial(1_000_000).is_err());
    /// ```
    pub fn from_serial(serial: u32) -> CoreResult<Self> {
        if serial >= BILL_CODE_SPACE {
            return Err(CoreError::SerialOutOfRange(serial));
        }
        Ok(BillCode(format!(
            "{}{:0width$}",
            BILL_CODE_PREFIX,
            serial,
            width = BILL_CODE_DIGITS
        )))
    }

    /// Formats any serial, reduced modulo the code space.
    pub fn from_serial_wrapping(serial: u32) -> Self {
        BillCode(format!(
            "{}{:0width$}",
            BILL_CODE_PREFIX,
            serial % BILL_CODE_SPACE,
            width = BILL_CODE_DIGITS
        ))
    }

    /// Parses and validates an existing code.
    pub fn parse(code: &str) -> CoreResult<Self> {
        let digits = code
            .strip_prefix(BILL_CODE_PREFIX)
            .ok_or_else(|| CoreError::InvalidBillCode(code.to_string()))?;

        if digits.len() != BILL_CODE_DIGITS || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(CoreError::InvalidBillCode(code.to_string()));
        }

        Ok(BillCode(code.to_string()))
    }

    /// Returns the numeric part.
    pub fn serial(&self) -> u32 {
        // Digits were validated on construction.
        self.0[BILL_CODE_PREFIX.len()..].parse().unwrap_or(0)
    }

    /// Returns the code as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BillCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for BillCode {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        BillCode::parse(s)
    }
}

impl TryFrom<String> for BillCode {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        BillCode::parse(&value)
    }
}

impl From<BillCode> for String {
    fn from(code: BillCode) -> Self {
        code.0
    }
}
