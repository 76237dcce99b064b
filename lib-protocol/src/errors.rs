//! Structural validation errors.
//!
//! These are raised before any state is read or written. Each variant names
//! the offending field so a rejected transaction is diagnosable from the
//! error alone.

use lib_types::AccountNameError;
use thiserror::Error;

/// Structural (pre-state) validation error
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    // =========================================================================
    // Shape Errors
    // =========================================================================
    #[error("Transaction has no operations")]
    EmptyOperations,

    #[error("Transaction expiration must be set")]
    MissingExpiration,

    // =========================================================================
    // Field Errors
    // =========================================================================
    #[error("Invalid account name in {field}: {source}")]
    BadAccountName {
        field: &'static str,
        source: AccountNameError,
    },

    #[error("Amount in {field} must be positive")]
    NonPositiveAmount { field: &'static str },

    #[error("Amount in {field} must not be negative")]
    NegativeAmount { field: &'static str },

    #[error("Wrong asset symbol in {field}")]
    WrongSymbol { field: &'static str },

    #[error("Percent in {field} out of range: {value}")]
    PercentOutOfRange { field: &'static str, value: i32 },

    #[error("String in {field} too long: {len} bytes, max {max}")]
    StringTooLong {
        field: &'static str,
        len: usize,
        max: usize,
    },

    #[error("Field {field} must not be empty")]
    EmptyField { field: &'static str },

    #[error("JSON in {field} is not valid: {reason}")]
    BadJson { field: &'static str, reason: String },

    #[error("Key in {field} has invalid size: {len} bytes")]
    BadKeySize { field: &'static str, len: usize },

    #[error("Signature has invalid size: {len} bytes")]
    BadSignatureSize { len: usize },

    // =========================================================================
    // Authority Errors
    // =========================================================================
    #[error("Authority in {field} is invalid: {reason}")]
    BadAuthority {
        field: &'static str,
        reason: &'static str,
    },

    // =========================================================================
    // Relationship Errors
    // =========================================================================
    #[error("Accounts in {field} must differ")]
    SameAccount { field: &'static str },

    #[error("Time window invalid: {reason}")]
    BadTimeWindow { reason: &'static str },

    #[error("Beneficiary list invalid: {reason}")]
    BadBeneficiaries { reason: &'static str },

    #[error("Amount bounds invalid: {field} min exceeds max")]
    MinExceedsMax { field: &'static str },
}
