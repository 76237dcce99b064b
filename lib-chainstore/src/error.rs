//! Store errors.
//!
//! These are infrastructure failures, distinct from protocol validation and
//! evaluation errors: a `StoreError` in the write path means a programming
//! error or an unrecoverable backend fault, never a bad transaction.

use thiserror::Error;

/// Versioned-store error
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("Unique index violation in table {table}")]
    UniqueViolation { table: &'static str },

    #[error("Missing row {id} in table {table}")]
    MissingRow { table: &'static str, id: u64 },

    #[error("No undo session is active")]
    NoActiveSession,

    #[error("Cannot commit past revision {requested}: head revision is {head}")]
    RevisionAhead { requested: u64, head: u64 },

    #[error("Storage backend error: {0}")]
    Backend(String),
}
