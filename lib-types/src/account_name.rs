//! Validated account name newtype.
//!
//! Account names are the single point where variable-length strings enter
//! consensus state, so the full character/length policy lives here and
//! nowhere else. Everything downstream can assume a name is well-formed.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Minimum total name length
pub const MIN_ACCOUNT_NAME_LENGTH: usize = 2;
/// Maximum total name length
pub const MAX_ACCOUNT_NAME_LENGTH: usize = 25;

/// Account name validation error
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AccountNameError {
    #[error("Account name too short: {0} chars, min {MIN_ACCOUNT_NAME_LENGTH}")]
    TooShort(usize),

    #[error("Account name too long: {0} chars, max {MAX_ACCOUNT_NAME_LENGTH}")]
    TooLong(usize),

    #[error("Account name segment must start with a letter: {0:?}")]
    BadSegmentStart(String),

    #[error("Account name segment too short: {0:?}")]
    SegmentTooShort(String),

    #[error("Invalid character {1:?} in account name {0:?}")]
    InvalidCharacter(String, char),
}

/// A validated, lowercase account name.
///
/// Grammar: dot-separated segments, each at least two characters, starting
/// with a letter, containing only `a-z`, `0-9` and `-`.
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct AccountName(String);

impl AccountName {
    /// Validate and wrap a raw string.
    pub fn new(raw: impl Into<String>) -> Result<Self, AccountNameError> {
        let raw = raw.into();
        Self::validate(&raw)?;
        Ok(Self(raw))
    }

    /// Validate a candidate name without allocating.
    pub fn validate(raw: &str) -> Result<(), AccountNameError> {
        if raw.len() < MIN_ACCOUNT_NAME_LENGTH {
            return Err(AccountNameError::TooShort(raw.len()));
        }
        if raw.len() > MAX_ACCOUNT_NAME_LENGTH {
            return Err(AccountNameError::TooLong(raw.len()));
        }
        for segment in raw.split('.') {
            if segment.len() < MIN_ACCOUNT_NAME_LENGTH {
                return Err(AccountNameError::SegmentTooShort(segment.to_string()));
            }
            let first = segment.chars().next().expect("segment is non-empty");
            if !first.is_ascii_lowercase() {
                return Err(AccountNameError::BadSegmentStart(segment.to_string()));
            }
            for c in segment.chars() {
                if !(c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-') {
                    return Err(AccountNameError::InvalidCharacter(raw.to_string(), c));
                }
            }
        }
        Ok(())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for AccountName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@{}", self.0)
    }
}

impl fmt::Display for AccountName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for AccountName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::str::FromStr for AccountName {
    type Err = AccountNameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_plain_and_dotted_names() {
        assert!(AccountName::new("alice").is_ok());
        assert!(AccountName::new("n1.anonymous").is_ok());
        assert!(AccountName::new("block-producer9").is_ok());
    }

    #[test]
    fn rejects_bad_names() {
        assert!(AccountName::new("a").is_err());
        assert!(AccountName::new("9lives").is_err());
        assert!(AccountName::new("Upper").is_err());
        assert!(AccountName::new("dot..dot").is_err());
        assert!(AccountName::new("under_score").is_err());
        assert!(AccountName::new("x".repeat(26)).is_err());
    }
}
