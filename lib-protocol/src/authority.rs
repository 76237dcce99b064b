//! Weighted authorities.
//!
//! Every account carries three authorities. From strongest to weakest:
//! - `master`: can change anything, including the other authorities
//! - `active`: moves funds and governance weight
//! - `regular`: social actions (content, votes, custom payloads)
//!
//! An operation declares which tier it needs; a transaction is valid when the
//! collected signatures satisfy every declared authority.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use lib_types::AccountName;

use crate::config::{MAX_AUTHORITY_MEMBERSHIP, MAX_KEY_SIZE};
use crate::errors::ValidationError;

/// Opaque serialized public key. The signature scheme behind it is a
/// collaborator concern; consensus only compares and hashes these bytes.
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize, Default)]
pub struct PublicKey(pub Vec<u8>);

impl PublicKey {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn validate(&self, field: &'static str) -> Result<(), ValidationError> {
        if self.0.is_empty() || self.0.len() > MAX_KEY_SIZE {
            return Err(ValidationError::BadKeySize {
                field,
                len: self.0.len(),
            });
        }
        Ok(())
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let shown = self.0.len().min(8);
        write!(f, "PublicKey({}..)", hex::encode(&self.0[..shown]))
    }
}

/// Authority tier required by an operation.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthorityLevel {
    Master,
    Active,
    Regular,
}

/// A weighted set of keys and accounts with a satisfaction threshold.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize, Default)]
pub struct Authority {
    pub weight_threshold: u32,
    /// (account, weight), sorted by account, no duplicates
    pub account_auths: Vec<(AccountName, u16)>,
    /// (key, weight), sorted by key, no duplicates
    pub key_auths: Vec<(PublicKey, u16)>,
}

impl Authority {
    /// Single-key authority with threshold 1.
    pub fn single_key(key: PublicKey) -> Self {
        Self {
            weight_threshold: 1,
            account_auths: Vec::new(),
            key_auths: vec![(key, 1)],
        }
    }

    pub fn is_impossible(&self) -> bool {
        let total: u64 = self
            .account_auths
            .iter()
            .map(|(_, w)| *w as u64)
            .chain(self.key_auths.iter().map(|(_, w)| *w as u64))
            .sum();
        total < self.weight_threshold as u64
    }

    /// Structural validation: sorted, deduplicated, reachable threshold.
    pub fn validate(&self, field: &'static str) -> Result<(), ValidationError> {
        if self.weight_threshold == 0 {
            return Err(ValidationError::BadAuthority {
                field,
                reason: "weight threshold must be positive",
            });
        }
        if self.account_auths.len() + self.key_auths.len() > MAX_AUTHORITY_MEMBERSHIP {
            return Err(ValidationError::BadAuthority {
                field,
                reason: "too many authority members",
            });
        }
        for window in self.account_auths.windows(2) {
            if window[0].0 >= window[1].0 {
                return Err(ValidationError::BadAuthority {
                    field,
                    reason: "account auths must be sorted and unique",
                });
            }
        }
        for window in self.key_auths.windows(2) {
            if window[0].0 >= window[1].0 {
                return Err(ValidationError::BadAuthority {
                    field,
                    reason: "key auths must be sorted and unique",
                });
            }
        }
        for (name, weight) in &self.account_auths {
            lib_types::AccountName::validate(name.as_str()).map_err(|source| {
                ValidationError::BadAccountName { field, source }
            })?;
            if *weight == 0 {
                return Err(ValidationError::BadAuthority {
                    field,
                    reason: "zero-weight account member",
                });
            }
        }
        for (key, weight) in &self.key_auths {
            key.validate(field)?;
            if *weight == 0 {
                return Err(ValidationError::BadAuthority {
                    field,
                    reason: "zero-weight key member",
                });
            }
        }
        if self.is_impossible() {
            return Err(ValidationError::BadAuthority {
                field,
                reason: "threshold cannot be reached by any member combination",
            });
        }
        Ok(())
    }

    /// Weight contributed by a set of proven keys, ignoring account members.
    pub fn signed_key_weight(&self, proven: &BTreeSet<PublicKey>) -> u64 {
        self.key_auths
            .iter()
            .filter(|(key, _)| proven.contains(key))
            .map(|(_, w)| *w as u64)
            .sum()
    }
}
