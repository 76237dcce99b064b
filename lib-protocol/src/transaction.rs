//! Transactions: ordered operations with TaPoS anchoring and expiration.

use std::ops::Deref;

use serde::{Deserialize, Serialize};

use lib_types::{hash_digest, BlockId, Digest, TimePoint, TransactionId};

use crate::errors::ValidationError;
use crate::operations::{Operation, RequiredAuthorities};
use crate::sign::{canonical_bytes, SignatureBytes};

/// Unsigned transaction body.
///
/// `ref_block_num`/`ref_block_prefix` anchor the transaction to a recent
/// block (TaPoS): a transaction referencing a block that is not in the
/// active chain cannot be replayed onto a competing fork.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Transaction {
    pub ref_block_num: u16,
    pub ref_block_prefix: u32,
    pub expiration: TimePoint,
    pub operations: Vec<Operation>,
}

impl Transaction {
    /// Structural validation of the whole transaction.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.operations.is_empty() {
            return Err(ValidationError::EmptyOperations);
        }
        if self.expiration == TimePoint::ZERO {
            return Err(ValidationError::MissingExpiration);
        }
        for operation in &self.operations {
            operation.validate()?;
        }
        // Regular-tier operations may not ride along with higher-tier ones:
        // a leaked regular key must never widen into active/master access.
        let any_regular = self.operations.iter().any(|op| op.is_regular_only());
        let any_higher = self.operations.iter().any(|op| !op.is_regular_only());
        if any_regular && any_higher {
            return Err(ValidationError::BadAuthority {
                field: "operations",
                reason: "cannot mix regular-tier operations with higher-tier ones",
            });
        }
        Ok(())
    }

    /// Authorities required across all operations.
    pub fn required_authorities(&self) -> RequiredAuthorities {
        let mut required = RequiredAuthorities::default();
        for operation in &self.operations {
            operation.required_authorities(&mut required);
        }
        required
    }

    /// Anchor this transaction to `block_id` for TaPoS.
    pub fn set_reference_block(&mut self, block_id: &BlockId) {
        self.ref_block_num = (block_id.block_num() & 0xffff) as u16;
        self.ref_block_prefix = block_id.tapos_prefix();
    }

    /// Content digest; doubles as the transaction id.
    pub fn digest(&self) -> Digest {
        hash_digest(&canonical_bytes(self))
    }

    /// Digest a signer commits to: bound to one chain by its id.
    pub fn sig_digest(&self, chain_id: &Digest) -> Digest {
        let mut input = chain_id.as_bytes().to_vec();
        input.extend_from_slice(&canonical_bytes(self));
        hash_digest(&input)
    }

    pub fn id(&self) -> TransactionId {
        TransactionId::from(self.digest())
    }
}

/// A transaction plus the signatures that authorize it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct SignedTransaction {
    pub transaction: Transaction,
    pub signatures: Vec<SignatureBytes>,
}

impl SignedTransaction {
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.transaction.validate()?;
        for signature in &self.signatures {
            signature.validate()?;
        }
        Ok(())
    }
}

impl Deref for SignedTransaction {
    type Target = Transaction;

    fn deref(&self) -> &Transaction {
        &self.transaction
    }
}
