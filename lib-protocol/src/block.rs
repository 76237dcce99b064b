//! Blocks.
//!
//! A block's id embeds its height (see [`BlockId`]), so fork handling can
//! order candidates without deserializing headers.

use serde::{Deserialize, Serialize};

use lib_types::{hash_digest, AccountName, BlockId, Digest, TimePoint};

use crate::errors::ValidationError;
use crate::sign::{canonical_bytes, SignatureBytes};
use crate::transaction::SignedTransaction;

/// Block header. The merkle root commits to every transaction id in order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct BlockHeader {
    pub previous: BlockId,
    pub timestamp: TimePoint,
    pub witness: AccountName,
    pub transaction_merkle_root: Digest,
}

impl BlockHeader {
    pub fn block_num(&self) -> u32 {
        self.previous.block_num() + 1
    }

    /// Digest the producing witness signs.
    pub fn sig_digest(&self, chain_id: &Digest) -> Digest {
        let mut input = chain_id.as_bytes().to_vec();
        input.extend_from_slice(&canonical_bytes(self));
        hash_digest(&input)
    }
}

/// A produced block: signed header plus its transactions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct SignedBlock {
    pub header: BlockHeader,
    pub witness_signature: SignatureBytes,
    pub transactions: Vec<SignedTransaction>,
}

impl SignedBlock {
    pub fn block_num(&self) -> u32 {
        self.header.block_num()
    }

    /// Block id: header-and-signature digest with the height spliced in.
    pub fn id(&self) -> BlockId {
        let mut input = canonical_bytes(&self.header);
        input.extend_from_slice(self.witness_signature.as_bytes());
        BlockId::from_digest(hash_digest(&input), self.block_num())
    }

    /// Structural validation of every carried transaction.
    pub fn validate_structure(&self) -> Result<(), ValidationError> {
        self.witness_signature.validate()?;
        for transaction in &self.transactions {
            transaction.validate()?;
        }
        Ok(())
    }

    /// Merkle root over the carried transactions.
    pub fn compute_merkle_root(&self) -> Digest {
        merkle_root(
            self.transactions
                .iter()
                .map(|t| t.transaction.digest())
                .collect(),
        )
    }
}

/// Pairwise blake3 merkle root; an odd leaf is promoted unpaired.
/// The empty block commits to the zero digest.
pub fn merkle_root(mut layer: Vec<Digest>) -> Digest {
    if layer.is_empty() {
        return Digest::zero();
    }
    while layer.len() > 1 {
        let mut next = Vec::with_capacity(layer.len().div_ceil(2));
        for pair in layer.chunks(2) {
            if pair.len() == 2 {
                let mut input = pair[0].as_bytes().to_vec();
                input.extend_from_slice(pair[1].as_bytes());
                next.push(hash_digest(&input));
            } else {
                next.push(pair[0]);
            }
        }
        layer = next;
    }
    layer[0]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merkle_root_shapes() {
        let a = hash_digest(b"a");
        let b = hash_digest(b"b");
        let c = hash_digest(b"c");

        assert_eq!(merkle_root(vec![]), Digest::zero());
        assert_eq!(merkle_root(vec![a]), a);
        assert_ne!(merkle_root(vec![a, b]), merkle_root(vec![b, a]));
        assert_ne!(merkle_root(vec![a, b, c]), merkle_root(vec![a, b]));
    }

    #[test]
    fn block_id_height() {
        let previous = BlockId::from_digest(hash_digest(b"prev"), 41);
        let block = SignedBlock {
            header: BlockHeader {
                previous,
                timestamp: TimePoint::from_secs(126),
                witness: AccountName::new("wit-a").unwrap(),
                transaction_merkle_root: Digest::zero(),
            },
            witness_signature: SignatureBytes::new(vec![7u8; 64]),
            transactions: Vec::new(),
        };
        assert_eq!(block.block_num(), 42);
        assert_eq!(block.id().block_num(), 42);
    }
}
