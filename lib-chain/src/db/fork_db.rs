//! In-memory tree of candidate chain tips.
//!
//! Every block above the irreversible height lives here, linked by previous
//! id. Fork choice is longest-chain by block number; ties keep the earlier
//! arrival. Pruning follows irreversibility: anything at or below the root
//! can never be reorganized away.

use std::collections::BTreeMap;

use tracing::debug;

use lib_protocol::SignedBlock;
use lib_types::BlockId;

use crate::errors::ForkError;

/// One candidate block.
#[derive(Debug, Clone)]
pub struct ForkItem {
    pub id: BlockId,
    pub num: u32,
    pub previous: BlockId,
    pub block: SignedBlock,
}

pub struct ForkDatabase {
    items: BTreeMap<BlockId, ForkItem>,
    /// Irreversible tip: the only valid attachment point besides items
    root_id: BlockId,
    root_num: u32,
    head: Option<BlockId>,
}

impl ForkDatabase {
    /// Start from an irreversible root (genesis: zero id, height 0).
    pub fn new(root_id: BlockId, root_num: u32) -> Self {
        Self {
            items: BTreeMap::new(),
            root_id,
            root_num,
            head: None,
        }
    }

    pub fn head_id(&self) -> Option<BlockId> {
        self.head
    }

    pub fn get(&self, id: &BlockId) -> Option<&ForkItem> {
        self.items.get(id)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Insert a candidate. Returns the stored item; updates the head under
    /// the longest-chain rule.
    pub fn push_block(&mut self, block: SignedBlock) -> Result<ForkItem, ForkError> {
        let id = block.id();
        let num = block.block_num();
        let previous = block.header.previous;

        if self.items.contains_key(&id) {
            return Err(ForkError::DuplicateBlock(id));
        }
        if num <= self.root_num && !(self.root_num == 0 && num == 0) {
            return Err(ForkError::BelowIrreversible {
                id,
                irreversible: self.root_num,
            });
        }
        let linked = previous == self.root_id || self.items.contains_key(&previous);
        if !linked {
            return Err(ForkError::Unlinkable(id));
        }

        let item = ForkItem {
            id,
            num,
            previous,
            block,
        };
        self.items.insert(id, item.clone());

        let head_num = self.head.and_then(|h| self.items.get(&h)).map(|i| i.num);
        if head_num.map(|h| num > h).unwrap_or(true) {
            self.head = Some(id);
        }
        Ok(item)
    }

    /// Force the head pointer (fork-switch failure recovery).
    pub fn set_head(&mut self, id: BlockId) {
        debug_assert!(self.items.contains_key(&id) || id == self.root_id);
        self.head = if id == self.root_id { None } else { Some(id) };
    }

    /// Remove a block and every descendant, then re-derive the head.
    pub fn remove(&mut self, id: BlockId) {
        let mut doomed = vec![id];
        while let Some(current) = doomed.pop() {
            self.items.remove(&current);
            let children: Vec<BlockId> = self
                .items
                .values()
                .filter(|i| i.previous == current)
                .map(|i| i.id)
                .collect();
            doomed.extend(children);
        }
        self.head = self
            .items
            .values()
            .max_by(|a, b| a.num.cmp(&b.num).then_with(|| b.id.cmp(&a.id)))
            .map(|i| i.id);
    }

    /// The two branches from `first` and `second` back to (excluding) their
    /// common ancestor, each newest-first.
    pub fn fetch_branch_from(
        &self,
        first: BlockId,
        second: BlockId,
    ) -> Result<(Vec<ForkItem>, Vec<ForkItem>), ForkError> {
        let mut first_branch = Vec::new();
        let mut second_branch = Vec::new();
        let mut first_cursor = self.item_or_root(first)?;
        let mut second_cursor = self.item_or_root(second)?;

        while first_cursor.as_ref().map(|i| i.num).unwrap_or(self.root_num)
            > second_cursor.as_ref().map(|i| i.num).unwrap_or(self.root_num)
        {
            let item = first_cursor.expect("higher side is a real item");
            first_cursor = self.item_or_root(item.previous)?;
            first_branch.push(item);
        }
        while second_cursor.as_ref().map(|i| i.num).unwrap_or(self.root_num)
            > first_cursor.as_ref().map(|i| i.num).unwrap_or(self.root_num)
        {
            let item = second_cursor.expect("higher side is a real item");
            second_cursor = self.item_or_root(item.previous)?;
            second_branch.push(item);
        }
        while first_cursor.as_ref().map(|i| i.id) != second_cursor.as_ref().map(|i| i.id) {
            let first_item = first_cursor.ok_or(ForkError::Unlinkable(first))?;
            let second_item = second_cursor.ok_or(ForkError::Unlinkable(second))?;
            first_cursor = self.item_or_root(first_item.previous)?;
            second_cursor = self.item_or_root(second_item.previous)?;
            first_branch.push(first_item);
            second_branch.push(second_item);
        }
        Ok((first_branch, second_branch))
    }

    fn item_or_root(&self, id: BlockId) -> Result<Option<ForkItem>, ForkError> {
        if id == self.root_id {
            return Ok(None);
        }
        self.items
            .get(&id)
            .cloned()
            .map(Some)
            .ok_or(ForkError::Unlinkable(id))
    }

    /// The block at `num` on the branch ending in `head`.
    pub fn main_branch_block(&self, num: u32, head: BlockId) -> Option<&SignedBlock> {
        let mut cursor = self.items.get(&head)?;
        loop {
            if cursor.num == num {
                return Some(&cursor.block);
            }
            if cursor.num < num {
                return None;
            }
            cursor = self.items.get(&cursor.previous)?;
        }
    }

    /// Advance the irreversible root, dropping everything at or below it.
    pub fn prune(&mut self, new_root_id: BlockId, new_root_num: u32) {
        if new_root_num <= self.root_num {
            return;
        }
        let before = self.items.len();
        self.items.retain(|_, item| item.num > new_root_num);
        self.root_id = new_root_id;
        self.root_num = new_root_num;
        if let Some(head) = self.head {
            if !self.items.contains_key(&head) {
                self.head = self
                    .items
                    .values()
                    .max_by(|a, b| a.num.cmp(&b.num).then_with(|| b.id.cmp(&a.id)))
                    .map(|i| i.id);
            }
        }
        debug!(
            pruned = before - self.items.len(),
            root = new_root_num,
            "fork database pruned"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lib_protocol::BlockHeader;
    use lib_types::{hash_digest, AccountName, TimePoint};

    fn block(previous: BlockId, num: u32, tag: u8) -> SignedBlock {
        SignedBlock {
            header: BlockHeader {
                previous,
                timestamp: TimePoint::from_secs(num as u64 * 3 + tag as u64),
                witness: AccountName::new("wa").unwrap(),
                transaction_merkle_root: hash_digest(&[tag]),
            },
            witness_signature: lib_protocol::SignatureBytes::new(vec![tag; 64]),
            transactions: Vec::new(),
        }
    }

    #[test]
    fn longest_chain_wins() {
        let mut db = ForkDatabase::new(BlockId::zero(), 0);
        let b1 = block(BlockId::zero(), 1, 1);
        let id1 = b1.id();
        db.push_block(b1).unwrap();
        assert_eq!(db.head_id(), Some(id1));

        // A competing block at the same height does not displace the head
        let b1b = block(BlockId::zero(), 1, 9);
        let id1b = b1b.id();
        db.push_block(b1b).unwrap();
        assert_eq!(db.head_id(), Some(id1));

        // But its child does
        let b2b = block(id1b, 2, 10);
        let id2b = b2b.id();
        db.push_block(b2b).unwrap();
        assert_eq!(db.head_id(), Some(id2b));
    }

    #[test]
    fn rejects_unlinkable_and_duplicates() {
        let mut db = ForkDatabase::new(BlockId::zero(), 0);
        let orphan = block(BlockId::from_digest(hash_digest(b"nowhere"), 5), 6, 1);
        assert!(matches!(
            db.push_block(orphan),
            Err(ForkError::Unlinkable(_))
        ));

        let b1 = block(BlockId::zero(), 1, 1);
        db.push_block(b1.clone()).unwrap();
        assert!(matches!(
            db.push_block(b1),
            Err(ForkError::DuplicateBlock(_))
        ));
    }

    #[test]
    fn branches_meet_at_common_ancestor() {
        let mut db = ForkDatabase::new(BlockId::zero(), 0);
        let b1 = block(BlockId::zero(), 1, 1);
        let id1 = b1.id();
        db.push_block(b1).unwrap();

        let a2 = block(id1, 2, 2);
        let a2_id = a2.id();
        db.push_block(a2).unwrap();

        let b2 = block(id1, 2, 3);
        let b2_id = b2.id();
        db.push_block(b2).unwrap();
        let b3 = block(b2_id, 3, 4);
        let b3_id = b3.id();
        db.push_block(b3).unwrap();

        let (new_branch, old_branch) = db.fetch_branch_from(b3_id, a2_id).unwrap();
        assert_eq!(
            new_branch.iter().map(|i| i.num).collect::<Vec<_>>(),
            vec![3, 2]
        );
        assert_eq!(
            old_branch.iter().map(|i| i.num).collect::<Vec<_>>(),
            vec![2]
        );
        // Both branches stop just above block 1
        assert_eq!(new_branch.last().unwrap().previous, id1);
        assert_eq!(old_branch.last().unwrap().previous, id1);
    }
}
