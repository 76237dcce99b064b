//! Append-only block log collaborator.
//!
//! The core appends a block exactly once, when it becomes irreversible.
//! `SledBlockLog` is the durable backend (sled is the only storage engine
//! in this workspace); `MemoryBlockLog` backs tests.

use lib_protocol::SignedBlock;

use crate::errors::ChainError;

/// Number-indexed immutable block sequence.
pub trait BlockLog: Send {
    /// Append the next block; `block_num` must be exactly `head + 1`.
    fn append(&mut self, block: &SignedBlock) -> Result<(), ChainError>;
    fn read_block_by_num(&self, num: u32) -> Result<Option<SignedBlock>, ChainError>;
    fn head_num(&self) -> Result<u32, ChainError>;
    fn head(&self) -> Result<Option<SignedBlock>, ChainError> {
        match self.head_num()? {
            0 => Ok(None),
            num => self.read_block_by_num(num),
        }
    }
}

// ============================================================================
// MEMORY BACKEND
// ============================================================================

#[derive(Default)]
pub struct MemoryBlockLog {
    blocks: Vec<SignedBlock>,
}

impl MemoryBlockLog {
    pub fn new() -> Self {
        Self::default()
    }
}

impl BlockLog for MemoryBlockLog {
    fn append(&mut self, block: &SignedBlock) -> Result<(), ChainError> {
        let expected = self.blocks.len() as u32 + 1;
        if block.block_num() != expected {
            return Err(ChainError::BlockLog(format!(
                "non-sequential append: got block {}, expected {}",
                block.block_num(),
                expected
            )));
        }
        self.blocks.push(block.clone());
        Ok(())
    }

    fn read_block_by_num(&self, num: u32) -> Result<Option<SignedBlock>, ChainError> {
        if num == 0 {
            return Ok(None);
        }
        Ok(self.blocks.get(num as usize - 1).cloned())
    }

    fn head_num(&self) -> Result<u32, ChainError> {
        Ok(self.blocks.len() as u32)
    }
}

// ============================================================================
// SLED BACKEND
// ============================================================================

// Tree names are protocol for the on-disk layout. Changing them orphans
// existing logs.
const TREE_BLOCKS: &str = "blocks_by_num";
const TREE_META: &str = "meta";
const META_HEAD_NUM: &str = "head_num";

pub struct SledBlockLog {
    _db: sled::Db,
    blocks: sled::Tree,
    meta: sled::Tree,
}

impl SledBlockLog {
    pub fn open(path: impl AsRef<std::path::Path>) -> Result<Self, ChainError> {
        let db = sled::open(path).map_err(|e| ChainError::BlockLog(e.to_string()))?;
        let blocks = db
            .open_tree(TREE_BLOCKS)
            .map_err(|e| ChainError::BlockLog(e.to_string()))?;
        let meta = db
            .open_tree(TREE_META)
            .map_err(|e| ChainError::BlockLog(e.to_string()))?;
        Ok(Self {
            _db: db,
            blocks,
            meta,
        })
    }

    fn stored_head(&self) -> Result<u32, ChainError> {
        Ok(self
            .meta
            .get(META_HEAD_NUM)
            .map_err(|e| ChainError::BlockLog(e.to_string()))?
            .map(|raw| {
                let mut bytes = [0u8; 4];
                bytes.copy_from_slice(&raw);
                u32::from_be_bytes(bytes)
            })
            .unwrap_or(0))
    }
}

impl BlockLog for SledBlockLog {
    fn append(&mut self, block: &SignedBlock) -> Result<(), ChainError> {
        let head = self.stored_head()?;
        let num = block.block_num();
        if num != head + 1 {
            return Err(ChainError::BlockLog(format!(
                "non-sequential append: got block {num}, expected {}",
                head + 1
            )));
        }
        let bytes =
            bincode::serialize(block).map_err(|e| ChainError::BlockLog(e.to_string()))?;
        self.blocks
            .insert(num.to_be_bytes(), bytes)
            .map_err(|e| ChainError::BlockLog(e.to_string()))?;
        self.meta
            .insert(META_HEAD_NUM, &num.to_be_bytes())
            .map_err(|e| ChainError::BlockLog(e.to_string()))?;
        Ok(())
    }

    fn read_block_by_num(&self, num: u32) -> Result<Option<SignedBlock>, ChainError> {
        let Some(raw) = self
            .blocks
            .get(num.to_be_bytes())
            .map_err(|e| ChainError::BlockLog(e.to_string()))?
        else {
            return Ok(None);
        };
        let block =
            bincode::deserialize(&raw).map_err(|e| ChainError::BlockLog(e.to_string()))?;
        Ok(Some(block))
    }

    fn head_num(&self) -> Result<u32, ChainError> {
        self.stored_head()
    }
}
