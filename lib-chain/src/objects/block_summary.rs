//! Block-summary ring buffer backing the TaPoS check.

use serde::{Deserialize, Serialize};

use lib_chainstore::StateObject;
use lib_types::{BlockId, ObjectId};

/// Ring size: transactions may reference any of the last 65536 blocks.
pub const BLOCK_SUMMARY_SLOTS: u32 = 0x10000;

/// Latest block id seen at `block_num % BLOCK_SUMMARY_SLOTS`. Slots are
/// created lazily on first use.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockSummary {
    pub id: ObjectId,
    pub slot: u32,
    pub block_id: BlockId,
}

impl StateObject for BlockSummary {
    const TABLE: &'static str = "block_summaries";
    type UniqueKey = u32;
    type OrderedKey = ();

    fn id(&self) -> ObjectId {
        self.id
    }

    fn unique_key(&self) -> u32 {
        self.slot
    }
}
