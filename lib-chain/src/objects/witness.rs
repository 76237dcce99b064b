//! Witnesses and witness votes.

use serde::{Deserialize, Serialize};

use lib_chainstore::StateObject;
use lib_protocol::{ChainProperties, ProtocolVersion, PublicKey};
use lib_types::{AccountName, ObjectId, TimePoint};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Witness {
    pub id: ObjectId,
    pub owner: AccountName,
    pub created: TimePoint,
    pub url: String,
    /// Empty key = shut down; never scheduled
    pub signing_key: PublicKey,
    /// Parameters this witness advocates; medians of these steer evaluators
    pub props: ChainProperties,

    /// Counted vote weight under the currently-applied vote formula
    pub votes: i64,
    pub total_missed: u32,
    pub last_confirmed_block_num: u32,

    /// Version tally inputs
    pub running_version: ProtocolVersion,
    pub hardfork_version_vote: ProtocolVersion,
    pub hardfork_time_vote: TimePoint,

    // --- virtual-time scheduling -------------------------------------------
    pub virtual_last_update: u128,
    pub virtual_position: u128,
    pub virtual_scheduled_time: u128,
}

impl Witness {
    pub fn is_schedulable(&self) -> bool {
        !self.signing_key.is_empty()
    }
}

impl StateObject for Witness {
    const TABLE: &'static str = "witnesses";
    type UniqueKey = AccountName;
    type OrderedKey = u128;

    fn id(&self) -> ObjectId {
        self.id
    }

    fn unique_key(&self) -> AccountName {
        self.owner.clone()
    }

    /// Ordered by virtual scheduled time: the support-tier queue.
    fn ordered_key(&self) -> Option<u128> {
        Some(self.virtual_scheduled_time)
    }
}

/// Existence is the vote; `weight` remembers the contribution actually
/// applied to the witness tally so it can be retracted exactly under any
/// vote-weight formula.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WitnessVote {
    pub id: ObjectId,
    pub account: AccountName,
    pub witness: AccountName,
    pub weight: i64,
}

impl StateObject for WitnessVote {
    const TABLE: &'static str = "witness_votes";
    type UniqueKey = (AccountName, AccountName);
    type OrderedKey = AccountName;

    fn id(&self) -> ObjectId {
        self.id
    }

    fn unique_key(&self) -> (AccountName, AccountName) {
        (self.account.clone(), self.witness.clone())
    }

    /// Ordered by voter, for renormalization sweeps over one account.
    fn ordered_key(&self) -> Option<AccountName> {
        Some(self.account.clone())
    }
}
