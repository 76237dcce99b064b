//! Singletons: dynamic global properties, witness schedule, hardforks.

use serde::{Deserialize, Serialize};

use lib_chainstore::StateObject;
use lib_protocol::{ChainProperties, ProtocolVersion};
use lib_types::{AccountName, Asset, BlockId, ObjectId, ShareAmount, TimePoint};

/// Chain-wide counters, updated every block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DynamicGlobalProperties {
    pub id: ObjectId,

    pub head_block_number: u32,
    pub head_block_id: BlockId,
    pub time: TimePoint,
    pub current_witness: AccountName,
    /// Absolute slot count since genesis, including missed slots
    pub current_aslot: u64,
    /// Bitmap of the last 128 slots; bit 0 is the newest
    pub recent_slots_filled: u128,
    pub last_irreversible_block_num: u32,

    // --- supply -------------------------------------------------------------
    pub current_supply: Asset,
    pub total_vesting_fund: Asset,
    pub total_vesting_shares: Asset,
    pub total_reward_fund: Asset,
    /// Denominator of payout claims: sum of content reward_shares2
    pub total_reward_shares2: u128,
    pub committee_fund: Asset,
    /// Annual inflation, basis points of virtual supply
    pub inflation_rate_bps: u16,
    pub last_committee_payout: TimePoint,

    // --- committee bookkeeping ----------------------------------------------
    pub committee_request_count: u32,

    // --- bandwidth ----------------------------------------------------------
    pub max_virtual_bandwidth: u128,
    pub current_reserve_ratio: u64,
    pub average_block_size: u32,
    /// Accounts below the reserve threshold, refreshed each round
    pub bandwidth_reserve_candidates: u32,
}

impl DynamicGlobalProperties {
    /// Everything the chain has issued, with the vesting fund counted once.
    pub fn virtual_supply(&self) -> i64 {
        self.current_supply.amount
    }

    /// Convert liquid tokens into vesting shares at the current price.
    /// The bootstrap price is 1000 share units per token unit.
    pub fn tokens_to_shares(&self, amount: Asset) -> Asset {
        debug_assert_eq!(amount.symbol, lib_types::Symbol::Weave);
        if self.total_vesting_shares.amount == 0 || self.total_vesting_fund.amount == 0 {
            return Asset::shares(amount.amount.saturating_mul(1_000));
        }
        let shares = (amount.amount as i128 * self.total_vesting_shares.amount as i128)
            / self.total_vesting_fund.amount as i128;
        Asset::shares(shares as ShareAmount)
    }

    /// Convert vesting shares back into liquid tokens at the current price.
    pub fn shares_to_tokens(&self, shares: Asset) -> Asset {
        debug_assert_eq!(shares.symbol, lib_types::Symbol::Shares);
        if self.total_vesting_shares.amount == 0 {
            return Asset::weave(0);
        }
        let tokens = (shares.amount as i128 * self.total_vesting_fund.amount as i128)
            / self.total_vesting_shares.amount as i128;
        Asset::weave(tokens as i64)
    }

    /// Share of the last 128 slots that carried a block, in basis points.
    pub fn participation_bps(&self) -> u32 {
        (self.recent_slots_filled.count_ones() * 10_000) / 128
    }
}

impl StateObject for DynamicGlobalProperties {
    const TABLE: &'static str = "dynamic_global_properties";
    type UniqueKey = ();
    type OrderedKey = ();

    fn id(&self) -> ObjectId {
        self.id
    }

    fn unique_key(&self) {}
}

/// Current producer schedule and the per-round consensus medians.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WitnessScheduleObject {
    pub id: ObjectId,

    pub current_virtual_time: u128,
    pub next_shuffle_block_num: u32,
    /// Producer sequence for the current round, repeat factor expanded
    pub current_shuffled_witnesses: Vec<AccountName>,
    pub num_scheduled_witnesses: u8,

    pub median_props: ChainProperties,
    pub majority_version: ProtocolVersion,
}

impl StateObject for WitnessScheduleObject {
    const TABLE: &'static str = "witness_schedule";
    type UniqueKey = ();
    type OrderedKey = ();

    fn id(&self) -> ObjectId {
        self.id
    }

    fn unique_key(&self) {}
}

/// Hardfork progress. `last_hardfork` only ever increments, one at a time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HardforkProperties {
    pub id: ObjectId,

    /// Count of applied hardforks; 0 = genesis rules
    pub last_hardfork: u32,
    /// Head-block time at which each hardfork was applied
    pub processed_hardforks: Vec<TimePoint>,
    pub current_hardfork_version: ProtocolVersion,
}

impl StateObject for HardforkProperties {
    const TABLE: &'static str = "hardfork_properties";
    type UniqueKey = ();
    type OrderedKey = ();

    fn id(&self) -> ObjectId {
        self.id
    }

    fn unique_key(&self) {}
}
