//! Chain configuration.
//!
//! Everything here is fixed at genesis and identical on every node; a
//! mismatch forks the network. Values that witnesses may steer at runtime
//! live in [`lib_protocol::ChainProperties`] instead.

use serde::{Deserialize, Serialize};

use lib_protocol::ProtocolVersion;
use lib_types::{hash_digest, AccountName, Digest, TimePoint};

/// Account whose balances are burned every block.
pub const NULL_ACCOUNT: &str = "null";
/// Account whose balances sweep into the committee fund every block.
pub const COMMITTEE_ACCOUNT: &str = "committee";
/// Faucet account: deposits with a key-bearing memo mint subaccounts.
pub const ANONYMOUS_ACCOUNT: &str = "anonymous";

/// One scheduled hardfork: applied once head time passes `time`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HardforkSchedule {
    pub version: ProtocolVersion,
    pub time: TimePoint,
}

/// Consensus constants fixed at genesis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChainConfig {
    /// Binds signatures to this chain
    pub chain_id: Digest,
    pub genesis_time: TimePoint,
    pub block_interval_secs: u64,

    // --- witness scheduling -------------------------------------------------
    /// Slots filled by vote ranking
    pub top_witnesses: u32,
    /// Slots filled from the virtual-time queue
    pub support_witnesses: u32,
    /// Contiguous repetitions of each scheduled witness
    pub witness_repeat_factor: u32,
    /// Numerator/denominator of the irreversibility supermajority
    pub irreversible_threshold_percent: u16,

    // --- transaction admission ----------------------------------------------
    pub max_time_until_expiration_secs: u64,
    pub bandwidth_average_window_secs: u64,
    pub bandwidth_precision: u64,

    // --- content economics --------------------------------------------------
    pub cashout_window_secs: u64,
    pub reverse_auction_window_secs: u64,
    pub energy_regen_secs: u64,
    /// Full-power votes per full energy regeneration
    pub vote_energy_rate: u16,
    /// Author curation share when not steered by medians, basis points
    pub default_curation_percent: u16,

    // --- vesting ------------------------------------------------------------
    pub vesting_withdraw_intervals: u32,
    pub vesting_withdraw_interval_secs: u64,

    // --- authority / recovery -----------------------------------------------
    pub master_update_interval_secs: u64,
    pub master_auth_recovery_secs: u64,
    pub recovery_request_expiration_secs: u64,
    pub change_recovery_delay_secs: u64,

    // --- committee ----------------------------------------------------------
    pub committee_processing_interval_secs: u64,
    pub committee_payout_installments: u32,

    // --- supply -------------------------------------------------------------
    /// Annual inflation in basis points of virtual supply
    pub inflation_rate_bps: u16,
    /// Liquid supply created at genesis, credited to the init account
    pub init_supply: i64,

    // --- genesis identities -------------------------------------------------
    pub init_witness: AccountName,
    pub init_witness_key_seed: String,

    // --- upgrades -----------------------------------------------------------
    pub hardforks: Vec<HardforkSchedule>,
}

impl Default for ChainConfig {
    fn default() -> Self {
        let genesis_time = TimePoint::from_secs(1_577_836_800); // 2020-01-01
        Self {
            chain_id: hash_digest(b"weave-mainnet"),
            genesis_time,
            block_interval_secs: 3,
            top_witnesses: 18,
            support_witnesses: 3,
            witness_repeat_factor: 1,
            irreversible_threshold_percent: 7_500,
            max_time_until_expiration_secs: 3_600,
            bandwidth_average_window_secs: 60 * 60 * 24 * 7,
            bandwidth_precision: 1_000_000,
            cashout_window_secs: 60 * 60 * 24 * 7,
            reverse_auction_window_secs: 60 * 30,
            energy_regen_secs: 60 * 60 * 24 * 5,
            vote_energy_rate: 50,
            default_curation_percent: 2_500,
            vesting_withdraw_intervals: 13,
            vesting_withdraw_interval_secs: 60 * 60 * 24 * 7,
            master_update_interval_secs: 3_600,
            master_auth_recovery_secs: 60 * 60 * 24 * 30,
            recovery_request_expiration_secs: 60 * 60 * 24,
            change_recovery_delay_secs: 60 * 60 * 24 * 30,
            committee_processing_interval_secs: 60 * 60 * 24,
            committee_payout_installments: 10,
            inflation_rate_bps: 1_000,
            init_supply: 50_000_000_000, // 50,000,000.000 WEAVE
            init_witness: AccountName::new("weave").expect("static name is valid"),
            init_witness_key_seed: "weave-init".to_string(),
            hardforks: vec![
                HardforkSchedule {
                    version: ProtocolVersion::new(0, 1, 0),
                    time: genesis_time + 60 * 60 * 24 * 180,
                },
                HardforkSchedule {
                    version: ProtocolVersion::new(0, 2, 0),
                    time: genesis_time + 60 * 60 * 24 * 365,
                },
            ],
        }
    }
}

impl ChainConfig {
    /// Small-round, short-window configuration for tests and local nets.
    pub fn testing() -> Self {
        let genesis_time = TimePoint::from_secs(1_000_000);
        Self {
            chain_id: hash_digest(b"weave-testnet"),
            genesis_time,
            top_witnesses: 2,
            support_witnesses: 1,
            cashout_window_secs: 60 * 60,
            energy_regen_secs: 60 * 60,
            vesting_withdraw_interval_secs: 60 * 60,
            master_update_interval_secs: 60,
            recovery_request_expiration_secs: 60 * 60,
            change_recovery_delay_secs: 60 * 60,
            committee_processing_interval_secs: 60 * 60,
            hardforks: vec![
                HardforkSchedule {
                    version: ProtocolVersion::new(0, 1, 0),
                    time: TimePoint::MAX,
                },
                HardforkSchedule {
                    version: ProtocolVersion::new(0, 2, 0),
                    time: TimePoint::MAX,
                },
            ],
            ..Self::default()
        }
    }

    /// Scheduled slots per round.
    pub fn round_length(&self) -> u32 {
        (self.top_witnesses + self.support_witnesses) * self.witness_repeat_factor
    }

    pub fn blocks_per_day(&self) -> u64 {
        (60 * 60 * 24) / self.block_interval_secs
    }

    pub fn blocks_per_year(&self) -> u64 {
        self.blocks_per_day() * 365
    }

    /// Witness-vote cap under the given applied-hardfork count.
    pub fn witness_vote_cap(&self, applied_hardforks: u32) -> u16 {
        if applied_hardforks >= 1 {
            21
        } else {
            30
        }
    }
}
