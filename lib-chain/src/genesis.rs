//! Genesis state initialization.
//!
//! Runs once, outside any undo session, at revision 0. Every node deriving
//! genesis from the same [`ChainConfig`] reaches the identical starting
//! state.

use tracing::info;

use lib_protocol::{Authority, ChainProperties, HashSigner, ProtocolVersion};
use lib_types::{AccountName, Asset, BlockId, TimePoint};

use crate::config::{ANONYMOUS_ACCOUNT, COMMITTEE_ACCOUNT, ChainConfig, NULL_ACCOUNT};
use crate::errors::ChainError;
use crate::objects::{
    Account, AccountAuthority, DynamicGlobalProperties, HardforkProperties, Witness,
    WitnessScheduleObject,
};
use crate::state::ChainState;

fn create_account(
    state: &mut ChainState,
    name: &AccountName,
    key_seed: &str,
    created: TimePoint,
) -> Result<(), ChainError> {
    let key = HashSigner::public_key(key_seed);
    state
        .accounts
        .create(|id| Account::new(id, name.clone(), key.clone(), created))
        .map_err(|e| ChainError::Corruption(format!("genesis account: {e}")))?;
    state
        .account_authorities
        .create(|id| AccountAuthority {
            id,
            account: name.clone(),
            master: Authority::single_key(key.clone()),
            active: Authority::single_key(key.clone()),
            regular: Authority::single_key(key),
            last_master_update: created,
        })
        .map_err(|e| ChainError::Corruption(format!("genesis authority: {e}")))?;
    Ok(())
}

pub fn initialize(config: &ChainConfig) -> Result<ChainState, ChainError> {
    let mut state = ChainState::new();
    let genesis_time = config.genesis_time;
    let init = config.init_witness.clone();

    // Reserved accounts first, then the initial producer.
    for name in [NULL_ACCOUNT, COMMITTEE_ACCOUNT, ANONYMOUS_ACCOUNT] {
        let name = AccountName::new(name).expect("static name is valid");
        let seed = format!("weave-reserved-{name}");
        create_account(&mut state, &name, &seed, genesis_time)?;
    }
    create_account(&mut state, &init, &config.init_witness_key_seed, genesis_time)?;

    // Entire initial supply starts liquid in the init account.
    let init_id = state
        .get_account(&init)
        .map_err(|e| ChainError::Corruption(e.to_string()))?
        .id;
    state
        .accounts
        .modify(init_id, |a| a.balance = Asset::weave(config.init_supply))
        .map_err(|e| ChainError::Corruption(e.to_string()))?;

    state
        .witnesses
        .create(|id| Witness {
            id,
            owner: init.clone(),
            created: genesis_time,
            url: String::new(),
            signing_key: HashSigner::public_key(&config.init_witness_key_seed),
            props: ChainProperties::default(),
            votes: 0,
            total_missed: 0,
            last_confirmed_block_num: 0,
            running_version: ProtocolVersion::default(),
            hardfork_version_vote: ProtocolVersion::default(),
            hardfork_time_vote: TimePoint::ZERO,
            virtual_last_update: 0,
            virtual_position: 0,
            virtual_scheduled_time: 0,
        })
        .map_err(|e| ChainError::Corruption(format!("genesis witness: {e}")))?;

    state
        .globals
        .create(|id| DynamicGlobalProperties {
            id,
            head_block_number: 0,
            head_block_id: BlockId::zero(),
            time: genesis_time,
            current_witness: init.clone(),
            current_aslot: 0,
            recent_slots_filled: u128::MAX,
            last_irreversible_block_num: 0,
            current_supply: Asset::weave(config.init_supply),
            total_vesting_fund: Asset::weave(0),
            total_vesting_shares: Asset::shares(0),
            total_reward_fund: Asset::weave(0),
            total_reward_shares2: 0,
            committee_fund: Asset::weave(0),
            inflation_rate_bps: config.inflation_rate_bps,
            last_committee_payout: genesis_time,
            committee_request_count: 0,
            max_virtual_bandwidth: 0,
            current_reserve_ratio: MAX_GENESIS_RESERVE_RATIO,
            average_block_size: 0,
            bandwidth_reserve_candidates: 1,
        })
        .map_err(|e| ChainError::Corruption(format!("genesis globals: {e}")))?;

    state
        .witness_schedule
        .create(|id| WitnessScheduleObject {
            id,
            current_virtual_time: 0,
            next_shuffle_block_num: config.round_length(),
            current_shuffled_witnesses: vec![init.clone()],
            num_scheduled_witnesses: 1,
            median_props: ChainProperties::default(),
            majority_version: ProtocolVersion::default(),
        })
        .map_err(|e| ChainError::Corruption(format!("genesis schedule: {e}")))?;

    state
        .hardforks
        .create(|id| HardforkProperties {
            id,
            last_hardfork: 0,
            processed_hardforks: Vec::new(),
            current_hardfork_version: ProtocolVersion::default(),
        })
        .map_err(|e| ChainError::Corruption(format!("genesis hardforks: {e}")))?;

    info!(init_witness = %init, supply = config.init_supply, "genesis state initialized");
    Ok(state)
}

/// Fresh chains start with the reserve ratio wide open.
const MAX_GENESIS_RESERVE_RATIO: u64 = 20_000;
