//! Witness scheduling: virtual-time election, deterministic shuffle, and
//! the per-round consensus medians.
//!
//! Two tiers fill a round: the top witnesses by counted vote weight, then a
//! support tier drained from the virtual-time queue. Virtual time gives a
//! witness a scheduled instant inversely proportional to its votes, so low
//! -vote witnesses still produce, just rarely.

use std::collections::BTreeMap;

use tracing::{debug, info};

use lib_protocol::{ChainProperties, ProtocolVersion};
use lib_types::{hash_digest, AccountName, Asset, TimePoint};

use crate::config::ChainConfig;
use crate::errors::EvaluationError;
use crate::state::ChainState;

/// Virtual-time lap: one full cycle of the support queue.
pub const VIRTUAL_LAP_LENGTH: u128 = 1 << 94;
/// Reset the virtual clock before additions can wrap.
const VIRTUAL_TIME_RESET_THRESHOLD: u128 = 1 << 120;

// ============================================================================
// SLOT ARITHMETIC
// ============================================================================

/// Wall-clock time of future slot `slot_num` (1 = next block).
pub fn get_slot_time(state: &ChainState, config: &ChainConfig, slot_num: u32) -> TimePoint {
    let interval = config.block_interval_secs;
    let global = state.global();
    if global.head_block_number == 0 {
        // Before the first block, slot 1 is one interval past genesis.
        return config.genesis_time + slot_num as u64 * interval;
    }
    global.time + slot_num as u64 * interval
}

/// Which future slot `when` falls into; 0 if it is not after the head.
pub fn get_slot_at_time(state: &ChainState, config: &ChainConfig, when: TimePoint) -> u32 {
    let first_slot_time = get_slot_time(state, config, 1);
    if when < first_slot_time {
        return 0;
    }
    (when.elapsed_since(first_slot_time) / config.block_interval_secs) as u32 + 1
}

/// Producer owning the given future slot.
pub fn get_scheduled_witness(state: &ChainState, slot_num: u32) -> AccountName {
    let schedule = state.schedule();
    let global = state.global();
    let len = schedule.current_shuffled_witnesses.len().max(1) as u64;
    let index = (global.current_aslot + slot_num as u64) % len;
    schedule.current_shuffled_witnesses[index as usize].clone()
}

// ============================================================================
// ROUND ELECTION
// ============================================================================

fn median_by<T: Ord + Copy>(mut values: Vec<T>) -> T {
    values.sort_unstable();
    values[values.len() / 2]
}

/// Per-field median of the active witnesses' published properties.
fn compute_median_props(props: &[ChainProperties]) -> ChainProperties {
    ChainProperties {
        account_creation_fee: Asset::weave(median_by(
            props.iter().map(|p| p.account_creation_fee.amount).collect(),
        )),
        maximum_block_size: median_by(props.iter().map(|p| p.maximum_block_size).collect()),
        create_account_delegation_ratio: median_by(
            props.iter().map(|p| p.create_account_delegation_ratio).collect(),
        ),
        create_account_delegation_time: median_by(
            props.iter().map(|p| p.create_account_delegation_time).collect(),
        ),
        min_delegation: Asset::shares(median_by(
            props.iter().map(|p| p.min_delegation.amount).collect(),
        )),
        min_curation_percent: median_by(props.iter().map(|p| p.min_curation_percent).collect()),
        max_curation_percent: median_by(props.iter().map(|p| p.max_curation_percent).collect()),
        bandwidth_reserve_percent: median_by(
            props.iter().map(|p| p.bandwidth_reserve_percent).collect(),
        ),
        bandwidth_reserve_below: Asset::shares(median_by(
            props.iter().map(|p| p.bandwidth_reserve_below.amount).collect(),
        )),
        flag_energy_additional_cost: median_by(
            props.iter().map(|p| p.flag_energy_additional_cost).collect(),
        ),
        vote_accounting_min_rshares: median_by(
            props.iter().map(|p| p.vote_accounting_min_rshares).collect(),
        ),
        committee_request_approve_min_percent: median_by(
            props
                .iter()
                .map(|p| p.committee_request_approve_min_percent)
                .collect(),
        ),
        inflation_witness_percent: median_by(
            props.iter().map(|p| p.inflation_witness_percent).collect(),
        ),
        inflation_committee_percent: median_by(
            props.iter().map(|p| p.inflation_committee_percent).collect(),
        ),
    }
}

/// Highest version run by a 2/3 supermajority of active witnesses.
fn compute_majority_version(versions: &[ProtocolVersion], current: ProtocolVersion) -> ProtocolVersion {
    if versions.is_empty() {
        return current;
    }
    let mut counts: BTreeMap<ProtocolVersion, u32> = BTreeMap::new();
    for version in versions {
        *counts.entry(*version).or_insert(0) += 1;
    }
    let threshold = versions.len() as u32 * 2 / 3 + 1;
    let mut cumulative = 0;
    for (version, count) in counts.iter().rev() {
        cumulative += count;
        if cumulative >= threshold {
            return *version;
        }
    }
    current
}

/// Deterministic Fisher-Yates keyed by the head block id: every node
/// derives the same permutation from the same chain.
fn shuffle_witnesses(witnesses: &mut [AccountName], seed_id: lib_types::BlockId, round: u32) {
    let mut seed_input = seed_id.as_bytes().to_vec();
    seed_input.extend_from_slice(&round.to_le_bytes());
    let seed = hash_digest(&seed_input);

    for i in (1..witnesses.len()).rev() {
        let mut pick_input = seed.as_bytes().to_vec();
        pick_input.extend_from_slice(&(i as u32).to_le_bytes());
        let digest = hash_digest(&pick_input);
        let raw = u64::from_le_bytes(digest.as_bytes()[..8].try_into().expect("8 bytes"));
        let j = (raw % (i as u64 + 1)) as usize;
        witnesses.swap(i, j);
    }
}

/// Elect and shuffle the next round of producers. Runs at round boundaries
/// only.
pub fn update_witness_schedule(
    state: &mut ChainState,
    config: &ChainConfig,
) -> Result<(), EvaluationError> {
    let head_num = state.head_block_num();
    let head_id = state.global().head_block_id;
    let mut virtual_now = state.schedule().current_virtual_time;

    // Candidates: every witness that could produce.
    let schedulable: Vec<(AccountName, i64)> = state
        .witnesses
        .iter()
        .filter(|w| w.is_schedulable())
        .map(|w| (w.owner.clone(), w.votes))
        .collect();
    if schedulable.is_empty() {
        return Ok(());
    }

    // --- top tier -----------------------------------------------------------
    let mut by_votes = schedulable.clone();
    by_votes.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    let mut selected: Vec<AccountName> = by_votes
        .iter()
        .take(config.top_witnesses as usize)
        .map(|(name, _)| name.clone())
        .collect();

    // --- support tier: drain the virtual-time queue -------------------------
    let queue: Vec<(AccountName, u128)> = state
        .witnesses
        .iter_ordered()
        .filter(|w| w.is_schedulable() && !selected.contains(&w.owner))
        .map(|w| (w.owner.clone(), w.virtual_scheduled_time))
        .take(config.support_witnesses as usize)
        .collect();
    for (name, scheduled) in &queue {
        virtual_now = virtual_now.max(*scheduled);
        selected.push(name.clone());
    }
    let support: Vec<AccountName> = queue.into_iter().map(|(name, _)| name).collect();

    // --- advance virtual time for everyone considered -----------------------
    for (name, votes) in &schedulable {
        let witness_id = state.get_witness(name)?.id;
        let ran_this_round = support.contains(name);
        let votes = (*votes).max(0) as u128;
        state.witnesses.modify(witness_id, |w| {
            w.virtual_position = w
                .virtual_position
                .wrapping_add(votes * virtual_now.saturating_sub(w.virtual_last_update));
            if ran_this_round {
                w.virtual_position = 0;
            }
            w.virtual_last_update = virtual_now;
            w.virtual_scheduled_time =
                virtual_now.saturating_add(VIRTUAL_LAP_LENGTH / (votes + 1));
        })?;
    }

    // Lap overflow resets every clock to zero.
    if virtual_now > VIRTUAL_TIME_RESET_THRESHOLD {
        debug!("virtual time lap overflow, resetting witness clocks");
        virtual_now = 0;
        let ids: Vec<_> = state.witnesses.iter().map(|w| (w.id, w.votes)).collect();
        for (id, votes) in ids {
            let votes = votes.max(0) as u128;
            state.witnesses.modify(id, |w| {
                w.virtual_position = 0;
                w.virtual_last_update = 0;
                w.virtual_scheduled_time = VIRTUAL_LAP_LENGTH / (votes + 1);
            })?;
        }
    }

    // --- shuffle and expand by the repeat factor ----------------------------
    shuffle_witnesses(&mut selected, head_id, head_num);
    let mut shuffled = Vec::with_capacity(selected.len() * config.witness_repeat_factor as usize);
    for witness in &selected {
        for _ in 0..config.witness_repeat_factor.max(1) {
            shuffled.push(witness.clone());
        }
    }

    // --- medians and version tally ------------------------------------------
    let active_props: Vec<ChainProperties> = selected
        .iter()
        .filter_map(|name| state.witnesses.find(name).map(|w| w.props.clone()))
        .collect();
    let median_props = if active_props.is_empty() {
        state.schedule().median_props.clone()
    } else {
        compute_median_props(&active_props)
    };
    let versions: Vec<ProtocolVersion> = selected
        .iter()
        .filter_map(|name| state.witnesses.find(name).map(|w| w.running_version))
        .collect();
    let majority_version =
        compute_majority_version(&versions, state.schedule().majority_version);

    let round_length = shuffled.len() as u32;
    state.update_schedule(|schedule| {
        schedule.current_virtual_time = virtual_now;
        schedule.next_shuffle_block_num = head_num + round_length;
        schedule.num_scheduled_witnesses = shuffled.len() as u8;
        schedule.current_shuffled_witnesses = shuffled;
        schedule.median_props = median_props;
        schedule.majority_version = majority_version;
    });

    info!(
        round = head_num,
        scheduled = round_length,
        "witness schedule updated"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn median_picks_upper_middle() {
        assert_eq!(median_by(vec![3u32, 1, 2]), 2);
        assert_eq!(median_by(vec![4u32, 1, 2, 3]), 3);
        assert_eq!(median_by(vec![7u32]), 7);
    }

    #[test]
    fn majority_version_needs_supermajority() {
        let v1 = ProtocolVersion::new(0, 1, 0);
        let v2 = ProtocolVersion::new(0, 2, 0);
        let current = ProtocolVersion::new(0, 0, 0);

        // 2 of 3 on v2 is not a supermajority (threshold 3)
        assert_eq!(compute_majority_version(&[v2, v2, v1], current), v1);
        // 3 of 3
        assert_eq!(compute_majority_version(&[v2, v2, v2], current), v2);
        assert_eq!(compute_majority_version(&[], current), current);
    }

    #[test]
    fn shuffle_is_deterministic() {
        let names: Vec<AccountName> = ["wa", "wb", "wc", "wd", "we"]
            .iter()
            .map(|n| AccountName::new(*n).unwrap())
            .collect();
        let id = lib_types::BlockId::from_digest(hash_digest(b"seed"), 42);

        let mut a = names.clone();
        let mut b = names.clone();
        shuffle_witnesses(&mut a, id, 42);
        shuffle_witnesses(&mut b, id, 42);
        assert_eq!(a, b);

        let mut c = names.clone();
        shuffle_witnesses(&mut c, id, 43);
        // Different round, different permutation (with these inputs)
        assert_ne!(a, c);
    }
}
