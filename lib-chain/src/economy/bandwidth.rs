//! Bandwidth rate limiting.
//!
//! Each account's rolling average bandwidth decays over a fixed window; its
//! allowance is proportional to its vesting stake, with a reserve slice
//! shared by small stakeholders so new accounts can transact at all.

use lib_protocol::config::PERCENT_100;
use lib_types::AccountName;

use crate::config::ChainConfig;
use crate::errors::BlockError;
use crate::state::ChainState;

/// Charge `trx_size` bytes against an account and fail if it exceeds its
/// share of the network's virtual bandwidth.
pub fn update_account_bandwidth(
    state: &mut ChainState,
    config: &ChainConfig,
    account_name: &AccountName,
    trx_size: usize,
) -> Result<(), BlockError> {
    let now = state.head_time();
    let account = state
        .accounts
        .find(account_name)
        .ok_or_else(|| BlockError::UnknownSigningAccount(account_name.clone()))?;
    let account_id = account.id;
    let account_shares = account.effective_vesting_shares().max(0) as u128;

    let window = config.bandwidth_average_window_secs.max(1);
    let elapsed = now.elapsed_since(account.last_bandwidth_update).min(window);
    let trx_bandwidth = trx_size as u64 * config.bandwidth_precision;

    // Linear decay of the rolling average, then the new charge.
    let decayed = (account.average_bandwidth as u128 * (window - elapsed) as u128
        / window as u128) as u64;
    let new_average = decayed.saturating_add(trx_bandwidth);

    let global = state.global();
    let total_shares = global.total_vesting_shares.amount.max(0) as u128;
    let max_virtual = global.max_virtual_bandwidth;
    let reserve_percent = state.schedule().median_props.bandwidth_reserve_percent;
    let reserve_below = state.schedule().median_props.bandwidth_reserve_below.amount;
    let candidates = state.global().bandwidth_reserve_candidates.max(1) as u128;

    // Stake-proportional allowance: avg/max_virtual <= stake/total_stake.
    let mut allowed = total_shares == 0
        || account_shares * max_virtual >= new_average as u128 * total_shares;

    // Small stakeholders may instead draw on the shared reserve slice.
    if !allowed && (account_shares as i64) < reserve_below {
        let reserve_share =
            max_virtual * reserve_percent as u128 / PERCENT_100 as u128 / candidates;
        allowed = (new_average as u128) <= reserve_share;
    }

    if !allowed {
        return Err(BlockError::BandwidthExceeded {
            account: account_name.clone(),
        });
    }

    state
        .accounts
        .modify(account_id, |a| {
            a.average_bandwidth = new_average;
            a.lifetime_bandwidth = a.lifetime_bandwidth.saturating_add(trx_bandwidth);
            a.last_bandwidth_update = now;
        })
        .map_err(BlockError::from)
}

/// Refresh the count of accounts eligible for the bandwidth reserve.
/// Runs once per round, not per block.
pub fn refresh_reserve_candidates(state: &mut ChainState) {
    let threshold = state.schedule().median_props.bandwidth_reserve_below.amount;
    let count = state
        .accounts
        .iter()
        .filter(|a| a.effective_vesting_shares() < threshold)
        .count() as u32;
    state.update_global(|g| g.bandwidth_reserve_candidates = count);
}
