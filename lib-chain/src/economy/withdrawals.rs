//! Vesting withdrawal processing.
//!
//! Accounts with a due `next_vesting_withdrawal` release one tranche, split
//! across their withdrawal routes before the remainder converts to liquid
//! for the account itself.

use tracing::debug;

use lib_protocol::config::PERCENT_100;
use lib_types::{Asset, TimePoint};

use crate::config::ChainConfig;
use crate::errors::EvaluationError;
use crate::evaluators::witness::on_stake_changed;
use crate::notify::VirtualOperation;
use crate::state::ChainState;

pub fn process_vesting_withdrawals(
    state: &mut ChainState,
    config: &ChainConfig,
    vops: &mut Vec<VirtualOperation>,
) -> Result<(), EvaluationError> {
    let now = state.head_time();

    loop {
        let Some(account) = state
            .accounts
            .iter_ordered()
            .next()
            .filter(|a| a.next_vesting_withdrawal <= now)
            .map(|a| a.clone())
        else {
            break;
        };

        let account_id = account.id;
        let name = account.name.clone();

        // One tranche, capped by what is still owed and still held.
        let remaining = account.to_withdraw - account.withdrawn;
        let tranche = account
            .vesting_withdraw_rate
            .amount
            .min(remaining)
            .min(account.vesting_shares.amount);
        if tranche <= 0 {
            state.accounts.modify(account_id, |a| {
                a.vesting_withdraw_rate = Asset::shares(0);
                a.next_vesting_withdrawal = TimePoint::MAX;
                a.to_withdraw = 0;
                a.withdrawn = 0;
            })?;
            continue;
        }

        let routes: Vec<_> = state
            .withdraw_routes
            .iter_ordered_from(&name)
            .take_while(|r| r.from_account == name)
            .map(|r| (r.to_account.clone(), r.percent, r.auto_vest))
            .collect();

        let mut routed_shares = 0i64;
        for (to_account, percent, auto_vest) in routes {
            let share_slice = tranche * percent as i64 / PERCENT_100 as i64;
            if share_slice == 0 || !state.account_exists(&to_account) {
                continue;
            }
            routed_shares += share_slice;

            if auto_vest {
                // Shares move as shares; the vesting fund is untouched.
                let to_id = state.get_account(&to_account)?.id;
                state
                    .accounts
                    .modify(to_id, |a| a.vesting_shares.amount += share_slice)?;
                on_stake_changed(state, &to_account, share_slice)?;
                vops.push(VirtualOperation::FillVestingWithdraw {
                    from: name.clone(),
                    to: to_account,
                    withdrawn: Asset::shares(share_slice),
                    deposited: Asset::shares(share_slice),
                });
            } else {
                let tokens = state.global().shares_to_tokens(Asset::shares(share_slice));
                state.update_global(|g| {
                    g.total_vesting_fund.amount -= tokens.amount;
                    g.total_vesting_shares.amount -= share_slice;
                });
                state.adjust_balance(&to_account, tokens)?;
                vops.push(VirtualOperation::FillVestingWithdraw {
                    from: name.clone(),
                    to: to_account,
                    withdrawn: Asset::shares(share_slice),
                    deposited: tokens,
                });
            }
        }

        // Remainder converts to liquid for the withdrawing account.
        let self_shares = tranche - routed_shares;
        if self_shares > 0 {
            let tokens = state.global().shares_to_tokens(Asset::shares(self_shares));
            state.update_global(|g| {
                g.total_vesting_fund.amount -= tokens.amount;
                g.total_vesting_shares.amount -= self_shares;
            });
            state.adjust_balance(&name, tokens)?;
            vops.push(VirtualOperation::FillVestingWithdraw {
                from: name.clone(),
                to: name.clone(),
                withdrawn: Asset::shares(self_shares),
                deposited: tokens,
            });
        }

        state.accounts.modify(account_id, |a| {
            a.vesting_shares.amount -= tranche;
            a.withdrawn += tranche;
            if a.withdrawn >= a.to_withdraw || a.vesting_shares.amount == 0 {
                a.vesting_withdraw_rate = Asset::shares(0);
                a.next_vesting_withdrawal = TimePoint::MAX;
                a.to_withdraw = 0;
                a.withdrawn = 0;
            } else {
                a.next_vesting_withdrawal =
                    a.next_vesting_withdrawal + config.vesting_withdraw_interval_secs;
            }
        })?;
        on_stake_changed(state, &name, -tranche)?;

        debug!(account = %name, tranche, routed_shares, "vesting withdrawal");
    }
    Ok(())
}

/// Return expired delegation locks to their delegators.
pub fn process_expired_delegations(
    state: &mut ChainState,
    vops: &mut Vec<VirtualOperation>,
) -> Result<(), EvaluationError> {
    let now = state.head_time();

    loop {
        let Some(expiration) = state
            .vesting_delegation_expirations
            .iter_ordered()
            .next()
            .filter(|e| e.expiration <= now)
            .map(|e| e.clone())
        else {
            break;
        };

        let delegator_id = state.get_account(&expiration.delegator)?.id;
        state.accounts.modify(delegator_id, |a| {
            a.delegated_vesting_shares.amount -= expiration.vesting_shares.amount;
        })?;
        state
            .vesting_delegation_expirations
            .remove(expiration.id)?;
        vops.push(VirtualOperation::ReturnVestingDelegation {
            account: expiration.delegator.clone(),
            vesting_shares: expiration.vesting_shares,
        });
    }
    Ok(())
}
