//! Balance movement evaluators: transfers, vesting conversions, staged
//! withdrawals, withdrawal routes, and vesting delegation.

use lib_protocol::config::PERCENT_100;
use lib_protocol::operations::{
    DelegateVestingSharesOperation, SetWithdrawVestingRouteOperation, TransferOperation,
    TransferToVestingOperation, WithdrawVestingOperation,
};
use lib_protocol::{Authority, PublicKey};
use lib_types::{AccountName, Asset, ShareAmount, TimePoint};

use crate::config::ANONYMOUS_ACCOUNT;
use crate::errors::EvaluationError;
use crate::objects::{
    Account, AccountAuthority, VestingDelegation, VestingDelegationExpiration,
    WithdrawVestingRoute,
};

use super::OperationContext;

/// Hard cap on withdrawal routes per account.
const MAX_WITHDRAW_ROUTES: u16 = 10;

pub fn apply_transfer(
    ctx: &mut OperationContext<'_>,
    op: &TransferOperation,
) -> Result<(), EvaluationError> {
    ctx.state.get_account(&op.from)?;

    if op.to.as_str() == ANONYMOUS_ACCOUNT {
        return apply_anonymous_deposit(ctx, op);
    }

    ctx.state.get_account(&op.to)?;
    ctx.state.adjust_balance(&op.from, Asset::weave(-op.amount.amount))?;
    ctx.state.adjust_balance(&op.to, op.amount)?;
    Ok(())
}

/// Deposits to the faucet account mint a subaccount when the memo encodes a
/// public key, either bare hex or as `login:hexkey`.
fn apply_anonymous_deposit(
    ctx: &mut OperationContext<'_>,
    op: &TransferOperation,
) -> Result<(), EvaluationError> {
    let now = ctx.now();
    let faucet = AccountName::new(ANONYMOUS_ACCOUNT).expect("static name is valid");
    let faucet_account = ctx.state.get_account(&faucet)?;
    let faucet_id = faucet_account.id;
    let counter = faucet_account.subaccount_count;

    let (login, key_hex) = match op.memo.split_once(':') {
        Some((login, key_hex)) => (Some(login.to_string()), key_hex),
        None => (None, op.memo.as_str()),
    };
    let key_bytes = hex::decode(key_hex.trim()).map_err(|_| EvaluationError::BadAnonymousMemo)?;
    if key_bytes.is_empty() || key_bytes.len() > lib_protocol::config::MAX_KEY_SIZE {
        return Err(EvaluationError::BadAnonymousMemo);
    }
    let key = PublicKey::new(key_bytes);

    let sub_name = match login {
        Some(login) => format!("{login}.{ANONYMOUS_ACCOUNT}"),
        None => format!("n{}.{ANONYMOUS_ACCOUNT}", counter + 1),
    };
    let sub_name = AccountName::new(sub_name).map_err(|_| EvaluationError::BadAnonymousMemo)?;
    if ctx.state.account_exists(&sub_name) {
        return Err(EvaluationError::AccountAlreadyExists(sub_name));
    }

    ctx.state.adjust_balance(&op.from, Asset::weave(-op.amount.amount))?;
    ctx.state.accounts.modify(faucet_id, |a| a.subaccount_count += 1)?;

    ctx.state
        .accounts
        .create(|id| Account::new(id, sub_name.clone(), key.clone(), now))?;
    ctx.state.account_authorities.create(|id| AccountAuthority {
        id,
        account: sub_name.clone(),
        master: Authority::single_key(key.clone()),
        active: Authority::single_key(key.clone()),
        regular: Authority::single_key(key),
        last_master_update: now,
    })?;

    ctx.state.create_vesting(&sub_name, op.amount)?;
    Ok(())
}

pub fn apply_transfer_to_vesting(
    ctx: &mut OperationContext<'_>,
    op: &TransferToVestingOperation,
) -> Result<(), EvaluationError> {
    ctx.state.get_account(&op.to)?;
    ctx.state.adjust_balance(&op.from, Asset::weave(-op.amount.amount))?;
    ctx.state.create_vesting(&op.to, op.amount)?;
    Ok(())
}

pub fn apply_withdraw_vesting(
    ctx: &mut OperationContext<'_>,
    op: &WithdrawVestingOperation,
) -> Result<(), EvaluationError> {
    let now = ctx.now();
    let account = ctx.state.get_account(&op.account)?;
    let account_id = account.id;

    if op.vesting_shares.is_zero() {
        // Cancel a running withdrawal.
        ctx.state.accounts.modify(account_id, |a| {
            a.vesting_withdraw_rate = Asset::shares(0);
            a.next_vesting_withdrawal = TimePoint::MAX;
            a.to_withdraw = 0;
            a.withdrawn = 0;
        })?;
        return Ok(());
    }

    if account.available_vesting_shares() < op.vesting_shares.amount {
        return Err(EvaluationError::InsufficientVesting {
            account: op.account.clone(),
            required: op.vesting_shares,
            available: Asset::shares(account.available_vesting_shares()),
        });
    }

    let intervals = ctx.config.vesting_withdraw_intervals.max(1) as ShareAmount;
    let rate = (op.vesting_shares.amount / intervals).max(1);
    ctx.state.accounts.modify(account_id, |a| {
        a.vesting_withdraw_rate = Asset::shares(rate);
        a.next_vesting_withdrawal = now + ctx.config.vesting_withdraw_interval_secs;
        a.to_withdraw = op.vesting_shares.amount;
        a.withdrawn = 0;
    })?;
    Ok(())
}

pub fn apply_set_withdraw_route(
    ctx: &mut OperationContext<'_>,
    op: &SetWithdrawVestingRouteOperation,
) -> Result<(), EvaluationError> {
    let from = ctx.state.get_account(&op.from_account)?;
    let from_id = from.id;
    let route_count = from.withdraw_routes;
    ctx.state.get_account(&op.to_account)?;

    let key = (op.from_account.clone(), op.to_account.clone());
    let existing = ctx.state.withdraw_routes.find(&key).map(|r| (r.id, r.percent));

    if op.percent == 0 {
        if let Some((route_id, _)) = existing {
            ctx.state.withdraw_routes.remove(route_id)?;
            ctx.state
                .accounts
                .modify(from_id, |a| a.withdraw_routes -= 1)?;
        }
        return Ok(());
    }

    // Route percents across the account must stay within 100%.
    let other_total: u32 = ctx
        .state
        .withdraw_routes
        .iter_ordered_from(&op.from_account)
        .take_while(|r| r.from_account == op.from_account)
        .filter(|r| r.to_account != op.to_account)
        .map(|r| r.percent as u32)
        .sum();
    let total = other_total + op.percent as u32;
    if total > PERCENT_100 as u32 {
        return Err(EvaluationError::RoutePercentOverflow { total });
    }

    match existing {
        Some((route_id, _)) => {
            ctx.state.withdraw_routes.modify(route_id, |r| {
                r.percent = op.percent;
                r.auto_vest = op.auto_vest;
            })?;
        }
        None => {
            if route_count >= MAX_WITHDRAW_ROUTES {
                return Err(EvaluationError::TooManyWithdrawRoutes {
                    count: route_count,
                    max: MAX_WITHDRAW_ROUTES,
                });
            }
            ctx.state.withdraw_routes.create(|id| WithdrawVestingRoute {
                id,
                from_account: op.from_account.clone(),
                to_account: op.to_account.clone(),
                percent: op.percent,
                auto_vest: op.auto_vest,
            })?;
            ctx.state
                .accounts
                .modify(from_id, |a| a.withdraw_routes += 1)?;
        }
    }
    Ok(())
}

pub fn apply_delegate_vesting_shares(
    ctx: &mut OperationContext<'_>,
    op: &DelegateVestingSharesOperation,
) -> Result<(), EvaluationError> {
    let median = ctx.median_props();
    let now = ctx.now();

    let delegator = ctx.state.get_account(&op.delegator)?;
    let delegator_id = delegator.id;
    let uncommitted = delegator.uncommitted_vesting_shares();
    let delegatee = ctx.state.get_account(&op.delegatee)?;
    let delegatee_id = delegatee.id;

    if op.vesting_shares.amount != 0 && op.vesting_shares.amount < median.min_delegation.amount {
        return Err(EvaluationError::DelegationTooSmall);
    }

    let key = (op.delegator.clone(), op.delegatee.clone());
    let existing = ctx
        .state
        .vesting_delegations
        .find(&key)
        .map(|d| (d.id, d.vesting_shares.amount, d.min_delegation_time));

    match existing {
        None => {
            if op.vesting_shares.is_zero() {
                return Err(EvaluationError::UnknownDelegation {
                    delegatee: op.delegatee.clone(),
                });
            }
            if op.vesting_shares.amount > uncommitted {
                return Err(EvaluationError::InsufficientVesting {
                    account: op.delegator.clone(),
                    required: op.vesting_shares,
                    available: Asset::shares(uncommitted),
                });
            }
            ctx.state.vesting_delegations.create(|id| VestingDelegation {
                id,
                delegator: op.delegator.clone(),
                delegatee: op.delegatee.clone(),
                vesting_shares: op.vesting_shares,
                min_delegation_time: now,
            })?;
            ctx.state.accounts.modify(delegator_id, |a| {
                a.delegated_vesting_shares.amount += op.vesting_shares.amount;
            })?;
            ctx.state.accounts.modify(delegatee_id, |a| {
                a.received_vesting_shares.amount += op.vesting_shares.amount;
            })?;
        }
        Some((delegation_id, current, min_time)) => {
            if op.vesting_shares.amount == current {
                return Err(EvaluationError::DelegationUnchanged);
            }
            if op.vesting_shares.amount > current {
                // Growing an existing delegation.
                let delta = op.vesting_shares.amount - current;
                if delta > uncommitted {
                    return Err(EvaluationError::InsufficientVesting {
                        account: op.delegator.clone(),
                        required: Asset::shares(delta),
                        available: Asset::shares(uncommitted),
                    });
                }
                ctx.state
                    .vesting_delegations
                    .modify(delegation_id, |d| d.vesting_shares = op.vesting_shares)?;
                ctx.state.accounts.modify(delegator_id, |a| {
                    a.delegated_vesting_shares.amount += delta;
                })?;
                ctx.state.accounts.modify(delegatee_id, |a| {
                    a.received_vesting_shares.amount += delta;
                })?;
            } else {
                // Shrinking: the difference leaves the delegatee now but
                // stays locked away from the delegator until the longer of
                // the payout window and the original minimum-delegation time.
                let delta = current - op.vesting_shares.amount;
                let release = TimePoint::from_secs(
                    (now + ctx.config.cashout_window_secs)
                        .secs()
                        .max(min_time.secs()),
                );
                ctx.state
                    .vesting_delegation_expirations
                    .create(|id| VestingDelegationExpiration {
                        id,
                        delegator: op.delegator.clone(),
                        vesting_shares: Asset::shares(delta),
                        expiration: release,
                    })?;
                ctx.state.accounts.modify(delegatee_id, |a| {
                    a.received_vesting_shares.amount -= delta;
                })?;
                if op.vesting_shares.is_zero() {
                    ctx.state.vesting_delegations.remove(delegation_id)?;
                } else {
                    ctx.state
                        .vesting_delegations
                        .modify(delegation_id, |d| d.vesting_shares = op.vesting_shares)?;
                }
            }
        }
    }
    Ok(())
}
