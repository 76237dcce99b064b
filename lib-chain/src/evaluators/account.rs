//! Account creation and authority updates.

use lib_protocol::operations::{AccountCreateOperation, AccountUpdateOperation};
use lib_protocol::Authority;
use lib_types::Asset;

use crate::errors::EvaluationError;
use crate::objects::{Account, AccountAuthority, MasterAuthorityHistory, VestingDelegation};
use crate::state::ChainState;

use super::OperationContext;

/// Every account member of an authority must already exist on chain.
fn check_authority_accounts(
    state: &ChainState,
    authority: &Authority,
) -> Result<(), EvaluationError> {
    for (member, _) in &authority.account_auths {
        state.get_account(member)?;
    }
    Ok(())
}

pub fn apply_account_create(
    ctx: &mut OperationContext<'_>,
    op: &AccountCreateOperation,
) -> Result<(), EvaluationError> {
    let median = ctx.median_props();
    let now = ctx.now();

    let creator = ctx.state.get_account(&op.creator)?;
    let creator_uncommitted = creator.uncommitted_vesting_shares();
    if ctx.state.account_exists(&op.new_account_name) {
        return Err(EvaluationError::AccountAlreadyExists(
            op.new_account_name.clone(),
        ));
    }
    check_authority_accounts(ctx.state, &op.master)?;
    check_authority_accounts(ctx.state, &op.active)?;
    check_authority_accounts(ctx.state, &op.regular)?;

    // A creator may substitute delegation for part of the fee, at the
    // median ratio, but never below the cash floor of fee*ratio >= median.
    let ratio = median.create_account_delegation_ratio.max(1) as i64;
    if op.fee.amount * ratio < median.account_creation_fee.amount {
        return Err(EvaluationError::CreationFeeTooLow {
            fee: op.fee,
            required: Asset::weave(
                (median.account_creation_fee.amount + ratio - 1) / ratio,
            ),
        });
    }
    let shortfall = (median.account_creation_fee.amount - op.fee.amount).max(0);
    let required_delegation = ctx
        .state
        .global()
        .tokens_to_shares(Asset::weave(shortfall.saturating_mul(ratio)));
    if op.delegation.amount < required_delegation.amount {
        return Err(EvaluationError::CreationDelegationTooLow {
            delegation: op.delegation,
            required: required_delegation,
        });
    }
    if op.delegation.amount > creator_uncommitted {
        return Err(EvaluationError::InsufficientVesting {
            account: op.creator.clone(),
            required: op.delegation,
            available: Asset::shares(creator_uncommitted),
        });
    }

    ctx.state.adjust_balance(&op.creator, Asset::weave(-op.fee.amount))?;
    if op.delegation.amount > 0 {
        let creator_id = ctx.state.get_account(&op.creator)?.id;
        ctx.state.accounts.modify(creator_id, |a| {
            a.delegated_vesting_shares.amount += op.delegation.amount;
        })?;
    }

    ctx.state.accounts.create(|id| {
        let mut account = Account::new(id, op.new_account_name.clone(), op.memo_key.clone(), now);
        account.recovery_account = Some(op.creator.clone());
        account.received_vesting_shares = op.delegation;
        account
    })?;
    ctx.state.account_authorities.create(|id| AccountAuthority {
        id,
        account: op.new_account_name.clone(),
        master: op.master.clone(),
        active: op.active.clone(),
        regular: op.regular.clone(),
        last_master_update: now,
    })?;

    if op.delegation.amount > 0 {
        ctx.state.vesting_delegations.create(|id| VestingDelegation {
            id,
            delegator: op.creator.clone(),
            delegatee: op.new_account_name.clone(),
            vesting_shares: op.delegation,
            min_delegation_time: now + median.create_account_delegation_time as u64,
        })?;
    }

    // The fee is not burned: it vests in the new account immediately.
    if op.fee.amount > 0 {
        ctx.state.create_vesting(&op.new_account_name, op.fee)?;
    }
    Ok(())
}

pub fn apply_account_update(
    ctx: &mut OperationContext<'_>,
    op: &AccountUpdateOperation,
) -> Result<(), EvaluationError> {
    let now = ctx.now();
    let account = ctx.state.get_account(&op.account)?;
    let account_id = account.id;
    let authority = ctx.state.get_authority(&op.account)?;
    let authority_id = authority.id;
    let last_master_update = authority.last_master_update;
    let previous_master = authority.master.clone();

    if let Some(master) = &op.master {
        if now.elapsed_since(last_master_update) < ctx.config.master_update_interval_secs {
            return Err(EvaluationError::MasterUpdateRateLimited {
                account: op.account.clone(),
            });
        }
        check_authority_accounts(ctx.state, master)?;
    }
    if let Some(active) = &op.active {
        check_authority_accounts(ctx.state, active)?;
    }
    if let Some(regular) = &op.regular {
        check_authority_accounts(ctx.state, regular)?;
    }

    if op.master.is_some() {
        // Keep the outgoing master recoverable for the recovery window.
        ctx.state
            .master_authority_history
            .create(|id| MasterAuthorityHistory {
                id,
                account: op.account.clone(),
                previous_master,
                last_valid_time: now,
            })?;
    }

    ctx.state.account_authorities.modify(authority_id, |auth| {
        if let Some(master) = &op.master {
            auth.master = master.clone();
            auth.last_master_update = now;
        }
        if let Some(active) = &op.active {
            auth.active = active.clone();
        }
        if let Some(regular) = &op.regular {
            auth.regular = regular.clone();
        }
    })?;

    if let Some(memo_key) = &op.memo_key {
        ctx.state
            .accounts
            .modify(account_id, |a| a.memo_key = memo_key.clone())?;
    }
    Ok(())
}
