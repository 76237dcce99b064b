//! Account recovery evaluators.
//!
//! Flow: the recovery partner files a request naming the new master
//! authority; the account holder completes it by proving a recent master
//! authority; a separate delayed operation rotates the partner itself.

use lib_protocol::operations::{
    ChangeRecoveryAccountOperation, RecoverAccountOperation, RequestAccountRecoveryOperation,
};

use crate::errors::EvaluationError;
use crate::objects::{AccountRecoveryRequest, ChangeRecoveryRequest, MasterAuthorityHistory};

use super::OperationContext;

pub fn apply_request_account_recovery(
    ctx: &mut OperationContext<'_>,
    op: &RequestAccountRecoveryOperation,
) -> Result<(), EvaluationError> {
    let now = ctx.now();
    ctx.state.get_account(&op.recovery_account)?;
    let account = ctx.state.get_account(&op.account_to_recover)?;

    let partner = account
        .recovery_account
        .clone()
        .ok_or_else(|| EvaluationError::RecoveryDisabled(op.account_to_recover.clone()))?;
    if partner != op.recovery_account {
        return Err(EvaluationError::NotRecoveryPartner { expected: partner });
    }

    let existing = ctx
        .state
        .account_recovery_requests
        .find(&op.account_to_recover)
        .map(|r| r.id);

    if op.new_master_authority.is_impossible() {
        // An unsatisfiable authority is the cancel signal.
        let request_id = existing.ok_or_else(|| {
            EvaluationError::NoRecoveryRequest(op.account_to_recover.clone())
        })?;
        ctx.state.account_recovery_requests.remove(request_id)?;
        return Ok(());
    }

    for (member, _) in &op.new_master_authority.account_auths {
        ctx.state.get_account(member)?;
    }

    let expires = now + ctx.config.recovery_request_expiration_secs;
    match existing {
        Some(request_id) => {
            ctx.state.account_recovery_requests.modify(request_id, |r| {
                r.new_master_authority = op.new_master_authority.clone();
                r.expires = expires;
            })?;
        }
        None => {
            ctx.state
                .account_recovery_requests
                .create(|id| AccountRecoveryRequest {
                    id,
                    account_to_recover: op.account_to_recover.clone(),
                    new_master_authority: op.new_master_authority.clone(),
                    expires,
                })?;
        }
    }
    Ok(())
}

pub fn apply_recover_account(
    ctx: &mut OperationContext<'_>,
    op: &RecoverAccountOperation,
) -> Result<(), EvaluationError> {
    let now = ctx.now();
    ctx.state.get_account(&op.account_to_recover)?;

    let request = ctx
        .state
        .account_recovery_requests
        .find(&op.account_to_recover)
        .ok_or_else(|| EvaluationError::NoRecoveryRequest(op.account_to_recover.clone()))?;
    if request.new_master_authority != op.new_master_authority {
        return Err(EvaluationError::RecoveryAuthorityMismatch);
    }
    let request_id = request.id;

    // The proven recent authority must be the current master or one retired
    // within the recovery window.
    let authority = ctx.state.get_authority(&op.account_to_recover)?;
    let authority_id = authority.id;
    let mut recognized = authority.master == op.recent_master_authority;
    if !recognized {
        let window_start = now.saturating_sub_secs(ctx.config.master_auth_recovery_secs);
        recognized = ctx
            .state
            .master_authority_history
            .iter()
            .any(|h| {
                h.account == op.account_to_recover
                    && h.last_valid_time >= window_start
                    && h.previous_master == op.recent_master_authority
            });
    }
    if !recognized {
        return Err(EvaluationError::UnknownRecentAuthority);
    }

    let previous_master = ctx.state.get_authority(&op.account_to_recover)?.master.clone();
    ctx.state
        .master_authority_history
        .create(|id| MasterAuthorityHistory {
            id,
            account: op.account_to_recover.clone(),
            previous_master,
            last_valid_time: now,
        })?;
    ctx.state.account_authorities.modify(authority_id, |auth| {
        auth.master = op.new_master_authority.clone();
        auth.last_master_update = now;
    })?;
    ctx.state.account_recovery_requests.remove(request_id)?;
    Ok(())
}

pub fn apply_change_recovery_account(
    ctx: &mut OperationContext<'_>,
    op: &ChangeRecoveryAccountOperation,
) -> Result<(), EvaluationError> {
    let now = ctx.now();
    ctx.state.get_account(&op.account_to_recover)?;
    ctx.state.get_account(&op.new_recovery_account)?;

    let effective_on = now + ctx.config.change_recovery_delay_secs;
    match ctx
        .state
        .change_recovery_requests
        .find(&op.account_to_recover)
        .map(|r| r.id)
    {
        Some(request_id) => {
            ctx.state.change_recovery_requests.modify(request_id, |r| {
                r.new_recovery_account = op.new_recovery_account.clone();
                r.effective_on = effective_on;
            })?;
        }
        None => {
            ctx.state
                .change_recovery_requests
                .create(|id| ChangeRecoveryRequest {
                    id,
                    account_to_recover: op.account_to_recover.clone(),
                    new_recovery_account: op.new_recovery_account.clone(),
                    effective_on,
                })?;
        }
    }
    Ok(())
}
