//! Invite evaluators: create, claim, register.

use lib_protocol::operations::{
    ClaimInviteBalanceOperation, CreateInviteOperation, InviteRegistrationOperation,
};
use lib_protocol::Authority;
use lib_types::{Asset, TimePoint};

use crate::errors::EvaluationError;
use crate::objects::{Account, AccountAuthority, Invite, InviteStatus};

use super::OperationContext;

pub fn apply_create_invite(
    ctx: &mut OperationContext<'_>,
    op: &CreateInviteOperation,
) -> Result<(), EvaluationError> {
    let now = ctx.now();
    ctx.state.adjust_balance(&op.creator, Asset::weave(-op.balance.amount))?;

    // Key uniqueness is permanent: a consumed invite keeps its row, so the
    // same key can never carry a second balance.
    ctx.state.invites.create(|id| Invite {
        id,
        creator: op.creator.clone(),
        invite_key: op.invite_key.clone(),
        balance: op.balance,
        claimed_balance: Asset::weave(0),
        status: InviteStatus::Pending,
        receiver: None,
        create_time: now,
        claim_time: TimePoint::ZERO,
    })?;
    Ok(())
}

pub fn apply_claim_invite_balance(
    ctx: &mut OperationContext<'_>,
    op: &ClaimInviteBalanceOperation,
) -> Result<(), EvaluationError> {
    let now = ctx.now();
    ctx.state.get_account(&op.initiator)?;
    ctx.state.get_account(&op.receiver)?;

    let invite = ctx
        .state
        .invites
        .find(&op.invite_key)
        .ok_or(EvaluationError::UnknownInvite)?;
    if invite.status != InviteStatus::Pending {
        return Err(EvaluationError::UnknownInvite);
    }
    let invite_id = invite.id;
    let balance = invite.balance;

    let digest = ClaimInviteBalanceOperation::claim_digest(&op.receiver);
    if !ctx
        .verifier
        .verify(&op.invite_key, &digest, &op.invite_signature)
    {
        return Err(EvaluationError::BadInviteSecret);
    }

    ctx.state.adjust_balance(&op.receiver, balance)?;
    ctx.state.invites.modify(invite_id, |i| {
        i.status = InviteStatus::Claimed;
        i.receiver = Some(op.receiver.clone());
        i.claimed_balance = balance;
        i.balance = Asset::weave(0);
        i.claim_time = now;
    })?;
    Ok(())
}

pub fn apply_invite_registration(
    ctx: &mut OperationContext<'_>,
    op: &InviteRegistrationOperation,
) -> Result<(), EvaluationError> {
    let now = ctx.now();
    ctx.state.get_account(&op.initiator)?;
    if ctx.state.account_exists(&op.new_account_name) {
        return Err(EvaluationError::AccountAlreadyExists(
            op.new_account_name.clone(),
        ));
    }

    let invite = ctx
        .state
        .invites
        .find(&op.invite_key)
        .ok_or(EvaluationError::UnknownInvite)?;
    if invite.status != InviteStatus::Pending {
        return Err(EvaluationError::UnknownInvite);
    }
    let invite_id = invite.id;
    let balance = invite.balance;

    let digest = InviteRegistrationOperation::registration_digest(&op.new_account_name);
    if !ctx
        .verifier
        .verify(&op.invite_key, &digest, &op.invite_signature)
    {
        return Err(EvaluationError::BadInviteSecret);
    }

    ctx.state
        .accounts
        .create(|id| Account::new(id, op.new_account_name.clone(), op.new_account_key.clone(), now))?;
    ctx.state.account_authorities.create(|id| AccountAuthority {
        id,
        account: op.new_account_name.clone(),
        master: Authority::single_key(op.new_account_key.clone()),
        active: Authority::single_key(op.new_account_key.clone()),
        regular: Authority::single_key(op.new_account_key.clone()),
        last_master_update: now,
    })?;

    ctx.state.invites.modify(invite_id, |i| {
        i.status = InviteStatus::Registered;
        i.receiver = Some(op.new_account_name.clone());
        i.claimed_balance = balance;
        i.balance = Asset::weave(0);
        i.claim_time = now;
    })?;
    // The invite balance arrives as stake, so the fresh account can act.
    ctx.state.create_vesting(&op.new_account_name, balance)?;
    Ok(())
}
