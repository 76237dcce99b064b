//! Escrow state machine.
//!
//! Release permission matrix:
//! - undisputed and unexpired: `from` may release to `to`, `to` to `from`
//! - disputed or expired: only the agent releases, to either party

use lib_protocol::operations::{
    EscrowApproveOperation, EscrowDisputeOperation, EscrowReleaseOperation,
    EscrowTransferOperation,
};
use lib_types::Asset;

use crate::errors::EvaluationError;
use crate::objects::Escrow;

use super::OperationContext;

pub fn apply_escrow_transfer(
    ctx: &mut OperationContext<'_>,
    op: &EscrowTransferOperation,
) -> Result<(), EvaluationError> {
    let now = ctx.now();
    ctx.state.get_account(&op.to)?;
    ctx.state.get_account(&op.agent)?;

    if op.ratification_deadline <= now {
        return Err(EvaluationError::EscrowDeadlineInPast);
    }

    let total = op.amount.checked_add(op.fee)?;
    ctx.state.adjust_balance(&op.from, Asset::weave(-total.amount))?;

    ctx.state.escrows.create(|id| Escrow {
        id,
        escrow_id: op.escrow_id,
        from: op.from.clone(),
        to: op.to.clone(),
        agent: op.agent.clone(),
        ratification_deadline: op.ratification_deadline,
        escrow_expiration: op.escrow_expiration,
        balance: op.amount,
        pending_fee: op.fee,
        to_approved: false,
        agent_approved: false,
        disputed: false,
    })?;
    Ok(())
}

pub fn apply_escrow_approve(
    ctx: &mut OperationContext<'_>,
    op: &EscrowApproveOperation,
) -> Result<(), EvaluationError> {
    let now = ctx.now();
    let key = (op.from.clone(), op.escrow_id);
    let escrow = ctx
        .state
        .escrows
        .find(&key)
        .ok_or(EvaluationError::UnknownEscrow {
            from: op.from.clone(),
            escrow_id: op.escrow_id,
        })?
        .clone();

    // The deadline check precedes everything; a late approval cannot ratify.
    if now >= escrow.ratification_deadline {
        return Err(EvaluationError::EscrowDeadlinePassed);
    }

    let is_to = op.who == escrow.to;
    let already = if is_to {
        escrow.to_approved
    } else {
        escrow.agent_approved
    };
    if already {
        return Err(EvaluationError::EscrowAlreadyApproved {
            escrow_id: op.escrow_id,
            who: op.who.clone(),
        });
    }

    if !op.approve {
        // A decline unwinds the whole escrow.
        let refund = escrow.balance.checked_add(escrow.pending_fee)?;
        ctx.state.adjust_balance(&escrow.from, refund)?;
        ctx.state.escrows.remove(escrow.id)?;
        return Ok(());
    }

    ctx.state.escrows.modify(escrow.id, |e| {
        if is_to {
            e.to_approved = true;
        } else {
            e.agent_approved = true;
        }
    })?;

    // Fee pays out once, when the second approval lands.
    let ratified = (escrow.to_approved || is_to) && (escrow.agent_approved || !is_to);
    if ratified && !escrow.pending_fee.is_zero() {
        ctx.state.adjust_balance(&escrow.agent, escrow.pending_fee)?;
        ctx.state
            .escrows
            .modify(escrow.id, |e| e.pending_fee = Asset::weave(0))?;
    }
    Ok(())
}

pub fn apply_escrow_dispute(
    ctx: &mut OperationContext<'_>,
    op: &EscrowDisputeOperation,
) -> Result<(), EvaluationError> {
    let now = ctx.now();
    let key = (op.from.clone(), op.escrow_id);
    let escrow = ctx
        .state
        .escrows
        .find(&key)
        .ok_or(EvaluationError::UnknownEscrow {
            from: op.from.clone(),
            escrow_id: op.escrow_id,
        })?;

    if !escrow.is_ratified() {
        return Err(EvaluationError::EscrowNotRatified);
    }
    if escrow.disputed || now >= escrow.escrow_expiration {
        return Err(EvaluationError::EscrowNotDisputable);
    }
    let escrow_id = escrow.id;
    ctx.state.escrows.modify(escrow_id, |e| e.disputed = true)?;
    Ok(())
}

pub fn apply_escrow_release(
    ctx: &mut OperationContext<'_>,
    op: &EscrowReleaseOperation,
) -> Result<(), EvaluationError> {
    let now = ctx.now();
    let key = (op.from.clone(), op.escrow_id);
    let escrow = ctx
        .state
        .escrows
        .find(&key)
        .ok_or(EvaluationError::UnknownEscrow {
            from: op.from.clone(),
            escrow_id: op.escrow_id,
        })?
        .clone();

    if !escrow.is_ratified() {
        return Err(EvaluationError::EscrowNotRatified);
    }

    let arbitration = escrow.disputed || now >= escrow.escrow_expiration;
    let permitted = if arbitration {
        op.who == escrow.agent
    } else {
        (op.who == escrow.from && op.receiver == escrow.to)
            || (op.who == escrow.to && op.receiver == escrow.from)
    };
    if !permitted {
        return Err(EvaluationError::EscrowReleaseForbidden {
            who: op.who.clone(),
        });
    }

    if op.amount.amount > escrow.balance.amount {
        return Err(EvaluationError::InsufficientBalance {
            account: escrow.from.clone(),
            required: op.amount,
            available: escrow.balance,
        });
    }

    ctx.state.adjust_balance(&op.receiver, op.amount)?;
    let remaining = escrow.balance.amount - op.amount.amount;
    if remaining == 0 {
        ctx.state.escrows.remove(escrow.id)?;
    } else {
        ctx.state
            .escrows
            .modify(escrow.id, |e| e.balance = Asset::weave(remaining))?;
    }
    Ok(())
}
