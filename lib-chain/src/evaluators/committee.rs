//! Committee worker request evaluators. Conclusion and payouts run in the
//! per-block maintenance pass (`economy::committee`).

use lib_protocol::operations::{
    CommitteeVoteRequestOperation, CommitteeWorkerCancelRequestOperation,
    CommitteeWorkerCreateRequestOperation,
};
use lib_types::Asset;

use crate::errors::EvaluationError;
use crate::objects::{CommitteeRequest, CommitteeRequestState, CommitteeVote};

use super::OperationContext;

pub fn apply_create_request(
    ctx: &mut OperationContext<'_>,
    op: &CommitteeWorkerCreateRequestOperation,
) -> Result<(), EvaluationError> {
    let now = ctx.now();
    ctx.state.get_account(&op.creator)?;
    ctx.state.get_account(&op.worker)?;

    let request_id = ctx.state.global().committee_request_count + 1;
    ctx.state.update_global(|g| g.committee_request_count = request_id);

    ctx.state.committee_requests.create(|id| CommitteeRequest {
        id,
        request_id,
        creator: op.creator.clone(),
        worker: op.worker.clone(),
        url: op.url.clone(),
        required_amount_min: op.required_amount_min,
        required_amount_max: op.required_amount_max,
        start_time: now,
        duration: op.duration,
        end_time: now + op.duration as u64,
        state: CommitteeRequestState::Pending,
        votes_count: 0,
        conclusion_payout: Asset::weave(0),
        remaining_payout: Asset::weave(0),
    })?;
    Ok(())
}

pub fn apply_cancel_request(
    ctx: &mut OperationContext<'_>,
    op: &CommitteeWorkerCancelRequestOperation,
) -> Result<(), EvaluationError> {
    let request = ctx
        .state
        .committee_requests
        .find(&op.request_id)
        .ok_or(EvaluationError::UnknownCommitteeRequest(op.request_id))?;

    if request.creator != op.creator {
        return Err(EvaluationError::CommitteeNotCreator);
    }
    if request.state != CommitteeRequestState::Pending {
        return Err(EvaluationError::CommitteeRequestNotPending(op.request_id));
    }
    let request_table_id = request.id;
    ctx.state.committee_requests.modify(request_table_id, |r| {
        r.state = CommitteeRequestState::Cancelled;
    })?;
    Ok(())
}

pub fn apply_vote_request(
    ctx: &mut OperationContext<'_>,
    op: &CommitteeVoteRequestOperation,
) -> Result<(), EvaluationError> {
    let now = ctx.now();
    ctx.state.get_account(&op.voter)?;

    let request = ctx
        .state
        .committee_requests
        .find(&op.request_id)
        .ok_or(EvaluationError::UnknownCommitteeRequest(op.request_id))?;
    if request.state != CommitteeRequestState::Pending {
        return Err(EvaluationError::CommitteeRequestNotPending(op.request_id));
    }
    if now >= request.end_time {
        return Err(EvaluationError::CommitteeVotingClosed(op.request_id));
    }
    let request_table_id = request.id;

    let key = (op.request_id, op.voter.clone());
    match ctx.state.committee_votes.find(&key).map(|v| v.id) {
        Some(vote_id) => {
            ctx.state.committee_votes.modify(vote_id, |v| {
                v.vote_percent = op.vote_percent;
                v.last_update = now;
            })?;
        }
        None => {
            ctx.state.committee_votes.create(|id| CommitteeVote {
                id,
                request_id: op.request_id,
                voter: op.voter.clone(),
                vote_percent: op.vote_percent,
                last_update: now,
            })?;
            ctx.state
                .committee_requests
                .modify(request_table_id, |r| r.votes_count += 1)?;
        }
    }
    Ok(())
}
