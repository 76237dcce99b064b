//! Committee request conclusion and installment payouts.

use tracing::{debug, info};

use lib_protocol::config::PERCENT_100;
use lib_types::Asset;

use crate::config::ChainConfig;
use crate::errors::EvaluationError;
use crate::notify::VirtualOperation;
use crate::objects::{CommitteeRequest, CommitteeRequestState};
use crate::state::ChainState;

pub fn process_committee(
    state: &mut ChainState,
    config: &ChainConfig,
    vops: &mut Vec<VirtualOperation>,
) -> Result<(), EvaluationError> {
    conclude_due_requests(state, vops)?;
    pay_installments(state, config, vops)?;
    Ok(())
}

/// Conclude every pending request whose voting window has closed.
fn conclude_due_requests(
    state: &mut ChainState,
    vops: &mut Vec<VirtualOperation>,
) -> Result<(), EvaluationError> {
    let now = state.head_time();
    let due: Vec<CommitteeRequest> = state
        .committee_requests
        .iter_ordered()
        .take_while(|r| r.end_time <= now)
        .filter(|r| r.state == CommitteeRequestState::Pending)
        .cloned()
        .collect();

    for request in due {
        let median = state.schedule().median_props.clone();
        let total_vesting = state.global().total_vesting_shares.amount.max(1);

        // Stake-weighted tally, scaled by each voter's percent.
        let mut yes_weight: i128 = 0;
        let mut no_weight: i128 = 0;
        let votes: Vec<_> = state
            .committee_votes
            .iter_ordered_from(&request.request_id)
            .take_while(|v| v.request_id == request.request_id)
            .map(|v| (v.voter.clone(), v.vote_percent))
            .collect();
        for (voter, percent) in votes {
            let Ok(account) = state.get_account(&voter) else {
                continue;
            };
            let stake = account.effective_vesting_shares() as i128;
            let scaled = stake * percent.unsigned_abs() as i128 / PERCENT_100 as i128;
            if percent >= 0 {
                yes_weight += scaled;
            } else {
                no_weight += scaled;
            }
        }

        // Gate: supporting stake must clear the median floor share of all
        // vesting.
        let floor = total_vesting as i128 * median.committee_request_approve_min_percent as i128
            / PERCENT_100 as i128;
        let (new_state, payout) = if yes_weight < floor {
            (CommitteeRequestState::RejectedVotes, Asset::weave(0))
        } else {
            // Payout scales the requested maximum by the approval ratio.
            let ratio_bps = if yes_weight + no_weight > 0 {
                (yes_weight * PERCENT_100 as i128) / (yes_weight + no_weight)
            } else {
                0
            };
            let amount =
                (request.required_amount_max.amount as i128 * ratio_bps / PERCENT_100 as i128) as i64;
            if amount < request.required_amount_min.amount {
                (CommitteeRequestState::RejectedBelowMin, Asset::weave(0))
            } else {
                (CommitteeRequestState::ApprovedPayout, Asset::weave(amount))
            }
        };

        state.committee_requests.modify(request.id, |r| {
            r.state = new_state;
            r.conclusion_payout = payout;
            r.remaining_payout = payout;
        })?;
        info!(
            request_id = request.request_id,
            state = ?new_state,
            payout = %payout,
            "committee request concluded"
        );
        vops.push(VirtualOperation::CommitteeRequestConcluded {
            request_id: request.request_id,
            state: new_state,
            payout,
        });
    }
    Ok(())
}

/// On the payout cadence, disburse capped installments from the shared fund.
fn pay_installments(
    state: &mut ChainState,
    config: &ChainConfig,
    vops: &mut Vec<VirtualOperation>,
) -> Result<(), EvaluationError> {
    let now = state.head_time();
    let global = state.global();
    if now.elapsed_since(global.last_committee_payout) < config.committee_processing_interval_secs {
        return Ok(());
    }
    let mut fund = global.committee_fund.amount;
    state.update_global(|g| g.last_committee_payout = now);

    let approved: Vec<CommitteeRequest> = state
        .committee_requests
        .iter()
        .filter(|r| r.state == CommitteeRequestState::ApprovedPayout)
        .cloned()
        .collect();

    for request in approved {
        if fund <= 0 {
            break;
        }
        let installment_cap = (request.conclusion_payout.amount
            / config.committee_payout_installments.max(1) as i64)
            .max(1);
        let pay = request
            .remaining_payout
            .amount
            .min(installment_cap)
            .min(fund);
        if pay <= 0 {
            continue;
        }

        fund -= pay;
        state.update_global(|g| g.committee_fund.amount -= pay);
        if state.account_exists(&request.worker) {
            state.adjust_balance(&request.worker, Asset::weave(pay))?;
        }
        state.committee_requests.modify(request.id, |r| {
            r.remaining_payout.amount -= pay;
            if r.remaining_payout.amount == 0 {
                r.state = CommitteeRequestState::Completed;
            }
        })?;
        debug!(request_id = request.request_id, pay, "committee installment");
        vops.push(VirtualOperation::CommitteePayout {
            request_id: request.request_id,
            worker: request.worker.clone(),
            amount: Asset::weave(pay),
        });
    }
    Ok(())
}
