//! Content voting: energy accounting, rshares, and the propagation of vote
//! deltas into ancestors and the global reward-share total.

use lib_protocol::config::{MAX_VOTE_CHANGES, PERCENT_100};
use lib_protocol::operations::VoteOperation;
use lib_types::{ObjectId, ShareAmount};

use crate::errors::EvaluationError;
use crate::objects::ContentVote;
use crate::state::ChainState;

use super::content::for_each_ancestor;
use super::OperationContext;

fn signum(value: i64) -> i32 {
    match value.cmp(&0) {
        std::cmp::Ordering::Greater => 1,
        std::cmp::Ordering::Less => -1,
        std::cmp::Ordering::Equal => 0,
    }
}

/// Fold a content's claim-weight change into the global payout denominator.
fn adjust_reward_shares2(state: &mut ChainState, old2: u128, new2: u128) {
    state.update_global(|g| {
        g.total_reward_shares2 = g.total_reward_shares2 - old2 + new2;
    });
}

/// Apply an rshares delta to the content's subtree aggregate, self included,
/// walking up to the root.
fn propagate_children_rshares(
    state: &mut ChainState,
    content_id: ObjectId,
    delta: ShareAmount,
) -> Result<(), EvaluationError> {
    for_each_ancestor(state, Some(content_id), |c| c.children_rshares += delta)
}

pub fn apply_vote(
    ctx: &mut OperationContext<'_>,
    op: &VoteOperation,
) -> Result<(), EvaluationError> {
    let now = ctx.now();
    let median = ctx.median_props();

    let voter = ctx.state.get_account(&op.voter)?;
    let voter_id = voter.id;
    let effective_shares = voter.effective_vesting_shares();
    let current_energy = voter.current_energy(now, ctx.config.energy_regen_secs);

    let content = ctx.state.get_content(&op.author, &op.permlink)?;
    let content_id = content.id;
    let paid_out = content.is_paid_out();
    let old_content_rshares2 = content.reward_shares2();
    let content_created = content.created;
    let author_id = ctx.state.get_account(&op.author)?.id;

    let key = (content_id, op.voter.clone());
    let existing = ctx
        .state
        .content_votes
        .find(&key)
        .map(|v| (v.id, v.rshares, v.percent, v.weight, v.num_changes));

    if paid_out {
        return match existing {
            None => Err(EvaluationError::ContentPaidOut),
            Some(_) => Err(EvaluationError::VoteLocked),
        };
    }

    // --- energy spend -------------------------------------------------------
    if current_energy <= 0 {
        return Err(EvaluationError::OutOfEnergy);
    }
    let abs_weight = op.weight.unsigned_abs() as i64;
    let mut used_energy = (current_energy as i64 * abs_weight)
        / (PERCENT_100 as i64 * ctx.config.vote_energy_rate as i64);
    if abs_weight > 0 {
        used_energy = used_energy.max(1);
    }
    if op.weight < 0 {
        // Flag votes carry a median-steered surcharge.
        used_energy += used_energy * median.flag_energy_additional_cost as i64 / PERCENT_100 as i64;
    }
    let new_energy = current_energy as i64 - used_energy;
    if new_energy < -(PERCENT_100 as i64) {
        return Err(EvaluationError::OutOfEnergy);
    }

    // --- rshares ------------------------------------------------------------
    let mut rshares_magnitude =
        ((effective_shares as i128 * used_energy as i128) / PERCENT_100 as i128) as i64;
    if rshares_magnitude < median.vote_accounting_min_rshares as i64 {
        // Noise floor: accounting ignores dust votes entirely.
        rshares_magnitude = 0;
    }
    let rshares = signum(op.weight as i64) as i64 * rshares_magnitude;

    match existing {
        None => {
            if op.weight == 0 {
                return Err(EvaluationError::VoteUnchanged);
            }

            // Curation weight rewards early conviction, damped linearly
            // inside the reverse-auction window.
            let auction = ctx.config.reverse_auction_window_secs.max(1);
            let elapsed = now.elapsed_since(content_created).min(auction);
            let curation_weight = if rshares > 0 {
                (rshares as u128 * elapsed as u128 / auction as u128) as u64
            } else {
                0
            };

            ctx.state.content_votes.create(|id| ContentVote {
                id,
                content: content_id,
                voter: op.voter.clone(),
                rshares,
                percent: op.weight,
                weight: curation_weight,
                last_update: now,
                num_changes: 0,
            })?;

            ctx.state.content.modify(content_id, |c| {
                c.net_rshares += rshares;
                c.abs_rshares += rshares.abs();
                c.vote_rshares += rshares.max(0);
                c.net_votes += signum(rshares);
                c.total_vote_weight += curation_weight;
            })?;

            propagate_children_rshares(ctx.state, content_id, rshares)?;
        }
        Some((vote_id, old_rshares, old_percent, old_weight, num_changes)) => {
            if old_percent == op.weight {
                return Err(EvaluationError::VoteUnchanged);
            }
            if num_changes as u8 >= MAX_VOTE_CHANGES {
                return Err(EvaluationError::TooManyVoteChanges);
            }

            ctx.state.content_votes.modify(vote_id, |v| {
                v.rshares = rshares;
                v.percent = op.weight;
                // A changed vote forfeits its curation share.
                v.weight = 0;
                v.last_update = now;
                v.num_changes += 1;
            })?;

            ctx.state.content.modify(content_id, |c| {
                c.net_rshares += rshares - old_rshares;
                c.abs_rshares += rshares.abs();
                c.vote_rshares += rshares.max(0) - old_rshares.max(0);
                c.net_votes += signum(rshares) - signum(old_rshares);
                c.total_vote_weight -= old_weight;
            })?;

            propagate_children_rshares(ctx.state, content_id, rshares - old_rshares)?;
        }
    }

    let new_content_rshares2 = ctx
        .state
        .content
        .get(content_id)
        .expect("content modified above")
        .reward_shares2();
    adjust_reward_shares2(ctx.state, old_content_rshares2, new_content_rshares2);

    // --- account bookkeeping ------------------------------------------------
    ctx.state.accounts.modify(voter_id, |a| {
        a.energy = new_energy as i16;
        a.last_energy_update = now;
        a.vote_count += 1;
        a.last_vote_time = now;
    })?;
    let award_delta = rshares - existing.map(|(_, old, ..)| old).unwrap_or(0);
    ctx.state
        .accounts
        .modify(author_id, |a| a.awarded_rshares += award_delta)?;

    Ok(())
}
