//! Witness declaration, witness voting, proxying, and the vote-weight
//! bookkeeping shared with vesting changes.
//!
//! Three vote-weight formulas exist, selected by applied-hardfork count:
//! - HF0: every voted witness gets the voter's full stake
//! - HF1: a new vote contributes `stake / witnesses_voted_for`; standing
//!   votes keep the weight they were cast with
//! - HF2: as HF1, but any stake or vote-count change renormalizes all of
//!   the voter's standing votes
//!
//! Each `WitnessVote` row remembers the weight actually applied, so a
//! retraction is exact under any formula.

use lib_protocol::config::MAX_PROXY_RECURSION_DEPTH;
use lib_protocol::operations::{
    AccountWitnessProxyOperation, AccountWitnessVoteOperation, WitnessUpdateOperation,
};
use lib_protocol::ProtocolVersion;
use lib_types::{AccountName, ShareAmount, TimePoint};

use crate::errors::EvaluationError;
use crate::objects::{Witness, WitnessVote};
use crate::state::ChainState;

use super::OperationContext;

/// Stake deltas bucketed by proxy distance: index 0 is the account's own
/// stake, index i>0 its proxied bucket i-1.
pub type ProxyDeltas = [ShareAmount; MAX_PROXY_RECURSION_DEPTH + 1];

/// Weight one witness receives from a voter under the given formula set.
fn vote_contribution(stake: ShareAmount, votes_cast: u16, applied_hardforks: u32) -> ShareAmount {
    if applied_hardforks >= 1 {
        stake / votes_cast.max(1) as ShareAmount
    } else {
        stake
    }
}

// ============================================================================
// STAKE / PROXY BOOKKEEPING
// ============================================================================

/// An account's own vesting stake changed by `delta`. Propagates through the
/// proxy chain (bounded walk) or into the account's own witness votes.
pub fn on_stake_changed(
    state: &mut ChainState,
    account: &AccountName,
    delta: ShareAmount,
) -> Result<(), EvaluationError> {
    if delta == 0 {
        return Ok(());
    }
    let holder = state.get_account(account)?;
    match holder.proxy.clone() {
        Some(proxy) => {
            let mut deltas: ProxyDeltas = Default::default();
            deltas[0] = delta;
            adjust_proxied(state, &proxy, &deltas, 1)
        }
        None => apply_stake_change_to_votes(state, account, delta),
    }
}

/// Walk up the proxy chain applying bucketed deltas, shifted one distance
/// per hop and truncated at the recursion cap. The terminal account's
/// witness votes absorb whatever is still visible at its depth.
pub fn adjust_proxied(
    state: &mut ChainState,
    first_proxy: &AccountName,
    deltas: &ProxyDeltas,
    sign: i64,
) -> Result<(), EvaluationError> {
    let mut current = first_proxy.clone();
    let mut depth = 0usize;
    loop {
        let proxy = state.get_account(&current)?;
        let next = proxy.proxy.clone();
        let id = proxy.id;

        state.accounts.modify(id, |a| {
            for i in 0..(MAX_PROXY_RECURSION_DEPTH - depth) {
                a.proxied_vsf_votes[i + depth] += sign * deltas[i];
            }
        })?;

        match next {
            Some(next_proxy) if depth + 1 < MAX_PROXY_RECURSION_DEPTH => {
                current = next_proxy;
                depth += 1;
            }
            Some(_) => {
                // Influence beyond the cap is dropped, exactly like the
                // bucket truncation above.
                return Ok(());
            }
            None => {
                let visible: ShareAmount =
                    deltas[..=(MAX_PROXY_RECURSION_DEPTH - depth)].iter().sum();
                return apply_stake_change_to_votes(state, &current, sign * visible);
            }
        }
    }
}

/// Apply a stake delta to an account's standing witness votes under the
/// currently-applied formula.
fn apply_stake_change_to_votes(
    state: &mut ChainState,
    account: &AccountName,
    delta: ShareAmount,
) -> Result<(), EvaluationError> {
    match state.applied_hardforks() {
        0 => {
            // Legacy: full stake per witness, so the delta lands on every
            // voted witness in full.
            let votes = collect_account_votes(state, account);
            for (vote_id, witness_name, _) in votes {
                state.witness_votes.modify(vote_id, |v| v.weight += delta)?;
                let witness_id = state.get_witness(&witness_name)?.id;
                state.witnesses.modify(witness_id, |w| w.votes += delta)?;
            }
            Ok(())
        }
        1 => Ok(()),
        _ => recompute_account_witness_votes(state, account),
    }
}

/// Re-derive every standing vote of `account` from its live stake and vote
/// count. Used by the HF2 formula and by hardfork migrations.
pub fn recompute_account_witness_votes(
    state: &mut ChainState,
    account: &AccountName,
) -> Result<(), EvaluationError> {
    let holder = state.get_account(account)?;
    let stake = holder.witness_vote_stake();
    let count = holder.witnesses_voted_for;
    let contribution = vote_contribution(stake, count, state.applied_hardforks());

    let votes = collect_account_votes(state, account);
    for (vote_id, witness_name, old) in votes {
        state
            .witness_votes
            .modify(vote_id, |v| v.weight = contribution)?;
        let witness_id = state.get_witness(&witness_name)?.id;
        state
            .witnesses
            .modify(witness_id, |w| w.votes += contribution - old)?;
    }
    Ok(())
}

fn collect_account_votes(
    state: &ChainState,
    account: &AccountName,
) -> Vec<(lib_types::ObjectId, AccountName, ShareAmount)> {
    state
        .witness_votes
        .iter_ordered_from(account)
        .take_while(|v| v.account == *account)
        .map(|v| (v.id, v.witness.clone(), v.weight))
        .collect()
}

/// Bucketed influence an account injects into its proxy chain: own stake
/// plus everything already proxied to it.
fn proxy_deltas_of(
    state: &ChainState,
    account: &AccountName,
) -> Result<ProxyDeltas, EvaluationError> {
    let holder = state.get_account(account)?;
    let mut deltas: ProxyDeltas = Default::default();
    deltas[0] = holder.vesting_shares.amount;
    for i in 0..MAX_PROXY_RECURSION_DEPTH {
        deltas[i + 1] = holder.proxied_vsf_votes[i];
    }
    Ok(deltas)
}

/// Remove every standing witness vote of `account`, subtracting the applied
/// weights. Used when a proxy takes over.
fn clear_witness_votes(state: &mut ChainState, account: &AccountName) -> Result<(), EvaluationError> {
    let votes = collect_account_votes(state, account);
    for (vote_id, witness_name, weight) in votes {
        let witness_id = state.get_witness(&witness_name)?.id;
        state.witnesses.modify(witness_id, |w| w.votes -= weight)?;
        state.witness_votes.remove(vote_id)?;
    }
    let id = state.get_account(account)?.id;
    state.accounts.modify(id, |a| a.witnesses_voted_for = 0)?;
    Ok(())
}

// ============================================================================
// EVALUATORS
// ============================================================================

pub fn apply_witness_update(
    ctx: &mut OperationContext<'_>,
    op: &WitnessUpdateOperation,
) -> Result<(), EvaluationError> {
    ctx.state.get_account(&op.owner)?;
    let now = ctx.now();

    // Declaring (or refreshing) a witness also records which rule set it
    // runs, feeding the majority-version tally.
    let running_version = ctx.state.hardfork_props().current_hardfork_version;

    if let Some(existing) = ctx.state.witnesses.find(&op.owner) {
        let id = existing.id;
        ctx.state.witnesses.modify(id, |w| {
            w.url = op.url.clone();
            w.signing_key = op.block_signing_key.clone();
            w.props = op.props.clone();
            w.running_version = running_version;
        })?;
    } else {
        ctx.state.witnesses.create(|id| Witness {
            id,
            owner: op.owner.clone(),
            created: now,
            url: op.url.clone(),
            signing_key: op.block_signing_key.clone(),
            props: op.props.clone(),
            votes: 0,
            total_missed: 0,
            last_confirmed_block_num: 0,
            running_version,
            hardfork_version_vote: ProtocolVersion::default(),
            hardfork_time_vote: TimePoint::ZERO,
            virtual_last_update: 0,
            virtual_position: 0,
            virtual_scheduled_time: 0,
        })?;
    }
    Ok(())
}

pub fn apply_account_witness_vote(
    ctx: &mut OperationContext<'_>,
    op: &AccountWitnessVoteOperation,
) -> Result<(), EvaluationError> {
    let voter = ctx.state.get_account(&op.account)?;
    if voter.proxy.is_some() {
        return Err(EvaluationError::ProxiedAccountCannotVote);
    }
    let stake = voter.witness_vote_stake();
    let count = voter.witnesses_voted_for;
    let voter_id = voter.id;

    ctx.state.get_witness(&op.witness)?;
    let hf = ctx.applied_hardforks();
    let cap = ctx.config.witness_vote_cap(hf);
    let key = (op.account.clone(), op.witness.clone());
    let existing = ctx.state.witness_votes.find(&key).map(|v| (v.id, v.weight));

    if op.approve {
        if existing.is_some() {
            return Err(EvaluationError::WitnessVoteUnchanged);
        }
        if count >= cap {
            return Err(EvaluationError::TooManyWitnessVotes { count, cap });
        }
        let contribution = vote_contribution(stake, count + 1, hf);
        ctx.state.witness_votes.create(|id| WitnessVote {
            id,
            account: op.account.clone(),
            witness: op.witness.clone(),
            weight: contribution,
        })?;
        let witness_id = ctx.state.get_witness(&op.witness)?.id;
        ctx.state
            .witnesses
            .modify(witness_id, |w| w.votes += contribution)?;
        ctx.state
            .accounts
            .modify(voter_id, |a| a.witnesses_voted_for += 1)?;
    } else {
        let Some((vote_id, weight)) = existing else {
            return Err(EvaluationError::WitnessVoteUnchanged);
        };
        let witness_id = ctx.state.get_witness(&op.witness)?.id;
        ctx.state.witnesses.modify(witness_id, |w| w.votes -= weight)?;
        ctx.state.witness_votes.remove(vote_id)?;
        ctx.state
            .accounts
            .modify(voter_id, |a| a.witnesses_voted_for -= 1)?;
    }

    // The renormalizing formula folds the count change into every
    // standing vote.
    if hf >= 2 {
        recompute_account_witness_votes(ctx.state, &op.account)?;
    }
    Ok(())
}

pub fn apply_account_witness_proxy(
    ctx: &mut OperationContext<'_>,
    op: &AccountWitnessProxyOperation,
) -> Result<(), EvaluationError> {
    let account = ctx.state.get_account(&op.account)?;
    let old_proxy = account.proxy.clone();
    let account_id = account.id;
    if old_proxy == op.proxy {
        return Err(EvaluationError::ProxyUnchanged);
    }

    if let Some(new_proxy) = &op.proxy {
        ctx.state.get_account(new_proxy)?;
        // Bounded loop detection: following the candidate chain must not
        // lead back to the voter.
        let mut cursor = new_proxy.clone();
        for _ in 0..MAX_PROXY_RECURSION_DEPTH {
            if cursor == op.account {
                return Err(EvaluationError::ProxyLoop);
            }
            match ctx.state.get_account(&cursor)?.proxy.clone() {
                Some(next) => cursor = next,
                None => break,
            }
        }
        if cursor == op.account {
            return Err(EvaluationError::ProxyLoop);
        }
    }

    let deltas = proxy_deltas_of(ctx.state, &op.account)?;

    // Retract current influence.
    match &old_proxy {
        Some(old) => adjust_proxied(ctx.state, old, &deltas, -1)?,
        None => clear_witness_votes(ctx.state, &op.account)?,
    }

    ctx.state
        .accounts
        .modify(account_id, |a| a.proxy = op.proxy.clone())?;

    // Inject under the new arrangement.
    if let Some(new_proxy) = &op.proxy {
        adjust_proxied(ctx.state, new_proxy, &deltas, 1)?;
    }
    Ok(())
}
