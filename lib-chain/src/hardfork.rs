//! Hardfork controller.
//!
//! Hardforks are scheduled in [`ChainConfig::hardforks`], ordered, and
//! applied exactly once each, never skipping, whenever the head time passes
//! a trigger. A hardfork's one-shot migration commits atomically with its
//! counter bump: both live in the same block session.

use std::collections::BTreeSet;

use tracing::info;

use lib_types::AccountName;

use crate::config::ChainConfig;
use crate::errors::{ChainError, EvaluationError};
use crate::evaluators::witness::recompute_account_witness_votes;
use crate::notify::VirtualOperation;
use crate::state::ChainState;

/// Startup sanity: state claiming more hardforks than this build knows is a
/// newer chain; running against it would fork us.
pub fn check_hardfork_state(state: &ChainState, config: &ChainConfig) -> Result<(), ChainError> {
    let applied = state.applied_hardforks();
    if applied as usize > config.hardforks.len() {
        return Err(ChainError::Corruption(format!(
            "state has {} applied hardforks but this build knows only {}; reindex with a newer node",
            applied,
            config.hardforks.len()
        )));
    }
    Ok(())
}

/// Apply every hardfork whose trigger time has passed, in order.
pub fn process_hardforks(
    state: &mut ChainState,
    config: &ChainConfig,
    vops: &mut Vec<VirtualOperation>,
) -> Result<(), EvaluationError> {
    loop {
        let applied = state.applied_hardforks();
        let Some(scheduled) = config.hardforks.get(applied as usize) else {
            return Ok(());
        };
        if state.head_time() < scheduled.time {
            return Ok(());
        }
        apply_hardfork(state, config, applied + 1, vops)?;
    }
}

fn apply_hardfork(
    state: &mut ChainState,
    config: &ChainConfig,
    hardfork: u32,
    vops: &mut Vec<VirtualOperation>,
) -> Result<(), EvaluationError> {
    let now = state.head_time();
    let version = config.hardforks[hardfork as usize - 1].version;

    // Counter first: migrations run under the new rules they introduce.
    state.update_hardforks(|h| {
        h.last_hardfork = hardfork;
        h.processed_hardforks.push(now);
        h.current_hardfork_version = version;
    });

    match hardfork {
        // Fair witness votes: stake splits across the voted witnesses.
        1 => recompute_all_witness_votes(state)?,
        // Renormalizing votes: same formula, plus live re-weighting; the
        // migration snaps every standing vote to its live value.
        2 => recompute_all_witness_votes(state)?,
        _ => {}
    }

    info!(hardfork, %version, "hardfork applied");
    vops.push(VirtualOperation::HardforkApplied { hardfork, time: now });
    Ok(())
}

/// One-shot migration: re-derive every account's witness-vote weights under
/// the formula in force.
fn recompute_all_witness_votes(state: &mut ChainState) -> Result<(), EvaluationError> {
    let voters: BTreeSet<AccountName> = state
        .witness_votes
        .iter()
        .map(|v| v.account.clone())
        .collect();
    for voter in voters {
        recompute_account_witness_votes(state, &voter)?;
    }
    Ok(())
}
