//! Funds issuance.
//!
//! Each block mints a pro-rata slice of the annual inflation and splits it
//! three ways by the median inflation percents: block producer, committee
//! fund, reward fund.

use lib_protocol::config::PERCENT_100;
use lib_types::Asset;

use crate::config::ChainConfig;
use crate::errors::EvaluationError;
use crate::state::ChainState;

pub fn process_funds(state: &mut ChainState, config: &ChainConfig) -> Result<(), EvaluationError> {
    let global = state.global();
    let median = state.schedule().median_props.clone();

    let per_block = (global.virtual_supply() as i128
        * global.inflation_rate_bps as i128
        / PERCENT_100 as i128
        / config.blocks_per_year() as i128) as i64;
    // A chain young enough to round to zero still trickles one unit so the
    // reward pipeline can be exercised end to end.
    let new_supply = per_block.max(1);

    let witness_reward = new_supply * median.inflation_witness_percent as i64 / PERCENT_100 as i64;
    let committee_share =
        new_supply * median.inflation_committee_percent as i64 / PERCENT_100 as i64;
    let content_share = new_supply - witness_reward - committee_share;

    let producer = global.current_witness.clone();
    state.update_global(|g| {
        g.current_supply.amount += new_supply;
        g.committee_fund.amount += committee_share;
        g.total_reward_fund.amount += content_share;
    });

    // The producer's cut vests immediately.
    if witness_reward > 0 && state.account_exists(&producer) {
        state.create_vesting(&producer, Asset::weave(witness_reward))?;
    }
    Ok(())
}
