//! Content cashout.
//!
//! A time-ordered sweep pays every piece of content whose cashout time has
//! elapsed. The pool claim is `reward_fund * rshares^2 / total_rshares2`,
//! computed in 256-bit arithmetic; the order of multiplications and
//! truncations here is consensus and must not be "simplified".

use primitive_types::U256;
use tracing::debug;

use lib_protocol::config::PERCENT_100;
use lib_types::{Asset, ObjectId, TimePoint};

use crate::config::ChainConfig;
use crate::errors::EvaluationError;
use crate::notify::VirtualOperation;
use crate::objects::VOTE_LOCKED;
use crate::state::ChainState;

use crate::evaluators::content::for_each_ancestor;

/// Pool share claimed by `rshares2` out of `total_rshares2`.
fn claim_from_pool(reward_fund: i64, rshares2: u128, total_rshares2: u128) -> i64 {
    if total_rshares2 == 0 || rshares2 == 0 || reward_fund <= 0 {
        return 0;
    }
    let claim = U256::from(reward_fund as u64) * U256::from(rshares2) / U256::from(total_rshares2);
    claim.as_u64() as i64
}

pub fn process_cashouts(
    state: &mut ChainState,
    config: &ChainConfig,
    vops: &mut Vec<VirtualOperation>,
) -> Result<(), EvaluationError> {
    let now = state.head_time();

    loop {
        // Ordered index yields the earliest cashout first.
        let Some(due) = state
            .content
            .iter_ordered()
            .next()
            .filter(|c| c.cashout_time <= now)
            .map(|c| c.clone())
        else {
            break;
        };

        pay_content(state, config, vops, due.id)?;
    }
    Ok(())
}

fn pay_content(
    state: &mut ChainState,
    config: &ChainConfig,
    vops: &mut Vec<VirtualOperation>,
    content_id: ObjectId,
) -> Result<(), EvaluationError> {
    let content = state
        .content
        .get(content_id)
        .expect("cashout sweep found this id")
        .clone();
    let global = state.global().clone();
    let median = state.schedule().median_props.clone();

    let rshares2 = content.reward_shares2();
    let claim = claim_from_pool(
        global.total_reward_fund.amount,
        rshares2,
        global.total_reward_shares2,
    );

    let mut author_tokens = claim;
    let mut curation_paid = 0i64;

    if claim > 0 {
        // Curation percent is steered by the median bounds.
        let curation_percent = (config.default_curation_percent as i64)
            .clamp(
                median.min_curation_percent as i64,
                median.max_curation_percent as i64,
            );
        let curation_pool = claim * curation_percent / PERCENT_100 as i64;

        if content.total_vote_weight > 0 && curation_pool > 0 {
            let votes: Vec<_> = state
                .content_votes
                .iter_ordered_from(&content_id)
                .take_while(|v| v.content == content_id)
                .filter(|v| v.weight > 0)
                .map(|v| (v.voter.clone(), v.weight))
                .collect();
            for (curator, weight) in votes {
                let reward = ((curation_pool as u128 * weight as u128)
                    / content.total_vote_weight as u128) as i64;
                if reward == 0 {
                    continue;
                }
                let vested = state.create_vesting(&curator, Asset::weave(reward))?;
                curation_paid += reward;
                vops.push(VirtualOperation::CurationReward {
                    curator,
                    reward: vested,
                    author: content.author.clone(),
                    permlink: content.permlink.clone(),
                });
            }
        }
        // Rounding dust from the curation split stays with the author.
        author_tokens = claim - curation_paid;

        // Beneficiary routes are carved from the author share.
        let mut benefactor_total = 0i64;
        for route in &content.beneficiaries {
            let reward = author_tokens * route.weight as i64 / PERCENT_100 as i64;
            if reward == 0 {
                continue;
            }
            let vested = state.create_vesting(&route.account, Asset::weave(reward))?;
            benefactor_total += reward;
            vops.push(VirtualOperation::BenefactorReward {
                benefactor: route.account.clone(),
                author: content.author.clone(),
                permlink: content.permlink.clone(),
                reward: vested,
            });
        }
        author_tokens -= benefactor_total;

        // Author: half liquid, half vested.
        let liquid_half = author_tokens / 2;
        let vested_half = author_tokens - liquid_half;
        state.adjust_balance(&content.author, Asset::weave(liquid_half))?;
        let vested = state.create_vesting(&content.author, Asset::weave(vested_half))?;
        vops.push(VirtualOperation::AuthorReward {
            author: content.author.clone(),
            permlink: content.permlink.clone(),
            liquid: Asset::weave(liquid_half),
            vesting: vested,
        });

        debug!(
            author = %content.author,
            permlink = %content.permlink,
            claim,
            curation_paid,
            "content cashout"
        );
    }

    // Retire the claim from the pool whether or not it rounded to zero.
    state.update_global(|g| {
        g.total_reward_fund.amount -= claim;
        g.total_reward_shares2 -= rshares2;
    });

    // The subtree aggregate unwinds by exactly the net rshares leaving.
    let net = content.net_rshares;
    if net != 0 {
        for_each_ancestor(state, Some(content_id), |c| c.children_rshares -= net)?;
    }

    state.content.modify(content_id, |c| {
        c.net_rshares = 0;
        c.cashout_time = TimePoint::MAX;
        c.total_payout_value.amount += author_tokens;
        c.curator_payout_value.amount += curation_paid;
        c.author_rewards += author_tokens;
    })?;

    // Lock every vote so post-payout edits are rejected.
    let vote_ids: Vec<_> = state
        .content_votes
        .iter_ordered_from(&content_id)
        .take_while(|v| v.content == content_id)
        .map(|v| v.id)
        .collect();
    for vote_id in vote_ids {
        state
            .content_votes
            .modify(vote_id, |v| v.num_changes = VOTE_LOCKED)?;
    }
    Ok(())
}
