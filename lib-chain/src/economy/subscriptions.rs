//! Subscription renewal sweep.
//!
//! A due subscription renews only when auto-renewal is on, the creator's
//! menu still honors the agreed terms, and the subscriber can pay. Anything
//! else deactivates it with a cancellation event.

use tracing::debug;

use lib_types::{Asset, TimePoint};

use crate::errors::EvaluationError;
use crate::notify::VirtualOperation;
use crate::state::ChainState;

const SECS_PER_DAY: u64 = 60 * 60 * 24;

pub fn process_subscriptions(
    state: &mut ChainState,
    vops: &mut Vec<VirtualOperation>,
) -> Result<(), EvaluationError> {
    let now = state.head_time();

    loop {
        let Some(sub) = state
            .paid_subscribes
            .iter_ordered()
            .next()
            .filter(|s| s.next_time <= now)
            .map(|s| s.clone())
        else {
            break;
        };

        let sub_id = sub.id;

        if !sub.active {
            // Inactive rows park at the end of the queue.
            state
                .paid_subscribes
                .modify(sub_id, |s| s.next_time = TimePoint::MAX)?;
            continue;
        }

        let menu_ok = state
            .paid_subscriptions
            .find(&sub.creator)
            .map(|menu| {
                menu.levels >= sub.level && menu.amount == sub.amount && menu.period == sub.period
            })
            .unwrap_or(false);

        let cost = sub.cycle_cost();
        let can_pay = state
            .get_account(&sub.subscriber)
            .map(|a| a.balance.amount >= cost.amount)
            .unwrap_or(false);

        if sub.auto_renewal && menu_ok && can_pay {
            state
                .adjust_balance(&sub.subscriber, Asset::weave(-cost.amount))?;
            state.adjust_balance(&sub.creator, cost)?;
            state.paid_subscribes.modify(sub_id, |s| {
                s.next_time = now + s.period as u64 * SECS_PER_DAY;
            })?;
            debug!(subscriber = %sub.subscriber, creator = %sub.creator, "subscription renewed");
            vops.push(VirtualOperation::PaidSubscriptionRenewal {
                subscriber: sub.subscriber.clone(),
                creator: sub.creator.clone(),
                amount: cost,
                level: sub.level,
            });
        } else {
            state.paid_subscribes.modify(sub_id, |s| {
                s.active = false;
                s.next_time = TimePoint::MAX;
            })?;
            debug!(subscriber = %sub.subscriber, creator = %sub.creator, "subscription lapsed");
            vops.push(VirtualOperation::PaidSubscriptionCancel {
                subscriber: sub.subscriber.clone(),
                creator: sub.creator.clone(),
            });
        }
    }
    Ok(())
}
