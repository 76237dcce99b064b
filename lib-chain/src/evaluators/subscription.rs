//! Paid subscription evaluators. Renewal runs in the per-block maintenance
//! pass (`economy::subscriptions`).

use lib_protocol::operations::{PaidSubscribeOperation, SetPaidSubscriptionOperation};
use lib_types::Asset;

use crate::errors::EvaluationError;
use crate::objects::{PaidSubscribe, PaidSubscription};

use super::OperationContext;

const SECS_PER_DAY: u64 = 60 * 60 * 24;

pub fn apply_set_paid_subscription(
    ctx: &mut OperationContext<'_>,
    op: &SetPaidSubscriptionOperation,
) -> Result<(), EvaluationError> {
    let now = ctx.now();
    ctx.state.get_account(&op.account)?;

    match ctx.state.paid_subscriptions.find(&op.account).map(|s| s.id) {
        Some(menu_id) => {
            ctx.state.paid_subscriptions.modify(menu_id, |s| {
                s.url = op.url.clone();
                s.levels = op.levels;
                s.amount = op.amount;
                s.period = op.period;
                s.update_time = now;
            })?;
        }
        None => {
            ctx.state.paid_subscriptions.create(|id| PaidSubscription {
                id,
                creator: op.account.clone(),
                url: op.url.clone(),
                levels: op.levels,
                amount: op.amount,
                period: op.period,
                update_time: now,
            })?;
        }
    }
    Ok(())
}

pub fn apply_paid_subscribe(
    ctx: &mut OperationContext<'_>,
    op: &PaidSubscribeOperation,
) -> Result<(), EvaluationError> {
    let now = ctx.now();
    ctx.state.get_account(&op.subscriber)?;
    ctx.state.get_account(&op.account)?;

    let menu = ctx
        .state
        .paid_subscriptions
        .find(&op.account)
        .ok_or_else(|| EvaluationError::UnknownSubscription(op.account.clone()))?;

    // The quoted terms shield the subscriber from a racing menu change.
    if op.level > menu.levels || op.amount != menu.amount || op.period != menu.period {
        return Err(EvaluationError::SubscriptionTermsMismatch);
    }

    let new_cost = op.amount.amount.saturating_mul(op.level as i64);
    let period_secs = op.period as u64 * SECS_PER_DAY;

    let key = (op.subscriber.clone(), op.account.clone());
    let existing = ctx.state.paid_subscribes.find(&key).cloned();

    match existing {
        Some(sub) if sub.active => {
            // Plan switch: the unspent tail of the current cycle counts
            // against the new plan's cost.
            let old_period_secs = (sub.period as u64 * SECS_PER_DAY).max(1);
            let remaining_secs = sub.next_time.elapsed_since(now).min(old_period_secs);
            let credit =
                (sub.cycle_cost().amount as i128 * remaining_secs as i128 / old_period_secs as i128) as i64;
            let due = new_cost - credit;
            if due > 0 {
                ctx.state
                    .adjust_balance(&op.subscriber, Asset::weave(-due))?;
                ctx.state.adjust_balance(&op.account, Asset::weave(due))?;
            }
            ctx.state.paid_subscribes.modify(sub.id, |s| {
                s.level = op.level;
                s.amount = op.amount;
                s.period = op.period;
                s.next_time = now + period_secs;
                s.auto_renewal = op.auto_renewal;
            })?;
        }
        Some(sub) => {
            // Reactivation charges a full cycle.
            ctx.state
                .adjust_balance(&op.subscriber, Asset::weave(-new_cost))?;
            ctx.state.adjust_balance(&op.account, Asset::weave(new_cost))?;
            ctx.state.paid_subscribes.modify(sub.id, |s| {
                s.level = op.level;
                s.amount = op.amount;
                s.period = op.period;
                s.start_time = now;
                s.next_time = now + period_secs;
                s.auto_renewal = op.auto_renewal;
                s.active = true;
            })?;
        }
        None => {
            ctx.state
                .adjust_balance(&op.subscriber, Asset::weave(-new_cost))?;
            ctx.state.adjust_balance(&op.account, Asset::weave(new_cost))?;
            ctx.state.paid_subscribes.create(|id| PaidSubscribe {
                id,
                subscriber: op.subscriber.clone(),
                creator: op.account.clone(),
                level: op.level,
                amount: op.amount,
                period: op.period,
                start_time: now,
                next_time: now + period_secs,
                auto_renewal: op.auto_renewal,
                active: true,
            })?;
        }
    }
    Ok(())
}
