//! Content creation, editing, and deletion.

use lib_protocol::config::MAX_COMMENT_DEPTH;
use lib_protocol::operations::{ContentOperation, DeleteContentOperation};
use lib_types::{ObjectId, TimePoint};

use crate::errors::EvaluationError;
use crate::objects::Content;
use crate::state::ChainState;

use super::OperationContext;

/// Walk from `start` to the thread root applying `f`, bounded by the depth
/// counter rather than trusting the link structure.
pub fn for_each_ancestor(
    state: &mut ChainState,
    start: Option<ObjectId>,
    mut f: impl FnMut(&mut Content),
) -> Result<(), EvaluationError> {
    let mut cursor = start;
    let mut hops = 0u32;
    while let Some(content_id) = cursor {
        if hops > MAX_COMMENT_DEPTH as u32 {
            break;
        }
        let parent = state
            .content
            .get(content_id)
            .map(|c| c.parent)
            .ok_or(EvaluationError::UnknownParent)?;
        state.content.modify(content_id, &mut f)?;
        cursor = parent;
        hops += 1;
    }
    Ok(())
}

pub fn apply_content(
    ctx: &mut OperationContext<'_>,
    op: &ContentOperation,
) -> Result<(), EvaluationError> {
    let now = ctx.now();
    let author = ctx.state.get_account(&op.author)?;
    let author_id = author.id;

    // Resolve the parent up front; its identity is fixed for the lifetime
    // of the content.
    let parent_info = match &op.parent_author {
        Some(parent_author) => {
            let parent = ctx.state.get_content(parent_author, &op.parent_permlink)?;
            let depth = parent.depth + 1;
            if depth > MAX_COMMENT_DEPTH {
                return Err(EvaluationError::CommentTooDeep { depth });
            }
            Some((parent.id, parent.root, depth))
        }
        None => None,
    };

    let key = (op.author.clone(), op.permlink.clone());
    let existing = ctx.state.content.find(&key).map(|c| {
        (
            c.id,
            c.parent_author.clone(),
            c.parent_permlink.clone(),
            c.beneficiaries.is_empty(),
            c.abs_rshares,
        )
    });

    match existing {
        None => {
            let cashout_time = now + ctx.config.cashout_window_secs;
            if let Some(routes) = op.beneficiaries() {
                for route in routes {
                    ctx.state.get_account(&route.account)?;
                }
            }
            let created = ctx.state.content.create(|id| Content {
                id,
                author: op.author.clone(),
                permlink: op.permlink.clone(),
                parent: parent_info.map(|(parent_id, _, _)| parent_id),
                parent_author: op.parent_author.clone(),
                parent_permlink: op.parent_permlink.clone(),
                // Root posts are their own thread root.
                root: parent_info.map(|(_, root, _)| root).unwrap_or(id),
                depth: parent_info.map(|(_, _, depth)| depth).unwrap_or(0),
                children: 0,
                created: now,
                last_update: now,
                net_rshares: 0,
                abs_rshares: 0,
                vote_rshares: 0,
                children_rshares: 0,
                net_votes: 0,
                total_vote_weight: 0,
                cashout_time,
                author_rewards: 0,
                total_payout_value: lib_types::Asset::weave(0),
                curator_payout_value: lib_types::Asset::weave(0),
                beneficiaries: op.beneficiaries().map(<[_]>::to_vec).unwrap_or_default(),
            })?;

            for_each_ancestor(ctx.state, parent_info.map(|(parent_id, _, _)| parent_id), |c| {
                c.children += 1;
            })?;

            ctx.state.accounts.modify(author_id, |a| {
                if created.is_root() {
                    a.content_count += 1;
                } else {
                    a.comment_count += 1;
                }
            })?;
        }
        Some((content_id, stored_parent_author, stored_parent_permlink, no_routes, abs_rshares)) => {
            if stored_parent_author != op.parent_author
                || stored_parent_permlink != op.parent_permlink
            {
                return Err(EvaluationError::ParentMismatch);
            }
            if let Some(routes) = op.beneficiaries() {
                // Attachable exactly once, and only before the first vote.
                if !no_routes || abs_rshares != 0 {
                    return Err(EvaluationError::BeneficiariesLocked);
                }
                for route in routes {
                    ctx.state.get_account(&route.account)?;
                }
                let routes = routes.to_vec();
                ctx.state
                    .content
                    .modify(content_id, |c| c.beneficiaries = routes)?;
            }
            ctx.state
                .content
                .modify(content_id, |c| c.last_update = now)?;
        }
    }
    Ok(())
}

pub fn apply_delete_content(
    ctx: &mut OperationContext<'_>,
    op: &DeleteContentOperation,
) -> Result<(), EvaluationError> {
    let content = ctx.state.get_content(&op.author, &op.permlink)?;
    if content.children != 0 || content.abs_rshares != 0 || content.net_votes != 0 {
        return Err(EvaluationError::ContentNotDeletable);
    }
    if content.cashout_time == TimePoint::MAX {
        return Err(EvaluationError::ContentPaidOut);
    }
    let content_id = content.id;
    let parent = content.parent;

    for_each_ancestor(ctx.state, parent, |c| {
        c.children = c.children.saturating_sub(1);
    })?;
    ctx.state.content.remove(content_id)?;
    Ok(())
}
