//! Content and content votes.
//!
//! Consensus keeps only the accounting a payout needs; bodies and titles
//! flow to read-side plugins through operation notifications and are never
//! stored here.

use serde::{Deserialize, Serialize};

use lib_chainstore::StateObject;
use lib_protocol::BeneficiaryRoute;
use lib_types::{AccountName, Asset, ObjectId, TimePoint};

/// Sentinel for [`ContentVote::num_changes`]: vote is locked after payout.
pub const VOTE_LOCKED: i8 = -1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Content {
    pub id: ObjectId,
    pub author: AccountName,
    pub permlink: String,

    /// Parent content id; `None` for root posts
    pub parent: Option<ObjectId>,
    pub parent_author: Option<AccountName>,
    /// Parent permlink for replies; category tag for root posts
    pub parent_permlink: String,
    /// Root post of this thread (self for root posts)
    pub root: ObjectId,
    /// Strictly `parent.depth + 1`; 0 for root posts
    pub depth: u16,
    pub children: u32,

    pub created: TimePoint,
    pub last_update: TimePoint,

    // --- vote accounting ----------------------------------------------------
    pub net_rshares: i64,
    pub abs_rshares: i64,
    pub vote_rshares: i64,
    /// Sum of net_rshares over this subtree, self included
    pub children_rshares: i64,
    pub net_votes: i32,
    pub total_vote_weight: u64,

    // --- payout -------------------------------------------------------------
    /// Concrete future instant, or `TimePoint::MAX` once paid
    pub cashout_time: TimePoint,
    pub author_rewards: i64,
    pub total_payout_value: Asset,
    pub curator_payout_value: Asset,
    /// Sorted by account; weights sum to at most 100%
    pub beneficiaries: Vec<BeneficiaryRoute>,
}

impl Content {
    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    pub fn is_paid_out(&self) -> bool {
        self.cashout_time == TimePoint::MAX
    }

    /// Claim weight for the payout pool: net positive rshares squared.
    pub fn reward_shares2(&self) -> u128 {
        let positive = self.net_rshares.max(0) as u128;
        positive * positive
    }
}

impl StateObject for Content {
    const TABLE: &'static str = "content";
    type UniqueKey = (AccountName, String);
    type OrderedKey = TimePoint;

    fn id(&self) -> ObjectId {
        self.id
    }

    fn unique_key(&self) -> (AccountName, String) {
        (self.author.clone(), self.permlink.clone())
    }

    /// Ordered by cashout so the payout sweep reads a prefix.
    fn ordered_key(&self) -> Option<TimePoint> {
        Some(self.cashout_time)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentVote {
    pub id: ObjectId,
    pub content: ObjectId,
    pub voter: AccountName,
    /// Signed reward shares this vote contributed
    pub rshares: i64,
    /// The weight the voter asked for, basis points
    pub percent: i16,
    /// Curation share weight; zeroed on re-vote
    pub weight: u64,
    pub last_update: TimePoint,
    /// Re-vote budget; [`VOTE_LOCKED`] after payout
    pub num_changes: i8,
}

impl ContentVote {
    pub fn is_locked(&self) -> bool {
        self.num_changes == VOTE_LOCKED
    }
}

impl StateObject for ContentVote {
    const TABLE: &'static str = "content_votes";
    type UniqueKey = (ObjectId, AccountName);
    type OrderedKey = ObjectId;

    fn id(&self) -> ObjectId {
        self.id
    }

    fn unique_key(&self) -> (ObjectId, AccountName) {
        (self.content, self.voter.clone())
    }

    /// Ordered by content so curation payout iterates one content's votes.
    fn ordered_key(&self) -> Option<ObjectId> {
        Some(self.content)
    }
}
