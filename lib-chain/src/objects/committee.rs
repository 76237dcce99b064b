//! Committee worker requests and their votes.

use serde::{Deserialize, Serialize};

use lib_chainstore::StateObject;
use lib_types::{AccountName, Asset, ObjectId, TimePoint};

/// Request lifecycle. The numeric values are protocol: they appear in
/// notifications and exports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommitteeRequestState {
    /// Collecting votes until `end_time`
    Pending = 0,
    /// Withdrawn by its creator
    Cancelled = 1,
    /// Concluded without enough supporting stake
    RejectedVotes = 2,
    /// Concluded, but the interpolated payout fell below the requested minimum
    RejectedBelowMin = 3,
    /// Concluded approved; receiving installments
    ApprovedPayout = 4,
    /// Fully paid
    Completed = 5,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommitteeRequest {
    pub id: ObjectId,
    /// Chain-wide sequential id, assigned at creation
    pub request_id: u32,
    pub creator: AccountName,
    /// Payout target
    pub worker: AccountName,
    pub url: String,

    pub required_amount_min: Asset,
    pub required_amount_max: Asset,

    pub start_time: TimePoint,
    pub duration: u32,
    pub end_time: TimePoint,

    pub state: CommitteeRequestState,
    pub votes_count: u32,

    /// Interpolated payout fixed at conclusion
    pub conclusion_payout: Asset,
    /// Still owed
    pub remaining_payout: Asset,
}

impl StateObject for CommitteeRequest {
    const TABLE: &'static str = "committee_requests";
    type UniqueKey = u32;
    type OrderedKey = TimePoint;

    fn id(&self) -> ObjectId {
        self.id
    }

    fn unique_key(&self) -> u32 {
        self.request_id
    }

    /// Ordered by voting end for the conclusion sweep.
    fn ordered_key(&self) -> Option<TimePoint> {
        Some(self.end_time)
    }
}

/// One account's stake-scaled vote on a request. Re-voting updates in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommitteeVote {
    pub id: ObjectId,
    pub request_id: u32,
    pub voter: AccountName,
    /// Basis points; negative votes against
    pub vote_percent: i16,
    pub last_update: TimePoint,
}

impl StateObject for CommitteeVote {
    const TABLE: &'static str = "committee_votes";
    type UniqueKey = (u32, AccountName);
    type OrderedKey = u32;

    fn id(&self) -> ObjectId {
        self.id
    }

    fn unique_key(&self) -> (u32, AccountName) {
        (self.request_id, self.voter.clone())
    }

    /// Ordered by request so a conclusion tallies one prefix.
    fn ordered_key(&self) -> Option<u32> {
        Some(self.request_id)
    }
}
