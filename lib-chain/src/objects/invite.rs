//! Invite balances.
//!
//! A consumed invite keeps its row (status + receiver) so its key can never
//! be reused and read-side plugins can trace redemptions.

use serde::{Deserialize, Serialize};

use lib_chainstore::StateObject;
use lib_protocol::PublicKey;
use lib_types::{AccountName, Asset, ObjectId, TimePoint};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InviteStatus {
    Pending = 0,
    /// Balance claimed into an existing account
    Claimed = 1,
    /// Consumed to register a new account
    Registered = 2,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Invite {
    pub id: ObjectId,
    pub creator: AccountName,
    /// The bearer key; unique, one invite per key forever
    pub invite_key: PublicKey,
    pub balance: Asset,
    pub claimed_balance: Asset,
    pub status: InviteStatus,
    pub receiver: Option<AccountName>,
    pub create_time: TimePoint,
    pub claim_time: TimePoint,
}

impl StateObject for Invite {
    const TABLE: &'static str = "invites";
    type UniqueKey = PublicKey;
    type OrderedKey = ();

    fn id(&self) -> ObjectId {
        self.id
    }

    fn unique_key(&self) -> PublicKey {
        self.invite_key.clone()
    }
}
