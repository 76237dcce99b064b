//! Escrow state.
//!
//! Lifecycle: created → (to approves, agent approves) → optionally disputed
//! → released/refunded. A decline or a passed ratification deadline refunds
//! the sender and removes the row.

use serde::{Deserialize, Serialize};

use lib_chainstore::StateObject;
use lib_types::{AccountName, Asset, ObjectId, TimePoint};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Escrow {
    pub id: ObjectId,
    /// Sender-scoped identifier from the transfer operation
    pub escrow_id: u32,
    pub from: AccountName,
    pub to: AccountName,
    pub agent: AccountName,

    pub ratification_deadline: TimePoint,
    pub escrow_expiration: TimePoint,

    /// Funds still held
    pub balance: Asset,
    /// Agent fee still pending; zeroed once paid on full ratification
    pub pending_fee: Asset,

    pub to_approved: bool,
    pub agent_approved: bool,
    pub disputed: bool,
}

impl Escrow {
    pub fn is_ratified(&self) -> bool {
        self.to_approved && self.agent_approved
    }
}

impl StateObject for Escrow {
    const TABLE: &'static str = "escrows";
    type UniqueKey = (AccountName, u32);
    type OrderedKey = TimePoint;

    fn id(&self) -> ObjectId {
        self.id
    }

    fn unique_key(&self) -> (AccountName, u32) {
        (self.from.clone(), self.escrow_id)
    }

    /// Ordered by ratification deadline for the expiry sweep.
    fn ordered_key(&self) -> Option<TimePoint> {
        Some(self.ratification_deadline)
    }
}
