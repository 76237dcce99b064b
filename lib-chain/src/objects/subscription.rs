//! Paid subscriptions: creator menus and active subscriptions.

use serde::{Deserialize, Serialize};

use lib_chainstore::StateObject;
use lib_types::{AccountName, Asset, ObjectId, TimePoint};

/// A creator's published menu: `levels` tiers at `amount` per level per
/// `period` days.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaidSubscription {
    pub id: ObjectId,
    pub creator: AccountName,
    pub url: String,
    pub levels: u16,
    pub amount: Asset,
    pub period: u16,
    pub update_time: TimePoint,
}

impl StateObject for PaidSubscription {
    const TABLE: &'static str = "paid_subscriptions";
    type UniqueKey = AccountName;
    type OrderedKey = ();

    fn id(&self) -> ObjectId {
        self.id
    }

    fn unique_key(&self) -> AccountName {
        self.creator.clone()
    }
}

/// One subscriber's standing subscription to one creator. The agreed terms
/// are pinned here; renewal compares them against the creator's current menu.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaidSubscribe {
    pub id: ObjectId,
    pub subscriber: AccountName,
    pub creator: AccountName,
    pub level: u16,
    /// Agreed per-level price
    pub amount: Asset,
    /// Agreed period in days
    pub period: u16,
    pub start_time: TimePoint,
    /// Next renewal charge; `TimePoint::MAX` when inactive
    pub next_time: TimePoint,
    pub auto_renewal: bool,
    pub active: bool,
}

impl PaidSubscribe {
    /// Total cost of one period at the agreed terms.
    pub fn cycle_cost(&self) -> Asset {
        Asset::new(
            self.amount.amount.saturating_mul(self.level as i64),
            self.amount.symbol,
        )
    }
}

impl StateObject for PaidSubscribe {
    const TABLE: &'static str = "paid_subscribes";
    type UniqueKey = (AccountName, AccountName);
    type OrderedKey = TimePoint;

    fn id(&self) -> ObjectId {
        self.id
    }

    fn unique_key(&self) -> (AccountName, AccountName) {
        (self.subscriber.clone(), self.creator.clone())
    }

    /// Ordered by renewal due time for the renewal sweep.
    fn ordered_key(&self) -> Option<TimePoint> {
        Some(self.next_time)
    }
}
