//! Vesting delegation records, their time-locked returns, and withdrawal
//! routes.

use serde::{Deserialize, Serialize};

use lib_chainstore::StateObject;
use lib_types::{AccountName, Asset, ObjectId, TimePoint};

/// A standing delegation from `delegator` to `delegatee`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VestingDelegation {
    pub id: ObjectId,
    pub delegator: AccountName,
    pub delegatee: AccountName,
    pub vesting_shares: Asset,
    /// Cannot shrink before this instant
    pub min_delegation_time: TimePoint,
}

impl StateObject for VestingDelegation {
    const TABLE: &'static str = "vesting_delegations";
    type UniqueKey = (AccountName, AccountName);
    type OrderedKey = ();

    fn id(&self) -> ObjectId {
        self.id
    }

    fn unique_key(&self) -> (AccountName, AccountName) {
        (self.delegator.clone(), self.delegatee.clone())
    }
}

/// Shares returning from a shrunk delegation; unusable by either party until
/// `expiration`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VestingDelegationExpiration {
    pub id: ObjectId,
    pub delegator: AccountName,
    pub vesting_shares: Asset,
    pub expiration: TimePoint,
}

impl StateObject for VestingDelegationExpiration {
    const TABLE: &'static str = "vesting_delegation_expirations";
    type UniqueKey = ObjectId;
    type OrderedKey = TimePoint;

    fn id(&self) -> ObjectId {
        self.id
    }

    fn unique_key(&self) -> ObjectId {
        self.id
    }

    fn ordered_key(&self) -> Option<TimePoint> {
        Some(self.expiration)
    }
}

/// Routes a share of each withdrawal tranche to another account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WithdrawVestingRoute {
    pub id: ObjectId,
    pub from_account: AccountName,
    pub to_account: AccountName,
    /// Basis points of each tranche
    pub percent: u16,
    /// Deliver as shares instead of converting to liquid
    pub auto_vest: bool,
}

impl StateObject for WithdrawVestingRoute {
    const TABLE: &'static str = "withdraw_vesting_routes";
    type UniqueKey = (AccountName, AccountName);
    type OrderedKey = AccountName;

    fn id(&self) -> ObjectId {
        self.id
    }

    fn unique_key(&self) -> (AccountName, AccountName) {
        (self.from_account.clone(), self.to_account.clone())
    }

    /// Ordered by source account so a tranche split reads one prefix.
    fn ordered_key(&self) -> Option<AccountName> {
        Some(self.from_account.clone())
    }
}
