//! Account recovery requests.

use serde::{Deserialize, Serialize};

use lib_chainstore::StateObject;
use lib_protocol::Authority;
use lib_types::{AccountName, ObjectId, TimePoint};

/// Pending recovery filed by the recovery partner; expires unclaimed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountRecoveryRequest {
    pub id: ObjectId,
    pub account_to_recover: AccountName,
    pub new_master_authority: Authority,
    pub expires: TimePoint,
}

impl StateObject for AccountRecoveryRequest {
    const TABLE: &'static str = "account_recovery_requests";
    type UniqueKey = AccountName;
    type OrderedKey = TimePoint;

    fn id(&self) -> ObjectId {
        self.id
    }

    fn unique_key(&self) -> AccountName {
        self.account_to_recover.clone()
    }

    fn ordered_key(&self) -> Option<TimePoint> {
        Some(self.expires)
    }
}

/// Pending change of recovery partner; applied once `effective_on` passes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeRecoveryRequest {
    pub id: ObjectId,
    pub account_to_recover: AccountName,
    pub new_recovery_account: AccountName,
    pub effective_on: TimePoint,
}

impl StateObject for ChangeRecoveryRequest {
    const TABLE: &'static str = "change_recovery_requests";
    type UniqueKey = AccountName;
    type OrderedKey = TimePoint;

    fn id(&self) -> ObjectId {
        self.id
    }

    fn unique_key(&self) -> AccountName {
        self.account_to_recover.clone()
    }

    fn ordered_key(&self) -> Option<TimePoint> {
        Some(self.effective_on)
    }
}
