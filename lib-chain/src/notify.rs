//! Observer seam for read-side plugins.
//!
//! Observers see operations before and after they apply, every applied
//! block, and the synthetic ("virtual") operations maintenance passes emit.
//! Delivery order is deterministic; observers must never feed anything back
//! into consensus.

use serde::{Deserialize, Serialize};

use lib_protocol::{Operation, SignedBlock};
use lib_types::{AccountName, Asset, TimePoint, TransactionId};

use crate::objects::CommitteeRequestState;

/// Synthetic operations: consensus-side effects with no transaction of
/// their own.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum VirtualOperation {
    AuthorReward {
        author: AccountName,
        permlink: String,
        liquid: Asset,
        vesting: Asset,
    },
    CurationReward {
        curator: AccountName,
        reward: Asset,
        author: AccountName,
        permlink: String,
    },
    BenefactorReward {
        benefactor: AccountName,
        author: AccountName,
        permlink: String,
        reward: Asset,
    },
    FillVestingWithdraw {
        from: AccountName,
        to: AccountName,
        withdrawn: Asset,
        deposited: Asset,
    },
    ReturnVestingDelegation {
        account: AccountName,
        vesting_shares: Asset,
    },
    ShutdownWitness {
        witness: AccountName,
    },
    HardforkApplied {
        hardfork: u32,
        time: TimePoint,
    },
    CommitteeRequestConcluded {
        request_id: u32,
        state: CommitteeRequestState,
        payout: Asset,
    },
    CommitteePayout {
        request_id: u32,
        worker: AccountName,
        amount: Asset,
    },
    PaidSubscriptionRenewal {
        subscriber: AccountName,
        creator: AccountName,
        amount: Asset,
        level: u16,
    },
    PaidSubscriptionCancel {
        subscriber: AccountName,
        creator: AccountName,
    },
}

/// Where an operation sat when it applied.
#[derive(Debug, Clone, Copy)]
pub struct OperationLocation {
    pub block_num: u32,
    pub trx_id: TransactionId,
    pub op_index: usize,
}

/// Read-side observer. Default impls make every hook opt-in.
pub trait ChainObserver: Send {
    fn pre_apply_operation(&mut self, _location: &OperationLocation, _operation: &Operation) {}
    fn post_apply_operation(&mut self, _location: &OperationLocation, _operation: &Operation) {}
    fn virtual_operation(&mut self, _operation: &VirtualOperation) {}
    fn applied_block(&mut self, _block: &SignedBlock) {}
}
