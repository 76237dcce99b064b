//! Consensus state objects, one module per table family.
//!
//! Each object is a plain serde struct with a stable id; all invariants are
//! enforced by the evaluators and maintenance passes that mutate them, not
//! by the objects themselves.

pub mod account;
pub mod block_summary;
pub mod committee;
pub mod content;
pub mod delegation;
pub mod escrow;
pub mod global;
pub mod invite;
pub mod recovery;
pub mod subscription;
pub mod transaction_object;
pub mod witness;

pub use account::{Account, AccountAuthority, MasterAuthorityHistory};
pub use block_summary::{BlockSummary, BLOCK_SUMMARY_SLOTS};
pub use committee::{CommitteeRequest, CommitteeRequestState, CommitteeVote};
pub use content::{Content, ContentVote, VOTE_LOCKED};
pub use delegation::{VestingDelegation, VestingDelegationExpiration, WithdrawVestingRoute};
pub use escrow::Escrow;
pub use global::{DynamicGlobalProperties, HardforkProperties, WitnessScheduleObject};
pub use invite::{Invite, InviteStatus};
pub use recovery::{AccountRecoveryRequest, ChangeRecoveryRequest};
pub use subscription::{PaidSubscribe, PaidSubscription};
pub use transaction_object::TransactionObject;
pub use witness::{Witness, WitnessVote};
