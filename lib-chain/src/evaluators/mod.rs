//! Operation evaluators.
//!
//! One function per operation kind, dispatched by a single exhaustive
//! `match`. Contract for every evaluator: check all preconditions against
//! current state before the first write, or fail inside the transaction
//! session; either way a failed evaluator leaves nothing behind.

pub mod account;
pub mod committee;
pub mod content;
pub mod escrow;
pub mod invite;
pub mod recovery;
pub mod subscription;
pub mod transfer;
pub mod vote;
pub mod witness;

use lib_protocol::{ChainProperties, Operation, SignatureVerifier};
use lib_types::TimePoint;

use crate::config::ChainConfig;
use crate::errors::EvaluationError;
use crate::state::ChainState;

/// Everything an evaluator may touch.
pub struct OperationContext<'a> {
    pub state: &'a mut ChainState,
    pub config: &'a ChainConfig,
    pub verifier: &'a dyn SignatureVerifier,
}

impl OperationContext<'_> {
    pub fn now(&self) -> TimePoint {
        self.state.head_time()
    }

    pub fn median_props(&self) -> ChainProperties {
        self.state.schedule().median_props.clone()
    }

    pub fn applied_hardforks(&self) -> u32 {
        self.state.applied_hardforks()
    }
}

/// Total dispatch: every operation kind has exactly one evaluator.
pub fn apply_operation(
    ctx: &mut OperationContext<'_>,
    operation: &Operation,
) -> Result<(), EvaluationError> {
    match operation {
        Operation::AccountCreate(op) => account::apply_account_create(ctx, op),
        Operation::AccountUpdate(op) => account::apply_account_update(ctx, op),
        Operation::Transfer(op) => transfer::apply_transfer(ctx, op),
        Operation::TransferToVesting(op) => transfer::apply_transfer_to_vesting(ctx, op),
        Operation::WithdrawVesting(op) => transfer::apply_withdraw_vesting(ctx, op),
        Operation::SetWithdrawVestingRoute(op) => transfer::apply_set_withdraw_route(ctx, op),
        Operation::DelegateVestingShares(op) => transfer::apply_delegate_vesting_shares(ctx, op),
        Operation::Content(op) => content::apply_content(ctx, op),
        Operation::DeleteContent(op) => content::apply_delete_content(ctx, op),
        Operation::Vote(op) => vote::apply_vote(ctx, op),
        Operation::WitnessUpdate(op) => witness::apply_witness_update(ctx, op),
        Operation::AccountWitnessVote(op) => witness::apply_account_witness_vote(ctx, op),
        Operation::AccountWitnessProxy(op) => witness::apply_account_witness_proxy(ctx, op),
        Operation::EscrowTransfer(op) => escrow::apply_escrow_transfer(ctx, op),
        Operation::EscrowApprove(op) => escrow::apply_escrow_approve(ctx, op),
        Operation::EscrowDispute(op) => escrow::apply_escrow_dispute(ctx, op),
        Operation::EscrowRelease(op) => escrow::apply_escrow_release(ctx, op),
        Operation::RequestAccountRecovery(op) => recovery::apply_request_account_recovery(ctx, op),
        Operation::RecoverAccount(op) => recovery::apply_recover_account(ctx, op),
        Operation::ChangeRecoveryAccount(op) => recovery::apply_change_recovery_account(ctx, op),
        Operation::CommitteeWorkerCreateRequest(op) => committee::apply_create_request(ctx, op),
        Operation::CommitteeWorkerCancelRequest(op) => committee::apply_cancel_request(ctx, op),
        Operation::CommitteeVoteRequest(op) => committee::apply_vote_request(ctx, op),
        Operation::CreateInvite(op) => invite::apply_create_invite(ctx, op),
        Operation::ClaimInviteBalance(op) => invite::apply_claim_invite_balance(ctx, op),
        Operation::InviteRegistration(op) => invite::apply_invite_registration(ctx, op),
        Operation::SetPaidSubscription(op) => subscription::apply_set_paid_subscription(ctx, op),
        Operation::PaidSubscribe(op) => subscription::apply_paid_subscribe(ctx, op),
        // Custom payloads authenticate data for plugins; consensus state is
        // untouched.
        Operation::Custom(_) => Ok(()),
    }
}
