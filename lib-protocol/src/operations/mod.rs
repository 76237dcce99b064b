//! Operation payloads and their structural validation.
//!
//! `Operation` is a closed sum type: adding a variant is a protocol change,
//! and the compiler forces every dispatch site to handle it. Each payload
//! knows how to validate its own fields and which authority tiers it needs;
//! nothing here reads state.

mod account;
mod committee;
mod content;
mod custom;
mod escrow;
mod invite;
mod subscription;
mod transfer;
mod witness;

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use lib_types::{AccountName, Asset, Symbol};

use crate::errors::ValidationError;

pub use account::{
    AccountCreateOperation, AccountUpdateOperation, ChangeRecoveryAccountOperation,
    RecoverAccountOperation, RequestAccountRecoveryOperation,
};
pub use committee::{
    CommitteeVoteRequestOperation, CommitteeWorkerCancelRequestOperation,
    CommitteeWorkerCreateRequestOperation,
};
pub use content::{
    BeneficiaryRoute, ContentExtension, ContentOperation, DeleteContentOperation, VoteOperation,
};
pub use custom::CustomOperation;
pub use escrow::{
    EscrowApproveOperation, EscrowDisputeOperation, EscrowReleaseOperation,
    EscrowTransferOperation,
};
pub use invite::{ClaimInviteBalanceOperation, CreateInviteOperation, InviteRegistrationOperation};
pub use subscription::{PaidSubscribeOperation, SetPaidSubscriptionOperation};
pub use transfer::{
    DelegateVestingSharesOperation, SetWithdrawVestingRouteOperation, TransferOperation,
    TransferToVestingOperation, WithdrawVestingOperation,
};
pub use witness::{
    AccountWitnessProxyOperation, AccountWitnessVoteOperation, ChainProperties,
    WitnessUpdateOperation,
};

/// Every state transition a transaction can carry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Operation {
    AccountCreate(AccountCreateOperation),
    AccountUpdate(AccountUpdateOperation),
    Transfer(TransferOperation),
    TransferToVesting(TransferToVestingOperation),
    WithdrawVesting(WithdrawVestingOperation),
    SetWithdrawVestingRoute(SetWithdrawVestingRouteOperation),
    DelegateVestingShares(DelegateVestingSharesOperation),
    Content(ContentOperation),
    DeleteContent(DeleteContentOperation),
    Vote(VoteOperation),
    WitnessUpdate(WitnessUpdateOperation),
    AccountWitnessVote(AccountWitnessVoteOperation),
    AccountWitnessProxy(AccountWitnessProxyOperation),
    EscrowTransfer(EscrowTransferOperation),
    EscrowApprove(EscrowApproveOperation),
    EscrowDispute(EscrowDisputeOperation),
    EscrowRelease(EscrowReleaseOperation),
    RequestAccountRecovery(RequestAccountRecoveryOperation),
    RecoverAccount(RecoverAccountOperation),
    ChangeRecoveryAccount(ChangeRecoveryAccountOperation),
    CommitteeWorkerCreateRequest(CommitteeWorkerCreateRequestOperation),
    CommitteeWorkerCancelRequest(CommitteeWorkerCancelRequestOperation),
    CommitteeVoteRequest(CommitteeVoteRequestOperation),
    CreateInvite(CreateInviteOperation),
    ClaimInviteBalance(ClaimInviteBalanceOperation),
    InviteRegistration(InviteRegistrationOperation),
    SetPaidSubscription(SetPaidSubscriptionOperation),
    PaidSubscribe(PaidSubscribeOperation),
    Custom(CustomOperation),
}

impl Operation {
    /// Structural validation. Must hold before any state is touched.
    pub fn validate(&self) -> Result<(), ValidationError> {
        match self {
            Operation::AccountCreate(op) => op.validate(),
            Operation::AccountUpdate(op) => op.validate(),
            Operation::Transfer(op) => op.validate(),
            Operation::TransferToVesting(op) => op.validate(),
            Operation::WithdrawVesting(op) => op.validate(),
            Operation::SetWithdrawVestingRoute(op) => op.validate(),
            Operation::DelegateVestingShares(op) => op.validate(),
            Operation::Content(op) => op.validate(),
            Operation::DeleteContent(op) => op.validate(),
            Operation::Vote(op) => op.validate(),
            Operation::WitnessUpdate(op) => op.validate(),
            Operation::AccountWitnessVote(op) => op.validate(),
            Operation::AccountWitnessProxy(op) => op.validate(),
            Operation::EscrowTransfer(op) => op.validate(),
            Operation::EscrowApprove(op) => op.validate(),
            Operation::EscrowDispute(op) => op.validate(),
            Operation::EscrowRelease(op) => op.validate(),
            Operation::RequestAccountRecovery(op) => op.validate(),
            Operation::RecoverAccount(op) => op.validate(),
            Operation::ChangeRecoveryAccount(op) => op.validate(),
            Operation::CommitteeWorkerCreateRequest(op) => op.validate(),
            Operation::CommitteeWorkerCancelRequest(op) => op.validate(),
            Operation::CommitteeVoteRequest(op) => op.validate(),
            Operation::CreateInvite(op) => op.validate(),
            Operation::ClaimInviteBalance(op) => op.validate(),
            Operation::InviteRegistration(op) => op.validate(),
            Operation::SetPaidSubscription(op) => op.validate(),
            Operation::PaidSubscribe(op) => op.validate(),
            Operation::Custom(op) => op.validate(),
        }
    }

    /// Collect the authorities this operation requires.
    pub fn required_authorities(&self, out: &mut RequiredAuthorities) {
        match self {
            Operation::AccountCreate(op) => out.active(&op.creator),
            Operation::AccountUpdate(op) => {
                if op.master.is_some() {
                    out.master(&op.account);
                } else {
                    out.active(&op.account);
                }
            }
            Operation::Transfer(op) => out.active(&op.from),
            Operation::TransferToVesting(op) => out.active(&op.from),
            Operation::WithdrawVesting(op) => out.active(&op.account),
            Operation::SetWithdrawVestingRoute(op) => out.active(&op.from_account),
            Operation::DelegateVestingShares(op) => out.active(&op.delegator),
            Operation::Content(op) => out.regular(&op.author),
            Operation::DeleteContent(op) => out.regular(&op.author),
            Operation::Vote(op) => out.regular(&op.voter),
            Operation::WitnessUpdate(op) => out.active(&op.owner),
            Operation::AccountWitnessVote(op) => out.active(&op.account),
            Operation::AccountWitnessProxy(op) => out.active(&op.account),
            Operation::EscrowTransfer(op) => out.active(&op.from),
            Operation::EscrowApprove(op) => out.active(&op.who),
            Operation::EscrowDispute(op) => out.active(&op.who),
            Operation::EscrowRelease(op) => out.active(&op.who),
            Operation::RequestAccountRecovery(op) => out.active(&op.recovery_account),
            Operation::RecoverAccount(op) => {
                // Authorized by the two master authorities carried in the
                // payload, not by any standing account authority.
                out.other(op.new_master_authority.clone());
                out.other(op.recent_master_authority.clone());
            }
            Operation::ChangeRecoveryAccount(op) => out.master(&op.account_to_recover),
            Operation::CommitteeWorkerCreateRequest(op) => out.regular(&op.creator),
            Operation::CommitteeWorkerCancelRequest(op) => out.regular(&op.creator),
            Operation::CommitteeVoteRequest(op) => out.regular(&op.voter),
            Operation::CreateInvite(op) => out.active(&op.creator),
            Operation::ClaimInviteBalance(op) => out.regular(&op.initiator),
            Operation::InviteRegistration(op) => out.regular(&op.initiator),
            Operation::SetPaidSubscription(op) => out.active(&op.account),
            Operation::PaidSubscribe(op) => out.active(&op.subscriber),
            Operation::Custom(op) => {
                for account in &op.required_active_auths {
                    out.active(account);
                }
                for account in &op.required_regular_auths {
                    out.regular(account);
                }
            }
        }
    }

    /// True when the operation needs no tier above `regular`. Transactions
    /// may not mix regular-only operations with higher-tier ones.
    pub fn is_regular_only(&self) -> bool {
        let mut required = RequiredAuthorities::default();
        self.required_authorities(&mut required);
        required.master.is_empty() && required.active.is_empty() && required.other.is_empty()
    }
}

/// Authority tiers collected across a transaction's operations.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequiredAuthorities {
    pub master: BTreeSet<AccountName>,
    pub active: BTreeSet<AccountName>,
    pub regular: BTreeSet<AccountName>,
    /// Loose authorities carried inside an operation payload (recovery)
    pub other: Vec<crate::authority::Authority>,
}

impl RequiredAuthorities {
    pub fn master(&mut self, account: &AccountName) {
        self.master.insert(account.clone());
    }

    pub fn active(&mut self, account: &AccountName) {
        self.active.insert(account.clone());
    }

    pub fn regular(&mut self, account: &AccountName) {
        self.regular.insert(account.clone());
    }

    pub fn other(&mut self, authority: crate::authority::Authority) {
        self.other.push(authority);
    }

    pub fn is_empty(&self) -> bool {
        self.master.is_empty()
            && self.active.is_empty()
            && self.regular.is_empty()
            && self.other.is_empty()
    }

    /// Every account that must be known to the chain for this transaction.
    pub fn accounts(&self) -> BTreeSet<AccountName> {
        self.master
            .iter()
            .chain(self.active.iter())
            .chain(self.regular.iter())
            .cloned()
            .collect()
    }
}

// ============================================================================
// SHARED FIELD CHECKS
// ============================================================================

pub(crate) fn check_account(
    name: &AccountName,
    field: &'static str,
) -> Result<(), ValidationError> {
    AccountName::validate(name.as_str())
        .map_err(|source| ValidationError::BadAccountName { field, source })
}

/// amount > 0 and the expected symbol
pub(crate) fn check_positive(
    asset: &Asset,
    symbol: Symbol,
    field: &'static str,
) -> Result<(), ValidationError> {
    if asset.symbol != symbol {
        return Err(ValidationError::WrongSymbol { field });
    }
    if asset.amount <= 0 {
        return Err(ValidationError::NonPositiveAmount { field });
    }
    Ok(())
}

/// amount >= 0 and the expected symbol
pub(crate) fn check_non_negative(
    asset: &Asset,
    symbol: Symbol,
    field: &'static str,
) -> Result<(), ValidationError> {
    if asset.symbol != symbol {
        return Err(ValidationError::WrongSymbol { field });
    }
    if asset.amount < 0 {
        return Err(ValidationError::NegativeAmount { field });
    }
    Ok(())
}

pub(crate) fn check_string_len(
    value: &str,
    max: usize,
    field: &'static str,
) -> Result<(), ValidationError> {
    if value.len() > max {
        return Err(ValidationError::StringTooLong {
            field,
            len: value.len(),
            max,
        });
    }
    Ok(())
}

pub(crate) fn check_not_empty(value: &str, field: &'static str) -> Result<(), ValidationError> {
    if value.is_empty() {
        return Err(ValidationError::EmptyField { field });
    }
    Ok(())
}

/// Empty metadata is allowed; non-empty metadata must parse as JSON.
pub(crate) fn check_json(value: &str, field: &'static str) -> Result<(), ValidationError> {
    if value.is_empty() {
        return Ok(());
    }
    serde_json::from_str::<serde_json::Value>(value).map_err(|e| ValidationError::BadJson {
        field,
        reason: e.to_string(),
    })?;
    Ok(())
}

pub(crate) fn check_percent_u16(
    value: u16,
    field: &'static str,
) -> Result<(), ValidationError> {
    if value > crate::config::PERCENT_100 {
        return Err(ValidationError::PercentOutOfRange {
            field,
            value: value as i32,
        });
    }
    Ok(())
}

pub(crate) fn check_percent_i16(
    value: i16,
    field: &'static str,
) -> Result<(), ValidationError> {
    let max = crate::config::PERCENT_100 as i16;
    if value > max || value < -max {
        return Err(ValidationError::PercentOutOfRange {
            field,
            value: value as i32,
        });
    }
    Ok(())
}
