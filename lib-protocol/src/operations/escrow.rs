//! Escrow operations: a three-party transfer with agent arbitration.

use serde::{Deserialize, Serialize};

use lib_types::{AccountName, Asset, Symbol, TimePoint};

use crate::config::MAX_JSON_METADATA_LENGTH;
use crate::errors::ValidationError;

use super::{check_account, check_json, check_non_negative, check_positive, check_string_len};

/// Open an escrow: funds move from `from` into the escrow until released.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EscrowTransferOperation {
    pub from: AccountName,
    pub to: AccountName,
    pub agent: AccountName,
    /// Sender-scoped identifier, unique per open escrow of `from`
    pub escrow_id: u32,
    pub amount: Asset,
    /// Paid to the agent once both counterparties approve
    pub fee: Asset,
    /// Both `to` and `agent` must approve before this instant
    pub ratification_deadline: TimePoint,
    /// After this instant the agent (or either party, undisputed) may release
    pub escrow_expiration: TimePoint,
    pub json_metadata: String,
}

impl EscrowTransferOperation {
    pub fn validate(&self) -> Result<(), ValidationError> {
        check_account(&self.from, "from")?;
        check_account(&self.to, "to")?;
        check_account(&self.agent, "agent")?;
        check_positive(&self.amount, Symbol::Weave, "amount")?;
        check_non_negative(&self.fee, Symbol::Weave, "fee")?;
        check_string_len(&self.json_metadata, MAX_JSON_METADATA_LENGTH, "json_metadata")?;
        check_json(&self.json_metadata, "json_metadata")?;
        if self.from == self.to || self.from == self.agent || self.to == self.agent {
            return Err(ValidationError::SameAccount {
                field: "from/to/agent",
            });
        }
        if self.ratification_deadline >= self.escrow_expiration {
            return Err(ValidationError::BadTimeWindow {
                reason: "ratification deadline must precede escrow expiration",
            });
        }
        Ok(())
    }
}

/// `to` or `agent` ratifies (or declines) an escrow they are party to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EscrowApproveOperation {
    pub from: AccountName,
    pub to: AccountName,
    pub agent: AccountName,
    /// Must be `to` or `agent`
    pub who: AccountName,
    pub escrow_id: u32,
    pub approve: bool,
}

impl EscrowApproveOperation {
    pub fn validate(&self) -> Result<(), ValidationError> {
        check_account(&self.from, "from")?;
        check_account(&self.to, "to")?;
        check_account(&self.agent, "agent")?;
        check_account(&self.who, "who")?;
        if self.who != self.to && self.who != self.agent {
            return Err(ValidationError::SameAccount { field: "who" });
        }
        Ok(())
    }
}

/// Either counterparty raises a dispute, handing release control to the agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EscrowDisputeOperation {
    pub from: AccountName,
    pub to: AccountName,
    pub agent: AccountName,
    /// Must be `from` or `to`
    pub who: AccountName,
    pub escrow_id: u32,
}

impl EscrowDisputeOperation {
    pub fn validate(&self) -> Result<(), ValidationError> {
        check_account(&self.from, "from")?;
        check_account(&self.to, "to")?;
        check_account(&self.agent, "agent")?;
        check_account(&self.who, "who")?;
        if self.who != self.from && self.who != self.to {
            return Err(ValidationError::SameAccount { field: "who" });
        }
        Ok(())
    }
}

/// Release escrowed funds to one of the counterparties. Who may release to
/// whom depends on dispute and expiration state; the evaluator enforces the
/// permission matrix.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EscrowReleaseOperation {
    pub from: AccountName,
    pub to: AccountName,
    pub agent: AccountName,
    pub who: AccountName,
    /// Must be `from` or `to`
    pub receiver: AccountName,
    pub escrow_id: u32,
    pub amount: Asset,
}

impl EscrowReleaseOperation {
    pub fn validate(&self) -> Result<(), ValidationError> {
        check_account(&self.from, "from")?;
        check_account(&self.to, "to")?;
        check_account(&self.agent, "agent")?;
        check_account(&self.who, "who")?;
        check_account(&self.receiver, "receiver")?;
        check_positive(&self.amount, Symbol::Weave, "amount")?;
        if self.who != self.from && self.who != self.to && self.who != self.agent {
            return Err(ValidationError::SameAccount { field: "who" });
        }
        if self.receiver != self.from && self.receiver != self.to {
            return Err(ValidationError::SameAccount { field: "receiver" });
        }
        Ok(())
    }
}
