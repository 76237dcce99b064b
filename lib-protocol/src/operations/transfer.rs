//! Balance movement: transfers, vesting conversions, withdrawal routes,
//! and vesting delegation.

use serde::{Deserialize, Serialize};

use lib_types::{AccountName, Asset, Symbol};

use crate::config::{MAX_MEMO_SIZE, PERCENT_100};
use crate::errors::ValidationError;

use super::{check_account, check_non_negative, check_percent_u16, check_positive, check_string_len};

/// Move liquid tokens between accounts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransferOperation {
    pub from: AccountName,
    pub to: AccountName,
    pub amount: Asset,
    pub memo: String,
}

impl TransferOperation {
    pub fn validate(&self) -> Result<(), ValidationError> {
        check_account(&self.from, "from")?;
        check_account(&self.to, "to")?;
        check_positive(&self.amount, Symbol::Weave, "amount")?;
        check_string_len(&self.memo, MAX_MEMO_SIZE, "memo")?;
        if self.from == self.to {
            return Err(ValidationError::SameAccount { field: "from/to" });
        }
        Ok(())
    }
}

/// Convert liquid tokens into vesting shares for `to` (or `from` itself).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransferToVestingOperation {
    pub from: AccountName,
    pub to: AccountName,
    pub amount: Asset,
}

impl TransferToVestingOperation {
    pub fn validate(&self) -> Result<(), ValidationError> {
        check_account(&self.from, "from")?;
        check_account(&self.to, "to")?;
        check_positive(&self.amount, Symbol::Weave, "amount")?;
        Ok(())
    }
}

/// Begin (or reset) a staged withdrawal of vesting shares. A zero amount
/// cancels a running withdrawal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WithdrawVestingOperation {
    pub account: AccountName,
    pub vesting_shares: Asset,
}

impl WithdrawVestingOperation {
    pub fn validate(&self) -> Result<(), ValidationError> {
        check_account(&self.account, "account")?;
        check_non_negative(&self.vesting_shares, Symbol::Shares, "vesting_shares")?;
        Ok(())
    }
}

/// Route a percentage of each withdrawal tranche to another account,
/// optionally re-vesting it there. Percent zero removes the route.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SetWithdrawVestingRouteOperation {
    pub from_account: AccountName,
    pub to_account: AccountName,
    pub percent: u16,
    pub auto_vest: bool,
}

impl SetWithdrawVestingRouteOperation {
    pub fn validate(&self) -> Result<(), ValidationError> {
        check_account(&self.from_account, "from_account")?;
        check_account(&self.to_account, "to_account")?;
        check_percent_u16(self.percent, "percent")?;
        if self.from_account == self.to_account {
            return Err(ValidationError::SameAccount {
                field: "from_account/to_account",
            });
        }
        debug_assert!(self.percent <= PERCENT_100);
        Ok(())
    }
}

/// Delegate vesting shares to another account. A smaller amount than the
/// current delegation shrinks it; zero removes it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DelegateVestingSharesOperation {
    pub delegator: AccountName,
    pub delegatee: AccountName,
    pub vesting_shares: Asset,
}

impl DelegateVestingSharesOperation {
    pub fn validate(&self) -> Result<(), ValidationError> {
        check_account(&self.delegator, "delegator")?;
        check_account(&self.delegatee, "delegatee")?;
        check_non_negative(&self.vesting_shares, Symbol::Shares, "vesting_shares")?;
        if self.delegator == self.delegatee {
            return Err(ValidationError::SameAccount {
                field: "delegator/delegatee",
            });
        }
        Ok(())
    }
}
