//! Account lifecycle operations: creation, authority updates, recovery.

use serde::{Deserialize, Serialize};

use lib_types::{AccountName, Asset, Symbol};

use crate::authority::{Authority, PublicKey};
use crate::config::MAX_JSON_METADATA_LENGTH;
use crate::errors::ValidationError;

use super::{check_account, check_json, check_non_negative, check_string_len};

/// Register a new account, funded by the creator's fee and optionally backed
/// by a vesting delegation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountCreateOperation {
    pub fee: Asset,
    pub delegation: Asset,
    pub creator: AccountName,
    pub new_account_name: AccountName,
    pub master: Authority,
    pub active: Authority,
    pub regular: Authority,
    pub memo_key: PublicKey,
    pub json_metadata: String,
}

impl AccountCreateOperation {
    pub fn validate(&self) -> Result<(), ValidationError> {
        check_account(&self.creator, "creator")?;
        check_account(&self.new_account_name, "new_account_name")?;
        check_non_negative(&self.fee, Symbol::Weave, "fee")?;
        check_non_negative(&self.delegation, Symbol::Shares, "delegation")?;
        self.master.validate("master")?;
        self.active.validate("active")?;
        self.regular.validate("regular")?;
        self.memo_key.validate("memo_key")?;
        check_string_len(&self.json_metadata, MAX_JSON_METADATA_LENGTH, "json_metadata")?;
        check_json(&self.json_metadata, "json_metadata")?;
        Ok(())
    }
}

/// Replace one or more of an account's authorities or its memo key.
///
/// Updating `master` requires the current master authority and is
/// rate-limited by the evaluator via the owner-authority history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountUpdateOperation {
    pub account: AccountName,
    pub master: Option<Authority>,
    pub active: Option<Authority>,
    pub regular: Option<Authority>,
    pub memo_key: Option<PublicKey>,
    pub json_metadata: String,
}

impl AccountUpdateOperation {
    pub fn validate(&self) -> Result<(), ValidationError> {
        check_account(&self.account, "account")?;
        if let Some(master) = &self.master {
            master.validate("master")?;
        }
        if let Some(active) = &self.active {
            active.validate("active")?;
        }
        if let Some(regular) = &self.regular {
            regular.validate("regular")?;
        }
        if let Some(memo_key) = &self.memo_key {
            memo_key.validate("memo_key")?;
        }
        check_string_len(&self.json_metadata, MAX_JSON_METADATA_LENGTH, "json_metadata")?;
        check_json(&self.json_metadata, "json_metadata")?;
        Ok(())
    }
}

/// Filed by an account's designated recovery partner to start recovery.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestAccountRecoveryOperation {
    pub recovery_account: AccountName,
    pub account_to_recover: AccountName,
    pub new_master_authority: Authority,
}

impl RequestAccountRecoveryOperation {
    pub fn validate(&self) -> Result<(), ValidationError> {
        check_account(&self.recovery_account, "recovery_account")?;
        check_account(&self.account_to_recover, "account_to_recover")?;
        if !self.new_master_authority.is_impossible() {
            self.new_master_authority.validate("new_master_authority")?;
        }
        Ok(())
    }
}

/// Completes a pending recovery: proves a recent master authority and swaps
/// in the new one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecoverAccountOperation {
    pub account_to_recover: AccountName,
    pub new_master_authority: Authority,
    pub recent_master_authority: Authority,
}

impl RecoverAccountOperation {
    pub fn validate(&self) -> Result<(), ValidationError> {
        check_account(&self.account_to_recover, "account_to_recover")?;
        self.new_master_authority.validate("new_master_authority")?;
        self.recent_master_authority
            .validate("recent_master_authority")?;
        if self.new_master_authority == self.recent_master_authority {
            return Err(ValidationError::BadAuthority {
                field: "new_master_authority",
                reason: "new master authority must differ from the recent one",
            });
        }
        Ok(())
    }
}

/// Point the account at a different recovery partner (takes effect after the
/// change-recovery delay).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeRecoveryAccountOperation {
    pub account_to_recover: AccountName,
    pub new_recovery_account: AccountName,
}

impl ChangeRecoveryAccountOperation {
    pub fn validate(&self) -> Result<(), ValidationError> {
        check_account(&self.account_to_recover, "account_to_recover")?;
        check_account(&self.new_recovery_account, "new_recovery_account")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sign::HashSigner;

    fn simple_authority(seed: &str) -> Authority {
        Authority::single_key(HashSigner::public_key(seed))
    }

    fn create_op() -> AccountCreateOperation {
        AccountCreateOperation {
            fee: Asset::weave(1_000),
            delegation: Asset::shares(0),
            creator: AccountName::new("alice").unwrap(),
            new_account_name: AccountName::new("bob").unwrap(),
            master: simple_authority("bob-master"),
            active: simple_authority("bob-active"),
            regular: simple_authority("bob-regular"),
            memo_key: HashSigner::public_key("bob-memo"),
            json_metadata: String::new(),
        }
    }

    #[test]
    fn account_create_validates() {
        assert!(create_op().validate().is_ok());

        let mut bad_fee = create_op();
        bad_fee.fee = Asset::weave(-1);
        assert!(bad_fee.validate().is_err());

        let mut bad_delegation = create_op();
        bad_delegation.delegation = Asset::weave(100);
        assert!(bad_delegation.validate().is_err());

        let mut bad_json = create_op();
        bad_json.json_metadata = "{not json".to_string();
        assert!(bad_json.validate().is_err());
    }

    #[test]
    fn recover_account_rejects_identical_authorities() {
        let auth = simple_authority("same");
        let op = RecoverAccountOperation {
            account_to_recover: AccountName::new("bob").unwrap(),
            new_master_authority: auth.clone(),
            recent_master_authority: auth,
        };
        assert!(op.validate().is_err());
    }
}
