//! Invites: bearer balances keyed by a one-time public key.
//!
//! The creator escrows a balance under a fresh key and hands the matching
//! secret off-chain. Whoever holds the secret proves it by signing a
//! claim digest with the invite key; the balance is consumed exactly once.

use serde::{Deserialize, Serialize};

use lib_types::{hash_digest, AccountName, Asset, Digest, Symbol};

use crate::authority::PublicKey;
use crate::errors::ValidationError;
use crate::sign::SignatureBytes;

use super::{check_account, check_positive};

/// Escrow a bearer balance under `invite_key`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateInviteOperation {
    pub creator: AccountName,
    pub balance: Asset,
    pub invite_key: PublicKey,
}

impl CreateInviteOperation {
    pub fn validate(&self) -> Result<(), ValidationError> {
        check_account(&self.creator, "creator")?;
        check_positive(&self.balance, Symbol::Weave, "balance")?;
        self.invite_key.validate("invite_key")?;
        Ok(())
    }
}

/// Claim an invite balance into an existing account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClaimInviteBalanceOperation {
    pub initiator: AccountName,
    pub receiver: AccountName,
    pub invite_key: PublicKey,
    /// Signature with the invite key over [`claim_digest`]
    pub invite_signature: SignatureBytes,
}

impl ClaimInviteBalanceOperation {
    pub fn validate(&self) -> Result<(), ValidationError> {
        check_account(&self.initiator, "initiator")?;
        check_account(&self.receiver, "receiver")?;
        self.invite_key.validate("invite_key")?;
        self.invite_signature.validate()?;
        Ok(())
    }

    /// Digest the invite holder must sign to claim into `receiver`.
    pub fn claim_digest(receiver: &AccountName) -> Digest {
        let mut input = b"weave/invite-claim/".to_vec();
        input.extend_from_slice(receiver.as_str().as_bytes());
        hash_digest(&input)
    }
}

/// Consume an invite to bootstrap a brand-new account whose authorities all
/// start from `new_account_key`; the balance arrives as vesting shares.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InviteRegistrationOperation {
    pub initiator: AccountName,
    pub new_account_name: AccountName,
    pub invite_key: PublicKey,
    /// Signature with the invite key over [`registration_digest`]
    pub invite_signature: SignatureBytes,
    pub new_account_key: PublicKey,
}

impl InviteRegistrationOperation {
    pub fn validate(&self) -> Result<(), ValidationError> {
        check_account(&self.initiator, "initiator")?;
        check_account(&self.new_account_name, "new_account_name")?;
        self.invite_key.validate("invite_key")?;
        self.invite_signature.validate()?;
        self.new_account_key.validate("new_account_key")?;
        Ok(())
    }

    /// Digest the invite holder must sign to register `new_account_name`.
    pub fn registration_digest(new_account_name: &AccountName) -> Digest {
        let mut input = b"weave/invite-register/".to_vec();
        input.extend_from_slice(new_account_name.as_str().as_bytes());
        hash_digest(&input)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sign::HashSigner;

    #[test]
    fn claim_digest_binds_receiver() {
        let a = ClaimInviteBalanceOperation::claim_digest(&AccountName::new("alice").unwrap());
        let b = ClaimInviteBalanceOperation::claim_digest(&AccountName::new("bob").unwrap());
        assert_ne!(a, b);
    }

    #[test]
    fn create_invite_validates() {
        let op = CreateInviteOperation {
            creator: AccountName::new("alice").unwrap(),
            balance: Asset::weave(0),
            invite_key: HashSigner::public_key("invite-1"),
        };
        assert!(op.validate().is_err());
    }
}
