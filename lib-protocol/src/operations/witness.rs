//! Witness declaration and governance voting.

use serde::{Deserialize, Serialize};

use lib_types::{AccountName, Asset, Symbol};

use crate::authority::PublicKey;
use crate::config::{MAX_URL_LENGTH, PERCENT_100};
use crate::errors::ValidationError;

use super::{check_account, check_non_negative, check_percent_u16, check_string_len};

/// Consensus parameters each witness publishes. Once per round the scheduler
/// takes the per-field median over the active witness set; evaluators read
/// the medians, never an individual witness's submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChainProperties {
    /// Fee burned from the creator on account creation
    pub account_creation_fee: Asset,
    /// Hard cap on serialized block size
    pub maximum_block_size: u32,
    /// Multiplier relating the creation fee to the delegation a creator may
    /// substitute for it
    pub create_account_delegation_ratio: u32,
    /// Seconds a creation-backed delegation stays locked
    pub create_account_delegation_time: u32,
    /// Smallest delegation an account may make
    pub min_delegation: Asset,
    /// Curation split bounds, basis points
    pub min_curation_percent: u16,
    pub max_curation_percent: u16,
    /// Share of bandwidth reserved for small stakeholders, basis points
    pub bandwidth_reserve_percent: u16,
    /// Stake threshold below which an account draws on the reserve
    pub bandwidth_reserve_below: Asset,
    /// Extra energy a flag vote costs, basis points
    pub flag_energy_additional_cost: u16,
    /// Noise floor: votes producing fewer rshares than this count as zero
    pub vote_accounting_min_rshares: u32,
    /// Minimum stake share (basis points of total vesting) for a committee
    /// request to conclude approved
    pub committee_request_approve_min_percent: u16,
    /// Inflation split, basis points of each block's new supply
    pub inflation_witness_percent: u16,
    pub inflation_committee_percent: u16,
}

impl Default for ChainProperties {
    fn default() -> Self {
        Self {
            account_creation_fee: Asset::weave(1_000),
            maximum_block_size: 65_536,
            create_account_delegation_ratio: 10,
            create_account_delegation_time: 60 * 60 * 24 * 30,
            min_delegation: Asset::shares(1_000_000),
            min_curation_percent: 1_000,
            max_curation_percent: 5_000,
            bandwidth_reserve_percent: 1_000,
            bandwidth_reserve_below: Asset::shares(500_000_000),
            flag_energy_additional_cost: 1_000,
            vote_accounting_min_rshares: 5_000,
            committee_request_approve_min_percent: 1_000,
            inflation_witness_percent: 2_000,
            inflation_committee_percent: 1_000,
        }
    }
}

impl ChainProperties {
    pub fn validate(&self) -> Result<(), ValidationError> {
        check_non_negative(
            &self.account_creation_fee,
            Symbol::Weave,
            "account_creation_fee",
        )?;
        check_non_negative(&self.min_delegation, Symbol::Shares, "min_delegation")?;
        check_non_negative(
            &self.bandwidth_reserve_below,
            Symbol::Shares,
            "bandwidth_reserve_below",
        )?;
        if self.maximum_block_size < 1_024 {
            return Err(ValidationError::PercentOutOfRange {
                field: "maximum_block_size",
                value: self.maximum_block_size as i32,
            });
        }
        check_percent_u16(self.min_curation_percent, "min_curation_percent")?;
        check_percent_u16(self.max_curation_percent, "max_curation_percent")?;
        if self.min_curation_percent > self.max_curation_percent {
            return Err(ValidationError::MinExceedsMax {
                field: "curation_percent",
            });
        }
        check_percent_u16(self.bandwidth_reserve_percent, "bandwidth_reserve_percent")?;
        check_percent_u16(self.flag_energy_additional_cost, "flag_energy_additional_cost")?;
        check_percent_u16(
            self.committee_request_approve_min_percent,
            "committee_request_approve_min_percent",
        )?;
        check_percent_u16(self.inflation_witness_percent, "inflation_witness_percent")?;
        check_percent_u16(self.inflation_committee_percent, "inflation_committee_percent")?;
        if self.inflation_witness_percent as u32 + self.inflation_committee_percent as u32
            > PERCENT_100 as u32
        {
            return Err(ValidationError::PercentOutOfRange {
                field: "inflation_split",
                value: (self.inflation_witness_percent + self.inflation_committee_percent) as i32,
            });
        }
        Ok(())
    }
}

/// Declare or update a witness. An empty signing key takes the witness out
/// of scheduling without deleting its vote tally.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WitnessUpdateOperation {
    pub owner: AccountName,
    pub url: String,
    /// Empty = shut down (never scheduled)
    pub block_signing_key: PublicKey,
    pub props: ChainProperties,
}

impl WitnessUpdateOperation {
    pub fn validate(&self) -> Result<(), ValidationError> {
        check_account(&self.owner, "owner")?;
        check_string_len(&self.url, MAX_URL_LENGTH, "url")?;
        if !self.block_signing_key.is_empty() {
            self.block_signing_key.validate("block_signing_key")?;
        }
        self.props.validate()?;
        Ok(())
    }
}

/// Approve or retract approval of a witness.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountWitnessVoteOperation {
    pub account: AccountName,
    pub witness: AccountName,
    pub approve: bool,
}

impl AccountWitnessVoteOperation {
    pub fn validate(&self) -> Result<(), ValidationError> {
        check_account(&self.account, "account")?;
        check_account(&self.witness, "witness")?;
        Ok(())
    }
}

/// Delegate witness voting to a proxy, or clear it with `None`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountWitnessProxyOperation {
    pub account: AccountName,
    pub proxy: Option<AccountName>,
}

impl AccountWitnessProxyOperation {
    pub fn validate(&self) -> Result<(), ValidationError> {
        check_account(&self.account, "account")?;
        if let Some(proxy) = &self.proxy {
            check_account(proxy, "proxy")?;
            if *proxy == self.account {
                return Err(ValidationError::SameAccount { field: "account/proxy" });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sign::HashSigner;

    #[test]
    fn default_props_validate() {
        assert!(ChainProperties::default().validate().is_ok());
    }

    #[test]
    fn curation_bounds_ordered() {
        let mut props = ChainProperties::default();
        props.min_curation_percent = 6_000;
        props.max_curation_percent = 5_000;
        assert!(props.validate().is_err());
    }

    #[test]
    fn witness_update_allows_empty_key() {
        let op = WitnessUpdateOperation {
            owner: AccountName::new("wit-a").unwrap(),
            url: "https://example.org".to_string(),
            block_signing_key: PublicKey::default(),
            props: ChainProperties::default(),
        };
        assert!(op.validate().is_ok());

        let op = WitnessUpdateOperation {
            block_signing_key: HashSigner::public_key("wit-a"),
            ..op
        };
        assert!(op.validate().is_ok());
    }

    #[test]
    fn proxy_to_self_rejected() {
        let op = AccountWitnessProxyOperation {
            account: AccountName::new("alice").unwrap(),
            proxy: Some(AccountName::new("alice").unwrap()),
        };
        assert!(op.validate().is_err());
    }
}
