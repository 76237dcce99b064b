//! Committee worker requests: stake-voted payouts from the committee fund.

use serde::{Deserialize, Serialize};

use lib_types::{AccountName, Asset, Symbol};

use crate::config::MAX_URL_LENGTH;
use crate::errors::ValidationError;

use super::{check_account, check_not_empty, check_percent_i16, check_positive, check_string_len};

/// Longest a committee request may collect votes, in seconds (30 days).
pub const COMMITTEE_MAX_DURATION_SECS: u32 = 60 * 60 * 24 * 30;

/// File a worker request asking the committee fund for between
/// `required_amount_min` and `required_amount_max`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommitteeWorkerCreateRequestOperation {
    pub creator: AccountName,
    pub url: String,
    /// Account the payout is credited to (often the creator)
    pub worker: AccountName,
    pub required_amount_min: Asset,
    pub required_amount_max: Asset,
    /// Voting window in seconds
    pub duration: u32,
}

impl CommitteeWorkerCreateRequestOperation {
    pub fn validate(&self) -> Result<(), ValidationError> {
        check_account(&self.creator, "creator")?;
        check_account(&self.worker, "worker")?;
        check_not_empty(&self.url, "url")?;
        check_string_len(&self.url, MAX_URL_LENGTH, "url")?;
        check_positive(&self.required_amount_min, Symbol::Weave, "required_amount_min")?;
        check_positive(&self.required_amount_max, Symbol::Weave, "required_amount_max")?;
        if self.required_amount_min.amount > self.required_amount_max.amount {
            return Err(ValidationError::MinExceedsMax {
                field: "required_amount",
            });
        }
        if self.duration == 0 || self.duration > COMMITTEE_MAX_DURATION_SECS {
            return Err(ValidationError::BadTimeWindow {
                reason: "committee request duration out of range",
            });
        }
        Ok(())
    }
}

/// Withdraw a pending request. Only its creator may cancel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommitteeWorkerCancelRequestOperation {
    pub creator: AccountName,
    pub request_id: u32,
}

impl CommitteeWorkerCancelRequestOperation {
    pub fn validate(&self) -> Result<(), ValidationError> {
        check_account(&self.creator, "creator")?;
        Ok(())
    }
}

/// Stake-weighted vote on a request. `vote_percent` scales the voter's stake
/// contribution; negative values vote against.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommitteeVoteRequestOperation {
    pub voter: AccountName,
    pub request_id: u32,
    pub vote_percent: i16,
}

impl CommitteeVoteRequestOperation {
    pub fn validate(&self) -> Result<(), ValidationError> {
        check_account(&self.voter, "voter")?;
        check_percent_i16(self.vote_percent, "vote_percent")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_op() -> CommitteeWorkerCreateRequestOperation {
        CommitteeWorkerCreateRequestOperation {
            creator: AccountName::new("alice").unwrap(),
            url: "https://example.org/proposal".to_string(),
            worker: AccountName::new("alice").unwrap(),
            required_amount_min: Asset::weave(100_000),
            required_amount_max: Asset::weave(1_000_000),
            duration: 60 * 60 * 24 * 5,
        }
    }

    #[test]
    fn bounds_must_be_ordered() {
        assert!(create_op().validate().is_ok());

        let mut op = create_op();
        op.required_amount_min = Asset::weave(2_000_000);
        assert!(op.validate().is_err());
    }

    #[test]
    fn duration_bounded() {
        let mut op = create_op();
        op.duration = 0;
        assert!(op.validate().is_err());
        op.duration = COMMITTEE_MAX_DURATION_SECS + 1;
        assert!(op.validate().is_err());
    }
}
