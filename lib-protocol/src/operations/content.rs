//! Content and voting operations.

use serde::{Deserialize, Serialize};

use lib_types::AccountName;

use crate::config::{
    MAX_BENEFICIARIES, MAX_BODY_LENGTH, MAX_JSON_METADATA_LENGTH, MAX_PERMLINK_LENGTH,
    MAX_TITLE_LENGTH, PERCENT_100,
};
use crate::errors::ValidationError;

use super::{check_account, check_json, check_not_empty, check_percent_i16, check_string_len};

/// One beneficiary route: `weight` basis points of the author payout go to
/// `account`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BeneficiaryRoute {
    pub account: AccountName,
    pub weight: u16,
}

/// Extensions attached to a content operation. Beneficiaries may be set
/// exactly once, before any vote lands.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ContentExtension {
    Beneficiaries(Vec<BeneficiaryRoute>),
}

/// Create or edit a post or comment. The (author, permlink) pair identifies
/// the content; a present pair means edit, an absent one means create.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentOperation {
    /// None for a root post; Some(author) for a reply
    pub parent_author: Option<AccountName>,
    /// Parent permlink for replies; category tag for root posts
    pub parent_permlink: String,
    pub author: AccountName,
    pub permlink: String,
    pub title: String,
    pub body: String,
    pub json_metadata: String,
    pub extensions: Vec<ContentExtension>,
}

impl ContentOperation {
    pub fn validate(&self) -> Result<(), ValidationError> {
        check_account(&self.author, "author")?;
        if let Some(parent_author) = &self.parent_author {
            check_account(parent_author, "parent_author")?;
        }
        check_not_empty(&self.permlink, "permlink")?;
        check_string_len(&self.permlink, MAX_PERMLINK_LENGTH, "permlink")?;
        check_string_len(&self.parent_permlink, MAX_PERMLINK_LENGTH, "parent_permlink")?;
        check_string_len(&self.title, MAX_TITLE_LENGTH, "title")?;
        check_not_empty(&self.body, "body")?;
        check_string_len(&self.body, MAX_BODY_LENGTH, "body")?;
        check_string_len(&self.json_metadata, MAX_JSON_METADATA_LENGTH, "json_metadata")?;
        check_json(&self.json_metadata, "json_metadata")?;

        for extension in &self.extensions {
            match extension {
                ContentExtension::Beneficiaries(routes) => {
                    validate_beneficiaries(routes)?;
                }
            }
        }
        Ok(())
    }

    /// The beneficiary list carried by this operation, if any.
    pub fn beneficiaries(&self) -> Option<&[BeneficiaryRoute]> {
        self.extensions.iter().map(|extension| {
            let ContentExtension::Beneficiaries(routes) = extension;
            routes.as_slice()
        }).next()
    }
}

fn validate_beneficiaries(routes: &[BeneficiaryRoute]) -> Result<(), ValidationError> {
    if routes.is_empty() {
        return Err(ValidationError::BadBeneficiaries {
            reason: "empty beneficiary list",
        });
    }
    if routes.len() > MAX_BENEFICIARIES {
        return Err(ValidationError::BadBeneficiaries {
            reason: "too many beneficiaries",
        });
    }
    let mut sum: u32 = 0;
    for (i, route) in routes.iter().enumerate() {
        check_account(&route.account, "beneficiary")?;
        if route.weight == 0 || route.weight > PERCENT_100 {
            return Err(ValidationError::BadBeneficiaries {
                reason: "beneficiary weight out of range",
            });
        }
        sum += route.weight as u32;
        // Sorted and unique, so replay produces identical iteration order
        if i > 0 && routes[i - 1].account >= route.account {
            return Err(ValidationError::BadBeneficiaries {
                reason: "beneficiaries must be sorted by account and unique",
            });
        }
    }
    if sum > PERCENT_100 as u32 {
        return Err(ValidationError::BadBeneficiaries {
            reason: "beneficiary weights exceed 100%",
        });
    }
    Ok(())
}

/// Remove content that has no replies and no votes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeleteContentOperation {
    pub author: AccountName,
    pub permlink: String,
}

impl DeleteContentOperation {
    pub fn validate(&self) -> Result<(), ValidationError> {
        check_account(&self.author, "author")?;
        check_not_empty(&self.permlink, "permlink")?;
        check_string_len(&self.permlink, MAX_PERMLINK_LENGTH, "permlink")?;
        Ok(())
    }
}

/// Vote on content. Weight is in basis points; negative weight is a flag.
/// A zero weight retracts the vote's rshares.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoteOperation {
    pub voter: AccountName,
    pub author: AccountName,
    pub permlink: String,
    pub weight: i16,
}

impl VoteOperation {
    pub fn validate(&self) -> Result<(), ValidationError> {
        check_account(&self.voter, "voter")?;
        check_account(&self.author, "author")?;
        check_not_empty(&self.permlink, "permlink")?;
        check_string_len(&self.permlink, MAX_PERMLINK_LENGTH, "permlink")?;
        check_percent_i16(self.weight, "weight")?;
        Ok(())
    }
}
