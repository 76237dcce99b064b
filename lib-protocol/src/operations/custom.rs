//! Inert custom payloads for read-side plugins.
//!
//! A custom operation mutates nothing in consensus state; it exists so that
//! off-chain tooling can ship authenticated data through the chain. The
//! declared authorities are still collected and verified.

use serde::{Deserialize, Serialize};

use lib_types::AccountName;

use crate::config::{MAX_CUSTOM_ID_LENGTH, MAX_CUSTOM_JSON_LENGTH};
use crate::errors::ValidationError;

use super::{check_account, check_json, check_not_empty, check_string_len};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomOperation {
    pub required_active_auths: Vec<AccountName>,
    pub required_regular_auths: Vec<AccountName>,
    /// Plugin-facing discriminator, e.g. "follow"
    pub id: String,
    pub json: String,
}

impl CustomOperation {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.required_active_auths.is_empty() && self.required_regular_auths.is_empty() {
            return Err(ValidationError::EmptyField {
                field: "required_auths",
            });
        }
        for account in &self.required_active_auths {
            check_account(account, "required_active_auths")?;
        }
        for account in &self.required_regular_auths {
            check_account(account, "required_regular_auths")?;
        }
        check_not_empty(&self.id, "id")?;
        check_string_len(&self.id, MAX_CUSTOM_ID_LENGTH, "id")?;
        check_string_len(&self.json, MAX_CUSTOM_JSON_LENGTH, "json")?;
        check_json(&self.json, "json")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn custom_requires_an_authority() {
        let op = CustomOperation {
            required_active_auths: Vec::new(),
            required_regular_auths: Vec::new(),
            id: "follow".to_string(),
            json: "{}".to_string(),
        };
        assert!(op.validate().is_err());
    }
}
