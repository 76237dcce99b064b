//! Paid subscriptions: a creator-owned plan menu and reader subscriptions.

use serde::{Deserialize, Serialize};

use lib_types::{AccountName, Asset, Symbol};

use crate::config::{
    MAX_SUBSCRIPTION_LEVELS, MAX_SUBSCRIPTION_PERIOD_DAYS, MAX_URL_LENGTH,
};
use crate::errors::ValidationError;

use super::{check_account, check_positive, check_string_len};

/// Publish (or replace) a subscription menu: up to `levels` tiers, each tier
/// costing `amount * level` per `period` days.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SetPaidSubscriptionOperation {
    pub account: AccountName,
    pub url: String,
    pub levels: u16,
    /// Price of one level for one period
    pub amount: Asset,
    /// Billing period in days
    pub period: u16,
}

impl SetPaidSubscriptionOperation {
    pub fn validate(&self) -> Result<(), ValidationError> {
        check_account(&self.account, "account")?;
        check_string_len(&self.url, MAX_URL_LENGTH, "url")?;
        if self.levels == 0 || self.levels > MAX_SUBSCRIPTION_LEVELS {
            return Err(ValidationError::PercentOutOfRange {
                field: "levels",
                value: self.levels as i32,
            });
        }
        check_positive(&self.amount, Symbol::Weave, "amount")?;
        if self.period == 0 || self.period > MAX_SUBSCRIPTION_PERIOD_DAYS {
            return Err(ValidationError::BadTimeWindow {
                reason: "subscription period out of range",
            });
        }
        Ok(())
    }
}

/// Subscribe to a creator's menu at a given level, or switch plans mid-cycle.
/// The quoted `amount`/`period` must match the creator's current menu; a
/// mismatch is an evaluation failure, protecting the subscriber from a menu
/// change racing their transaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaidSubscribeOperation {
    pub subscriber: AccountName,
    pub account: AccountName,
    pub level: u16,
    pub amount: Asset,
    pub period: u16,
    pub auto_renewal: bool,
}

impl PaidSubscribeOperation {
    pub fn validate(&self) -> Result<(), ValidationError> {
        check_account(&self.subscriber, "subscriber")?;
        check_account(&self.account, "account")?;
        if self.subscriber == self.account {
            return Err(ValidationError::SameAccount {
                field: "subscriber/account",
            });
        }
        if self.level == 0 || self.level > MAX_SUBSCRIPTION_LEVELS {
            return Err(ValidationError::PercentOutOfRange {
                field: "level",
                value: self.level as i32,
            });
        }
        check_positive(&self.amount, Symbol::Weave, "amount")?;
        if self.period == 0 || self.period > MAX_SUBSCRIPTION_PERIOD_DAYS {
            return Err(ValidationError::BadTimeWindow {
                reason: "subscription period out of range",
            });
        }
        Ok(())
    }
}
