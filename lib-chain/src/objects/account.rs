//! Accounts and their authority bundles.

use serde::{Deserialize, Serialize};

use lib_chainstore::StateObject;
use lib_protocol::config::{MAX_PROXY_RECURSION_DEPTH, PERCENT_100};
use lib_protocol::{Authority, PublicKey};
use lib_types::{AccountName, Asset, ObjectId, ShareAmount, TimePoint};

/// Core account record.
///
/// The authority bundle lives in [`AccountAuthority`] to keep this row small;
/// it is copied on every balance change, and balances change far more often
/// than keys.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub id: ObjectId,
    pub name: AccountName,
    pub memo_key: PublicKey,
    pub recovery_account: Option<AccountName>,
    pub created: TimePoint,

    // --- balances -----------------------------------------------------------
    pub balance: Asset,
    pub vesting_shares: Asset,
    pub delegated_vesting_shares: Asset,
    pub received_vesting_shares: Asset,

    // --- staged withdrawal --------------------------------------------------
    pub vesting_withdraw_rate: Asset,
    /// `TimePoint::MAX` when no withdrawal is running
    pub next_vesting_withdrawal: TimePoint,
    pub withdrawn: ShareAmount,
    pub to_withdraw: ShareAmount,
    pub withdraw_routes: u16,

    // --- voting energy ------------------------------------------------------
    /// Basis points in [-10000, 10000]
    pub energy: i16,
    pub last_energy_update: TimePoint,
    /// Lifetime rshares credited to this account's content by voters
    pub awarded_rshares: i64,

    // --- witness governance -------------------------------------------------
    pub proxy: Option<AccountName>,
    pub witnesses_voted_for: u16,
    /// Stake proxied to this account, bucketed by proxy-chain distance
    pub proxied_vsf_votes: [i64; MAX_PROXY_RECURSION_DEPTH],

    // --- bandwidth ----------------------------------------------------------
    pub average_bandwidth: u64,
    pub lifetime_bandwidth: u64,
    pub last_bandwidth_update: TimePoint,

    // --- activity counters --------------------------------------------------
    pub content_count: u32,
    pub comment_count: u32,
    pub vote_count: u32,
    pub last_vote_time: TimePoint,
    /// Counter for faucet-minted subaccounts (meaningful on the faucet only)
    pub subaccount_count: u32,

    // --- marketplace flags --------------------------------------------------
    pub account_for_sale: bool,
    pub subaccount_for_sale: bool,
    pub account_sale_price: Asset,
    pub sale_beneficiary: Option<AccountName>,
}

impl Account {
    /// Fresh account with zeroed balances and full energy.
    pub fn new(id: ObjectId, name: AccountName, memo_key: PublicKey, created: TimePoint) -> Self {
        Self {
            id,
            name,
            memo_key,
            recovery_account: None,
            created,
            balance: Asset::weave(0),
            vesting_shares: Asset::shares(0),
            delegated_vesting_shares: Asset::shares(0),
            received_vesting_shares: Asset::shares(0),
            vesting_withdraw_rate: Asset::shares(0),
            next_vesting_withdrawal: TimePoint::MAX,
            withdrawn: 0,
            to_withdraw: 0,
            withdraw_routes: 0,
            energy: PERCENT_100 as i16,
            last_energy_update: created,
            awarded_rshares: 0,
            proxy: None,
            witnesses_voted_for: 0,
            proxied_vsf_votes: [0; MAX_PROXY_RECURSION_DEPTH],
            average_bandwidth: 0,
            lifetime_bandwidth: 0,
            last_bandwidth_update: created,
            content_count: 0,
            comment_count: 0,
            vote_count: 0,
            last_vote_time: TimePoint::ZERO,
            subaccount_count: 0,
            account_for_sale: false,
            subaccount_for_sale: false,
            account_sale_price: Asset::weave(0),
            sale_beneficiary: None,
        }
    }

    /// Shares backing content-vote power: own stake net of delegations out,
    /// plus delegations in.
    pub fn effective_vesting_shares(&self) -> ShareAmount {
        self.vesting_shares.amount - self.delegated_vesting_shares.amount
            + self.received_vesting_shares.amount
    }

    /// Shares free to delegate away: own stake minus what is already
    /// delegated or queued for withdrawal.
    pub fn available_vesting_shares(&self) -> ShareAmount {
        self.vesting_shares.amount - self.delegated_vesting_shares.amount
    }

    /// Shares not spoken for by delegation or the unfinished part of a
    /// staged withdrawal.
    pub fn uncommitted_vesting_shares(&self) -> ShareAmount {
        self.available_vesting_shares() - (self.to_withdraw - self.withdrawn)
    }

    /// Total proxied stake across all chain distances.
    pub fn proxied_vsf_total(&self) -> i64 {
        self.proxied_vsf_votes.iter().sum()
    }

    /// Governance weight behind this account's witness votes: own stake plus
    /// proxied stake. Delegated vesting moves content-vote power only.
    pub fn witness_vote_stake(&self) -> i64 {
        self.vesting_shares.amount + self.proxied_vsf_total()
    }

    /// Energy regenerated up to `now`, clamped to +100%.
    pub fn current_energy(&self, now: TimePoint, regen_secs: u64) -> i16 {
        let elapsed = now.elapsed_since(self.last_energy_update);
        let regenerated = (elapsed as i64 * PERCENT_100 as i64) / regen_secs.max(1) as i64;
        let current = self.energy as i64 + regenerated;
        current.min(PERCENT_100 as i64) as i16
    }
}

impl StateObject for Account {
    const TABLE: &'static str = "accounts";
    type UniqueKey = AccountName;
    type OrderedKey = TimePoint;

    fn id(&self) -> ObjectId {
        self.id
    }

    fn unique_key(&self) -> AccountName {
        self.name.clone()
    }

    /// Ordered by next withdrawal so the vesting sweep reads a prefix.
    fn ordered_key(&self) -> Option<TimePoint> {
        Some(self.next_vesting_withdrawal)
    }
}

/// Authority bundle, one row per account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountAuthority {
    pub id: ObjectId,
    pub account: AccountName,
    pub master: Authority,
    pub active: Authority,
    pub regular: Authority,
    /// Rate-limits master rotations and anchors recovery windows
    pub last_master_update: TimePoint,
}

impl StateObject for AccountAuthority {
    const TABLE: &'static str = "account_authorities";
    type UniqueKey = AccountName;
    type OrderedKey = ();

    fn id(&self) -> ObjectId {
        self.id
    }

    fn unique_key(&self) -> AccountName {
        self.account.clone()
    }
}

/// Superseded master authorities, kept for the recovery window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MasterAuthorityHistory {
    pub id: ObjectId,
    pub account: AccountName,
    pub previous_master: Authority,
    pub last_valid_time: TimePoint,
}

impl StateObject for MasterAuthorityHistory {
    const TABLE: &'static str = "master_authority_history";
    type UniqueKey = ObjectId;
    type OrderedKey = TimePoint;

    fn id(&self) -> ObjectId {
        self.id
    }

    fn unique_key(&self) -> ObjectId {
        self.id
    }

    fn ordered_key(&self) -> Option<TimePoint> {
        Some(self.last_valid_time)
    }
}
