//! The chain state: every consensus table plus the shared undo-session
//! machinery.
//!
//! All tables push, undo, squash, and commit layers in lockstep; the
//! [`UndoState`] tracker is the single source of truth for the revision
//! number. `revision == head_block_number` holds whenever no speculative
//! session is open.

use lib_chainstore::{StoreError, Table, UndoState, UndoableTable};
use lib_types::{AccountName, Asset, Symbol, TimePoint};

use crate::errors::EvaluationError;
use crate::objects::*;

/// Runs `$body` once per table, binding `$t` to each in turn.
macro_rules! with_each_table {
    ($self:ident, |$t:ident| $body:expr) => {{
        {
            let $t: &mut dyn UndoableTable = &mut $self.accounts;
            $body
        }
        {
            let $t: &mut dyn UndoableTable = &mut $self.account_authorities;
            $body
        }
        {
            let $t: &mut dyn UndoableTable = &mut $self.master_authority_history;
            $body
        }
        {
            let $t: &mut dyn UndoableTable = &mut $self.content;
            $body
        }
        {
            let $t: &mut dyn UndoableTable = &mut $self.content_votes;
            $body
        }
        {
            let $t: &mut dyn UndoableTable = &mut $self.witnesses;
            $body
        }
        {
            let $t: &mut dyn UndoableTable = &mut $self.witness_votes;
            $body
        }
        {
            let $t: &mut dyn UndoableTable = &mut $self.globals;
            $body
        }
        {
            let $t: &mut dyn UndoableTable = &mut $self.witness_schedule;
            $body
        }
        {
            let $t: &mut dyn UndoableTable = &mut $self.hardforks;
            $body
        }
        {
            let $t: &mut dyn UndoableTable = &mut $self.transactions;
            $body
        }
        {
            let $t: &mut dyn UndoableTable = &mut $self.block_summaries;
            $body
        }
        {
            let $t: &mut dyn UndoableTable = &mut $self.escrows;
            $body
        }
        {
            let $t: &mut dyn UndoableTable = &mut $self.vesting_delegations;
            $body
        }
        {
            let $t: &mut dyn UndoableTable = &mut $self.vesting_delegation_expirations;
            $body
        }
        {
            let $t: &mut dyn UndoableTable = &mut $self.withdraw_routes;
            $body
        }
        {
            let $t: &mut dyn UndoableTable = &mut $self.committee_requests;
            $body
        }
        {
            let $t: &mut dyn UndoableTable = &mut $self.committee_votes;
            $body
        }
        {
            let $t: &mut dyn UndoableTable = &mut $self.paid_subscriptions;
            $body
        }
        {
            let $t: &mut dyn UndoableTable = &mut $self.paid_subscribes;
            $body
        }
        {
            let $t: &mut dyn UndoableTable = &mut $self.invites;
            $body
        }
        {
            let $t: &mut dyn UndoableTable = &mut $self.account_recovery_requests;
            $body
        }
        {
            let $t: &mut dyn UndoableTable = &mut $self.change_recovery_requests;
            $body
        }
    }};
}

/// All consensus tables.
#[derive(Default)]
pub struct ChainState {
    pub accounts: Table<Account>,
    pub account_authorities: Table<AccountAuthority>,
    pub master_authority_history: Table<MasterAuthorityHistory>,
    pub content: Table<Content>,
    pub content_votes: Table<ContentVote>,
    pub witnesses: Table<Witness>,
    pub witness_votes: Table<WitnessVote>,
    pub globals: Table<DynamicGlobalProperties>,
    pub witness_schedule: Table<WitnessScheduleObject>,
    pub hardforks: Table<HardforkProperties>,
    pub transactions: Table<TransactionObject>,
    pub block_summaries: Table<BlockSummary>,
    pub escrows: Table<Escrow>,
    pub vesting_delegations: Table<VestingDelegation>,
    pub vesting_delegation_expirations: Table<VestingDelegationExpiration>,
    pub withdraw_routes: Table<WithdrawVestingRoute>,
    pub committee_requests: Table<CommitteeRequest>,
    pub committee_votes: Table<CommitteeVote>,
    pub paid_subscriptions: Table<PaidSubscription>,
    pub paid_subscribes: Table<PaidSubscribe>,
    pub invites: Table<Invite>,
    pub account_recovery_requests: Table<AccountRecoveryRequest>,
    pub change_recovery_requests: Table<ChangeRecoveryRequest>,

    undo_state: UndoState,
}

impl ChainState {
    pub fn new() -> Self {
        Self::default()
    }

    // ------------------------------------------------------------------
    // Sessions
    // ------------------------------------------------------------------

    /// Open a nested undo session across every table.
    pub fn push_session(&mut self) {
        with_each_table!(self, |t| t.push_layer());
        self.undo_state.on_push();
    }

    /// Roll back the newest session.
    pub fn undo_session(&mut self) -> Result<(), StoreError> {
        self.undo_state.on_undo()?;
        with_each_table!(self, |t| t.undo());
        Ok(())
    }

    /// Merge the newest session into its parent.
    pub fn squash_session(&mut self) -> Result<(), StoreError> {
        self.undo_state.on_squash()?;
        with_each_table!(self, |t| t.squash());
        Ok(())
    }

    /// Pin everything at or below `revision` as irreversible.
    pub fn commit_to(&mut self, revision: u64) -> Result<(), StoreError> {
        let layers = self.undo_state.on_commit(revision)?;
        for _ in 0..layers {
            with_each_table!(self, |t| t.commit_one());
        }
        Ok(())
    }

    pub fn revision(&self) -> u64 {
        self.undo_state.revision()
    }

    pub fn undo_depth(&self) -> usize {
        self.undo_state.depth()
    }

    /// Run `f` in a fresh session: squash on success, undo on error. A
    /// failed scope is structurally unable to leak partial writes.
    pub fn with_session<T, E>(
        &mut self,
        f: impl FnOnce(&mut Self) -> Result<T, E>,
    ) -> Result<T, E> {
        self.push_session();
        match f(self) {
            Ok(value) => {
                self.squash_session()
                    .expect("session opened above is still live");
                Ok(value)
            }
            Err(error) => {
                self.undo_session()
                    .expect("session opened above is still live");
                Err(error)
            }
        }
    }

    // ------------------------------------------------------------------
    // Singleton accessors
    // ------------------------------------------------------------------

    /// Invariant: the singletons exist from genesis initialization onward.
    pub fn global(&self) -> &DynamicGlobalProperties {
        self.globals
            .iter()
            .next()
            .expect("global properties initialized at genesis")
    }

    pub fn update_global(&mut self, f: impl FnOnce(&mut DynamicGlobalProperties)) {
        let id = self.global().id;
        self.globals
            .modify(id, f)
            .expect("global properties row exists");
    }

    pub fn schedule(&self) -> &WitnessScheduleObject {
        self.witness_schedule
            .iter()
            .next()
            .expect("witness schedule initialized at genesis")
    }

    pub fn update_schedule(&mut self, f: impl FnOnce(&mut WitnessScheduleObject)) {
        let id = self.schedule().id;
        self.witness_schedule
            .modify(id, f)
            .expect("witness schedule row exists");
    }

    pub fn hardfork_props(&self) -> &HardforkProperties {
        self.hardforks
            .iter()
            .next()
            .expect("hardfork properties initialized at genesis")
    }

    pub fn update_hardforks(&mut self, f: impl FnOnce(&mut HardforkProperties)) {
        let id = self.hardfork_props().id;
        self.hardforks
            .modify(id, f)
            .expect("hardfork properties row exists");
    }

    /// The deterministic behavior switch: evaluators branch on this count,
    /// never on wall-clock time.
    pub fn applied_hardforks(&self) -> u32 {
        self.hardfork_props().last_hardfork
    }

    pub fn head_time(&self) -> TimePoint {
        self.global().time
    }

    pub fn head_block_num(&self) -> u32 {
        self.global().head_block_number
    }

    // ------------------------------------------------------------------
    // Common lookups
    // ------------------------------------------------------------------

    pub fn get_account(&self, name: &AccountName) -> Result<&Account, EvaluationError> {
        self.accounts
            .find(name)
            .ok_or_else(|| EvaluationError::UnknownAccount(name.clone()))
    }

    pub fn account_exists(&self, name: &AccountName) -> bool {
        self.accounts.contains(name)
    }

    pub fn get_authority(&self, name: &AccountName) -> Result<&AccountAuthority, EvaluationError> {
        self.account_authorities
            .find(name)
            .ok_or_else(|| EvaluationError::UnknownAccount(name.clone()))
    }

    pub fn get_witness(&self, name: &AccountName) -> Result<&Witness, EvaluationError> {
        self.witnesses
            .find(name)
            .ok_or_else(|| EvaluationError::UnknownWitness(name.clone()))
    }

    pub fn get_content(
        &self,
        author: &AccountName,
        permlink: &str,
    ) -> Result<&Content, EvaluationError> {
        self.content
            .find(&(author.clone(), permlink.to_string()))
            .ok_or_else(|| EvaluationError::UnknownContent {
                author: author.clone(),
                permlink: permlink.to_string(),
            })
    }

    // ------------------------------------------------------------------
    // Balance plumbing
    // ------------------------------------------------------------------

    /// Add `delta` (possibly negative) to an account's liquid balance,
    /// refusing to take it below zero.
    pub fn adjust_balance(
        &mut self,
        name: &AccountName,
        delta: Asset,
    ) -> Result<(), EvaluationError> {
        delta.expect_symbol(Symbol::Weave)?;
        let account = self.get_account(name)?;
        let new_balance = account.balance.checked_add(delta)?;
        if new_balance.is_negative() {
            return Err(EvaluationError::InsufficientBalance {
                account: name.clone(),
                required: Asset::weave(-delta.amount),
                available: account.balance,
            });
        }
        let id = account.id;
        self.accounts
            .modify(id, |a| a.balance = new_balance)
            .map_err(EvaluationError::from)
    }

    /// Convert existing liquid tokens into new vesting shares credited to
    /// `name`. The tokens must already be debited from their source; this
    /// moves them into the vesting fund and mints shares at the current
    /// price. Returns the shares minted.
    pub fn create_vesting(
        &mut self,
        name: &AccountName,
        liquid: Asset,
    ) -> Result<Asset, EvaluationError> {
        liquid.expect_symbol(Symbol::Weave)?;
        let shares = self.global().tokens_to_shares(liquid);
        let id = self.get_account(name)?.id;
        self.accounts.modify(id, |a| {
            a.vesting_shares.amount += shares.amount;
        })?;
        self.update_global(|g| {
            g.total_vesting_fund.amount += liquid.amount;
            g.total_vesting_shares.amount += shares.amount;
        });
        crate::evaluators::witness::on_stake_changed(self, name, shares.amount)?;
        Ok(shares)
    }

    /// Upsert the TaPoS ring-buffer entry for a block.
    pub fn record_block_summary(
        &mut self,
        block_num: u32,
        block_id: lib_types::BlockId,
    ) -> Result<(), StoreError> {
        let slot = block_num % BLOCK_SUMMARY_SLOTS;
        if let Some(existing) = self.block_summaries.find(&slot) {
            let id = existing.id;
            self.block_summaries.modify(id, |s| s.block_id = block_id)
        } else {
            self.block_summaries
                .create(|id| BlockSummary { id, slot, block_id })
                .map(|_| ())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lib_protocol::HashSigner;

    fn seeded_state() -> ChainState {
        let mut state = ChainState::new();
        state
            .accounts
            .create(|id| {
                Account::new(
                    id,
                    AccountName::new("alice").unwrap(),
                    HashSigner::public_key("alice"),
                    TimePoint::ZERO,
                )
            })
            .unwrap();
        state
    }

    #[test]
    fn session_round_trip_is_a_noop() {
        let mut state = seeded_state();
        let name = AccountName::new("alice").unwrap();

        state.push_session();
        state
            .accounts
            .create(|id| {
                Account::new(
                    id,
                    AccountName::new("bob").unwrap(),
                    HashSigner::public_key("bob"),
                    TimePoint::ZERO,
                )
            })
            .unwrap();
        let id = state.get_account(&name).unwrap().id;
        state.accounts.modify(id, |a| a.balance = Asset::weave(5)).unwrap();
        state.undo_session().unwrap();

        assert_eq!(state.accounts.len(), 1);
        assert!(state.get_account(&name).unwrap().balance.is_zero());
        assert_eq!(state.revision(), 0);
    }

    #[test]
    fn adjust_balance_refuses_overdraft() {
        let mut state = seeded_state();
        let name = AccountName::new("alice").unwrap();

        state.adjust_balance(&name, Asset::weave(100)).unwrap();
        assert!(state.adjust_balance(&name, Asset::weave(-150)).is_err());
        assert_eq!(state.get_account(&name).unwrap().balance.amount, 100);
    }
}
